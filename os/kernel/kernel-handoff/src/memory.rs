//! # Fixed Addresses

/// Size of a UEFI page. Allocation granularity for the kernel image.
pub const PAGE_SIZE: u64 = 4096;

/// Where the kernel image is placed in *physical* memory.
///
/// The kernel is linked for this address; the loader reserves it exactly
/// and never accepts a firmware-chosen alternative.
pub const PHYS_LOAD: u64 = 0x0010_0000; // 1 MiB

/// Virtual/physical offset the kernel uses to reach physical memory.
///
/// This is an ABI parameter agreed upon at build time, not something the
/// loader derives or validates. The kernel maps physical address `pa` at
/// `PHYSICAL_MEMORY_OFFSET + pa`.
pub const PHYSICAL_MEMORY_OFFSET: u64 = 0xffff_8000_0000_0000;

const _: () = {
    assert!(PHYS_LOAD.is_multiple_of(PAGE_SIZE));
    assert!(PHYSICAL_MEMORY_OFFSET.is_multiple_of(PAGE_SIZE));
    assert!(PHYSICAL_MEMORY_OFFSET > PHYS_LOAD);
};
