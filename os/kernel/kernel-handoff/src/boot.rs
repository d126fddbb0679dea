//! # Kernel Boot Handoff

use crate::descriptor::MemoryDescriptors;
use core::fmt;
use core::mem::{offset_of, size_of};

/// Kernel function pointer.
///
/// # ABI
/// The ABI is `efiapi` since the kernel is called from a UEFI (PE/COFF)
/// application. The single argument is the handoff record; the function
/// never returns.
pub type KernelEntryFn = extern "efiapi" fn(*const BootHandoff) -> !;

/// Everything the kernel receives from the loader after `ExitBootServices`.
///
/// The record lives in `LOADER_DATA` pool memory and is never freed by the
/// loader. Field order and widths are part of the ABI; keep this `#[repr(C)]`
/// and append, never reorder.
#[repr(C)]
#[derive(Clone, PartialEq, Eq)]
pub struct BootHandoff {
    /// Physical address of the raw UEFI memory map (array of `EFI_MEMORY_DESCRIPTOR` bytes).
    pub memory_map: u64,

    /// Bytes of the memory map buffer actually populated by the firmware.
    pub memory_map_size: u64,

    /// Stride of one descriptor in bytes. May exceed `size_of::<EFI_MEMORY_DESCRIPTOR>()`.
    pub descriptor_size: u64,

    /// Descriptor format version as reported by `GetMemoryMap`.
    pub descriptor_version: u32,

    /// Virtual/physical offset convention, see [`PHYSICAL_MEMORY_OFFSET`](crate::memory::PHYSICAL_MEMORY_OFFSET).
    pub physical_memory_offset: u64,

    /// Physical address the loader jumped to.
    pub kernel_entry_phys: u64,
}

const _: () = {
    assert!(offset_of!(BootHandoff, memory_map) == 0);
    assert!(offset_of!(BootHandoff, memory_map_size) == 8);
    assert!(offset_of!(BootHandoff, descriptor_size) == 16);
    assert!(offset_of!(BootHandoff, descriptor_version) == 24);
    assert!(offset_of!(BootHandoff, physical_memory_offset) == 32);
    assert!(offset_of!(BootHandoff, kernel_entry_phys) == 40);
    assert!(size_of::<BootHandoff>() == 48);
};

impl BootHandoff {
    /// The raw memory map bytes described by this record.
    ///
    /// # Safety
    /// `memory_map` and `memory_map_size` must describe memory that is mapped
    /// and readable at its physical address (identity mapping, as set up by
    /// the firmware), and that memory must not be written while the returned
    /// slice is alive.
    #[allow(unsafe_code, clippy::cast_possible_truncation)]
    #[must_use]
    pub unsafe fn memory_map_bytes(&self) -> &[u8] {
        if self.memory_map == 0 || self.memory_map_size == 0 {
            return &[];
        }

        // SAFETY: upheld by the caller.
        unsafe {
            core::slice::from_raw_parts(
                self.memory_map as usize as *const u8,
                self.memory_map_size as usize,
            )
        }
    }

    /// Iterate the memory descriptors described by this record.
    ///
    /// # Safety
    /// Same requirements as [`memory_map_bytes`](Self::memory_map_bytes).
    #[allow(unsafe_code, clippy::cast_possible_truncation)]
    #[must_use]
    pub unsafe fn descriptors(&self) -> MemoryDescriptors<'_> {
        // SAFETY: upheld by the caller.
        let bytes = unsafe { self.memory_map_bytes() };
        MemoryDescriptors::new(bytes, self.descriptor_size as usize)
    }
}

impl fmt::Debug for BootHandoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootHandoff")
            .field("memory_map", &format_args!("{:#018x}", self.memory_map))
            .field("memory_map_size", &self.memory_map_size)
            .field("descriptor_size", &self.descriptor_size)
            .field("descriptor_version", &self.descriptor_version)
            .field(
                "physical_memory_offset",
                &format_args!("{:#018x}", self.physical_memory_offset),
            )
            .field(
                "kernel_entry_phys",
                &format_args!("{:#018x}", self.kernel_entry_phys),
            )
            .finish()
    }
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;
    use crate::descriptor::{DESCRIPTOR_LEN, MemoryType};
    use crate::memory::{PHYS_LOAD, PHYSICAL_MEMORY_OFFSET};

    fn descriptor_bytes(ty: u32, phys_start: u64, pages: u64, stride: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; stride];
        bytes[0..4].copy_from_slice(&ty.to_le_bytes());
        bytes[8..16].copy_from_slice(&phys_start.to_le_bytes());
        bytes[24..32].copy_from_slice(&pages.to_le_bytes());
        bytes
    }

    #[test]
    fn empty_map_yields_no_bytes() {
        let handoff = BootHandoff {
            memory_map: 0,
            memory_map_size: 0,
            descriptor_size: 48,
            descriptor_version: 1,
            physical_memory_offset: PHYSICAL_MEMORY_OFFSET,
            kernel_entry_phys: PHYS_LOAD,
        };

        assert!(unsafe { handoff.memory_map_bytes() }.is_empty());
        assert_eq!(unsafe { handoff.descriptors() }.count(), 0);
    }

    #[test]
    fn descriptors_follow_record_stride() {
        let stride = 48;
        let mut map = descriptor_bytes(7, 0x10_0000, 16, stride);
        map.extend(descriptor_bytes(2, 0x20_0000, 4, stride));
        assert!(stride > DESCRIPTOR_LEN);

        let handoff = BootHandoff {
            memory_map: map.as_ptr() as u64,
            memory_map_size: map.len() as u64,
            descriptor_size: stride as u64,
            descriptor_version: 1,
            physical_memory_offset: PHYSICAL_MEMORY_OFFSET,
            kernel_entry_phys: PHYS_LOAD,
        };

        let descriptors: Vec<_> = unsafe { handoff.descriptors() }.collect();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].ty, MemoryType::CONVENTIONAL);
        assert_eq!(descriptors[0].phys_start, 0x10_0000);
        assert_eq!(descriptors[1].ty, MemoryType::LOADER_DATA);
        assert_eq!(descriptors[1].page_count, 4);
    }

    #[test]
    fn debug_prints_addresses_in_hex() {
        let handoff = BootHandoff {
            memory_map: 0x8000,
            memory_map_size: 96,
            descriptor_size: 48,
            descriptor_version: 1,
            physical_memory_offset: PHYSICAL_MEMORY_OFFSET,
            kernel_entry_phys: PHYS_LOAD,
        };

        let text = format!("{handoff:?}");
        assert!(text.contains("kernel_entry_phys: 0x0000000000100000"));
        assert!(text.contains("physical_memory_offset: 0xffff800000000000"));
    }
}
