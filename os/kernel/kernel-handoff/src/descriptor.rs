//! # UEFI Memory Descriptors
//!
//! Read-only view over the raw memory map handed over in
//! [`BootHandoff`](crate::boot::BootHandoff). Descriptors are decoded from
//! little-endian bytes at the reported stride, so neither alignment nor the
//! exact descriptor version matters as long as the version-1 prefix is
//! present.

use core::fmt;
use core::slice::ChunksExact;

/// Bytes of the version-1 `EFI_MEMORY_DESCRIPTOR` prefix we decode.
pub const DESCRIPTOR_LEN: usize = 40;

/// `EFI_MEMORY_TYPE` of a descriptor.
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemoryType(pub u32);

impl MemoryType {
    pub const RESERVED: Self = Self(0);
    pub const LOADER_CODE: Self = Self(1);
    pub const LOADER_DATA: Self = Self(2);
    pub const BOOT_SERVICES_CODE: Self = Self(3);
    pub const BOOT_SERVICES_DATA: Self = Self(4);
    pub const RUNTIME_SERVICES_CODE: Self = Self(5);
    pub const RUNTIME_SERVICES_DATA: Self = Self(6);
    pub const CONVENTIONAL: Self = Self(7);
    pub const UNUSABLE: Self = Self(8);
    pub const ACPI_RECLAIM: Self = Self(9);
    pub const ACPI_NON_VOLATILE: Self = Self(10);
    pub const MMIO: Self = Self(11);
    pub const MMIO_PORT_SPACE: Self = Self(12);
    pub const PAL_CODE: Self = Self(13);
    pub const PERSISTENT_MEMORY: Self = Self(14);
    pub const UNACCEPTED: Self = Self(15);

    /// Whether the kernel may use this range once boot services are gone.
    ///
    /// Loader ranges are included: they hold the kernel image, the handoff
    /// record and this very memory map, so the kernel must reserve those
    /// before handing the rest to its allocator.
    #[must_use]
    pub const fn is_usable_after_exit(self) -> bool {
        matches!(self.0, 1..=4 | 7)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self.0 {
            0 => "reserved",
            1 => "loader code",
            2 => "loader data",
            3 => "boot services code",
            4 => "boot services data",
            5 => "runtime services code",
            6 => "runtime services data",
            7 => "conventional",
            8 => "unusable",
            9 => "ACPI reclaim",
            10 => "ACPI NVS",
            11 => "MMIO",
            12 => "MMIO port space",
            13 => "PAL code",
            14 => "persistent",
            15 => "unaccepted",
            _ => "unknown",
        }
    }
}

impl fmt::Debug for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

/// `EFI_MEMORY_DESCRIPTOR.Attribute` bits.
///
/// Layout (LSB→MSB):
/// - bits 0..=4: cacheability (`UC`, `WC`, `WT`, `WB`, `UCE`)
/// - bits 12..=19: protection and capability flags
/// - bit 63: needs a runtime mapping
#[bitfield_struct::bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct MemoryAttribute {
    pub uncacheable: bool,
    pub write_combine: bool,
    pub write_through: bool,
    pub write_back: bool,
    pub uncacheable_exported: bool,
    #[bits(7)]
    __: u8,
    pub write_protect: bool,
    pub read_protect: bool,
    pub execute_protect: bool,
    pub non_volatile: bool,
    pub more_reliable: bool,
    pub read_only: bool,
    pub specific_purpose: bool,
    pub cpu_crypto: bool,
    #[bits(43)]
    __: u64,
    pub runtime: bool,
}

/// One decoded memory descriptor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryDescriptor {
    pub ty: MemoryType,
    pub phys_start: u64,
    pub virt_start: u64,
    pub page_count: u64,
    pub attribute: MemoryAttribute,
}

impl MemoryDescriptor {
    /// Decode a descriptor from the start of `bytes`.
    ///
    /// Returns `None` if fewer than [`DESCRIPTOR_LEN`] bytes are available.
    #[must_use]
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..DESCRIPTOR_LEN)?;
        let u64_at = |offset: usize| {
            bytes
                .get(offset..offset + 8)
                .and_then(|b| b.try_into().ok())
                .map(u64::from_le_bytes)
        };

        Some(Self {
            ty: MemoryType(u32::from_le_bytes(bytes[0..4].try_into().ok()?)),
            phys_start: u64_at(8)?,
            virt_start: u64_at(16)?,
            page_count: u64_at(24)?,
            attribute: MemoryAttribute::from_bits(u64_at(32)?),
        })
    }

    /// Size of the described range in bytes, saturating on overflow.
    #[must_use]
    pub const fn len_bytes(&self) -> u64 {
        self.page_count.saturating_mul(crate::memory::PAGE_SIZE)
    }
}

/// Iterator over the descriptors of a raw memory map.
///
/// Trailing bytes that do not form a full stride are ignored, as is every
/// descriptor if the stride is smaller than [`DESCRIPTOR_LEN`].
pub struct MemoryDescriptors<'a> {
    chunks: ChunksExact<'a, u8>,
}

impl<'a> MemoryDescriptors<'a> {
    #[must_use]
    pub fn new(map: &'a [u8], desc_size: usize) -> Self {
        let (map, stride) = if desc_size < DESCRIPTOR_LEN {
            (&map[..0], 1)
        } else {
            (map, desc_size)
        };

        Self {
            chunks: map.chunks_exact(stride),
        }
    }
}

impl Iterator for MemoryDescriptors<'_> {
    type Item = MemoryDescriptor;

    fn next(&mut self) -> Option<Self::Item> {
        self.chunks.next().and_then(MemoryDescriptor::parse)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}
