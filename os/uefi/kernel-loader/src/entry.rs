//! # Entry Point Resolution
//!
//! The kernel is either a flat binary, entered at its first byte, or an
//! ELF64 file, entered at `e_entry`. Nothing else about the ELF header is
//! looked at; `e_entry` is trusted as-is and not checked against the image
//! bounds.

use log::info;

/// `EI_MAG0..=EI_MAG3`.
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// Size of the ELF64 file header; shorter files are never treated as ELF.
pub const ELF64_HEADER_LEN: usize = 64;

/// Byte offset of the 8-byte little-endian `e_entry` field in an ELF64 header.
pub const E_ENTRY_OFFSET: usize = 24;

/// Where the loader jumps to, and why.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Taken from the ELF64 header.
    Elf64 { address: u64 },
    /// No ELF header found; the image is entered at its load base.
    FlatBinary { address: u64 },
}

impl EntryPoint {
    #[must_use]
    pub const fn address(self) -> u64 {
        match self {
            Self::Elf64 { address } | Self::FlatBinary { address } => address,
        }
    }
}

/// Resolve the entry point of an image loaded at `base`.
#[must_use]
pub fn resolve_entry(bytes: &[u8], base: u64) -> EntryPoint {
    if let Some(address) = elf64_entry(bytes) {
        info!("ELF detected. e_entry = {address:#x}");
        EntryPoint::Elf64 { address }
    } else {
        info!("Non-ELF kernel file, using load address {base:#x} as entry");
        EntryPoint::FlatBinary { address: base }
    }
}

fn elf64_entry(bytes: &[u8]) -> Option<u64> {
    let header = bytes.get(..ELF64_HEADER_LEN)?;
    if header[..ELF_MAGIC.len()] != ELF_MAGIC {
        return None;
    }

    let field = header.get(E_ENTRY_OFFSET..E_ENTRY_OFFSET + size_of::<u64>())?;
    field.try_into().ok().map(u64::from_le_bytes)
}
