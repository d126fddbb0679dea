//! # Firmware Seam
//!
//! The handful of boot services the loader consumes, expressed as a trait so
//! the boot sequence can run against the real UEFI boot services
//! ([`UefiFirmware`](crate::uefi_firmware::UefiFirmware)) or a simulation.
//!
//! Results follow the `uefi` crate conventions: a failed call carries its
//! [`Status`](uefi::Status), and two-call size probes report the required
//! size in the error data alongside `BUFFER_TOO_SMALL`.

use crate::error::LoaderError;
use uefi::CStr16;

/// Key identifying one specific state of the firmware memory map.
///
/// Any allocation made after the key was handed out makes it stale;
/// `ExitBootServices` only accepts the current key.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MapKey(usize);

impl MapKey {
    #[must_use]
    pub const fn new(raw: usize) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }
}

/// Geometry reported alongside a memory map query.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryMapMeta {
    /// Bytes written, or on `BUFFER_TOO_SMALL` the bytes required.
    pub map_size: usize,
    /// Stride of one descriptor.
    pub desc_size: usize,
    pub desc_version: u32,
    pub map_key: MapKey,
}

/// A kernel file opened for reading.
pub trait KernelFile {
    /// `EFI_FILE_PROTOCOL.GetInfo(EFI_FILE_INFO)`, returning the file size.
    ///
    /// # Errors
    /// `BUFFER_TOO_SMALL` with the required buffer size if `buffer` cannot
    /// hold the info structure, any other firmware status on failure.
    fn file_size(&mut self, buffer: &mut [u8]) -> uefi::Result<u64, Option<usize>>;

    /// `EFI_FILE_PROTOCOL.Read` into `buffer`, returning the bytes read.
    ///
    /// # Errors
    /// The firmware status of a failed read.
    fn read(&mut self, buffer: &mut [u8]) -> uefi::Result<usize>;
}

/// Boot services consumed by the loader.
///
/// All memory handed out is `LOADER_DATA` and stays valid after
/// `ExitBootServices`; the loader never frees anything the kernel receives.
pub trait Firmware {
    type File: KernelFile;

    /// Open `path` read-only on the volume the loader image was started from.
    ///
    /// # Errors
    /// The [`LoaderError`] naming the resolution step that failed.
    fn open_boot_file(&mut self, path: &'static CStr16) -> Result<Self::File, LoaderError>;

    /// `AllocatePool(LOADER_DATA)`.
    ///
    /// # Errors
    /// The firmware status, typically `OUT_OF_RESOURCES`.
    fn allocate_pool(&mut self, size: usize) -> uefi::Result<&'static mut [u8]>;

    /// `FreePool` for a buffer obtained from [`allocate_pool`](Self::allocate_pool).
    ///
    /// # Errors
    /// The firmware status.
    fn free_pool(&mut self, buffer: &'static mut [u8]) -> uefi::Result;

    /// `AllocatePages(AllocateAddress, LOADER_DATA)`: exactly `pages` pages
    /// starting at `address`, or nothing at all.
    ///
    /// # Errors
    /// `NOT_FOUND` if the range is not available, any other firmware status.
    fn allocate_pages_at(&mut self, address: u64, pages: usize) -> uefi::Result<&'static mut [u8]>;

    /// `GetMemoryMap` into `buffer`.
    ///
    /// # Errors
    /// `BUFFER_TOO_SMALL` with the required geometry, any other firmware
    /// status without data.
    fn get_memory_map(
        &mut self,
        buffer: &mut [u8],
    ) -> uefi::Result<MemoryMapMeta, Option<MemoryMapMeta>>;

    /// `ExitBootServices` for the loader image with the given map key.
    ///
    /// # Errors
    /// `INVALID_PARAMETER` if the key is stale.
    fn exit_boot_services(&mut self, key: MapKey) -> uefi::Result;
}
