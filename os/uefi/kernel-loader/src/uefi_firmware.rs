//! # UEFI Boot Services Backend
//!
//! [`Firmware`] on top of the real boot services. Allocation and file access
//! go through the `uefi` crate; `GetMemoryMap` and `ExitBootServices` are
//! called through the raw boot services table, because the loader has to
//! own the map buffer and the map key itself rather than let a wrapper
//! retry on its behalf.

use crate::error::LoaderError;
use crate::file_system::{BootVolumeFile, open_boot_file};
use crate::firmware::{Firmware, MapKey, MemoryMapMeta};
use core::ptr::NonNull;
use kernel_handoff::memory::PAGE_SIZE;
use uefi::boot::{self, AllocateType, MemoryType};
use uefi::{CStr16, Status, StatusExt};

/// The boot services of the running firmware.
///
/// Only valid while boot services are active, i.e. until
/// [`exit_boot_services`](Firmware::exit_boot_services) succeeded.
pub struct UefiFirmware {
    _private: (),
}

impl UefiFirmware {
    /// # Safety
    /// The `uefi` crate must have been initialized (`#[entry]`), and at most
    /// one instance may exist.
    #[allow(unsafe_code)]
    #[must_use]
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

#[allow(unsafe_code)]
impl Firmware for UefiFirmware {
    type File = BootVolumeFile;

    fn open_boot_file(&mut self, path: &'static CStr16) -> Result<Self::File, LoaderError> {
        open_boot_file(path)
    }

    fn allocate_pool(&mut self, size: usize) -> uefi::Result<&'static mut [u8]> {
        let ptr = boot::allocate_pool(MemoryType::LOADER_DATA, size)?;
        // SAFETY: the firmware handed us `size` bytes that nobody else references.
        Ok(unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), size) })
    }

    fn free_pool(&mut self, buffer: &'static mut [u8]) -> uefi::Result {
        let Some(ptr) = NonNull::new(buffer.as_mut_ptr()) else {
            return Ok(());
        };
        // SAFETY: the buffer came from `allocate_pool` and is consumed here.
        unsafe { boot::free_pool(ptr) }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn allocate_pages_at(&mut self, address: u64, pages: usize) -> uefi::Result<&'static mut [u8]> {
        let ptr = boot::allocate_pages(
            AllocateType::Address(address),
            MemoryType::LOADER_DATA,
            pages,
        )?;
        let len = pages
            .checked_mul(PAGE_SIZE as usize)
            .ok_or_else(|| uefi::Error::from(Status::BAD_BUFFER_SIZE))?;
        // SAFETY: the pages are identity mapped and exclusively ours.
        Ok(unsafe { core::slice::from_raw_parts_mut(ptr.as_ptr(), len) })
    }

    fn get_memory_map(
        &mut self,
        buffer: &mut [u8],
    ) -> uefi::Result<MemoryMapMeta, Option<MemoryMapMeta>> {
        let Some(st) = uefi::table::system_table_raw() else {
            return Err(uefi::Error::new(Status::UNSUPPORTED, None));
        };
        // SAFETY: the system table outlives the image.
        let bs = unsafe { st.as_ref().boot_services };
        if bs.is_null() {
            return Err(uefi::Error::new(Status::UNSUPPORTED, None));
        }

        let mut map_size = buffer.len();
        let mut map_key = 0usize;
        let mut desc_size = 0usize;
        let mut desc_version = 0u32;

        // SAFETY: all out-pointers are valid; `map_size` bounds the buffer.
        let status = unsafe {
            ((*bs).get_memory_map)(
                &raw mut map_size,
                buffer.as_mut_ptr().cast(),
                &raw mut map_key,
                &raw mut desc_size,
                &raw mut desc_version,
            )
        };

        let meta = MemoryMapMeta {
            map_size,
            desc_size,
            desc_version,
            map_key: MapKey::new(map_key),
        };

        if status.is_success() {
            Ok(meta)
        } else if status == Status::BUFFER_TOO_SMALL {
            Err(uefi::Error::new(status, Some(meta)))
        } else {
            Err(uefi::Error::new(status, None))
        }
    }

    fn exit_boot_services(&mut self, key: MapKey) -> uefi::Result {
        let Some(st) = uefi::table::system_table_raw() else {
            return Err(Status::UNSUPPORTED.into());
        };
        // SAFETY: the system table outlives the image.
        let bs = unsafe { st.as_ref().boot_services };
        if bs.is_null() {
            return Err(Status::UNSUPPORTED.into());
        }

        // SAFETY: the caller guarantees nothing uses boot services after success.
        let status = unsafe {
            ((*bs).exit_boot_services)(boot::image_handle().as_ptr(), key.as_usize())
        };
        status.to_result()
    }
}
