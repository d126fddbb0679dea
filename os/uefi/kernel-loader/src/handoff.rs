//! # Handoff Record Assembly
//!
//! The record is reserved in pool memory *before* the memory map is
//! captured and filled in afterwards, so that no allocation sits between
//! the final `GetMemoryMap` and `ExitBootServices`.

use crate::error::LoaderError;
use crate::firmware::Firmware;
use crate::image::LoadedImage;
use crate::mmap::MemoryMapSnapshot;
use core::mem::MaybeUninit;
use kernel_handoff::boot::BootHandoff;
use kernel_handoff::memory::PHYSICAL_MEMORY_OFFSET;
use log::error;

/// Pool storage for the [`BootHandoff`] record, not yet populated.
pub struct HandoffSlot {
    slot: &'static mut MaybeUninit<BootHandoff>,
}

impl HandoffSlot {
    /// Allocate storage for the record.
    ///
    /// # Errors
    /// Allocation failure, or pool memory too small or misaligned for the
    /// record.
    #[allow(unsafe_code)]
    pub fn reserve<F: Firmware>(fw: &mut F) -> Result<Self, LoaderError> {
        let size = size_of::<BootHandoff>();
        let buffer = fw
            .allocate_pool(size)
            .map_err(|e| LoaderError::OutOfResources {
                purpose: "boot handoff",
                size,
                status: e.status(),
            })
            .inspect_err(|e| error!("{e}"))?;

        let ptr = buffer.as_mut_ptr().cast::<MaybeUninit<BootHandoff>>();
        if buffer.len() < size || !ptr.is_aligned() {
            let err = LoaderError::HandoffStorage {
                address: ptr as u64,
            };
            error!("{err}");
            return Err(err);
        }

        // SAFETY: the buffer is large enough and aligned for the record, it is
        // exclusively ours for the rest of the boot, and `MaybeUninit` has no
        // validity requirements.
        let slot = unsafe { &mut *ptr };
        Ok(Self { slot })
    }

    /// Physical address of the record.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.slot.as_ptr() as u64
    }

    /// Fill in the record. Performs no firmware calls.
    ///
    /// The snapshot's buffer is referenced, not copied; its ownership passes
    /// to the kernel together with the record.
    #[must_use]
    pub fn populate(self, snapshot: MemoryMapSnapshot, image: &LoadedImage) -> &'static BootHandoff {
        let Self { slot } = self;
        MaybeUninit::write(slot, BootHandoff {
            memory_map: snapshot.address(),
            memory_map_size: snapshot.len() as u64,
            descriptor_size: snapshot.desc_size() as u64,
            descriptor_version: snapshot.desc_version(),
            physical_memory_offset: PHYSICAL_MEMORY_OFFSET,
            kernel_entry_phys: image.entry.address(),
        })
    }
}
