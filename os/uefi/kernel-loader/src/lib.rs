//! # UEFI Flat-Kernel Loader
//!
//! Loads a single kernel file from the boot volume to a fixed physical
//! address, captures the firmware memory map, leaves boot services and jumps
//! into the kernel with a pointer to a [`BootHandoff`] record.
//!
//! ## Boot sequence
//!
//! ```text
//! efi_main
//!   ├─ read_kernel_image      \BOOT\KERNEL_X.BIN → 0x0010_0000 (AllocateAddress)
//!   ├─ resolve entry          ELF64 e_entry, or the load address for flat images
//!   ├─ HandoffSlot::reserve   pool memory for the record (last allocation)
//!   ├─ capture_memory_map     probe, allocate with headroom, fetch
//!   ├─ HandoffSlot::populate  no firmware calls
//!   ├─ exit_boot_services     single attempt with the fetched map key
//!   └─ enter_kernel           extern "efiapi" fn(*const BootHandoff) -> !
//! ```
//!
//! Between the final `GetMemoryMap` and `ExitBootServices` the loader makes
//! no firmware call at all. The UEFI console is suspended for that window;
//! trace output keeps flowing to the QEMU debug console.
//!
//! Firmware access goes through the [`Firmware`] trait, implemented by
//! [`UefiFirmware`] for the real boot services.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod debugcon;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod exit;
pub mod file_system;
pub mod firmware;
pub mod handoff;
pub mod image;
pub mod logger;
pub mod mmap;
pub mod tracing;
pub mod uefi_firmware;

pub use crate::error::{ErrorClass, LoaderError};
pub use crate::firmware::Firmware;
pub use crate::uefi_firmware::UefiFirmware;
pub use kernel_handoff::boot::BootHandoff;

use crate::handoff::HandoffSlot;
use crate::image::read_kernel_image;
use crate::mmap::capture_memory_map;
use log::{debug, info};

/// Run the loader up to, and including, `ExitBootServices`.
///
/// On success boot services are gone and the returned record is ready to be
/// passed to [`dispatch::enter_kernel`]. On failure boot services are still
/// active and the error has already been logged to the console.
///
/// # Errors
/// The first step that failed. No step is retried.
pub fn stage_kernel<F: Firmware>(fw: &mut F) -> Result<&'static BootHandoff, LoaderError> {
    let image = read_kernel_image(fw)?.resolve();
    info!(
        "Kernel loaded: {} bytes in {} pages at {:#x}, entry {:#x}",
        image.len,
        image.pages,
        image.base,
        image.entry.address()
    );

    let slot = HandoffSlot::reserve(fw)?;
    debug!("Boot handoff record at {:#x}", slot.address());

    info!("Exiting boot services ...");
    let snapshot = capture_memory_map(fw)?;
    let key = snapshot.map_key();
    let handoff = slot.populate(snapshot, &image);

    exit::exit_boot_services(fw, key)?;
    Ok(handoff)
}
