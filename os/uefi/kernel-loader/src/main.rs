//! # Kernel Loader Image
//!
//! The UEFI application entry point. See the library crate for the boot
//! sequence. Built for the host the binary is empty, so the workspace can
//! run its tests there.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]

#[cfg(target_os = "uefi")]
mod efi {
    use kernel_loader::dispatch::enter_kernel;
    use kernel_loader::logger::UefiLogger;
    use kernel_loader::tracing::trace_handoff;
    use kernel_loader::{UefiFirmware, stage_kernel};
    use log::{LevelFilter, error, info};
    use uefi::prelude::*;

    static LOGGER: UefiLogger = UefiLogger::new(LevelFilter::Debug);

    #[entry]
    fn efi_main() -> Status {
        if uefi::helpers::init().is_err() {
            return Status::UNSUPPORTED;
        }
        if LOGGER.init().is_err() {
            return Status::ABORTED;
        }

        info!("UEFI Loader reporting to QEMU");

        // SAFETY: `uefi` is initialized and this is the only instance.
        let mut firmware = unsafe { UefiFirmware::new() };
        let handoff = match stage_kernel(&mut firmware) {
            Ok(handoff) => handoff,
            Err(e) => {
                error!("Failed to load kernel, class {:?}", e.class());
                return e.into();
            }
        };

        // SAFETY: boot services are gone; the record and its memory map are
        // LOADER_DATA and identity mapped.
        unsafe {
            trace_handoff(handoff);
            enter_kernel(handoff)
        }
    }
}

#[cfg(not(target_os = "uefi"))]
fn main() {}
