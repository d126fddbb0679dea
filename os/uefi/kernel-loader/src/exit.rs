//! # Boot Services Termination

use crate::error::LoaderError;
use crate::firmware::{Firmware, MapKey};
use crate::logger;
use log::error;

/// Terminate boot services with the key of the last memory map snapshot.
///
/// There is exactly one attempt. A rejection means something allocated
/// after the snapshot was taken, which retrying would only paper over.
/// Boot services survive a failed call, so the failure is still reported
/// on the console.
///
/// After success no firmware service may be used anymore, logging included.
///
/// # Errors
/// [`LoaderError::ExitBootServices`] carrying the firmware status.
pub fn exit_boot_services<F: Firmware>(fw: &mut F, key: MapKey) -> Result<(), LoaderError> {
    fw.exit_boot_services(key).map_err(|e| {
        let err = LoaderError::ExitBootServices { status: e.status() };
        logger::resume_console();
        error!("{err}");
        err
    })
}
