//! # Control Transfer

use kernel_handoff::boot::{BootHandoff, KernelEntryFn};

/// Jump to `handoff.kernel_entry_phys`, passing the record.
///
/// # Safety
/// Boot services must have been exited, and the entry address must point
/// at code that accepts a [`KernelEntryFn`] call.
#[allow(unsafe_code, clippy::cast_possible_truncation)]
pub unsafe fn enter_kernel(handoff: &'static BootHandoff) -> ! {
    // SAFETY: upheld by the caller; addresses are identity mapped under UEFI.
    let entry = unsafe {
        core::mem::transmute::<usize, KernelEntryFn>(handoff.kernel_entry_phys as usize)
    };
    entry(core::ptr::from_ref(handoff))
}
