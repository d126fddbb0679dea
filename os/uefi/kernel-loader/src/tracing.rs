//! # Trace output
//!
//! Dumps the handoff record to the debug console right before the jump.
//! Runs after `ExitBootServices`, so it must stay clear of the firmware.

use crate::debugcon_trace;
use kernel_handoff::boot::BootHandoff;
use kernel_handoff::descriptor::{MemoryDescriptor, MemoryType};

/// Page totals of a memory map.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MemorySummary {
    pub descriptors: usize,
    pub total_pages: u64,
    pub conventional_pages: u64,
    pub loader_pages: u64,
    pub usable_pages: u64,
}

impl MemorySummary {
    #[must_use]
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = MemoryDescriptor>) -> Self {
        descriptors
            .into_iter()
            .fold(Self::default(), |mut summary, d| {
                summary.descriptors += 1;
                summary.total_pages = summary.total_pages.saturating_add(d.page_count);
                if d.ty == MemoryType::CONVENTIONAL {
                    summary.conventional_pages += d.page_count;
                }
                if d.ty == MemoryType::LOADER_CODE || d.ty == MemoryType::LOADER_DATA {
                    summary.loader_pages += d.page_count;
                }
                if d.ty.is_usable_after_exit() {
                    summary.usable_pages += d.page_count;
                }
                summary
            })
    }
}

/// Trace the handoff record and a summary of its memory map.
///
/// # Safety
/// The memory map referenced by `handoff` must be readable, see
/// [`BootHandoff::memory_map_bytes`].
#[allow(unsafe_code)]
pub unsafe fn trace_handoff(handoff: &BootHandoff) {
    debugcon_trace!("Boot handoff in UEFI Loader:\n");
    debugcon_trace!(
        "   BI ptr = {:018x}\n",
        core::ptr::from_ref(handoff) as usize
    );
    debugcon_trace!(" MMAP ptr = {:018x}", handoff.memory_map);
    debugcon_trace!(", MMAP len = {}", handoff.memory_map_size);
    debugcon_trace!(", MMAP desc size = {}", handoff.descriptor_size);
    debugcon_trace!(", MMAP desc version = {}\n", handoff.descriptor_version);
    debugcon_trace!(
        " phys offset = {:018x}, entry = {:018x}\n",
        handoff.physical_memory_offset,
        handoff.kernel_entry_phys
    );

    // SAFETY: upheld by the caller.
    let summary = MemorySummary::from_descriptors(unsafe { handoff.descriptors() });
    debugcon_trace!(
        " descriptors = {}, pages = {}, conventional = {}, loader = {}, usable = {}\n",
        summary.descriptors,
        summary.total_pages,
        summary.conventional_pages,
        summary.loader_pages,
        summary.usable_pages
    );
}
