//! # Memory Map Snapshot
//!
//! Two-phase `GetMemoryMap`: a probe with an empty buffer to learn the
//! required size and descriptor stride, then the real fetch into a pool
//! buffer with headroom.
//!
//! Allocating the buffer itself can add descriptors, so the fetch buffer is
//! [`EXTRA_DESCRIPTORS`] strides larger than the probe asked for. A second
//! `BUFFER_TOO_SMALL` is fatal; we don't loop.
//!
//! The fetch must be the last firmware call before `ExitBootServices`: any
//! allocation in between changes the map key and termination fails.

use crate::error::LoaderError;
use crate::firmware::{Firmware, MapKey, MemoryMapMeta};
use crate::logger;
use log::{debug, error};
use uefi::Status;

/// Headroom of the fetch buffer, in descriptors.
pub const EXTRA_DESCRIPTORS: usize = 10;

/// Size of the buffer used for the second `GetMemoryMap` call.
///
/// Returns `None` on overflow.
#[must_use]
pub const fn fetch_buffer_size(required: usize, desc_size: usize) -> Option<usize> {
    match desc_size.checked_mul(EXTRA_DESCRIPTORS) {
        Some(extra) => required.checked_add(extra),
        None => None,
    }
}

/// A copy of the firmware memory map together with its map key.
///
/// The buffer is `LOADER_DATA` pool memory that is never freed; it is handed
/// over to the kernel as-is.
pub struct MemoryMapSnapshot {
    buffer: &'static mut [u8],
    len: usize,
    desc_size: usize,
    desc_version: u32,
    map_key: MapKey,
}

impl MemoryMapSnapshot {
    /// Physical address of the descriptor buffer.
    #[must_use]
    pub fn address(&self) -> u64 {
        self.buffer.as_ptr() as u64
    }

    /// Bytes populated by the firmware.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes available in the buffer, including the unused headroom.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub const fn desc_size(&self) -> usize {
        self.desc_size
    }

    #[must_use]
    pub const fn desc_version(&self) -> u32 {
        self.desc_version
    }

    /// The key to pass to `ExitBootServices`. Single use.
    #[must_use]
    pub const fn map_key(&self) -> MapKey {
        self.map_key
    }

    /// The populated descriptor bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buffer[..self.len]
    }
}

/// Capture the memory map.
///
/// On success the UEFI console is suspended, see [`logger`].
///
/// # Errors
/// An unexpected probe result, a failed buffer allocation, or a failed or
/// undersized fetch.
pub fn capture_memory_map<F: Firmware>(fw: &mut F) -> Result<MemoryMapSnapshot, LoaderError> {
    let probe = probe_memory_map(fw).inspect_err(|e| error!("{e}"))?;

    let size = fetch_buffer_size(probe.map_size, probe.desc_size).ok_or(
        LoaderError::MemoryMapBufferTooSmall {
            required: probe.map_size,
            provided: usize::MAX,
        },
    )
    .inspect_err(|e| error!("{e}"))?;
    debug!(
        "Memory map needs {} bytes ({} byte descriptors), fetching into {size} bytes",
        probe.map_size, probe.desc_size
    );

    let buffer = fw
        .allocate_pool(size)
        .map_err(|e| LoaderError::OutOfResources {
            purpose: "memory map",
            size,
            status: e.status(),
        })
        .inspect_err(|e| error!("{e}"))?;

    // From here on the console is off limits; see module docs.
    logger::suspend_console();

    let meta = match fw.get_memory_map(buffer) {
        Ok(meta) => meta,
        Err(e) => {
            let err = match e.data() {
                Some(meta) if e.status() == Status::BUFFER_TOO_SMALL => {
                    LoaderError::MemoryMapBufferTooSmall {
                        required: meta.map_size,
                        provided: size,
                    }
                }
                _ => LoaderError::MemoryMapFetch { status: e.status() },
            };
            logger::resume_console();
            error!("{err}");
            return Err(err);
        }
    };

    Ok(MemoryMapSnapshot {
        len: meta.map_size.min(buffer.len()),
        buffer,
        desc_size: meta.desc_size,
        desc_version: meta.desc_version,
        map_key: meta.map_key,
    })
}

/// Phase one: the empty-buffer call must report `BUFFER_TOO_SMALL`.
fn probe_memory_map<F: Firmware>(fw: &mut F) -> Result<MemoryMapMeta, LoaderError> {
    match fw.get_memory_map(&mut []) {
        Err(e) if e.status() == Status::BUFFER_TOO_SMALL => {
            (*e.data()).ok_or(LoaderError::MemoryMapProbe { status: e.status() })
        }
        Err(e) => Err(LoaderError::MemoryMapProbe { status: e.status() }),
        Ok(_) => Err(LoaderError::MemoryMapProbe {
            status: Status::SUCCESS,
        }),
    }
}
