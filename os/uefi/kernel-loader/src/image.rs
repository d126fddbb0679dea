//! # Kernel Image Reader
//!
//! Reads `\BOOT\KERNEL_X.BIN` from the loader's own volume verbatim into the
//! pages at [`PHYS_LOAD`]. The kernel is linked for that address, so the
//! pages are requested with `AllocateAddress` and a refusal is fatal; there
//! is no fallback placement.

use crate::entry::{EntryPoint, resolve_entry};
use crate::error::LoaderError;
use crate::firmware::{Firmware, KernelFile};
use kernel_handoff::memory::{PAGE_SIZE, PHYS_LOAD};
use log::{debug, error, info};
use uefi::{CStr16, Status, cstr16};

/// Fixed, case-sensitive location of the kernel on the boot volume.
pub const KERNEL_PATH: &CStr16 = cstr16!("\\BOOT\\KERNEL_X.BIN");

/// Number of pages needed to hold `len` bytes.
///
/// An empty file still gets one page so the load region is never empty.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn pages_for(len: usize) -> usize {
    let pages = len.div_ceil(PAGE_SIZE as usize);
    if pages == 0 { 1 } else { pages }
}

/// The kernel file as it sits in memory, before entry resolution.
pub struct KernelImage {
    base: u64,
    region: &'static mut [u8],
    len: usize,
}

impl KernelImage {
    /// Physical address of the first byte.
    #[must_use]
    pub const fn base(&self) -> u64 {
        self.base
    }

    /// The file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.region[..self.len]
    }

    /// Pages reserved at [`base`](Self::base).
    #[must_use]
    pub const fn pages(&self) -> usize {
        pages_for(self.len)
    }

    /// Probe the image for its entry point.
    #[must_use]
    pub fn resolve(self) -> LoadedImage {
        let entry = resolve_entry(self.bytes(), self.base);
        LoadedImage {
            base: self.base,
            len: self.len,
            pages: self.pages(),
            entry,
        }
    }
}

/// A kernel resident at its load address with a resolved entry point.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LoadedImage {
    pub base: u64,
    pub len: usize,
    pub pages: usize,
    pub entry: EntryPoint,
}

/// Load the kernel to [`PHYS_LOAD`].
///
/// # Errors
/// Any failure to locate, size, place or fully read the file. A short read
/// is reported as [`LoaderError::ShortRead`] (`DEVICE_ERROR`).
pub fn read_kernel_image<F: Firmware>(fw: &mut F) -> Result<KernelImage, LoaderError> {
    info!("Loading kernel from {KERNEL_PATH} ...");

    let mut file = fw.open_boot_file(KERNEL_PATH).inspect_err(report)?;

    let size = file_size(fw, &mut file).inspect_err(report)?;
    let len = usize::try_from(size)
        .map_err(|_| LoaderError::KernelTooLarge { size })
        .inspect_err(report)?;
    let pages = pages_for(len);
    debug!("Kernel file is {size} bytes, reserving {pages} pages at {PHYS_LOAD:#x}");

    let region = fw
        .allocate_pages_at(PHYS_LOAD, pages)
        .map_err(|e| LoaderError::LoadAddressUnavailable {
            address: PHYS_LOAD,
            pages,
            status: e.status(),
        })
        .inspect_err(report)?;

    let read = file
        .read(&mut region[..len])
        .map_err(|e| LoaderError::ReadFailed { status: e.status() })
        .inspect_err(report)?;
    if read != len {
        let err = LoaderError::ShortRead {
            read,
            expected: len,
        };
        report(&err);
        return Err(err);
    }

    Ok(KernelImage {
        base: PHYS_LOAD,
        region,
        len,
    })
}

/// Two-call `GetInfo` probe: ask for the info size, then fetch the info.
fn file_size<F: Firmware>(fw: &mut F, file: &mut F::File) -> Result<u64, LoaderError> {
    let required = match file.file_size(&mut []) {
        Ok(size) => return Ok(size),
        Err(e) if e.status() == Status::BUFFER_TOO_SMALL => match *e.data() {
            Some(required) => required,
            None => return Err(LoaderError::FileInfo { status: e.status() }),
        },
        Err(e) => return Err(LoaderError::FileInfo { status: e.status() }),
    };

    let buffer = fw
        .allocate_pool(required)
        .map_err(|e| LoaderError::OutOfResources {
            purpose: "file info",
            size: required,
            status: e.status(),
        })?;

    let size = file
        .file_size(buffer)
        .map_err(|e| LoaderError::FileInfo { status: e.status() });

    if let Err(e) = fw.free_pool(buffer) {
        debug!("FreePool(FileInfo) failed: {:?}", e.status());
    }

    size
}

fn report(err: &LoaderError) {
    error!("{err}");
}
