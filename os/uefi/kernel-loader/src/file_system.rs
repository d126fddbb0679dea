//! # Boot Volume Access
//!
//! Resolves the volume the loader image came from
//! (`LoadedImage` → device handle → `SimpleFileSystem`) and opens files on
//! it. Each step fails with its own [`LoaderError`] so the console shows
//! which link of the chain broke.

use crate::error::LoaderError;
use crate::firmware::KernelFile;
use uefi::proto::loaded_image::LoadedImage;
use uefi::proto::media::file::{File, FileAttribute, FileInfo, FileMode, RegularFile};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::{CStr16, boot};

/// A regular file opened on the boot volume. Closed on drop.
pub struct BootVolumeFile(RegularFile);

/// Open `path` read-only on the volume that provided the loader image.
///
/// # Errors
/// The step of the resolution chain that failed.
pub fn open_boot_file(path: &'static CStr16) -> Result<BootVolumeFile, LoaderError> {
    let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(boot::image_handle())
        .map_err(|e| LoaderError::LoadedImage { status: e.status() })?;
    let device = loaded_image.device().ok_or(LoaderError::NoBootDevice)?;

    let mut sfs = boot::open_protocol_exclusive::<SimpleFileSystem>(device)
        .map_err(|e| LoaderError::FileSystem { status: e.status() })?;
    let mut root = sfs
        .open_volume()
        .map_err(|e| LoaderError::OpenVolume { status: e.status() })?;

    let handle = root
        .open(path, FileMode::Read, FileAttribute::empty())
        .map_err(|e| LoaderError::KernelNotFound {
            path,
            status: e.status(),
        })?;

    handle
        .into_regular_file()
        .map(BootVolumeFile)
        .ok_or(LoaderError::NotARegularFile { path })
}

impl KernelFile for BootVolumeFile {
    fn file_size(&mut self, buffer: &mut [u8]) -> uefi::Result<u64, Option<usize>> {
        self.0.get_info::<FileInfo>(buffer).map(|info| info.file_size())
    }

    fn read(&mut self, buffer: &mut [u8]) -> uefi::Result<usize> {
        self.0.read(buffer).map_err(|e| uefi::Error::from(e.status()))
    }
}
