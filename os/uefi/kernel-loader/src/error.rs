//! # Loader Errors
//!
//! Every fallible step maps to exactly one variant. Nothing is retried; the
//! caller logs the error and returns the associated [`Status`] to the
//! firmware.

use uefi::{CStr16, Status};

/// Coarse classification of a [`LoaderError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorClass {
    /// A protocol, volume or file could not be found.
    ResourceResolution,
    /// An allocation failed or a buffer turned out too small.
    Capacity,
    /// The kernel could not be read completely.
    Integrity,
    /// The firmware rejected a stale memory map key.
    Ordering,
}

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("HandleProtocol(LoadedImage) failed: {status:?}")]
    LoadedImage { status: Status },
    #[error("The loader image reports no device handle")]
    NoBootDevice,
    #[error("HandleProtocol(SimpleFileSystem) failed: {status:?}")]
    FileSystem { status: Status },
    #[error("OpenVolume failed: {status:?}")]
    OpenVolume { status: Status },
    #[error("Failed to open {path}: {status:?}")]
    KernelNotFound {
        path: &'static CStr16,
        status: Status,
    },
    #[error("{path} is not a regular file")]
    NotARegularFile { path: &'static CStr16 },
    #[error("GetInfo(FileInfo) failed: {status:?}")]
    FileInfo { status: Status },
    #[error("A kernel of {size} bytes does not fit the address space")]
    KernelTooLarge { size: u64 },
    #[error("AllocatePool of {size} bytes for the {purpose} failed: {status:?}")]
    OutOfResources {
        purpose: &'static str,
        size: usize,
        status: Status,
    },
    #[error("AllocatePages of {pages} pages at {address:#x} failed: {status:?}")]
    LoadAddressUnavailable {
        address: u64,
        pages: usize,
        status: Status,
    },
    #[error("Reading the kernel failed: {status:?}")]
    ReadFailed { status: Status },
    #[error("Short read: read {read} bytes, expected {expected}")]
    ShortRead { read: usize, expected: usize },
    #[error("GetMemoryMap size probe returned {status:?} instead of BUFFER_TOO_SMALL")]
    MemoryMapProbe { status: Status },
    #[error("Memory map needs {required} bytes but the buffer holds {provided}")]
    MemoryMapBufferTooSmall { required: usize, provided: usize },
    #[error("GetMemoryMap failed: {status:?}")]
    MemoryMapFetch { status: Status },
    #[error("Pool memory at {address:#x} cannot hold the boot handoff record")]
    HandoffStorage { address: u64 },
    #[error("ExitBootServices failed: {status:?}")]
    ExitBootServices { status: Status },
}

impl LoaderError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::LoadedImage { .. }
            | Self::NoBootDevice
            | Self::FileSystem { .. }
            | Self::OpenVolume { .. }
            | Self::KernelNotFound { .. }
            | Self::NotARegularFile { .. }
            | Self::FileInfo { .. }
            | Self::MemoryMapProbe { .. }
            | Self::MemoryMapFetch { .. } => ErrorClass::ResourceResolution,
            Self::KernelTooLarge { .. }
            | Self::OutOfResources { .. }
            | Self::LoadAddressUnavailable { .. }
            | Self::MemoryMapBufferTooSmall { .. }
            | Self::HandoffStorage { .. } => ErrorClass::Capacity,
            Self::ReadFailed { .. } | Self::ShortRead { .. } => ErrorClass::Integrity,
            Self::ExitBootServices { .. } => ErrorClass::Ordering,
        }
    }

    /// The status reported back to the firmware.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Self::LoadedImage { status }
            | Self::FileSystem { status }
            | Self::OpenVolume { status }
            | Self::KernelNotFound { status, .. }
            | Self::FileInfo { status }
            | Self::LoadAddressUnavailable { status, .. }
            | Self::MemoryMapFetch { status }
            | Self::ExitBootServices { status } => *status,
            Self::MemoryMapProbe { status } if !status.is_success() => *status,
            Self::MemoryMapProbe { .. } => Status::PROTOCOL_ERROR,
            Self::NoBootDevice => Status::NOT_FOUND,
            Self::NotARegularFile { .. } => Status::UNSUPPORTED,
            Self::KernelTooLarge { .. } => Status::BAD_BUFFER_SIZE,
            Self::OutOfResources { .. } | Self::HandoffStorage { .. } => Status::OUT_OF_RESOURCES,
            Self::ReadFailed { .. } | Self::ShortRead { .. } => Status::DEVICE_ERROR,
            Self::MemoryMapBufferTooSmall { .. } => Status::BUFFER_TOO_SMALL,
        }
    }
}

impl From<LoaderError> for Status {
    fn from(value: LoaderError) -> Self {
        value.status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uefi::cstr16;

    #[test]
    fn integrity_failures_report_device_error() {
        let short = LoaderError::ShortRead {
            read: 100,
            expected: 4096,
        };
        assert_eq!(short.class(), ErrorClass::Integrity);
        assert_eq!(Status::from(short), Status::DEVICE_ERROR);

        let failed = LoaderError::ReadFailed {
            status: Status::NO_MEDIA,
        };
        assert_eq!(failed.status(), Status::DEVICE_ERROR);
    }

    #[test]
    fn firmware_status_is_passed_through() {
        let err = LoaderError::KernelNotFound {
            path: cstr16!("\\BOOT\\KERNEL_X.BIN"),
            status: Status::NOT_FOUND,
        };
        assert_eq!(err.class(), ErrorClass::ResourceResolution);
        assert_eq!(err.status(), Status::NOT_FOUND);

        let err = LoaderError::ExitBootServices {
            status: Status::INVALID_PARAMETER,
        };
        assert_eq!(err.class(), ErrorClass::Ordering);
        assert_eq!(err.status(), Status::INVALID_PARAMETER);
    }

    #[test]
    fn successful_probe_never_maps_to_success() {
        let err = LoaderError::MemoryMapProbe {
            status: Status::SUCCESS,
        };
        assert!(!err.status().is_success());
    }

    #[test]
    fn messages_name_the_failing_step() {
        let err = LoaderError::LoadAddressUnavailable {
            address: 0x10_0000,
            pages: 2,
            status: Status::NOT_FOUND,
        };
        let text = format!("{err}");
        assert!(text.contains("0x100000"));
        assert!(text.contains("2 pages"));
    }
}
