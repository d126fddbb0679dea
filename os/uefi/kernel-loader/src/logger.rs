//! # Loader Logging
//!
//! A `log::Log` backend writing to the UEFI console and mirroring every
//! record to the QEMU debug console.
//!
//! The console is a boot service. It is suspended right before the final
//! memory map fetch, since nothing may touch the firmware between that fetch
//! and `ExitBootServices`, and only resumed if termination fails.

use crate::debugcon_trace;
use core::sync::atomic::{AtomicBool, Ordering};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

static CONSOLE_AVAILABLE: AtomicBool = AtomicBool::new(true);

/// Stop mirroring records to the UEFI console.
pub fn suspend_console() {
    CONSOLE_AVAILABLE.store(false, Ordering::Release);
}

/// Resume mirroring records to the UEFI console.
///
/// Only valid while boot services are still active.
pub fn resume_console() {
    CONSOLE_AVAILABLE.store(true, Ordering::Release);
}

#[must_use]
pub fn console_available() -> bool {
    CONSOLE_AVAILABLE.load(Ordering::Acquire)
}

pub struct UefiLogger {
    max_level: LevelFilter,
}

impl UefiLogger {
    #[must_use]
    pub const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    /// Register as the global logger. Call this once during early init.
    ///
    /// # Errors
    /// Fails if another logger was registered before.
    pub fn init(&'static self) -> Result<(), SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level);
        Ok(())
    }
}

impl Log for UefiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        debugcon_trace!(
            "[{}] {}: {}\n",
            record.level(),
            record.target(),
            record.args()
        );

        if console_available() {
            uefi::println!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_can_be_suspended_and_resumed() {
        assert!(console_available());
        suspend_console();
        assert!(!console_available());
        resume_console();
        assert!(console_available());
    }

    #[test]
    fn level_filter_is_respected() {
        let logger = UefiLogger::new(LevelFilter::Info);
        let debug = Metadata::builder().level(log::Level::Debug).build();
        let warn = Metadata::builder().level(log::Level::Warn).build();
        assert!(!logger.enabled(&debug));
        assert!(logger.enabled(&warn));
    }
}
