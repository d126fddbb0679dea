//! # QEMU Debug Console
//!
//! Byte-wise output to QEMU's `-debugcon` port. This is plain port I/O and
//! does not involve any firmware service, so it keeps working after
//! `ExitBootServices`.
//!
//! Output is only emitted with the `qemu` feature on an x86-64 UEFI build;
//! everywhere else the sink swallows its input.

use core::fmt::{self, Write};

/// A `core::fmt::Write` sink for the debug console.
pub struct DebugconSink;

impl Write for DebugconSink {
    #[inline]
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for b in s.bytes() {
            putc(b);
        }
        Ok(())
    }
}

#[cfg(all(feature = "qemu", target_os = "uefi", target_arch = "x86_64"))]
#[inline(always)]
#[allow(clippy::inline_always, unsafe_code)]
fn putc(byte: u8) {
    const DEBUGCON_PORT: u16 = 0x402;

    // SAFETY: writing to the debugcon port has no effect besides emitting the byte.
    unsafe {
        core::arch::asm!(
            "out dx, al",
            in("dx") DEBUGCON_PORT,
            in("al") byte,
            options(nomem, nostack, preserves_flags)
        );
    }
}

#[cfg(not(all(feature = "qemu", target_os = "uefi", target_arch = "x86_64")))]
#[inline(always)]
#[allow(clippy::inline_always)]
const fn putc(_byte: u8) {}

#[doc(hidden)]
pub fn write_fmt(args: fmt::Arguments) {
    // Best effort; there is nobody to report a failure to.
    let _ = DebugconSink.write_fmt(args);
}

/// Formatted, allocation-free output to the debug console.
#[macro_export]
macro_rules! debugcon_trace {
    ($($arg:tt)*) => {{
        $crate::debugcon::write_fmt(core::format_args!($($arg)*));
    }};
}
