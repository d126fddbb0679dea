//! # Loader-to-Kernel Handoff Interface
//!
//! This crate is the single data contract between the UEFI kernel loader and
//! the kernel it starts. Both artifacts are built independently; everything
//! they have to agree on lives here so that neither side duplicates a magic
//! number.
//!
//! ## Contents
//!
//! ### Boot Handoff ([`boot`])
//! * **Entry Point**: [`KernelEntryFn`](boot::KernelEntryFn), the signature the
//!   loader calls after `ExitBootServices`
//! * **Handoff Record**: [`BootHandoff`](boot::BootHandoff), a `#[repr(C)]`
//!   record whose layout is checked at compile time
//!
//! ### Fixed Addresses ([`memory`])
//! * **Load Base**: the physical address the kernel image is placed at
//! * **Physical Memory Offset**: the virtual/physical offset convention
//!
//! ### Memory Descriptors ([`descriptor`])
//! A read-only view over the raw UEFI memory map the loader hands over. The
//! descriptor stride is taken from the handoff record, never from
//! `size_of`, since firmware may append fields to newer descriptor versions.
//!
//! ## Entry Convention
//! ```rust
//! # use kernel_handoff::boot::BootHandoff;
//! pub type KernelEntryFn = extern "efiapi" fn(*const BootHandoff) -> !;
//! ```
//!
//! * **Calling Convention**: the firmware's native convention (`efiapi`)
//! * **Parameter**: a single pointer to the handoff record
//! * **No Return**: the kernel owns the machine afterwards
//!
//! ## Physical Layout
//!
//! ```text
//! 0x0000_0000 ┌─────────────────────────────────┐
//!             │     Low Memory (< 1MiB)         │
//! PHYS_LOAD   ├─────────────────────────────────┤ 0x0010_0000 (1 MiB)
//!             │  Kernel Image (verbatim file)   │
//!             ├─────────────────────────────────┤
//!             │  Firmware-managed RAM, incl.    │
//!             │  handoff record and memory map  │
//!             └─────────────────────────────────┘
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod descriptor;
pub mod memory;
