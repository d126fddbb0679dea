//! Simulated boot services for running the boot sequence on the host.
//!
//! Every allocation adds descriptors to the simulated memory map and
//! invalidates the map key, the same way real firmware does. All firmware
//! calls are recorded so tests can assert on their order.

#![allow(dead_code, unsafe_code)]

use kernel_handoff::descriptor::MemoryType;
use kernel_handoff::memory::PAGE_SIZE;
use kernel_loader::LoaderError;
use kernel_loader::firmware::{Firmware, KernelFile, MapKey, MemoryMapMeta};
use std::cell::RefCell;
use std::rc::Rc;
use uefi::{CStr16, Status};

/// Bytes `GetInfo(FileInfo)` asks for.
pub const FILE_INFO_SIZE: usize = 104;

/// Descriptor stride reported by the simulated firmware.
pub const DESC_SIZE: usize = 48;

pub const DESC_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    OpenFile,
    FileInfo { buffer_len: usize },
    AllocatePool { size: usize },
    FreePool,
    AllocatePagesAt { address: u64, pages: usize },
    Read { len: usize },
    GetMemoryMap { buffer_len: usize },
    ExitBootServices { key: MapKey },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    MissingFile,
    NoFileSystem,
}

pub struct State {
    pub events: Vec<Event>,
    pub kernel: Vec<u8>,
    /// Cap on the bytes a single read returns.
    pub read_limit: Option<usize>,
    pub open_failure: Option<OpenFailure>,
    /// Physical ranges `AllocateAddress` refuses, as `(start, end)`.
    pub reserved: Vec<(u64, u64)>,
    pub probe_status: Option<Status>,
    /// Descriptors added to the map by each allocation.
    pub growth_per_allocation: usize,
    pub descriptors: usize,
    pub key: usize,
    pub exited: bool,
}

impl State {
    fn check_alive(&self, call: &str) {
        assert!(!self.exited, "{call} called after ExitBootServices");
    }

    fn mutate_map(&mut self, descriptors: usize) {
        self.descriptors += descriptors;
        self.key += 1;
    }

    fn map_meta(&self) -> MemoryMapMeta {
        MemoryMapMeta {
            map_size: self.descriptors * DESC_SIZE,
            desc_size: DESC_SIZE,
            desc_version: DESC_VERSION,
            map_key: MapKey::new(self.key),
        }
    }
}

#[derive(Clone)]
pub struct MockFirmware {
    pub state: Rc<RefCell<State>>,
}

impl MockFirmware {
    pub fn with_kernel(kernel: Vec<u8>) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                events: Vec::new(),
                kernel,
                read_limit: None,
                open_failure: None,
                reserved: Vec::new(),
                probe_status: None,
                growth_per_allocation: 1,
                descriptors: 24,
                key: 0x1000,
                exited: false,
            })),
        }
    }

    pub fn configure(&self, f: impl FnOnce(&mut State)) {
        f(&mut self.state.borrow_mut());
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn exited(&self) -> bool {
        self.state.borrow().exited
    }

    pub fn current_key(&self) -> MapKey {
        MapKey::new(self.state.borrow().key)
    }

    fn record(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }
}

/// Leak a zeroed, 8-byte aligned buffer.
fn leak_buffer(size: usize) -> &'static mut [u8] {
    let words: &'static mut [u64] = Box::leak(vec![0u64; size.div_ceil(8)].into_boxed_slice());
    // SAFETY: the words are leaked, so the bytes live forever and are ours.
    unsafe { std::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), size) }
}

/// Write `count` descriptors at [`DESC_SIZE`] stride.
fn fill_descriptors(buffer: &mut [u8], count: usize) {
    for (i, chunk) in buffer.chunks_exact_mut(DESC_SIZE).take(count).enumerate() {
        let ty = if i == 0 {
            MemoryType::CONVENTIONAL
        } else {
            MemoryType::LOADER_DATA
        };
        let phys = (i as u64) * 0x10_0000;
        chunk[0..4].copy_from_slice(&ty.0.to_le_bytes());
        chunk[4..8].fill(0);
        chunk[8..16].copy_from_slice(&phys.to_le_bytes());
        chunk[16..24].copy_from_slice(&0u64.to_le_bytes());
        chunk[24..32].copy_from_slice(&(i as u64 + 1).to_le_bytes());
        chunk[32..40].copy_from_slice(&(1u64 << 3).to_le_bytes());
    }
}

pub struct MockFile {
    state: Rc<RefCell<State>>,
    position: usize,
}

impl KernelFile for MockFile {
    fn file_size(&mut self, buffer: &mut [u8]) -> uefi::Result<u64, Option<usize>> {
        let mut state = self.state.borrow_mut();
        state.check_alive("GetInfo");
        state.events.push(Event::FileInfo {
            buffer_len: buffer.len(),
        });
        if buffer.len() < FILE_INFO_SIZE {
            return Err(uefi::Error::new(
                Status::BUFFER_TOO_SMALL,
                Some(FILE_INFO_SIZE),
            ));
        }
        Ok(state.kernel.len() as u64)
    }

    fn read(&mut self, buffer: &mut [u8]) -> uefi::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.check_alive("Read");
        state.events.push(Event::Read { len: buffer.len() });

        let remaining = &state.kernel[self.position.min(state.kernel.len())..];
        let mut n = remaining.len().min(buffer.len());
        if let Some(limit) = state.read_limit {
            n = n.min(limit);
        }
        buffer[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }
}

impl Firmware for MockFirmware {
    type File = MockFile;

    fn open_boot_file(&mut self, path: &'static CStr16) -> Result<Self::File, LoaderError> {
        let failure = {
            let state = self.state.borrow();
            state.check_alive("OpenFile");
            state.open_failure
        };
        self.record(Event::OpenFile);
        match failure {
            Some(OpenFailure::MissingFile) => Err(LoaderError::KernelNotFound {
                path,
                status: Status::NOT_FOUND,
            }),
            Some(OpenFailure::NoFileSystem) => Err(LoaderError::FileSystem {
                status: Status::UNSUPPORTED,
            }),
            None => Ok(MockFile {
                state: Rc::clone(&self.state),
                position: 0,
            }),
        }
    }

    fn allocate_pool(&mut self, size: usize) -> uefi::Result<&'static mut [u8]> {
        let mut state = self.state.borrow_mut();
        state.check_alive("AllocatePool");
        state.events.push(Event::AllocatePool { size });
        let growth = state.growth_per_allocation;
        state.mutate_map(growth);
        Ok(leak_buffer(size))
    }

    fn free_pool(&mut self, _buffer: &'static mut [u8]) -> uefi::Result {
        let mut state = self.state.borrow_mut();
        state.check_alive("FreePool");
        state.events.push(Event::FreePool);
        state.mutate_map(0);
        Ok(())
    }

    fn allocate_pages_at(&mut self, address: u64, pages: usize) -> uefi::Result<&'static mut [u8]> {
        let mut state = self.state.borrow_mut();
        state.check_alive("AllocatePages");
        state.events.push(Event::AllocatePagesAt { address, pages });

        let end = address + pages as u64 * PAGE_SIZE;
        if state
            .reserved
            .iter()
            .any(|&(start, stop)| address < stop && start < end)
        {
            return Err(Status::NOT_FOUND.into());
        }

        let growth = state.growth_per_allocation;
        state.mutate_map(growth);
        Ok(leak_buffer(pages * PAGE_SIZE as usize))
    }

    fn get_memory_map(
        &mut self,
        buffer: &mut [u8],
    ) -> uefi::Result<MemoryMapMeta, Option<MemoryMapMeta>> {
        let mut state = self.state.borrow_mut();
        state.check_alive("GetMemoryMap");
        state.events.push(Event::GetMemoryMap {
            buffer_len: buffer.len(),
        });

        if buffer.is_empty() {
            if let Some(status) = state.probe_status {
                return Err(uefi::Error::new(status, None));
            }
        }

        let meta = state.map_meta();
        if buffer.len() < meta.map_size {
            return Err(uefi::Error::new(Status::BUFFER_TOO_SMALL, Some(meta)));
        }

        fill_descriptors(buffer, state.descriptors);
        Ok(meta)
    }

    fn exit_boot_services(&mut self, key: MapKey) -> uefi::Result {
        let mut state = self.state.borrow_mut();
        state.events.push(Event::ExitBootServices { key });
        if state.exited || key.as_usize() != state.key {
            return Err(Status::INVALID_PARAMETER.into());
        }
        state.exited = true;
        Ok(())
    }
}

/// A flat binary of `len` bytes with a recognizable pattern.
pub fn flat_kernel(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// An ELF64 image of `len` bytes whose header names `entry`.
pub fn elf_kernel(len: usize, entry: u64) -> Vec<u8> {
    let mut image = vec![0u8; len.max(64)];
    image[..4].copy_from_slice(b"\x7fELF");
    image[4] = 2; // ELFCLASS64
    image[5] = 1; // little endian
    image[6] = 1;
    image[24..32].copy_from_slice(&entry.to_le_bytes());
    image
}
