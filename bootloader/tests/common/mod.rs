//! In-memory firmware used by the integration tests
//!
//! Files live in a map keyed by their volume path. Every firmware call is
//! recorded as an [`Event`] so tests can check ordering and short-circuiting.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use uefi::{CStr16, Status};
use zebrafish_bootloader::firmware::{FileHandle, Firmware, Volume};
use zebrafish_bootloader::{BootError, CommandLine, Result, Service};

pub const CMDLINE: &str = "\\cmdline.txt";
pub const KERNEL: &str = "\\zebrafish-kernel";

/// Firmware call observed by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    BootDevice,
    OpenVolume,
    Open(String),
    Close(String),
    LoadImage(String),
    SetLoadOptions { units: Vec<u16>, size: u32 },
    StartImage,
}

/// Firmware call that should fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    LoadedImage,
    NoBootDevice,
    FileSystem,
    VolumeOpen,
    DevicePath,
    LoadImage,
    KernelLoadedImage,
}

/// Directory entry on the fake volume
#[derive(Debug, Clone, Default)]
pub struct Entry {
    pub data: Vec<u8>,
    /// Size reported by metadata, if different from `data.len()`
    pub reported_size: Option<u64>,
    pub directory: bool,
    pub fail_info: bool,
    pub fail_read: bool,
    /// Upper bound on bytes returned by one read call
    pub max_read: Option<usize>,
}

impl Entry {
    pub fn bytes(data: Vec<u8>) -> Self {
        Self {
            data,
            ..Self::default()
        }
    }

    pub fn text(text: &str) -> Self {
        Self::bytes(utf16le(text))
    }

    pub fn units(units: &[u16]) -> Self {
        Self::bytes(units.iter().flat_map(|unit| unit.to_le_bytes()).collect())
    }

    pub fn directory() -> Self {
        Self {
            directory: true,
            ..Self::default()
        }
    }
}

pub fn utf16le(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect()
}

pub fn units(text: &str) -> Vec<u16> {
    text.encode_utf16().collect()
}

type EventLog = Rc<RefCell<Vec<Event>>>;

pub struct FakeFirmware {
    entries: BTreeMap<String, Entry>,
    fault: Option<Fault>,
    start_status: Status,
    events: EventLog,
}

impl FakeFirmware {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            fault: None,
            start_status: Status::LOAD_ERROR,
            events: EventLog::default(),
        }
    }

    pub fn with_entry(mut self, path: &str, entry: Entry) -> Self {
        self.entries.insert(path.to_string(), entry);
        self
    }

    pub fn with_kernel(self) -> Self {
        self.with_entry(KERNEL, Entry::bytes(b"MZ\x90\x00".to_vec()))
    }

    pub fn with_cmdline(self, text: &str) -> Self {
        self.with_entry(CMDLINE, Entry::text(text))
    }

    pub fn failing_at(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn start_returns(mut self, status: Status) -> Self {
        self.start_status = status;
        self
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Fake volume sharing this firmware's entries and event log
    pub fn volume(&self) -> FakeVolume {
        FakeVolume {
            entries: self.entries.clone(),
            events: Rc::clone(&self.events),
        }
    }

    /// Load options handed to the kernel, terminator included
    pub fn injected_units(&self) -> Option<Vec<u16>> {
        self.events().into_iter().find_map(|event| match event {
            Event::SetLoadOptions { units, .. } => Some(units),
            _ => None,
        })
    }

    pub fn injected_size(&self) -> Option<u32> {
        self.events().into_iter().find_map(|event| match event {
            Event::SetLoadOptions { size, .. } => Some(size),
            _ => None,
        })
    }

    pub fn started(&self) -> bool {
        self.events().contains(&Event::StartImage)
    }

    pub fn load_attempted(&self) -> bool {
        self.events()
            .iter()
            .any(|event| matches!(event, Event::LoadImage(_)))
    }

    fn record(&self, event: Event) {
        self.events.borrow_mut().push(event);
    }

    fn fails_at(&self, fault: Fault) -> bool {
        self.fault == Some(fault)
    }
}

/// Image handle; deliberately neither `Copy` nor `Clone`
#[derive(Debug)]
pub struct FakeImage(String);

impl Firmware for FakeFirmware {
    type Device = u32;
    type Volume = FakeVolume;
    type Image = FakeImage;

    fn boot_device(&mut self) -> Result<u32> {
        self.record(Event::BootDevice);
        if self.fails_at(Fault::LoadedImage) {
            return Err(BootError::ServiceUnavailable {
                service: Service::LoadedImage,
                status: Status::UNSUPPORTED,
            });
        }
        if self.fails_at(Fault::NoBootDevice) {
            return Err(BootError::ServiceUnavailable {
                service: Service::BootDevice,
                status: Status::NOT_FOUND,
            });
        }
        Ok(7)
    }

    fn open_volume(&mut self, device: u32) -> Result<FakeVolume> {
        assert_eq!(device, 7);
        self.record(Event::OpenVolume);
        if self.fails_at(Fault::FileSystem) {
            return Err(BootError::ServiceUnavailable {
                service: Service::SimpleFileSystem,
                status: Status::UNSUPPORTED,
            });
        }
        if self.fails_at(Fault::VolumeOpen) {
            return Err(BootError::VolumeOpenFailed(Status::DEVICE_ERROR));
        }
        Ok(self.volume())
    }

    fn load_image(&mut self, path: &CStr16) -> Result<FakeImage> {
        self.record(Event::LoadImage(path.to_string()));
        if self.fails_at(Fault::DevicePath) {
            return Err(BootError::ServiceUnavailable {
                service: Service::DevicePath,
                status: Status::UNSUPPORTED,
            });
        }
        if self.fails_at(Fault::LoadImage) {
            return Err(BootError::LoadFailed(Status::LOAD_ERROR));
        }
        Ok(FakeImage(path.to_string()))
    }

    unsafe fn set_load_options(&mut self, image: &FakeImage, options: &CommandLine) -> Result<()> {
        assert_eq!(image.0, KERNEL);
        if self.fails_at(Fault::KernelLoadedImage) {
            return Err(BootError::ServiceUnavailable {
                service: Service::KernelLoadedImage,
                status: Status::INVALID_PARAMETER,
            });
        }
        self.record(Event::SetLoadOptions {
            units: options.as_units_with_nul().to_vec(),
            size: options.load_options_size(),
        });
        Ok(())
    }

    fn start_image(&mut self, image: FakeImage) -> Status {
        assert_eq!(image.0, KERNEL);
        self.record(Event::StartImage);
        self.start_status
    }
}

pub struct FakeVolume {
    entries: BTreeMap<String, Entry>,
    events: EventLog,
}

impl Volume for FakeVolume {
    type File = FakeFile;

    fn open(&mut self, path: &CStr16) -> std::result::Result<FakeFile, Status> {
        let path = path.to_string();
        let entry = self.entries.get(&path).ok_or(Status::NOT_FOUND)?;
        if entry.directory {
            return Err(Status::UNSUPPORTED);
        }
        self.events.borrow_mut().push(Event::Open(path.clone()));
        Ok(FakeFile {
            path,
            entry: entry.clone(),
            position: 0,
            events: Rc::clone(&self.events),
        })
    }
}

pub struct FakeFile {
    path: String,
    entry: Entry,
    position: usize,
    events: EventLog,
}

impl FileHandle for FakeFile {
    fn size(&mut self) -> std::result::Result<u64, Status> {
        if self.entry.fail_info {
            return Err(Status::DEVICE_ERROR);
        }
        Ok(self
            .entry
            .reported_size
            .unwrap_or(self.entry.data.len() as u64))
    }

    fn read(&mut self, buf: &mut [u8]) -> std::result::Result<usize, Status> {
        if self.entry.fail_read {
            return Err(Status::DEVICE_ERROR);
        }
        let remaining = &self.entry.data[self.position..];
        let count = remaining
            .len()
            .min(buf.len())
            .min(self.entry.max_read.unwrap_or(usize::MAX));
        buf[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        Ok(count)
    }

    fn close(self) {
        self.events.borrow_mut().push(Event::Close(self.path));
    }
}

/// Every opened file has been closed exactly once
pub fn assert_all_closed(events: &[Event]) {
    let opened: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::Open(path) => Some(path),
            _ => None,
        })
        .collect();
    let closed: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            Event::Close(path) => Some(path),
            _ => None,
        })
        .collect();
    assert_eq!(opened, closed, "file handles left open: {:?}", events);
}
