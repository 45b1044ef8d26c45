//! Kernel command line
//!
//! The command line is read from a UTF-16LE file on the boot volume into a
//! fixed-capacity buffer and handed to the kernel as its load options. A
//! missing or unreadable file is not an error: the fallback string is used.

use core::fmt;

use arrayvec::ArrayVec;
use log::{debug, trace};
use uefi::Status;

use crate::config::{CMDLINE_CAPACITY, LoaderConfig};
use crate::firmware::{FileHandle, Volume};

/// Longest command line in code units, leaving room for the terminator
pub const MAX_CMDLINE_LEN: usize = CMDLINE_CAPACITY - 2;

/// Size of a UTF-16 code unit in bytes
const CODE_UNIT_SIZE: usize = core::mem::size_of::<u16>();

const READ_CHUNK_SIZE: usize = 512;

/// NUL-terminated UTF-16 command line with a fixed capacity.
///
/// The buffer always ends in a terminator and never holds more than
/// [`MAX_CMDLINE_LEN`] code units of text. Pushing past that is a no-op.
/// A NUL code unit ends the text; anything pushed after it is dropped.
pub struct CommandLine {
    units: ArrayVec<u16, CMDLINE_CAPACITY>,
    ended: bool,
}

impl CommandLine {
    /// Create an empty, terminated command line
    pub fn new() -> Self {
        let mut units = ArrayVec::new();
        units.push(0);
        Self { units, ended: false }
    }

    /// Encode `text` as UTF-16, truncating at the capacity
    pub fn from_text(text: &str) -> Self {
        let mut cmdline = Self::new();
        for unit in text.encode_utf16() {
            if !cmdline.push(unit) {
                break;
            }
        }
        cmdline
    }

    /// Append one code unit.
    ///
    /// Returns `false` once the text is full or has been ended by a NUL.
    pub fn push(&mut self, unit: u16) -> bool {
        if self.ended || self.len() >= MAX_CMDLINE_LEN {
            return false;
        }
        if unit == 0 {
            self.ended = true;
            return false;
        }
        // len() < MAX_CMDLINE_LEN leaves room for the unit and the terminator
        self.units.pop();
        self.units.push(unit);
        self.units.push(0);
        true
    }

    /// Length of the text in code units, excluding the terminator
    pub fn len(&self) -> usize {
        self.units.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text without the terminator
    pub fn as_units(&self) -> &[u16] {
        &self.units[..self.len()]
    }

    /// Text followed by its terminator, as passed to the kernel
    pub fn as_units_with_nul(&self) -> &[u16] {
        &self.units
    }

    /// Load-options length in bytes, terminator included
    pub fn load_options_size(&self) -> u32 {
        ((self.len() + 1) * CODE_UNIT_SIZE) as u32
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in char::decode_utf16(self.as_units().iter().copied()) {
            fmt::Write::write_char(f, c.unwrap_or(char::REPLACEMENT_CHARACTER))?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandLine")
            .field("len", &self.len())
            .field("text", &DisplayQuoted(self))
            .finish()
    }
}

struct DisplayQuoted<'a>(&'a CommandLine);

impl fmt::Debug for DisplayQuoted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.0)
    }
}

/// Resolve the kernel command line from the boot volume.
///
/// Opens the configured file and reads it into a [`CommandLine`]. Any failure
/// along the way yields the fallback string instead.
pub fn resolve<V: Volume>(volume: &mut V, config: &LoaderConfig) -> CommandLine {
    let file = match volume.open(config.cmdline_path) {
        Ok(file) => file,
        Err(status) => {
            debug!("[cmdline] {} not opened ({:?}), using fallback", config.cmdline_path, status);
            return CommandLine::from_text(config.fallback_cmdline);
        }
    };

    match read_from(file) {
        Ok(cmdline) => {
            debug!("[cmdline] read {} code units from {}", cmdline.len(), config.cmdline_path);
            cmdline
        }
        Err(status) => {
            debug!("[cmdline] reading {} failed ({:?}), using fallback", config.cmdline_path, status);
            CommandLine::from_text(config.fallback_cmdline)
        }
    }
}

/// Read a command line from an open file and close it.
///
/// The read is clamped to [`MAX_CMDLINE_LEN`] code units. An odd trailing
/// byte is dropped.
pub fn read_from<F: FileHandle>(mut file: F) -> Result<CommandLine, Status> {
    let result = read_units(&mut file);
    file.close();
    result
}

fn read_units<F: FileHandle>(file: &mut F) -> Result<CommandLine, Status> {
    let size = file.size()?;
    let limit = size.min((MAX_CMDLINE_LEN * CODE_UNIT_SIZE) as u64) as usize;
    if (limit as u64) < size {
        trace!("[cmdline] file is {} bytes, truncating to {}", size, limit);
    }

    let mut cmdline = CommandLine::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut remaining = limit;
    let mut low_byte: Option<u8> = None;

    while remaining > 0 {
        let wanted = remaining.min(chunk.len());
        let read = file.read(&mut chunk[..wanted])?.min(wanted);
        if read == 0 {
            break;
        }
        remaining -= read;

        for &byte in &chunk[..read] {
            match low_byte.take() {
                None => low_byte = Some(byte),
                Some(low) => {
                    cmdline.push(u16::from_le_bytes([low, byte]));
                }
            }
        }
    }

    Ok(cmdline)
}
