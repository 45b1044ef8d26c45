//! Firmware abstraction layer
//!
//! The chain-load sequence only talks to firmware through these traits. The
//! UEFI backend in [`efi`] implements them on top of boot services; tests
//! drive the same sequence against an in-memory firmware.

use uefi::{CStr16, Status};

use crate::cmdline::CommandLine;
use crate::error::Result;

#[cfg(feature = "uefi_support")]
pub mod efi;

/// Open file on the boot volume
pub trait FileHandle {
    /// Size of the file in bytes, as reported by its metadata
    fn size(&mut self) -> core::result::Result<u64, Status>;

    /// Read up to `buf.len()` bytes from the current position.
    ///
    /// Returns the number of bytes read; `0` means end of file.
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Status>;

    /// Release the handle
    fn close(self);
}

/// Root directory of the boot volume
pub trait Volume {
    type File: FileHandle;

    /// Open a regular file for reading
    fn open(&mut self, path: &CStr16) -> core::result::Result<Self::File, Status>;
}

/// Boot-time services needed to chain-load a kernel
pub trait Firmware {
    /// Device the running loader was loaded from
    type Device: Copy;
    type Volume: Volume;
    /// Loaded but not yet started image
    type Image;

    /// Look up the device this loader was started from
    fn boot_device(&mut self) -> Result<Self::Device>;

    /// Open the root of the file system on `device`
    fn open_volume(&mut self, device: Self::Device) -> Result<Self::Volume>;

    /// Load the image at `path` on the loader's own device without starting it
    fn load_image(&mut self, path: &CStr16) -> Result<Self::Image>;

    /// Attach `options` to the image as its load options.
    ///
    /// # Safety
    ///
    /// The firmware keeps a pointer to `options`. It must stay alive and
    /// unmoved until [`Firmware::start_image`] has been called for `image`.
    unsafe fn set_load_options(&mut self, image: &Self::Image, options: &CommandLine) -> Result<()>;

    /// Transfer control to the image.
    ///
    /// Only returns if the image could not be started or exited; the status is
    /// whatever firmware reported.
    fn start_image(&mut self, image: Self::Image) -> Status;
}
