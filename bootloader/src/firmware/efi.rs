//! UEFI boot-services backend
//!
//! Implements the firmware traits with the `uefi` crate. Protocols are opened
//! exclusively and closed again as soon as the value they provide has been
//! read, except for the file system which stays open with its root directory.

use core::mem::MaybeUninit;

use log::trace;
use uefi::boot::{self, LoadImageSource, ScopedProtocol};
use uefi::proto::BootPolicy;
use uefi::proto::device_path::build::{self, BuildError, DevicePathBuilder};
use uefi::proto::device_path::{DevicePath, DeviceSubType, DeviceType, LoadedImageDevicePath};
use uefi::proto::loaded_image::LoadedImage;
use uefi::proto::media::file::{Directory, File, FileAttribute, FileInfo, FileMode, RegularFile};
use uefi::proto::media::fs::SimpleFileSystem;
use uefi::{CStr16, Handle, Status};

use crate::cmdline::CommandLine;
use crate::error::{BootError, Result, Service};
use crate::firmware::{FileHandle, Firmware, Volume};

/// Room for the boot device path plus one file path node
const DEVICE_PATH_BUFFER_SIZE: usize = 1024;

/// Room for `FileInfo` and a short file name
const FILE_INFO_BUFFER_SIZE: usize = 512;

/// Firmware services reached through the boot services table
pub struct UefiFirmware {
    image_handle: Handle,
}

impl UefiFirmware {
    /// Create a backend acting on behalf of the running image
    pub fn new(image_handle: Handle) -> Self {
        Self { image_handle }
    }
}

fn unavailable(service: Service) -> impl FnOnce(uefi::Error) -> BootError {
    move |err| BootError::ServiceUnavailable {
        service,
        status: err.status(),
    }
}

impl Firmware for UefiFirmware {
    type Device = Handle;
    type Volume = UefiVolume;
    type Image = Handle;

    fn boot_device(&mut self) -> Result<Handle> {
        let loaded_image = boot::open_protocol_exclusive::<LoadedImage>(self.image_handle)
            .map_err(unavailable(Service::LoadedImage))?;

        loaded_image.device().ok_or(BootError::ServiceUnavailable {
            service: Service::BootDevice,
            status: Status::NOT_FOUND,
        })
    }

    fn open_volume(&mut self, device: Handle) -> Result<UefiVolume> {
        let mut fs = boot::open_protocol_exclusive::<SimpleFileSystem>(device)
            .map_err(unavailable(Service::SimpleFileSystem))?;
        let root = fs
            .open_volume()
            .map_err(|err| BootError::VolumeOpenFailed(err.status()))?;

        Ok(UefiVolume { root, _fs: fs })
    }

    fn load_image(&mut self, path: &CStr16) -> Result<Handle> {
        let own_path = boot::open_protocol_exclusive::<LoadedImageDevicePath>(self.image_handle)
            .map_err(unavailable(Service::DevicePath))?;

        let mut storage = [MaybeUninit::<u8>::uninit(); DEVICE_PATH_BUFFER_SIZE];
        let kernel_path = file_device_path(&own_path, path, &mut storage).map_err(|err| {
            trace!("[efi] building device path failed: {:?}", err);
            BootError::LoadFailed(Status::INVALID_PARAMETER)
        })?;

        boot::load_image(
            self.image_handle,
            LoadImageSource::FromDevicePath {
                device_path: kernel_path,
                boot_policy: BootPolicy::ExactMatch,
            },
        )
        .map_err(|err| BootError::LoadFailed(err.status()))
    }

    unsafe fn set_load_options(&mut self, image: &Handle, options: &CommandLine) -> Result<()> {
        let mut loaded_image = boot::open_protocol_exclusive::<LoadedImage>(*image)
            .map_err(unavailable(Service::KernelLoadedImage))?;

        // SAFETY: the caller keeps `options` alive until the image is started.
        unsafe {
            loaded_image.set_load_options(
                options.as_units_with_nul().as_ptr().cast(),
                options.load_options_size(),
            );
        }
        Ok(())
    }

    fn start_image(&mut self, image: Handle) -> Status {
        match boot::start_image(image) {
            Ok(()) => Status::SUCCESS,
            Err(err) => err.status(),
        }
    }
}

/// Device path of the file at `path` on the device `image_path` was loaded from.
///
/// Media file path nodes of the running image are dropped so only the
/// device part remains.
fn file_device_path<'a>(
    image_path: &DevicePath,
    path: &CStr16,
    storage: &'a mut [MaybeUninit<u8>],
) -> core::result::Result<&'a DevicePath, BuildError> {
    let mut builder = DevicePathBuilder::with_buf(storage);
    for node in image_path.node_iter() {
        if node.full_type() == (DeviceType::MEDIA, DeviceSubType::MEDIA_FILE_PATH) {
            break;
        }
        builder = builder.push(&node)?;
    }
    builder = builder.push(&build::media::FilePath { path_name: path })?;
    builder.finalize()
}

/// Root directory of the boot file system
pub struct UefiVolume {
    root: Directory,
    _fs: ScopedProtocol<SimpleFileSystem>,
}

impl Volume for UefiVolume {
    type File = UefiFile;

    fn open(&mut self, path: &CStr16) -> core::result::Result<UefiFile, Status> {
        let handle = self
            .root
            .open(path, FileMode::Read, FileAttribute::empty())
            .map_err(|err| err.status())?;

        handle.into_regular_file().map(UefiFile).ok_or_else(|| {
            trace!("[efi] {} is not a regular file", path);
            Status::UNSUPPORTED
        })
    }
}

/// Regular file opened for reading
pub struct UefiFile(RegularFile);

impl FileHandle for UefiFile {
    fn size(&mut self) -> core::result::Result<u64, Status> {
        let mut buf = [0u8; FILE_INFO_BUFFER_SIZE];
        let info = self
            .0
            .get_info::<FileInfo>(&mut buf)
            .map_err(|err| err.status())?;
        Ok(info.file_size())
    }

    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Status> {
        self.0.read(buf).map_err(|err| err.status())
    }

    fn close(self) {
        // Dropping the handle closes it with the firmware.
        drop(self.0);
    }
}
