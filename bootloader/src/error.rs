//! Bootloader error handling
//!
//! Every failure in the chain-load sequence is fatal. Each variant carries the
//! firmware status that caused it, which becomes the loader's exit status.

use core::fmt;

use uefi::Status;

/// Firmware service that could not be obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Loaded-image protocol on the loader's own handle
    LoadedImage,
    /// Device the loader itself was loaded from
    BootDevice,
    /// Simple file system protocol on the boot device
    SimpleFileSystem,
    /// Device path protocol on the boot device
    DevicePath,
    /// Loaded-image protocol on the freshly loaded kernel
    KernelLoadedImage,
}

impl Service {
    /// Protocol name as printed in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            Service::LoadedImage => "LoadedImageProtocol",
            Service::BootDevice => "boot device handle",
            Service::SimpleFileSystem => "FileSystemProtocol",
            Service::DevicePath => "DevicePathProtocol",
            Service::KernelLoadedImage => "kernel loaded image protocol",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bootloader error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// A required firmware protocol could not be obtained
    ServiceUnavailable { service: Service, status: Status },

    /// The boot volume could not be opened
    VolumeOpenFailed(Status),

    /// The kernel image does not exist on the boot volume
    KernelNotFound(Status),

    /// The firmware image loader rejected the kernel
    LoadFailed(Status),

    /// Start-image returned instead of transferring control
    StartFailed(Status),
}

impl BootError {
    /// Firmware status to hand back as the loader's exit status
    pub fn status(&self) -> Status {
        match *self {
            BootError::ServiceUnavailable { status, .. }
            | BootError::VolumeOpenFailed(status)
            | BootError::KernelNotFound(status)
            | BootError::LoadFailed(status)
            | BootError::StartFailed(status) => status,
        }
    }

    /// Get a human-readable description of the error
    pub fn description(&self) -> &'static str {
        match self {
            BootError::ServiceUnavailable { .. } => "Firmware service unavailable",
            BootError::VolumeOpenFailed(_) => "Failed to open volume",
            BootError::KernelNotFound(_) => "Kernel not found",
            BootError::LoadFailed(_) => "LoadImage failed",
            BootError::StartFailed(_) => "StartImage failed",
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::ServiceUnavailable { service, status } => {
                write!(f, "Failed to get {}: {}", service, status)
            }
            other => write!(f, "{}: {}", other.description(), other.status()),
        }
    }
}

/// Result type used throughout the bootloader
pub type Result<T = ()> = core::result::Result<T, BootError>;
