//! Chain-load sequence
//!
//! Four stages run in order, each consuming what the previous one produced:
//!
//! 1. open the volume the loader was started from
//! 2. resolve the kernel command line (never fails, see [`cmdline::resolve`])
//! 3. probe for the kernel and load it
//! 4. inject the command line and start the kernel
//!
//! The first failing stage ends the attempt. Starting the kernel does not
//! return on success, so the sequence as a whole only ever yields an error.

use core::convert::Infallible;

use log::{debug, error};

use crate::cmdline::{self, CommandLine};
use crate::config::LoaderConfig;
use crate::error::{BootError, Result};
use crate::firmware::{FileHandle, Firmware, Volume};

/// Run one boot attempt.
///
/// Returns only when the attempt failed. The error has already been reported
/// on the console; its status is the loader's exit status.
pub fn chainload<F: Firmware>(firmware: &mut F, config: &LoaderConfig) -> BootError {
    let error = match run(firmware, config) {
        Ok(never) => match never {},
        Err(error) => error,
    };
    error!("{}", error);
    error
}

fn run<F: Firmware>(firmware: &mut F, config: &LoaderConfig) -> Result<Infallible> {
    let mut volume = open_boot_volume(firmware)?;
    let cmdline = cmdline::resolve(&mut volume, config);
    let kernel = load_kernel(firmware, &mut volume, config)?;
    launch(firmware, kernel, &cmdline)
}

/// Open the root of the file system the loader was started from
pub fn open_boot_volume<F: Firmware>(firmware: &mut F) -> Result<F::Volume> {
    let device = firmware.boot_device()?;
    firmware.open_volume(device)
}

/// Check that the kernel exists on `volume`, then load it
pub fn load_kernel<F: Firmware>(
    firmware: &mut F,
    volume: &mut F::Volume,
    config: &LoaderConfig,
) -> Result<F::Image> {
    let probe = volume
        .open(config.kernel_path)
        .map_err(BootError::KernelNotFound)?;
    probe.close();

    debug!("[boot] loading kernel from {}", config.kernel_path);
    firmware.load_image(config.kernel_path)
}

/// Hand `cmdline` to the kernel and start it.
///
/// Never returns `Ok`: a start that comes back is a failure.
pub fn launch<F: Firmware>(
    firmware: &mut F,
    kernel: F::Image,
    cmdline: &CommandLine,
) -> Result<Infallible> {
    // SAFETY: `cmdline` is borrowed for this whole call, so the buffer stays
    // in place until start_image below has returned.
    unsafe { firmware.set_load_options(&kernel, cmdline)? };

    debug!("[boot] starting kernel with load options \"{}\"", cmdline);
    Err(BootError::StartFailed(firmware.start_image(kernel)))
}
