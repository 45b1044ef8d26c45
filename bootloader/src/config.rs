//! Loader configuration
//!
//! Everything here is fixed at build time. Paths are relative to the root of
//! the volume the loader was started from.

use log::LevelFilter;
use uefi::{CStr16, cstr16};

/// Capacity of the command-line buffer in UTF-16 code units
pub const CMDLINE_CAPACITY: usize = 16384;

/// Kernel image started by the loader
pub const KERNEL_PATH: &CStr16 = cstr16!("\\zebrafish-kernel");

/// Optional file holding the kernel command line
pub const CMDLINE_PATH: &CStr16 = cstr16!("\\cmdline.txt");

/// Command line used when `CMDLINE_PATH` is absent or unreadable
pub const FALLBACK_CMDLINE: &str = "initrd=\\zebrafish-initrd";

/// Paths and defaults used by one boot attempt
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    pub kernel_path: &'static CStr16,
    pub cmdline_path: &'static CStr16,
    pub fallback_cmdline: &'static str,
}

impl LoaderConfig {
    /// Console log level selected by the build features.
    ///
    /// The default build only reports fatal conditions.
    pub const fn log_level() -> LevelFilter {
        if cfg!(feature = "verbose_logging") {
            LevelFilter::Trace
        } else if cfg!(feature = "debug") {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            kernel_path: KERNEL_PATH,
            cmdline_path: CMDLINE_PATH,
            fallback_cmdline: FALLBACK_CMDLINE,
        }
    }
}
