//! Zebrafish Bootloader Library
//!
//! A minimal UEFI chain-loader. It opens the volume it was started from,
//! reads an optional kernel command line from `\cmdline.txt`, loads
//! `\zebrafish-kernel` through the firmware image loader and starts it with
//! that command line as its load options.
//!
//! The sequence in [`chainload`] is written against the traits in
//! [`firmware`]; the UEFI implementation lives in `firmware::efi`.

#![cfg_attr(not(test), no_std)]

pub mod chainload;
pub mod cmdline;
pub mod config;
pub mod error;
pub mod firmware;
#[cfg(feature = "uefi_support")]
pub mod logging;

pub use chainload::chainload;
pub use cmdline::CommandLine;
pub use config::LoaderConfig;
pub use error::{BootError, Result, Service};
