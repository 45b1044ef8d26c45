//! Console logging
//!
//! Log records go to the firmware text console through the `uefi` crate's
//! logger. The level comes from [`LoaderConfig::log_level`].

use crate::config::LoaderConfig;

/// Install the console logger and apply the configured level.
///
/// Must run once, before anything is logged.
pub fn init() -> uefi::Result {
    uefi::helpers::init()?;
    log::set_max_level(LoaderConfig::log_level());
    Ok(())
}
