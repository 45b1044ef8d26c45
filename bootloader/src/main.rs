//! Zebrafish Bootloader - UEFI chain-loader
//!
//! Entry point of the EFI application. Everything past logger setup lives in
//! the library; this file only wires the UEFI backend to the chain-load
//! sequence and provides the panic handler.

#![cfg_attr(target_os = "uefi", no_std)]
#![cfg_attr(target_os = "uefi", no_main)]

#[cfg(all(target_os = "uefi", not(feature = "uefi_support")))]
compile_error!("the EFI application requires the `uefi_support` feature");

#[cfg(all(target_os = "uefi", feature = "uefi_support"))]
mod efi_entry {
    use core::panic::PanicInfo;

    use log::error;
    use uefi::prelude::*;
    use zebrafish_bootloader::firmware::efi::UefiFirmware;
    use zebrafish_bootloader::{LoaderConfig, chainload, logging};

    /// UEFI application entry point
    #[entry]
    fn main() -> Status {
        if let Err(err) = logging::init() {
            return err.status();
        }

        let mut firmware = UefiFirmware::new(boot::image_handle());
        chainload(&mut firmware, &LoaderConfig::default()).status()
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        error!("!! BOOTLOADER PANIC !!");
        error!("{}", info);
        loop {
            core::hint::spin_loop();
        }
    }
}

#[cfg(not(target_os = "uefi"))]
fn main() {
    eprintln!("bootloader is a UEFI application; build it with `cargo run -p xtask -- build`");
    std::process::exit(1);
}
