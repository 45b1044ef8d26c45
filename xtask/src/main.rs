use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};

fn main() {
    let mut args = std::env::args().skip(1);
    let task = args.next().unwrap_or_else(|| "help".to_string());
    let result = match task.as_str() {
        "build" => build_bootloader(args.collect()).map(|_| ()),
        "esp" => stage_esp(args.collect()),
        _ => {
            print_help();
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!("[xtask] {:#}", err);
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "x86_64" => Ok(Arch::X86_64),
            "aarch64" => Ok(Arch::Aarch64),
            other => bail!("unsupported architecture `{}` (expected x86_64 or aarch64)", other),
        }
    }

    fn target(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64-unknown-uefi",
            Arch::Aarch64 => "aarch64-unknown-uefi",
        }
    }

    /// Removable-media boot file name from the UEFI specification
    fn boot_file_name(self) -> &'static str {
        match self {
            Arch::X86_64 => "BOOTX64.EFI",
            Arch::Aarch64 => "BOOTAA64.EFI",
        }
    }
}

/// Build the EFI application and return the path of the produced image
fn build_bootloader(args: Vec<String>) -> Result<PathBuf> {
    let arch = Arch::parse(args.first().map(String::as_str).unwrap_or("x86_64"))?;
    let release = args.iter().any(|a| a == "--release");

    let mut cmd = Command::new("cargo");
    cmd.arg("build")
        .arg("-p").arg("zebrafish-bootloader")
        .arg("--bin").arg("bootloader")
        .arg("--target").arg(arch.target());
    if release {
        cmd.arg("--release");
    }
    if args.iter().any(|a| a == "--verbose-logging") {
        cmd.arg("--features").arg("verbose_logging");
    }
    run(&mut cmd, "bootloader build")?;

    let profile = if release { "release" } else { "debug" };
    Ok(workspace_root()
        .join("target")
        .join(arch.target())
        .join(profile)
        .join("bootloader.efi"))
}

/// Lay out a boot volume directory the firmware can start the loader from
fn stage_esp(args: Vec<String>) -> Result<()> {
    let mut args = args.into_iter();
    let dir = PathBuf::from(args.next().context("missing ESP directory argument")?);

    let mut arch = Arch::X86_64;
    let mut kernel: Option<PathBuf> = None;
    let mut cmdline: Option<String> = None;
    let mut build_args = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--arch" => arch = Arch::parse(&args.next().context("--arch needs a value")?)?,
            "--kernel" => kernel = Some(args.next().context("--kernel needs a path")?.into()),
            "--cmdline" => cmdline = Some(args.next().context("--cmdline needs a value")?),
            "--release" | "--verbose-logging" => build_args.push(arg),
            other => bail!("unknown esp option `{}`", other),
        }
    }

    let mut build = vec![match arch {
        Arch::X86_64 => "x86_64".to_string(),
        Arch::Aarch64 => "aarch64".to_string(),
    }];
    build.extend(build_args);
    let image = build_bootloader(build)?;

    let boot_dir = dir.join("EFI").join("BOOT");
    fs::create_dir_all(&boot_dir)
        .with_context(|| format!("creating {}", boot_dir.display()))?;
    copy(&image, &boot_dir.join(arch.boot_file_name()))?;

    if let Some(kernel) = kernel {
        copy(&kernel, &dir.join("zebrafish-kernel"))?;
    }
    if let Some(cmdline) = cmdline {
        let path = dir.join("cmdline.txt");
        fs::write(&path, encode_cmdline(&cmdline))
            .with_context(|| format!("writing {}", path.display()))?;
    }

    println!("[xtask] boot volume staged in {}", dir.display());
    Ok(())
}

/// Encode a command line the way the loader reads it: UTF-16LE, no BOM, no terminator
fn encode_cmdline(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn copy(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .with_context(|| format!("copying {} to {}", from.display(), to.display()))?;
    Ok(())
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn run(cmd: &mut Command, name: &str) -> Result<()> {
    println!("[xtask] {}: {:?}", name, cmd);
    let status = cmd.status().with_context(|| format!("failed to run {}", name))?;
    if !status.success() {
        bail!("{} failed with status {:?}", name, status);
    }
    Ok(())
}

fn print_help() {
    println!(
        "xtask usage:\n  \
         cargo run -p xtask -- build [x86_64|aarch64] [--release] [--verbose-logging]\n  \
         cargo run -p xtask -- esp <dir> [--arch x86_64|aarch64] [--kernel PATH] [--cmdline TEXT] [--release]"
    );
}
