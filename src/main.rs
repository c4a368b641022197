//! romflash - In-system parallel flash programmer
//!
//! Reads, verifies and rewrites the 5 V parallel flash ROM of Z80/Z180
//! single-board computers (RomWBW, UNA and P112 BIOSes, or bare Z180 DMA),
//! and of boards that expose their flash in a physical memory window.
//!
//! # Architecture
//!
//! The platform (`-p`) decides how the flash is reached: the registry in
//! `romflash-flash` opens it, detects the BIOS (or takes `--access`) and
//! hands back an access strategy. The engine in `romflash-core` then
//! identifies the chip(s) and reads, verifies or rewrites the flash sector
//! by sector, skipping sectors that already match the image.

mod cli;
mod commands;
mod error;
mod storage;

use clap::Parser;
use cli::{Cli, Commands, SessionArgs};
use romflash_core::chip::ChipCatalog;
use romflash_core::flash::ProbeOptions;
use romflash_flash::{open_platform, PlatformHandle};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }
    let verbose = cli.verbose > 0;

    // Load chip catalog
    let catalog = match load_chip_catalog(cli.chip_db.as_deref()) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Failed to load chip database: {}", e);
            std::process::exit(1);
        }
    };

    log::debug!("Loaded {} chip definitions", catalog.len());

    match cli.command {
        Commands::Read { session, file } => {
            let (mut handle, opts) = open(&session, &catalog)?;
            commands::run_read(&mut handle, &catalog, &opts, &file, verbose)
        }
        Commands::Write { session, file } => {
            let (mut handle, opts) = open(&session, &catalog)?;
            commands::run_write(&mut handle, &catalog, &opts, &file, verbose)
        }
        Commands::Verify { session, file } => {
            let (mut handle, opts) = open(&session, &catalog)?;
            commands::run_verify(&mut handle, &catalog, &opts, &file, verbose)
        }
        Commands::ListPlatforms => {
            commands::list_platforms();
            Ok(())
        }
        Commands::ListChips { vendor } => {
            commands::list_chips(&catalog, vendor.as_deref());
            Ok(())
        }
    }
}

/// Open the platform and build the probe options for a session
fn open(
    args: &SessionArgs,
    catalog: &ChipCatalog,
) -> Result<(PlatformHandle, ProbeOptions), Box<dyn std::error::Error>> {
    let handle = open_platform(&args.platform, args.access, catalog)?;
    let opts = ProbeOptions {
        chip_count: args.chips,
        allow_unknown: args.rom,
        allow_partial: args.partial,
        ..Default::default()
    };
    Ok((handle, opts))
}

/// Load the built-in catalog plus any definitions from the specified path
/// or default locations
fn load_chip_catalog(path: Option<&Path>) -> Result<ChipCatalog, Box<dyn std::error::Error>> {
    let mut catalog = ChipCatalog::builtin();

    if let Some(path) = path {
        // User specified a path
        if path.is_dir() {
            catalog.load_dir(path)?;
        } else if path.is_file() {
            catalog.load_file(path)?;
        } else {
            return Err(format!("Chip database path not found: {}", path.display()).into());
        }
    } else {
        // Try default locations
        let default_paths = [
            PathBuf::from("chips"),
            PathBuf::from("/usr/share/romflash/chips"),
            PathBuf::from("/usr/local/share/romflash/chips"),
        ];

        for dir in &default_paths {
            if dir.is_dir() {
                match catalog.load_dir(dir) {
                    Ok(count) => log::debug!("Loaded {} chips from {}", count, dir.display()),
                    Err(e) => log::warn!("Failed to load chips from {}: {}", dir.display(), e),
                }
            }
        }
    }

    Ok(catalog)
}
