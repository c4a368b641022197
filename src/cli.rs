//! CLI argument parsing

use clap::{Parser, Subcommand};
use romflash_flash::{platform_names_short, AccessKind};
use std::path::PathBuf;

/// Parse an access method name
fn parse_access(s: &str) -> Result<AccessKind, String> {
    AccessKind::from_name(s).ok_or_else(|| {
        let names: Vec<&str> = AccessKind::ALL.iter().map(|k| k.name()).collect();
        format!("Unknown access method '{}' (expected one of: {})", s, names.join(", "))
    })
}

/// Generate dynamic help text for the platform argument
fn platform_help() -> String {
    format!("Platform to use [available: {}]", platform_names_short())
}

#[derive(Parser)]
#[command(name = "romflash")]
#[command(author, version, about = "In-system parallel flash programmer for Z80/Z180 boards", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v per-sector output, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Extra chip definitions (a .ron file or a directory of them)
    /// Defaults to looking in ./chips/ and /usr/share/romflash/chips/
    #[arg(long, global = true)]
    pub chip_db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by the commands that touch the flash
#[derive(clap::Args, Debug, Clone)]
pub struct SessionArgs {
    /// Platform to use
    #[arg(short, long, default_value = "physmap", help = platform_help())]
    pub platform: String,

    /// Force an access method instead of detecting one
    #[arg(long, value_parser = parse_access)]
    pub access: Option<AccessKind>,

    /// Number of identical flash chips (2-9), overriding what the BIOS reports
    #[arg(long, value_parser = clap::value_parser!(u32).range(2..=9))]
    pub chips: Option<u32>,

    /// Accept an image smaller than the flash (whole 32 KiB units)
    #[arg(long)]
    pub partial: bool,

    /// Treat an unrecognised chip as a 512 KiB ROM (read and verify only)
    #[arg(long)]
    pub rom: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read flash contents to a file
    Read {
        #[command(flatten)]
        session: SessionArgs,

        /// Output file path
        file: PathBuf,
    },

    /// Write a file to flash, reprogramming only sectors that differ
    Write {
        #[command(flatten)]
        session: SessionArgs,

        /// Input image path
        file: PathBuf,
    },

    /// Verify flash contents against a file
    Verify {
        #[command(flatten)]
        session: SessionArgs,

        /// Input image path to verify against
        file: PathBuf,
    },

    /// List supported platforms
    ListPlatforms,

    /// List supported chips
    ListChips {
        /// Filter by manufacturer name
        #[arg(long)]
        vendor: Option<String>,
    },
}
