//! Platform selection for the flash programmer
//!
//! This crate turns a platform string from the command line into an opened
//! access strategy. The CLI only interacts with types from this crate and
//! the chip catalog, never with the bank, DMA or memory-window plumbing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        CLI (bin/romflash)                    │
//! │  - Only imports romflash-flash and romflash-core (catalog)  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    romflash-flash (this crate)               │
//! │  - PlatformHandle: detected access method + strategy        │
//! │  - open_platform: opens platforms by name                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │    romflash-core         │   │  Platform crates         │
//! │  - AccessStrategy trait  │   │  - dummy (emulated SBCs) │
//! │  - Detection, engine     │   │  - physmap (/dev/mem)    │
//! │  - Chip catalog          │   │                          │
//! └──────────────────────────┘   └──────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use romflash_core::chip::ChipCatalog;
//! use romflash_core::flash::ProbeOptions;
//! use romflash_flash::open_platform;
//!
//! let catalog = ChipCatalog::builtin();
//! let mut handle = open_platform("dummy:board=z180", None, &catalog)?;
//! let session = handle.probe(&catalog, &ProbeOptions::default())?;
//! println!("{} KiB of flash", session.total_size() / 1024);
//! ```

mod handle;
mod registry;

pub use handle::PlatformHandle;
pub use registry::{
    available_platforms, open_platform, parse_number, parse_platform_params,
    platform_names_short, PlatformInfo, PlatformParams,
};

// Re-export core types that CLI needs
pub use romflash_core::platform::AccessKind;
