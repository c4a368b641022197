//! romflash-core - Core library for in-system parallel flash programming
//!
//! This crate contains everything needed to identify and reprogram the
//! 5 V parallel flash parts (29F0x0, 39F0x0, AT29C/AT49F) found on Z80 and
//! Z180 single-board computers. It is `no_std` compatible (it only needs
//! `alloc`) so the same engine can drive real hardware, an emulated board or
//! a memory-mapped window on a Linux host.
//!
//! # Layers
//!
//! - [`chip`] - the catalog of supported flash parts
//! - [`access`] - the [`AccessStrategy`](access::AccessStrategy) trait and its
//!   bank-switched, Z180 DMA and memory-mapped implementations
//! - [`platform`] - BIOS signature detection
//! - [`protocol`] - JEDEC unlock/command sequences and toggle-bit polling
//! - [`flash`] - identification, multi-chip probing and the
//!   verify/erase/program engine
//! - [`storage`] - the 128-byte block store the engine reads images from
//!
//! # Features
//!
//! - `std` - Enable standard library support (RON chip definitions,
//!   `std::error::Error` impls)
//!
//! # Example
//!
//! ```ignore
//! use romflash_core::{chip::ChipCatalog, flash};
//!
//! let catalog = ChipCatalog::builtin();
//! let mut session = flash::probe(&mut strategy, &catalog, &flash::ProbeOptions::default())?;
//! let report = session.verify_and_write(&mut image, true, &mut flash::NoProgress)?;
//! println!("reprogrammed {} sectors", report.mismatched);
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

extern crate alloc;

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod access;
pub mod chip;
pub mod error;
pub mod flash;
pub mod platform;
pub mod protocol;
pub mod storage;

pub use error::{Error, Result};
