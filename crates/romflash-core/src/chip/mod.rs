//! Flash chip types and catalog
//!
//! This module provides the descriptor for a flash part, the built-in
//! catalog of parts this programmer knows how to drive and, with `std`,
//! loading of extra definitions from RON files.

mod catalog;
mod types;

#[cfg(feature = "std")]
mod database;

pub use catalog::{ChipCatalog, BUILTIN_CHIPS};
pub use types::*;

#[cfg(feature = "std")]
pub use database::*;
