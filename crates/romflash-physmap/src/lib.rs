//! romflash-physmap - Parallel flash behind a physical address window
//!
//! On a Linux-hosted board the flash sits at a fixed physical address and
//! can be reached by mapping `/dev/mem`. This crate provides that mapping
//! as a [`MemoryWindow`](romflash_core::access::MemoryWindow), ready to be
//! wrapped in the core [`MemoryMapped`] access strategy.
//!
//! Requires root.

pub mod error;
mod physmap;

pub use error::{PhysMapError, Result};
pub use physmap::{PhysMap, DEFAULT_BASE, DEFAULT_SIZE};

use romflash_core::access::MemoryMapped;

/// Map the flash window and wrap it in an access strategy
pub fn open(base: u64, size: usize) -> Result<MemoryMapped<PhysMap>> {
    log::info!(
        "Opening flash window at {:#x} ({} KiB) through /dev/mem",
        base,
        size / 1024
    );
    Ok(MemoryMapped::new(PhysMap::new(base, size)?))
}
