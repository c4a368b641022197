//! Error types for physical memory mapping

use std::io;
use thiserror::Error;

/// Errors from mapping the flash window
#[derive(Debug, Error)]
pub enum PhysMapError {
    /// `/dev/mem` could not be opened
    #[error("cannot open /dev/mem: {0} (are you root?)")]
    Open(#[source] io::Error),

    /// mmap() refused the range
    #[error("cannot map {size:#x} bytes at physical {address:#x}: {source}")]
    Map {
        address: u64,
        size: usize,
        #[source]
        source: io::Error,
    },

    /// Zero-sized or overflowing window
    #[error("invalid window: {size:#x} bytes at {address:#x}")]
    InvalidWindow { address: u64, size: usize },

    /// Not available on this OS
    #[error("physical memory mapping is only supported on Linux")]
    NotSupported,
}

/// Result type for physmap operations
pub type Result<T> = std::result::Result<T, PhysMapError>;
