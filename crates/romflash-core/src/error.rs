//! Error types for romflash-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Failure reported by a [`BlockStore`](crate::storage::BlockStore)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// The named file does not exist
    NotFound,
    /// The file could not be created
    CreateFailed,
    /// Reading a block failed
    ReadFailed {
        /// Block number (128-byte units)
        block: u32,
    },
    /// Writing a block failed
    WriteFailed {
        /// Block number (128-byte units)
        block: u32,
    },
    /// The store was used before being opened, or another I/O failure
    Io,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Chip errors
    /// Chip ID is not in the catalog
    UnrecognizedChip {
        /// Manufacturer/device ID read from the chip
        id: u16,
    },
    /// An additional chip identified differently from the first one
    ChipMismatch {
        /// Index of the offending chip (0 based)
        chip: u32,
        /// ID of chip 0
        expected: u16,
        /// ID of the offending chip
        found: u16,
    },
    /// Catalog entry inconsistent with the engine's partitioning rules
    UnsupportedGeometry(&'static str),
    /// Write requested against a chip whose geometry was only assumed
    WriteNotAllowed,
    /// Chip count outside 1..=9
    InvalidChipCount(u32),

    // Image errors
    /// Image size doesn't match the device and partial mode doesn't allow it
    SizeMismatch {
        /// Size of the image in bytes
        image_bytes: u32,
        /// Size of the flash address space in bytes
        device_bytes: u32,
    },

    // Hardware errors
    /// No usable access method was found for this platform
    NoAccessMethod,
    /// A program or erase operation never settled
    HardwareTimeout {
        /// Address being polled
        addr: u32,
    },
    /// Address outside what the access method can reach
    AddressOutOfBounds {
        /// Offending linear flash address
        addr: u32,
    },

    // Storage errors
    /// Image file I/O failed
    Storage(StorageError),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::CreateFailed => write!(f, "cannot create file"),
            Self::ReadFailed { block } => write!(f, "read of block {} failed", block),
            Self::WriteFailed { block } => write!(f, "write of block {} failed", block),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedChip { id } => {
                write!(f, "flash chip ID 0x{:04X} is not recognised", id)
            }
            Self::ChipMismatch {
                chip,
                expected,
                found,
            } => write!(
                f,
                "flash chip {} has ID 0x{:04X}, expected 0x{:04X} (mixed chip types are not supported)",
                chip, found, expected
            ),
            Self::UnsupportedGeometry(msg) => write!(f, "unsupported chip geometry: {}", msg),
            Self::WriteNotAllowed => {
                write!(f, "refusing to write to a chip with assumed geometry")
            }
            Self::InvalidChipCount(n) => write!(f, "invalid chip count {} (expected 1-9)", n),
            Self::SizeMismatch {
                image_bytes,
                device_bytes,
            } => write!(
                f,
                "image file size ({} bytes) does not match ROM size ({} bytes)",
                image_bytes, device_bytes
            ),
            Self::NoAccessMethod => write!(f, "cannot determine how to access the flash ROM"),
            Self::HardwareTimeout { addr } => {
                write!(f, "flash operation at 0x{:06X} did not complete", addr)
            }
            Self::AddressOutOfBounds { addr } => {
                write!(f, "address 0x{:06X} out of bounds", addr)
            }
            Self::Storage(e) => write!(f, "image file: {}", e),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Error::Storage(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StorageError {}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
