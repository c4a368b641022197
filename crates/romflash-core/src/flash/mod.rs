//! High-level flash operations
//!
//! [`probe`] identifies the chip (or chips) behind an access strategy and
//! returns a [`ProgrammingSession`], which then reads the flash out or runs
//! the verify-and-write engine against an image.

mod engine;
#[cfg(test)]
mod mock;
mod progress;
mod session;

pub use engine::{SubsectorLayout, VerifyReport, WriteOutcome};
pub use progress::{NoProgress, Pass, ProgressSink, SectorOutcome};
pub use session::{probe, ProbeOptions, ProgrammingSession};

/// Default staging buffer size in 128-byte blocks (4 KiB)
pub const DEFAULT_BUFFER_BLOCKS: u32 = 32;

/// Most chips that can be ganged in one address space
pub const MAX_CHIPS: u32 = 9;

/// A partial image must be a whole number of these
pub const PARTIAL_IMAGE_UNIT: u32 = 32 * 1024;
