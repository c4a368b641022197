//! Progress reporting hooks

use super::engine::VerifyReport;

/// Which pass the engine is running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// Compare and reprogram sectors that differ
    Write,
    /// Compare only
    Verify,
}

/// What happened to one sector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectorOutcome {
    /// Flash already matched the image
    Unchanged,
    /// Flash differs from the image (verify pass)
    Mismatch,
    /// Sector was erased and programmed (write pass)
    Reprogrammed,
}

/// Trait for progress reporting during long operations
///
/// The engine calls these as it goes; the command line front end turns them
/// into a spinner or per-sector log lines.
pub trait ProgressSink {
    /// Called when starting to copy the flash out
    fn reading(&mut self, total_bytes: u32);

    /// Called to update read progress
    fn read_progress(&mut self, bytes_read: u32);

    /// Called when a verify or write pass starts
    fn sectors(&mut self, pass: Pass, total_sectors: u32);

    /// Called once per sector examined
    fn sector_done(&mut self, sector: u32, addr: u32, outcome: SectorOutcome);

    /// Called when the pass is over
    fn complete(&mut self, report: &VerifyReport);
}

/// A no-op progress reporter
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn reading(&mut self, _total_bytes: u32) {}
    fn read_progress(&mut self, _bytes_read: u32) {}
    fn sectors(&mut self, _pass: Pass, _total_sectors: u32) {}
    fn sector_done(&mut self, _sector: u32, _addr: u32, _outcome: SectorOutcome) {}
    fn complete(&mut self, _report: &VerifyReport) {}
}
