//! Verify-and-write engine
//!
//! The flash is processed one erase sector at a time. A sector is compared
//! against the image first and only erased and programmed if it differs, so
//! rewriting an image that mostly matches the chip is quick. Sectors larger
//! than the staging buffer are handled as several equal subsectors.

use alloc::vec;

use crate::chip::{ChipDescriptor, EraseStrategy};
use crate::error::{Error, Result};
use crate::protocol;
use crate::storage::{BlockStatus, BlockStore, BLOCK_SIZE};

use super::progress::{Pass, ProgressSink, SectorOutcome};
use super::session::ProgrammingSession;

/// Result of a verify or write pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerifyReport {
    /// Sectors that differed from the image
    pub mismatched: u32,
    /// Sectors examined before the pass ended
    pub processed: u32,
    /// Sectors in the whole address space
    pub total: u32,
    /// The image (or the reachable window) ended before the last sector
    pub partial: bool,
}

impl VerifyReport {
    /// Whether every examined sector matched
    pub fn is_clean(&self) -> bool {
        self.mismatched == 0
    }
}

/// Result of [`ProgrammingSession::write_and_verify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// The write pass
    pub write: VerifyReport,
    /// The follow-up verify pass, run only if something was reprogrammed
    pub verify: Option<VerifyReport>,
}

impl WriteOutcome {
    /// Whether the flash ended up matching the image
    pub fn is_ok(&self) -> bool {
        self.verify.map_or(true, |v| v.is_clean())
    }
}

/// How a sector is split to fit the staging buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsectorLayout {
    /// Subsectors per sector
    pub count: u32,
    /// Bytes per subsector
    pub len: u32,
}

impl SubsectorLayout {
    /// Partition the sectors of `chip` for a buffer of `buffer_bytes`
    pub fn new(chip: &ChipDescriptor, buffer_bytes: u32) -> Result<Self> {
        if buffer_bytes == 0 {
            return Err(Error::UnsupportedGeometry("staging buffer is empty"));
        }
        let count = (chip.sector_size / buffer_bytes).max(1);
        let len = chip.sector_size / count;

        if len * count != chip.sector_size {
            return Err(Error::UnsupportedGeometry(
                "sector does not divide evenly into subsectors",
            ));
        }
        if len > buffer_bytes {
            return Err(Error::UnsupportedGeometry(
                "subsector is larger than the staging buffer",
            ));
        }
        if len as usize % BLOCK_SIZE != 0 {
            return Err(Error::UnsupportedGeometry(
                "subsector is not a whole number of blocks",
            ));
        }
        if chip.strategy == EraseStrategy::ProgramWholeSector && count != 1 {
            return Err(Error::UnsupportedGeometry(
                "sector program needs the whole sector in one buffer",
            ));
        }
        Ok(Self { count, len })
    }
}

/// Fill `buf` from the image starting at flash address `addr`
///
/// Returns the number of bytes staged, which is less than `buf.len()` when
/// the image ends or `addr` nears `limit`.
fn stage(store: &mut dyn BlockStore, addr: u32, limit: u32, buf: &mut [u8]) -> Result<usize> {
    let want = buf.len().min(limit.saturating_sub(addr) as usize);
    let first = addr / BLOCK_SIZE as u32;
    let mut block = [0u8; BLOCK_SIZE];
    let mut filled = 0;

    while filled < want {
        let n = first + (filled / BLOCK_SIZE) as u32;
        match store.read_block(n, &mut block)? {
            BlockStatus::Eof => break,
            BlockStatus::Data => {
                let take = (want - filled).min(BLOCK_SIZE);
                buf[filled..filled + take].copy_from_slice(&block[..take]);
                filled += take;
            }
        }
    }
    Ok(filled)
}

impl<'a> ProgrammingSession<'a> {
    /// Compare the flash against the image in `store`, reprogramming
    /// sectors that differ when `write` is set
    ///
    /// The store must already be open. Processing stops at the end of the
    /// image or of the reachable address space, whichever comes first.
    pub fn verify_and_write(
        &mut self,
        store: &mut dyn BlockStore,
        write: bool,
        progress: &mut dyn ProgressSink,
    ) -> Result<VerifyReport> {
        if write && self.chip.is_assumed() {
            return Err(Error::WriteNotAllowed);
        }

        let layout = SubsectorLayout::new(&self.chip, self.buffer_bytes())?;
        let sector_size = self.chip.sector_size;
        let total = self.chip.sector_count * self.chip_count;
        let limit = self.reachable_size();
        let mut buffer = vec![0u8; layout.len as usize];
        let mut report = VerifyReport {
            total,
            ..Default::default()
        };

        progress.sectors(if write { Pass::Write } else { Pass::Verify }, total);

        for sector in 0..total {
            let sector_addr = sector * sector_size;
            if sector_addr >= limit {
                break;
            }

            let mut eof = false;
            let mut compared = false;
            let mut mismatch = false;
            for sub in 0..layout.count {
                let addr = sector_addr + sub * layout.len;
                let n = stage(store, addr, limit, &mut buffer)?;
                if n == 0 {
                    eof = true;
                    break;
                }
                compared = true;
                if !self.strategy.verify_block(addr, &buffer[..n])? {
                    mismatch = true;
                    break;
                }
                if n < buffer.len() {
                    eof = true;
                    break;
                }
            }
            if !compared {
                break;
            }
            report.processed += 1;

            let outcome = if !mismatch {
                SectorOutcome::Unchanged
            } else {
                report.mismatched += 1;
                if write {
                    eof = self.rewrite_sector(store, sector_addr, layout, limit, &mut buffer)?;
                    SectorOutcome::Reprogrammed
                } else {
                    SectorOutcome::Mismatch
                }
            };
            log::trace!("sector {} at 0x{:06X}: {:?}", sector, sector_addr, outcome);
            progress.sector_done(sector, sector_addr, outcome);

            if eof {
                break;
            }
        }

        report.partial = report.processed < total;
        progress.complete(&report);
        Ok(report)
    }

    /// Erase and program one sector from the image
    ///
    /// Returns whether the image ended inside this sector.
    fn rewrite_sector(
        &mut self,
        store: &mut dyn BlockStore,
        sector_addr: u32,
        layout: SubsectorLayout,
        limit: u32,
        buffer: &mut [u8],
    ) -> Result<bool> {
        let chip_size = self.chip.chip_size();
        let base = sector_addr / chip_size * chip_size;
        let poll = self.poll_limit;

        match self.chip.strategy {
            EraseStrategy::EraseWholeChip => {
                log::debug!("erasing chip at 0x{:06X}", base);
                protocol::chip_erase(&mut *self.strategy, base, poll)?;
            }
            EraseStrategy::ProgramWholeSector => {}
            EraseStrategy::Normal => {
                log::debug!("erasing sector at 0x{:06X}", sector_addr);
                protocol::sector_erase(&mut *self.strategy, base, sector_addr, poll)?;
            }
        }

        for sub in 0..layout.count {
            let addr = sector_addr + sub * layout.len;
            let n = stage(store, addr, limit, buffer)?;
            if n == 0 {
                return Ok(true);
            }
            let data = &buffer[..n];
            match self.chip.strategy {
                EraseStrategy::ProgramWholeSector => {
                    protocol::sector_program(&mut *self.strategy, base, addr, data, poll)?
                }
                _ => protocol::program_range(&mut *self.strategy, base, addr, data, poll)?,
            }
            if n < buffer.len() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Write pass, followed by a verify pass if anything was reprogrammed
    pub fn write_and_verify(
        &mut self,
        store: &mut dyn BlockStore,
        progress: &mut dyn ProgressSink,
    ) -> Result<WriteOutcome> {
        let write = self.verify_and_write(store, true, progress)?;
        let verify = if write.mismatched > 0 {
            Some(self.verify_and_write(store, false, progress)?)
        } else {
            None
        };
        Ok(WriteOutcome { write, verify })
    }

    /// Copy the reachable flash contents into a freshly created `store`
    ///
    /// Returns the number of bytes read.
    pub fn read_to(
        &mut self,
        store: &mut dyn BlockStore,
        progress: &mut dyn ProgressSink,
    ) -> Result<u32> {
        let total = self.reachable_size();
        let mut buf = vec![0u8; self.buffer_bytes() as usize];

        store.delete()?;
        store.create()?;
        progress.reading(total);

        let mut addr = 0u32;
        while addr < total {
            let n = (total - addr).min(buf.len() as u32) as usize;
            self.strategy.read_block(addr, &mut buf[..n])?;

            let first = addr / BLOCK_SIZE as u32;
            for (i, chunk) in buf[..n].chunks(BLOCK_SIZE).enumerate() {
                let mut block = [0xFFu8; BLOCK_SIZE];
                block[..chunk.len()].copy_from_slice(chunk);
                store.write_block(first + i as u32, &block)?;
            }

            addr += n as u32;
            progress.read_progress(addr);
        }

        store.close()?;
        Ok(total)
    }
}
