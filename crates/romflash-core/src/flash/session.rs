//! Chip identification and per-run session state

use crate::access::AccessStrategy;
use crate::chip::{ChipCatalog, ChipDescriptor};
use crate::error::{Error, Result};
use crate::protocol::{self, PollLimit};
use crate::storage::BLOCK_SIZE;

use super::{DEFAULT_BUFFER_BLOCKS, MAX_CHIPS, PARTIAL_IMAGE_UNIT};

/// Options controlling [`probe`] and the session it returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Number of ganged chips, overriding what the platform reports
    pub chip_count: Option<u32>,
    /// Fall back to the assumed "ROM" geometry when the chip isn't known
    pub allow_unknown: bool,
    /// Accept images smaller than the device
    pub allow_partial: bool,
    /// Staging buffer size in 128-byte blocks
    pub buffer_blocks: u32,
    /// Bound on toggle-bit polling
    pub poll_limit: PollLimit,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            chip_count: None,
            allow_unknown: false,
            allow_partial: false,
            buffer_blocks: DEFAULT_BUFFER_BLOCKS,
            poll_limit: PollLimit::default(),
        }
    }
}

/// State for one run of the programmer
///
/// Ties the identified chip geometry to the access strategy it was found
/// through. All engine operations are methods on this type.
pub struct ProgrammingSession<'a> {
    pub(super) strategy: &'a mut dyn AccessStrategy,
    pub(super) chip: ChipDescriptor,
    pub(super) chip_count: u32,
    pub(super) allow_partial: bool,
    pub(super) buffer_blocks: u32,
    pub(super) poll_limit: PollLimit,
}

/// Identify the flash behind `strategy` and open a session on it
///
/// Chip 0 is identified first. The number of chips comes from
/// `opts.chip_count` if set, otherwise from the ROM size the platform
/// reports. Every further chip must return the same ID as chip 0.
pub fn probe<'a>(
    strategy: &'a mut dyn AccessStrategy,
    catalog: &ChipCatalog,
    opts: &ProbeOptions,
) -> Result<ProgrammingSession<'a>> {
    if opts.buffer_blocks == 0 {
        return Err(Error::UnsupportedGeometry("staging buffer is empty"));
    }
    if let Some(n) = opts.chip_count {
        if !(2..=MAX_CHIPS).contains(&n) {
            return Err(Error::InvalidChipCount(n));
        }
    }

    let id = protocol::read_id(strategy, 0)?;
    let chip = match catalog.lookup(id) {
        Some(chip) => {
            log::info!("Flash chip ID is 0x{:04X}: {}", id, chip.name);
            chip
        }
        None if opts.allow_unknown => {
            log::warn!(
                "Flash chip ID 0x{:04X} is not recognised, assuming a {} KiB ROM",
                id,
                ChipDescriptor::assumed_rom().chip_size() / 1024
            );
            ChipDescriptor::assumed_rom()
        }
        None => return Err(Error::UnrecognizedChip { id }),
    };
    let chip_size = chip.chip_size();

    let chip_count = match opts.chip_count {
        Some(n) => n,
        None => match strategy.installed_rom_size() {
            Some(installed) if installed / chip_size > 1 => {
                let n = (installed / chip_size).min(MAX_CHIPS);
                log::debug!(
                    "platform reports {} KiB of ROM: {} chips",
                    installed / 1024,
                    n
                );
                n
            }
            _ => 1,
        },
    };

    for n in 1..chip_count {
        let base = n
            .checked_mul(chip_size)
            .ok_or(Error::AddressOutOfBounds { addr: u32::MAX })?;
        let found = protocol::read_id(strategy, base)?;
        if found != id {
            return Err(Error::ChipMismatch {
                chip: n,
                expected: id,
                found,
            });
        }
    }

    log::info!(
        "Flash memory has {} chip(s) of {} sectors of {} bytes, total {} KiB",
        chip_count,
        chip.sector_count,
        chip.sector_size,
        (chip_size as u64 * chip_count as u64) / 1024
    );

    Ok(ProgrammingSession {
        strategy,
        chip,
        chip_count,
        allow_partial: opts.allow_partial,
        buffer_blocks: opts.buffer_blocks,
        poll_limit: opts.poll_limit,
    })
}

impl<'a> ProgrammingSession<'a> {
    /// The identified (or assumed) chip
    pub fn chip(&self) -> &ChipDescriptor {
        &self.chip
    }

    /// Number of identical chips in the address space
    pub fn chip_count(&self) -> u32 {
        self.chip_count
    }

    /// Size of one chip in bytes
    pub fn chip_size(&self) -> u32 {
        self.chip.chip_size()
    }

    /// Size of the whole flash address space in bytes
    pub fn total_size(&self) -> u32 {
        self.chip.chip_size() * self.chip_count
    }

    /// Part of the address space the strategy can actually reach
    pub fn reachable_size(&self) -> u32 {
        match self.strategy.address_limit() {
            Some(limit) => limit.min(self.total_size()),
            None => self.total_size(),
        }
    }

    /// Whether the chip geometry was only assumed
    pub fn is_assumed(&self) -> bool {
        self.chip.is_assumed()
    }

    /// Staging buffer size in bytes
    pub fn buffer_bytes(&self) -> u32 {
        self.buffer_blocks * BLOCK_SIZE as u32
    }

    /// Check an image of `blocks` 128-byte blocks against the device size
    ///
    /// A smaller image is only accepted in partial mode, and only if it is
    /// a whole number of 32 KiB units.
    pub fn check_image_size(&self, blocks: u32) -> Result<()> {
        let device_bytes = self.total_size();
        let image_bytes = blocks.saturating_mul(BLOCK_SIZE as u32);
        let mismatch = Error::SizeMismatch {
            image_bytes,
            device_bytes,
        };

        if image_bytes == device_bytes {
            return Ok(());
        }
        if image_bytes > device_bytes || !self.allow_partial {
            return Err(mismatch);
        }
        if image_bytes == 0 || image_bytes % PARTIAL_IMAGE_UNIT != 0 {
            return Err(mismatch);
        }
        log::info!(
            "Partial image: {} of {} KiB",
            image_bytes / 1024,
            device_bytes / 1024
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flash::mock::MockFlash;

    #[test]
    fn test_probe_single_chip() {
        let mut flash = MockFlash::single(0xBFB7, 512 * 1024);
        let catalog = ChipCatalog::builtin();
        let session = probe(&mut flash, &catalog, &ProbeOptions::default()).unwrap();
        assert_eq!(session.chip().name, "39F040");
        assert_eq!(session.chip_count(), 1);
        assert_eq!(session.total_size(), 512 * 1024);
        assert!(!session.is_assumed());
    }

    #[test]
    fn test_probe_unknown_chip() {
        let mut flash = MockFlash::single(0x1234, 512 * 1024);
        let catalog = ChipCatalog::builtin();
        assert_eq!(
            probe(&mut flash, &catalog, &ProbeOptions::default()).err(),
            Some(Error::UnrecognizedChip { id: 0x1234 })
        );

        let opts = ProbeOptions {
            allow_unknown: true,
            ..Default::default()
        };
        let session = probe(&mut flash, &catalog, &opts).unwrap();
        assert!(session.is_assumed());
        assert_eq!(session.total_size(), 512 * 1024);
    }

    #[test]
    fn test_probe_counts_chips_from_installed_size() {
        let mut flash = MockFlash::ganged(&[0x0120; 4], 128 * 1024);
        flash.installed = Some(512 * 1024);
        let catalog = ChipCatalog::builtin();
        let session = probe(&mut flash, &catalog, &ProbeOptions::default()).unwrap();
        assert_eq!(session.chip_count(), 4);
        assert_eq!(session.total_size(), 512 * 1024);
    }

    #[test]
    fn test_probe_forced_count_wins() {
        let mut flash = MockFlash::ganged(&[0x0120; 4], 128 * 1024);
        flash.installed = Some(512 * 1024);
        let catalog = ChipCatalog::builtin();
        let opts = ProbeOptions {
            chip_count: Some(2),
            ..Default::default()
        };
        let session = probe(&mut flash, &catalog, &opts).unwrap();
        assert_eq!(session.chip_count(), 2);
    }

    #[test]
    fn test_probe_rejects_bad_forced_count() {
        let mut flash = MockFlash::single(0xBFB7, 512 * 1024);
        let catalog = ChipCatalog::builtin();
        for n in [0, 1, 10] {
            let opts = ProbeOptions {
                chip_count: Some(n),
                ..Default::default()
            };
            assert_eq!(
                probe(&mut flash, &catalog, &opts).err(),
                Some(Error::InvalidChipCount(n))
            );
        }
    }

    #[test]
    fn test_probe_mixed_chips_abort() {
        let mut flash = MockFlash::ganged(&[0xBFB5, 0x0120], 128 * 1024);
        let catalog = ChipCatalog::builtin();
        let opts = ProbeOptions {
            chip_count: Some(2),
            ..Default::default()
        };
        assert_eq!(
            probe(&mut flash, &catalog, &opts).err(),
            Some(Error::ChipMismatch {
                chip: 1,
                expected: 0xBFB5,
                found: 0x0120
            })
        );
        assert!(flash.erases.is_empty());
        assert_eq!(flash.programmed, 0);
    }

    #[test]
    fn test_image_size_rules() {
        // 4 x 128 KiB = 512 KiB
        let mut flash = MockFlash::ganged(&[0x0120; 4], 128 * 1024);
        let catalog = ChipCatalog::builtin();
        let mut opts = ProbeOptions {
            chip_count: Some(4),
            ..Default::default()
        };

        let session = probe(&mut flash, &catalog, &opts).unwrap();
        let blocks_32k = PARTIAL_IMAGE_UNIT / BLOCK_SIZE as u32;
        assert!(session.check_image_size(4096).is_ok());
        assert!(session.check_image_size(4097).is_err());
        assert!(session.check_image_size(blocks_32k * 3).is_err());
        drop(session);

        opts.allow_partial = true;
        let session = probe(&mut flash, &catalog, &opts).unwrap();
        assert!(session.check_image_size(blocks_32k * 3).is_ok());
        assert_eq!(
            session.check_image_size(blocks_32k * 3 + 1),
            Err(Error::SizeMismatch {
                image_bytes: (blocks_32k * 3 + 1) * 128,
                device_bytes: 512 * 1024
            })
        );
        assert!(session.check_image_size(0).is_err());
        assert!(session.check_image_size(4097).is_err());
    }
}
