//! Flash chip type definitions

use alloc::borrow::Cow;

use crate::error::{Error, Result};

/// Size of the assumed "ROM" part used when the chip can't be identified
pub const ASSUMED_ROM_SIZE: u32 = 512 * 1024;

/// How a chip is erased and programmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
pub enum EraseStrategy {
    /// Erase a sector, then program it byte by byte (JEDEC style)
    #[default]
    Normal,
    /// Combined erase/program cycle covering a whole sector (Atmel AT29C)
    ProgramWholeSector,
    /// Only a whole-chip erase is available (AT49F parts with unequal sectors)
    EraseWholeChip,
}

/// Flash chip descriptor
///
/// Immutable description of a flash part: its manufacturer/device ID, its
/// erase geometry and the strategy needed to program it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipDescriptor {
    /// Manufacturer ID in the high byte, device ID in the low byte
    pub device_id: u16,
    /// Chip model name (e.g., "39F040")
    pub name: Cow<'static, str>,
    /// Size of one erase sector in bytes
    pub sector_size: u32,
    /// Number of sectors
    pub sector_count: u32,
    /// Erase/program strategy
    pub strategy: EraseStrategy,
}

impl ChipDescriptor {
    /// Create a descriptor for the static catalog
    pub const fn new(
        device_id: u16,
        name: &'static str,
        sector_size: u32,
        sector_count: u32,
        strategy: EraseStrategy,
    ) -> Self {
        Self {
            device_id,
            name: Cow::Borrowed(name),
            sector_size,
            sector_count,
            strategy,
        }
    }

    /// Geometry assumed for a chip that could not be identified
    ///
    /// Only good enough for reading and verifying; the engine refuses to
    /// write with it.
    pub const fn assumed_rom() -> Self {
        Self::new(0x0000, "ROM", 4096, ASSUMED_ROM_SIZE / 4096, EraseStrategy::Normal)
    }

    /// Whether this descriptor is the assumed "ROM" geometry
    pub fn is_assumed(&self) -> bool {
        self.device_id == 0x0000
    }

    /// Manufacturer ID (high byte of the device ID)
    pub fn manufacturer(&self) -> u8 {
        (self.device_id >> 8) as u8
    }

    /// Total chip size in bytes
    pub fn chip_size(&self) -> u32 {
        self.sector_size * self.sector_count
    }

    /// Linear address of a sector within one chip
    pub fn sector_address(&self, sector: u32) -> u32 {
        self.sector_size * sector
    }

    /// Check the descriptor against the invariants the engine relies on
    pub fn validate(&self) -> Result<()> {
        if self.sector_size == 0 || self.sector_count == 0 {
            return Err(Error::UnsupportedGeometry("empty sector geometry"));
        }
        if self.strategy == EraseStrategy::EraseWholeChip && self.sector_count != 1 {
            return Err(Error::UnsupportedGeometry(
                "whole-chip erase requires exactly one sector",
            ));
        }
        if self.sector_size.checked_mul(self.sector_count).is_none() {
            return Err(Error::UnsupportedGeometry("chip size overflows"));
        }
        Ok(())
    }
}

/// JEDEC manufacturer IDs of the supported parts
pub mod manufacturer {
    /// AMD
    pub const AMD: u8 = 0x01;
    /// Atmel
    pub const ATMEL: u8 = 0x1F;
    /// ST (now Micron)
    pub const ST: u8 = 0x20;
    /// SST
    pub const SST: u8 = 0xBF;
    /// Macronix
    pub const MACRONIX: u8 = 0xC2;

    /// Vendor name for a manufacturer ID
    pub fn name(id: u8) -> &'static str {
        match id {
            AMD => "AMD",
            ATMEL => "Atmel",
            ST => "ST",
            SST => "SST",
            MACRONIX => "Macronix",
            _ => "Unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sector_addresses_increase() {
        let chip = ChipDescriptor::new(0xBFB7, "39F040", 4096, 128, EraseStrategy::Normal);
        let mut last = None;
        for s in 0..chip.sector_count {
            let addr = chip.sector_address(s);
            assert_eq!(addr, s * 4096);
            if let Some(prev) = last {
                assert!(addr > prev);
            }
            last = Some(addr);
        }
        assert_eq!(chip.chip_size(), 512 * 1024);
    }

    #[test]
    fn test_manufacturer_names() {
        let chip = ChipDescriptor::new(0x1FD5, "AT29C010", 128, 1024, EraseStrategy::ProgramWholeSector);
        assert_eq!(manufacturer::name(chip.manufacturer()), "Atmel");
        assert_eq!(manufacturer::name(0x00), "Unknown");
    }

    #[test]
    fn test_validate_whole_chip_erase() {
        let good = ChipDescriptor::new(0x1F13, "AT49F040", 524288, 1, EraseStrategy::EraseWholeChip);
        assert!(good.validate().is_ok());

        let bad = ChipDescriptor::new(0x1F13, "bogus", 4096, 2, EraseStrategy::EraseWholeChip);
        assert!(matches!(bad.validate(), Err(Error::UnsupportedGeometry(_))));
    }

    #[test]
    fn test_assumed_rom() {
        let rom = ChipDescriptor::assumed_rom();
        assert!(rom.is_assumed());
        assert_eq!(rom.chip_size(), ASSUMED_ROM_SIZE);
    }
}
