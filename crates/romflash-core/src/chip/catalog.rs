//! Built-in chip catalog and lookup

use alloc::vec::Vec;

use super::types::{ChipDescriptor, EraseStrategy};
use crate::error::Result;

use EraseStrategy::{EraseWholeChip, Normal, ProgramWholeSector};

/// Flash parts known to work with this programmer, in lookup order
pub static BUILTIN_CHIPS: &[ChipDescriptor] = &[
    ChipDescriptor::new(0x0120, "29F010", 16384, 8, Normal),
    ChipDescriptor::new(0x01A4, "29F040", 65536, 8, Normal),
    // AT49F parts have several unequal sectors; only whole-chip erase is used
    ChipDescriptor::new(0x1F04, "AT49F001NT", 131072, 1, EraseWholeChip),
    ChipDescriptor::new(0x1F05, "AT49F001N", 131072, 1, EraseWholeChip),
    ChipDescriptor::new(0x1F07, "AT49F002N", 262144, 1, EraseWholeChip),
    ChipDescriptor::new(0x1F08, "AT49F002NT", 262144, 1, EraseWholeChip),
    ChipDescriptor::new(0x1F13, "AT49F040", 524288, 1, EraseWholeChip),
    ChipDescriptor::new(0x1F5D, "AT29C512", 128, 512, ProgramWholeSector),
    ChipDescriptor::new(0x1FA4, "AT29C040", 256, 2048, ProgramWholeSector),
    ChipDescriptor::new(0x1FD5, "AT29C010", 128, 1024, ProgramWholeSector),
    ChipDescriptor::new(0x1FDA, "AT29C020", 256, 1024, ProgramWholeSector),
    ChipDescriptor::new(0x2020, "M29F010", 16384, 8, Normal),
    ChipDescriptor::new(0x20E2, "M29F040", 65536, 8, Normal),
    ChipDescriptor::new(0xBFB5, "39F010", 4096, 32, Normal),
    ChipDescriptor::new(0xBFB6, "39F020", 4096, 64, Normal),
    ChipDescriptor::new(0xBFB7, "39F040", 4096, 128, Normal),
    ChipDescriptor::new(0xC2A4, "MX29F040", 65536, 8, Normal),
];

/// Chip catalog
///
/// Starts out as the built-in table; extra definitions are appended after
/// it, so a built-in entry always wins over a user-supplied one with the
/// same ID.
#[derive(Debug, Clone)]
pub struct ChipCatalog {
    chips: Vec<ChipDescriptor>,
}

impl Default for ChipCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChipCatalog {
    /// Catalog holding only the built-in parts
    pub fn builtin() -> Self {
        Self {
            chips: BUILTIN_CHIPS.to_vec(),
        }
    }

    /// Catalog with no entries at all
    pub fn empty() -> Self {
        Self { chips: Vec::new() }
    }

    /// Append a descriptor after validating it
    pub fn push(&mut self, chip: ChipDescriptor) -> Result<()> {
        chip.validate()?;
        self.chips.push(chip);
        Ok(())
    }

    /// Find a chip by its 16-bit manufacturer/device ID
    ///
    /// `0x0000` is what an empty socket or a bus that ignored the identify
    /// command returns, so it never matches.
    pub fn lookup(&self, device_id: u16) -> Option<ChipDescriptor> {
        if device_id == 0x0000 {
            return None;
        }
        self.chips
            .iter()
            .find(|c| c.device_id == device_id)
            .cloned()
    }

    /// Get all chips in the catalog
    pub fn chips(&self) -> &[ChipDescriptor] {
        &self.chips
    }

    /// Number of chips in the catalog
    pub fn len(&self) -> usize {
        self.chips.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Iterate over all chips
    pub fn iter(&self) -> impl Iterator<Item = &ChipDescriptor> {
        self.chips.iter()
    }
}
