//! Extra chip definitions loaded at runtime
//!
//! Parts missing from the built-in table can be described in RON files and
//! appended to a [`ChipCatalog`].

use alloc::borrow::Cow;
use alloc::string::String;
use alloc::vec::Vec;
use std::fs;
use std::io;
use std::path::Path;

use super::catalog::ChipCatalog;
use super::types::{ChipDescriptor, EraseStrategy};

/// Error type for chip definition loading
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// I/O error reading files
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// RON parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Size specification with human-readable units (for RON parsing)
#[derive(Debug, Clone, Copy, serde::Deserialize)]
pub enum Size {
    /// Size in bytes
    B(u32),
    /// Size in kibibytes (1024 bytes)
    KiB(u32),
}

impl Size {
    /// Convert to bytes
    pub fn to_bytes(self) -> u32 {
        match self {
            Size::B(n) => n,
            Size::KiB(n) => n * 1024,
        }
    }
}

/// Single chip definition in RON format
#[derive(Debug, Clone, serde::Deserialize)]
struct ChipDef {
    name: String,
    device_id: u16,
    sector_size: Size,
    sector_count: u32,
    #[serde(default)]
    strategy: EraseStrategy,
}

/// File-level wrapper
#[derive(Debug, Clone, serde::Deserialize)]
struct ChipFileDef {
    chips: Vec<ChipDef>,
}

impl ChipCatalog {
    /// Load chip definitions from a single RON file
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CatalogError> {
        let content = fs::read_to_string(path)?;
        self.load_ron(&content)
    }

    /// Load chip definitions from a RON string
    pub fn load_ron(&mut self, content: &str) -> Result<usize, CatalogError> {
        let file: ChipFileDef = ron::from_str(content)?;
        let count = file.chips.len();

        for def in file.chips {
            let chip = ChipDescriptor {
                device_id: def.device_id,
                name: Cow::Owned(def.name),
                sector_size: def.sector_size.to_bytes(),
                sector_count: def.sector_count,
                strategy: def.strategy,
            };
            if chip.device_id == 0x0000 {
                return Err(CatalogError::Validation(alloc::format!(
                    "{}: device ID 0x0000 is reserved",
                    chip.name
                )));
            }
            self.push(chip.clone()).map_err(|e| {
                CatalogError::Validation(alloc::format!("{}: {}", chip.name, e))
            })?;
        }

        Ok(count)
    }

    /// Load all RON files from a directory
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize, CatalogError> {
        let mut total = 0;

        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.extension().is_some_and(|ext| ext == "ron") {
                total += self.load_file(&path)?;
            }
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_ron() {
        let ron = r#"
        (
            chips: [
                (
                    name: "W29C040",
                    device_id: 0xDA46,
                    sector_size: B(256),
                    sector_count: 2048,
                    strategy: ProgramWholeSector,
                ),
                (
                    name: "SST39SF010A",
                    device_id: 0xBFB4,
                    sector_size: KiB(4),
                    sector_count: 32,
                ),
            ],
        )
        "#;

        let mut catalog = ChipCatalog::builtin();
        let before = catalog.len();
        let count = catalog.load_ron(ron).unwrap();

        assert_eq!(count, 2);
        assert_eq!(catalog.len(), before + 2);

        let chip = catalog.lookup(0xDA46).unwrap();
        assert_eq!(chip.name, "W29C040");
        assert_eq!(chip.strategy, EraseStrategy::ProgramWholeSector);
        assert_eq!(chip.chip_size(), 512 * 1024);

        let chip = catalog.lookup(0xBFB4).unwrap();
        assert_eq!(chip.strategy, EraseStrategy::Normal);
        assert_eq!(chip.sector_size, 4096);
    }

    #[test]
    fn test_load_ron_rejects_bad_geometry() {
        let ron = r#"
        (
            chips: [
                (
                    name: "broken",
                    device_id: 0x1234,
                    sector_size: KiB(64),
                    sector_count: 8,
                    strategy: EraseWholeChip,
                ),
            ],
        )
        "#;

        let mut catalog = ChipCatalog::empty();
        assert!(matches!(
            catalog.load_ron(ron),
            Err(CatalogError::Validation(_))
        ));
    }

    #[test]
    fn test_size_conversion() {
        assert_eq!(Size::B(128).to_bytes(), 128);
        assert_eq!(Size::KiB(4).to_bytes(), 4096);
        assert_eq!(Size::KiB(64).to_bytes(), 65536);
    }
}
