//! List commands implementation

use romflash_core::chip::{manufacturer, ChipCatalog, EraseStrategy};
use romflash_flash::available_platforms;

/// List all available platforms
pub fn list_platforms() {
    println!("Supported platforms:");
    println!();
    for platform in available_platforms() {
        println!("  {:<9} - {}", platform.name, platform.description);
    }
}

/// List all known chips
pub fn list_chips(catalog: &ChipCatalog, vendor_filter: Option<&str>) {
    println!("Supported flash chips:");
    println!();
    println!(
        "{:<10} {:<12} {:>8} {:>14} {:>8}  {}",
        "Vendor", "Name", "Size", "Sectors", "ID", "Programming"
    );
    println!("{}", "-".repeat(72));

    for chip in catalog.iter() {
        let vendor = manufacturer::name(chip.manufacturer());
        if let Some(filter) = vendor_filter {
            if !vendor.to_lowercase().contains(&filter.to_lowercase()) {
                continue;
            }
        }

        let sectors = format!("{} x {}", chip.sector_count, format_size(chip.sector_size));
        let method = match chip.strategy {
            EraseStrategy::Normal => "sector erase",
            EraseStrategy::ProgramWholeSector => "sector program",
            EraseStrategy::EraseWholeChip => "chip erase",
        };
        println!(
            "{:<10} {:<12} {:>8} {:>14} {:>8}  {}",
            vendor,
            chip.name,
            format_size(chip.chip_size()),
            sectors,
            format!("{:04X}", chip.device_id),
            method
        );
    }
}

fn format_size(bytes: u32) -> String {
    if bytes >= 1024 * 1024 {
        format!("{} MiB", bytes / (1024 * 1024))
    } else if bytes >= 1024 {
        format!("{} KiB", bytes / 1024)
    } else {
        format!("{} B", bytes)
    }
}
