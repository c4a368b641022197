//! CLI command implementations
//!
//! Each command opens a programming session on a [`PlatformHandle`] and
//! drives one of the engine operations, reporting through
//! [`IndicatifProgress`].

mod list;
mod progress;
mod read;
mod verify;
mod write;

pub use list::{list_chips, list_platforms};
pub use progress::IndicatifProgress;
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;

use crate::error::CommandError;
use crate::storage::FileBlockStore;
use romflash_core::chip::ChipCatalog;
use romflash_core::flash::{ProbeOptions, ProgrammingSession};
use romflash_core::storage::BlockStore;
use romflash_flash::PlatformHandle;
use std::path::Path;

/// Probe the flash and print what was found
fn open_session<'a>(
    handle: &'a mut PlatformHandle,
    catalog: &ChipCatalog,
    opts: &ProbeOptions,
) -> Result<ProgrammingSession<'a>, Box<dyn std::error::Error>> {
    println!("Using {} ({}).", handle.name(), handle.kind());
    let session = handle.probe(catalog, opts)?;
    println!(
        "Flash: {}{} x {}, {} sectors of {} bytes, total {} KiB",
        session.chip().name,
        if session.is_assumed() { " (assumed)" } else { "" },
        session.chip_count(),
        session.chip().sector_count * session.chip_count(),
        session.chip().sector_size,
        session.total_size() / 1024
    );
    if session.reachable_size() < session.total_size() {
        println!(
            "Note: only the first {} KiB can be reached on this platform.",
            session.reachable_size() / 1024
        );
    }
    Ok(session)
}

/// Open the image file and check its size against the flash
fn open_image(
    session: &ProgrammingSession<'_>,
    path: &Path,
) -> Result<FileBlockStore, Box<dyn std::error::Error>> {
    let mut store = FileBlockStore::new(path);
    store.open().map_err(|source| CommandError::OpenImage {
        path: path.to_path_buf(),
        source,
    })?;
    let blocks = store.size_in_blocks()?;
    session.check_image_size(blocks)?;
    Ok(store)
}
