//! Read command implementation

use super::{open_session, IndicatifProgress};
use crate::error::CommandError;
use crate::storage::FileBlockStore;
use romflash_core::chip::ChipCatalog;
use romflash_core::flash::ProbeOptions;
use romflash_flash::PlatformHandle;
use std::path::Path;

/// Run the read command
pub fn run_read(
    handle: &mut PlatformHandle,
    catalog: &ChipCatalog,
    opts: &ProbeOptions,
    output: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(handle, catalog, opts)?;
    let mut store = FileBlockStore::new(output);
    let mut progress = IndicatifProgress::new(verbose);

    let bytes = match session.read_to(&mut store, &mut progress) {
        Ok(bytes) => bytes,
        Err(source @ romflash_core::Error::Storage(_)) => {
            return Err(CommandError::WriteImage {
                path: output.to_path_buf(),
                source,
            }
            .into())
        }
        Err(e) => return Err(e.into()),
    };

    println!("Read complete: {} KiB written to {}", bytes / 1024, output.display());
    Ok(())
}
