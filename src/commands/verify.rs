//! Verify command implementation

use super::{open_image, open_session, IndicatifProgress};
use crate::error::CommandError;
use romflash_core::chip::ChipCatalog;
use romflash_core::flash::ProbeOptions;
use romflash_core::storage::BlockStore;
use romflash_flash::PlatformHandle;
use std::path::Path;

/// Run the verify command
pub fn run_verify(
    handle: &mut PlatformHandle,
    catalog: &ChipCatalog,
    opts: &ProbeOptions,
    input: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(handle, catalog, opts)?;
    let mut store = open_image(&session, input)?;
    let mut progress = IndicatifProgress::new(verbose);

    let report = session.verify_and_write(&mut store, false, &mut progress)?;
    store.close()?;

    println!(
        "Verify complete: {} sectors contain errors.",
        report.mismatched
    );
    if !report.is_clean() {
        return Err(CommandError::VerifyFailed {
            sectors: report.mismatched,
        }
        .into());
    }
    Ok(())
}
