//! Write command implementation

use super::{open_image, open_session, IndicatifProgress};
use crate::error::CommandError;
use romflash_core::chip::ChipCatalog;
use romflash_core::flash::ProbeOptions;
use romflash_core::storage::BlockStore;
use romflash_flash::PlatformHandle;
use std::path::Path;

/// Run the write command
///
/// Only sectors that differ from the image are reprogrammed. If anything
/// was reprogrammed a verify pass follows.
pub fn run_write(
    handle: &mut PlatformHandle,
    catalog: &ChipCatalog,
    opts: &ProbeOptions,
    input: &Path,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = open_session(handle, catalog, opts)?;
    if session.is_assumed() {
        return Err(romflash_core::Error::WriteNotAllowed.into());
    }
    let mut store = open_image(&session, input)?;
    let mut progress = IndicatifProgress::new(verbose);

    let outcome = session.write_and_verify(&mut store, &mut progress)?;
    store.close()?;

    println!(
        "Write complete: Reprogrammed {}/{} sectors.",
        outcome.write.mismatched, outcome.write.processed
    );
    match outcome.verify {
        None => println!("Flash already contains the image - no changes needed"),
        Some(verify) => {
            println!(
                "Verify complete: {} sectors contain errors.",
                verify.mismatched
            );
            if !verify.is_clean() {
                return Err(CommandError::VerifyFailed {
                    sectors: verify.mismatched,
                }
                .into());
            }
        }
    }
    Ok(())
}
