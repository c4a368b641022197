//! Errors reported by the command implementations

use std::path::PathBuf;
use thiserror::Error;

/// Command-level failures
#[derive(Debug, Error)]
pub enum CommandError {
    /// The image file could not be opened
    #[error("cannot open file \"{}\": {source}", .path.display())]
    OpenImage {
        path: PathBuf,
        #[source]
        source: romflash_core::Error,
    },

    /// The output file could not be written
    #[error("cannot write file \"{}\": {source}", .path.display())]
    WriteImage {
        path: PathBuf,
        #[source]
        source: romflash_core::Error,
    },

    /// Sectors still differ from the image
    #[error("*** VERIFY FAILED ***: {sectors} sector(s) contain errors")]
    VerifyFailed { sectors: u32 },
}
