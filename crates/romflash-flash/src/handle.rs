//! PlatformHandle - an opened access strategy
//!
//! Bundles the strategy with the access method that was detected (or
//! forced) so the CLI can report it and then probe the flash.

use romflash_core::access::AccessStrategy;
use romflash_core::chip::ChipCatalog;
use romflash_core::flash::{self, ProbeOptions, ProgrammingSession};
use romflash_core::platform::AccessKind;

/// An opened platform, ready to probe
pub struct PlatformHandle {
    kind: AccessKind,
    strategy: Box<dyn AccessStrategy>,
}

impl PlatformHandle {
    pub(crate) fn new(kind: AccessKind, strategy: Box<dyn AccessStrategy>) -> Self {
        Self { kind, strategy }
    }

    /// Access method in use
    pub fn kind(&self) -> AccessKind {
        self.kind
    }

    /// Name of the access strategy
    pub fn name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Direct access to the strategy
    pub fn strategy(&mut self) -> &mut dyn AccessStrategy {
        &mut *self.strategy
    }

    /// Identify the flash and open a programming session on it
    pub fn probe(
        &mut self,
        catalog: &ChipCatalog,
        opts: &ProbeOptions,
    ) -> romflash_core::Result<ProgrammingSession<'_>> {
        flash::probe(&mut *self.strategy, catalog, opts)
    }
}
