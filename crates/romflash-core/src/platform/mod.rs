//! Platform identification
//!
//! Before the flash can be touched the tool has to work out which BIOS (if
//! any) is running, because that decides how the ROM is reached. The
//! checks peek at fixed addresses in the CPU address space through the
//! [`PlatformProbe`] trait, which keeps them testable off-target.

mod detect;

pub use detect::{detect, select, signatures};

use core::fmt;

/// Raw peeks into the running system's memory
pub trait PlatformProbe {
    /// Little-endian 16-bit word at `addr`
    fn read_u16(&mut self, addr: u16) -> u16;

    /// Fill `buf` with the bytes starting at `addr`
    fn read_bytes(&mut self, addr: u16, buf: &mut [u8]);

    /// Whether the CPU is a Z180 (or Z8S180)
    fn cpu_is_z180(&mut self) -> bool;
}

/// How the flash will be accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// UNA BIOS bank switching
    UnaBios,
    /// P112 B/P BIOS bank switching (first 32 KiB only)
    P112,
    /// RomWBW 2.6 or later bank switching
    RomwbwModern,
    /// RomWBW before 2.6 bank switching
    RomwbwLegacy,
    /// Z180 DMA controller
    Z180Dma,
    /// Flat memory mapping (Linux `/dev/mem`)
    MemoryMapped,
}

impl AccessKind {
    /// Every kind, in detection order
    pub const ALL: [AccessKind; 6] = [
        AccessKind::UnaBios,
        AccessKind::P112,
        AccessKind::RomwbwModern,
        AccessKind::RomwbwLegacy,
        AccessKind::Z180Dma,
        AccessKind::MemoryMapped,
    ];

    /// Short name used on the command line
    pub fn name(self) -> &'static str {
        match self {
            AccessKind::UnaBios => "una",
            AccessKind::P112 => "p112",
            AccessKind::RomwbwModern => "romwbw",
            AccessKind::RomwbwLegacy => "romwbw-legacy",
            AccessKind::Z180Dma => "z180dma",
            AccessKind::MemoryMapped => "mapped",
        }
    }

    /// Parse a command line name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let desc = match self {
            AccessKind::UnaBios => "UNA BIOS",
            AccessKind::P112 => "P112 B/P BIOS",
            AccessKind::RomwbwModern => "RomWBW",
            AccessKind::RomwbwLegacy => "RomWBW (pre 2.6)",
            AccessKind::Z180Dma => "Z180 DMA",
            AccessKind::MemoryMapped => "memory mapped",
        };
        f.write_str(desc)
    }
}
