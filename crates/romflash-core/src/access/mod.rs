//! Flash access strategies
//!
//! A Z80 board can't simply dereference a 20-bit flash address. Depending on
//! the platform the flash is reached by asking the BIOS to page a ROM bank
//! into a 32 KiB window, by programming the Z180 DMA controller with
//! physical addresses, or (on the Linux-hosted board) by mapping it from
//! `/dev/mem`. The [`AccessStrategy`] trait hides those differences so the
//! identification and programming code in [`crate::flash`] runs unchanged on
//! all of them.
//!
//! Every address passed to a strategy is a *linear flash offset*: byte 0 is
//! the first byte of the first chip, and ganged chips follow each other.
//! Translation to banks, windows or physical addresses happens inside the
//! strategy and nowhere else.

mod banked;
mod dma;
mod mapped;
mod translate;

pub use banked::{BankBios, BankLayout, BankSwitched};
pub use dma::{ScratchWindow, Z180Bus, Z180Dma};
pub use mapped::{MemoryMapped, MemoryWindow};
pub use translate::{BankLocation, DmaMapped, MmuRegion, MmuRegisters, WindowedBank};

use crate::error::Result;

/// Size of the banked window on RomWBW, UNA and P112 systems
pub const BANK_WINDOW_SIZE: u32 = 32 * 1024;

/// Byte and block access to the flash address space
///
/// Exactly one strategy is active for a programming session. The chip
/// command protocol (unlock sequences, toggle polling) is built on
/// [`read_byte`](Self::read_byte) and [`write_byte`](Self::write_byte), so
/// implementations must perform every access individually and in order;
/// caching or coalescing would break the command state machine in the chip.
pub trait AccessStrategy {
    /// Short human readable description (e.g. "RomWBW bank switching")
    fn name(&self) -> &'static str;

    /// Read one byte at a linear flash address
    fn read_byte(&mut self, addr: u32) -> Result<u8>;

    /// Write one byte at a linear flash address
    ///
    /// This is a raw bus write. Whether it programs anything depends on the
    /// command sequence that preceded it.
    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()>;

    /// Read `buf.len()` bytes starting at `addr`
    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` starting at `addr` as consecutive raw bus writes
    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()>;

    /// Compare flash contents at `addr` against `expected`
    ///
    /// Returns `Ok(false)` on the first difference.
    fn verify_block(&mut self, addr: u32, expected: &[u8]) -> Result<bool>;

    /// Busy-wait for the given number of microseconds
    fn delay_us(&mut self, us: u32);

    /// Highest linear address (exclusive) this strategy can reach, if the
    /// platform exposes less than the whole flash
    fn address_limit(&self) -> Option<u32> {
        None
    }

    /// Total installed ROM size reported by the platform, if it can tell
    ///
    /// Used to detect several identical chips ganged in the address space.
    fn installed_rom_size(&mut self) -> Option<u32> {
        None
    }
}
