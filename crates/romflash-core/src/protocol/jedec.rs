//! JEDEC parallel flash command sequences
//!
//! 29F0x0, 39F0x0 and the Atmel AT29C/AT49F parts all use the same
//! software command interface: two unlock cycles at 0x5555/0x2AAA followed
//! by a command byte. Every address here is relative to `base`, the linear
//! address of the chip being talked to, so ganged chips are driven one at a
//! time through the same [`AccessStrategy`].
//!
//! Completion of program and erase operations is detected with the DQ6
//! toggle bit: while the chip is busy consecutive reads return different
//! values.

use crate::access::AccessStrategy;
use crate::error::{Error, Result};

/// Command addresses and bytes
pub mod commands {
    /// First unlock cycle address
    pub const UNLOCK_ADDR1: u32 = 0x5555;
    /// Second unlock cycle address
    pub const UNLOCK_ADDR2: u32 = 0x2AAA;
    /// First unlock cycle data
    pub const UNLOCK_DATA1: u8 = 0xAA;
    /// Second unlock cycle data
    pub const UNLOCK_DATA2: u8 = 0x55;

    /// Enter software identification (autoselect) mode
    pub const IDENTIFY: u8 = 0x90;
    /// Return to read mode
    pub const RESET: u8 = 0xF0;
    /// Program (byte program, or sector load on AT29C parts)
    pub const PROGRAM: u8 = 0xA0;
    /// Erase setup, followed by a second unlock and the erase command
    pub const ERASE_SETUP: u8 = 0x80;
    /// Chip erase, issued at [`UNLOCK_ADDR1`]
    pub const CHIP_ERASE: u8 = 0x10;
    /// Sector erase, issued at the sector address
    pub const SECTOR_ERASE: u8 = 0x30;

    /// Offset of the manufacturer ID in identification mode
    pub const MANUFACTURER_ID_ADDR: u32 = 0x0000;
    /// Offset of the device ID in identification mode
    pub const DEVICE_ID_ADDR: u32 = 0x0001;
}

use commands::*;

/// Settle time around identification mode changes (AT29C parts need it)
pub const IDENTIFY_DELAY_US: u32 = 10_000;

/// Default toggle poll bound
pub const DEFAULT_MAX_POLLS: u32 = 1_000_000;

/// How long to keep polling for completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollLimit {
    /// Give up with [`Error::HardwareTimeout`] after this many poll rounds
    Bounded(u32),
    /// Poll until the chip settles, however long that takes
    Unbounded,
}

impl Default for PollLimit {
    fn default() -> Self {
        PollLimit::Bounded(DEFAULT_MAX_POLLS)
    }
}

fn write_cmd<A: AccessStrategy + ?Sized>(access: &mut A, base: u32, offset: u32, value: u8) -> Result<()> {
    access.write_byte(base + offset, value)
}

/// Issue the two unlock cycles followed by `command` at 0x5555
pub fn command<A: AccessStrategy + ?Sized>(access: &mut A, base: u32, command: u8) -> Result<()> {
    write_cmd(access, base, UNLOCK_ADDR1, UNLOCK_DATA1)?;
    write_cmd(access, base, UNLOCK_ADDR2, UNLOCK_DATA2)?;
    write_cmd(access, base, UNLOCK_ADDR1, command)
}

/// Read the 16-bit manufacturer/device ID of the chip at `base`
///
/// The manufacturer ID ends up in the high byte.
pub fn read_id<A: AccessStrategy + ?Sized>(access: &mut A, base: u32) -> Result<u16> {
    command(access, base, IDENTIFY)?;
    access.delay_us(IDENTIFY_DELAY_US);

    let manufacturer = access.read_byte(base + MANUFACTURER_ID_ADDR)?;
    let device = access.read_byte(base + DEVICE_ID_ADDR)?;

    write_cmd(access, base, UNLOCK_ADDR1, RESET)?;
    access.delay_us(IDENTIFY_DELAY_US);

    Ok(((manufacturer as u16) << 8) | device as u16)
}

/// Wait for the toggle bit at `addr` to stop toggling
///
/// Two consecutive reads that agree are confirmed by a second pair before
/// the operation is considered complete.
pub fn wait_toggle<A: AccessStrategy + ?Sized>(access: &mut A, addr: u32, limit: PollLimit) -> Result<()> {
    let mut polls = 0u32;
    loop {
        let mut a = access.read_byte(addr)?;
        let mut b = access.read_byte(addr)?;
        if a == b {
            a = access.read_byte(addr)?;
            b = access.read_byte(addr)?;
        }
        if a == b {
            return Ok(());
        }

        polls += 1;
        if let PollLimit::Bounded(max) = limit {
            if polls >= max {
                log::error!("flash at 0x{:06X} still busy after {} polls", addr, polls);
                return Err(Error::HardwareTimeout { addr });
            }
        }
    }
}

/// Program one byte at `addr`
pub fn program_byte<A: AccessStrategy + ?Sized>(
    access: &mut A,
    base: u32,
    addr: u32,
    value: u8,
    limit: PollLimit,
) -> Result<()> {
    command(access, base, PROGRAM)?;
    access.write_byte(addr, value)?;
    wait_toggle(access, addr, limit)
}

/// Program `data` at `addr` one byte at a time
///
/// Bytes equal to 0xFF are skipped; the range must already be erased.
pub fn program_range<A: AccessStrategy + ?Sized>(
    access: &mut A,
    base: u32,
    addr: u32,
    data: &[u8],
    limit: PollLimit,
) -> Result<()> {
    for (i, &value) in data.iter().enumerate() {
        if value != 0xFF {
            program_byte(access, base, addr + i as u32, value, limit)?;
        }
    }
    Ok(())
}

/// Erase the sector starting at `addr`
pub fn sector_erase<A: AccessStrategy + ?Sized>(
    access: &mut A,
    base: u32,
    addr: u32,
    limit: PollLimit,
) -> Result<()> {
    command(access, base, ERASE_SETUP)?;
    write_cmd(access, base, UNLOCK_ADDR1, UNLOCK_DATA1)?;
    write_cmd(access, base, UNLOCK_ADDR2, UNLOCK_DATA2)?;
    access.write_byte(addr, SECTOR_ERASE)?;
    wait_toggle(access, addr, limit)
}

/// Erase the whole chip at `base`
pub fn chip_erase<A: AccessStrategy + ?Sized>(access: &mut A, base: u32, limit: PollLimit) -> Result<()> {
    command(access, base, ERASE_SETUP)?;
    command(access, base, CHIP_ERASE)?;
    wait_toggle(access, base, limit)
}

/// Combined erase and program of one sector (AT29C parts)
///
/// The chip latches the bytes written after the program command and then
/// erases and programs the whole sector in one cycle. Bytes of the sector
/// that aren't loaded read back as 0xFF.
pub fn sector_program<A: AccessStrategy + ?Sized>(
    access: &mut A,
    base: u32,
    addr: u32,
    data: &[u8],
    limit: PollLimit,
) -> Result<()> {
    command(access, base, PROGRAM)?;
    access.write_block(addr, data)?;
    wait_toggle(access, addr, limit)
}
