//! Bank-switched access through a BIOS window
//!
//! RomWBW, UNA and the P112 BIOS all expose the ROM by selecting a bank into
//! the low 32 KiB of the CPU address space. The strategy here walks a linear
//! address range bank by bank and always puts the BIOS default bank back
//! when an operation ends, even if it fails part way through.

use super::translate::WindowedBank;
use super::{AccessStrategy, BANK_WINDOW_SIZE};
use crate::error::{Error, Result};
use crate::platform::AccessKind;

/// BIOS services needed for banked flash access
///
/// Bank numbers are ROM bank indexes: bank `n` exposes linear flash
/// addresses `n * window .. (n + 1) * window`.
pub trait BankBios {
    /// Bank currently paged into the window
    fn current_bank(&mut self) -> u16;

    /// Page a bank into the window
    fn select_bank(&mut self, bank: u16);

    /// Number of ROM banks the BIOS knows about, or 0 if it can't say
    fn rom_bank_count(&mut self) -> u16 {
        0
    }

    /// Read one byte at an offset inside the window
    fn window_read(&mut self, offset: u16) -> u8;

    /// Write one byte at an offset inside the window
    fn window_write(&mut self, offset: u16, value: u8);

    /// Busy-wait
    fn delay_us(&mut self, us: u32);
}

/// Static properties of a BIOS's bank switching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankLayout {
    /// Strategy name shown to the user
    pub name: &'static str,
    /// Window size in bytes
    pub window_size: u32,
    /// Linear addresses at or above this can't be reached
    pub address_limit: Option<u32>,
    /// Whether [`BankBios::rom_bank_count`] is meaningful
    pub reports_bank_count: bool,
}

impl BankLayout {
    /// RomWBW HBIOS
    pub const fn romwbw() -> Self {
        Self {
            name: "RomWBW bank switching",
            window_size: BANK_WINDOW_SIZE,
            address_limit: None,
            reports_bank_count: true,
        }
    }

    /// RomWBW before the HBIOS ident block moved to the top of memory
    pub const fn romwbw_legacy() -> Self {
        Self {
            name: "RomWBW (legacy) bank switching",
            window_size: BANK_WINDOW_SIZE,
            address_limit: None,
            reports_bank_count: false,
        }
    }

    /// UNA BIOS
    pub const fn una() -> Self {
        Self {
            name: "UNA BIOS bank switching",
            window_size: BANK_WINDOW_SIZE,
            address_limit: None,
            reports_bank_count: false,
        }
    }

    /// P112 B/P BIOS, which only ever exposes its first 32 KiB of ROM
    pub const fn p112() -> Self {
        Self {
            name: "P112 B/P BIOS",
            window_size: BANK_WINDOW_SIZE,
            address_limit: Some(BANK_WINDOW_SIZE),
            reports_bank_count: false,
        }
    }

    /// Layout for a banked access kind, `None` for the others
    pub fn for_kind(kind: AccessKind) -> Option<Self> {
        match kind {
            AccessKind::UnaBios => Some(Self::una()),
            AccessKind::P112 => Some(Self::p112()),
            AccessKind::RomwbwModern => Some(Self::romwbw()),
            AccessKind::RomwbwLegacy => Some(Self::romwbw_legacy()),
            AccessKind::Z180Dma | AccessKind::MemoryMapped => None,
        }
    }
}

/// Access strategy backed by a [`BankBios`]
pub struct BankSwitched<B: BankBios> {
    bios: B,
    layout: BankLayout,
    translator: WindowedBank,
    default_bank: u16,
}

impl<B: BankBios> BankSwitched<B> {
    /// Wrap a BIOS, remembering the bank that is selected right now as the
    /// one to restore after every operation
    pub fn new(mut bios: B, layout: BankLayout) -> Self {
        let default_bank = bios.current_bank();
        log::debug!(
            "{}: default bank {}, window {} bytes",
            layout.name,
            default_bank,
            layout.window_size
        );
        Self {
            bios,
            translator: WindowedBank::new(layout.window_size),
            layout,
            default_bank,
        }
    }

    /// Bank restored after each operation
    pub fn default_bank(&self) -> u16 {
        self.default_bank
    }

    /// Access the wrapped BIOS
    pub fn bios(&mut self) -> &mut B {
        &mut self.bios
    }

    /// Unwrap the BIOS
    pub fn into_inner(self) -> B {
        self.bios
    }

    fn check_range(&self, addr: u32, len: usize) -> Result<()> {
        let end = addr
            .checked_add(len as u32)
            .ok_or(Error::AddressOutOfBounds { addr })?;
        if let Some(limit) = self.layout.address_limit {
            if end > limit {
                return Err(Error::AddressOutOfBounds { addr });
            }
        }
        Ok(())
    }

    /// Run `f` once per window-sized run of `addr..addr+len`, with the right
    /// bank selected. `f` gets the window offset, the position within the
    /// range and the run length, and returns `false` to stop early.
    fn for_each_run<F>(&mut self, addr: u32, len: usize, mut f: F) -> Result<()>
    where
        F: FnMut(&mut B, u16, usize, usize) -> bool,
    {
        self.check_range(addr, len)?;

        let mut done = 0usize;
        let mut result = Ok(());
        while done < len {
            let cur = addr + done as u32;
            let Some(loc) = self.translator.locate(cur) else {
                result = Err(Error::AddressOutOfBounds { addr: cur });
                break;
            };
            let run = (len - done).min(loc.remaining as usize);
            self.bios.select_bank(loc.bank);
            if !f(&mut self.bios, loc.offset, done, run) {
                break;
            }
            done += run;
        }

        self.bios.select_bank(self.default_bank);
        result
    }
}

impl<B: BankBios> AccessStrategy for BankSwitched<B> {
    fn name(&self) -> &'static str {
        self.layout.name
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let mut value = 0xFF;
        self.for_each_run(addr, 1, |bios, offset, _, _| {
            value = bios.window_read(offset);
            true
        })?;
        Ok(value)
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.for_each_run(addr, 1, |bios, offset, _, _| {
            bios.window_write(offset, value);
            true
        })
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let len = buf.len();
        self.for_each_run(addr, len, |bios, offset, pos, run| {
            for (i, b) in buf[pos..pos + run].iter_mut().enumerate() {
                *b = bios.window_read(offset + i as u16);
            }
            true
        })
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.for_each_run(addr, data.len(), |bios, offset, pos, run| {
            for (i, &b) in data[pos..pos + run].iter().enumerate() {
                bios.window_write(offset + i as u16, b);
            }
            true
        })
    }

    fn verify_block(&mut self, addr: u32, expected: &[u8]) -> Result<bool> {
        let mut matches = true;
        self.for_each_run(addr, expected.len(), |bios, offset, pos, run| {
            matches = expected[pos..pos + run]
                .iter()
                .enumerate()
                .all(|(i, &b)| bios.window_read(offset + i as u16) == b);
            matches
        })?;
        Ok(matches)
    }

    fn delay_us(&mut self, us: u32) {
        self.bios.delay_us(us);
    }

    fn address_limit(&self) -> Option<u32> {
        self.layout.address_limit
    }

    fn installed_rom_size(&mut self) -> Option<u32> {
        if !self.layout.reports_bank_count {
            return None;
        }
        match self.bios.rom_bank_count() {
            0 => None,
            n => Some(n as u32 * self.layout.window_size),
        }
    }
}
