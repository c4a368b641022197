//! Direct access through a memory-mapped window

use super::AccessStrategy;
use crate::error::{Error, Result};

/// A byte-addressable window onto the flash
///
/// Implemented by `/dev/mem` mappings on Linux and by emulated boards in
/// tests. Accesses must reach the device one at a time and in program order.
pub trait MemoryWindow {
    /// Window size in bytes
    fn len(&self) -> usize;

    /// Whether the window is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read the byte at `offset`
    ///
    /// Takes `&mut self` because a read can change device state (toggle
    /// bits, autoselect mode).
    fn read8(&mut self, offset: usize) -> u8;

    /// Write the byte at `offset`
    fn write8(&mut self, offset: usize, value: u8);

    /// Busy-wait
    fn delay_us(&mut self, us: u32);
}

/// Access strategy over a [`MemoryWindow`]
pub struct MemoryMapped<W: MemoryWindow> {
    window: W,
}

impl<W: MemoryWindow> MemoryMapped<W> {
    /// Wrap a mapped window
    pub fn new(window: W) -> Self {
        Self { window }
    }

    /// Unwrap the window
    pub fn into_inner(self) -> W {
        self.window
    }

    fn offset(&self, addr: u32, len: usize) -> Result<usize> {
        let start = addr as usize;
        match start.checked_add(len) {
            Some(end) if end <= self.window.len() => Ok(start),
            _ => Err(Error::AddressOutOfBounds { addr }),
        }
    }
}

impl<W: MemoryWindow> AccessStrategy for MemoryMapped<W> {
    fn name(&self) -> &'static str {
        "memory mapped"
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let off = self.offset(addr, 1)?;
        Ok(self.window.read8(off))
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        let off = self.offset(addr, 1)?;
        self.window.write8(off, value);
        Ok(())
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let off = self.offset(addr, buf.len())?;
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.window.read8(off + i);
        }
        Ok(())
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let off = self.offset(addr, data.len())?;
        for (i, &b) in data.iter().enumerate() {
            self.window.write8(off + i, b);
        }
        Ok(())
    }

    fn verify_block(&mut self, addr: u32, expected: &[u8]) -> Result<bool> {
        let off = self.offset(addr, expected.len())?;
        Ok(expected
            .iter()
            .enumerate()
            .all(|(i, &b)| self.window.read8(off + i) == b))
    }

    fn delay_us(&mut self, us: u32) {
        self.window.delay_us(us);
    }
}
