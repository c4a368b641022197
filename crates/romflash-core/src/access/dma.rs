//! Z180 DMA access
//!
//! On a Z180 without a cooperating BIOS the flash is still reachable: DMA
//! channel 0 takes 20-bit physical addresses, so the tool copies between
//! the flash and a small scratch buffer in its own memory. The scratch
//! buffer is given as a logical address and translated through the MMU
//! every time it is used, since a BIOS call in between may remap it.

use alloc::vec;
use alloc::vec::Vec;

use super::translate::{DmaMapped, MmuRegisters};
use super::AccessStrategy;
use crate::error::{Error, Result};

/// Z180 CPU facilities used for DMA access
pub trait Z180Bus {
    /// Current MMU register values
    fn mmu(&mut self) -> MmuRegisters;

    /// Copy `len` bytes between two physical addresses with DMA channel 0
    fn dma_copy(&mut self, src: u32, dst: u32, len: u16) -> Result<()>;

    /// Read from the program's own (logical) memory
    fn load(&mut self, vaddr: u16, buf: &mut [u8]);

    /// Write to the program's own (logical) memory
    fn store(&mut self, vaddr: u16, data: &[u8]);

    /// Busy-wait
    fn delay_us(&mut self, us: u32);
}

/// Logical memory the DMA strategy may use as a bounce buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScratchWindow {
    /// Logical start address
    pub vaddr: u16,
    /// Length in bytes
    pub len: u16,
}

impl ScratchWindow {
    /// Default scratch length, one CP/M record
    pub const DEFAULT_LEN: u16 = 128;

    /// Scratch window of the default length at `vaddr`
    pub const fn at(vaddr: u16) -> Self {
        Self {
            vaddr,
            len: Self::DEFAULT_LEN,
        }
    }
}

/// Access strategy backed by Z180 DMA transfers
pub struct Z180Dma<H: Z180Bus> {
    bus: H,
    translator: DmaMapped,
    scratch: ScratchWindow,
    readback: Vec<u8>,
}

impl<H: Z180Bus> Z180Dma<H> {
    /// Create a DMA strategy with flash at physical address 0
    pub fn new(bus: H, scratch: ScratchWindow) -> Result<Self> {
        Self::with_flash_base(bus, scratch, 0)
    }

    /// Create a DMA strategy with flash starting at `flash_base`
    pub fn with_flash_base(bus: H, scratch: ScratchWindow, flash_base: u32) -> Result<Self> {
        if scratch.len == 0 || scratch.vaddr as u32 + scratch.len as u32 > 0x1_0000 {
            return Err(Error::UnsupportedGeometry("invalid DMA scratch window"));
        }
        let mut dma = Self {
            bus,
            translator: DmaMapped::new(flash_base),
            scratch,
            readback: vec![0; scratch.len as usize],
        };
        let phys = dma.scratch_physical()?;
        log::debug!(
            "Z180 DMA: scratch {:#06X}+{} at physical {:#07X}",
            scratch.vaddr,
            scratch.len,
            phys
        );
        Ok(dma)
    }

    /// Unwrap the bus
    pub fn into_inner(self) -> H {
        self.bus
    }

    /// Physical address of the scratch buffer under the current mapping
    ///
    /// Fails if the buffer straddles an MMU region boundary, as DMA needs
    /// it physically contiguous.
    fn scratch_physical(&mut self) -> Result<u32> {
        let regs = self.bus.mmu();
        let first = self.translator.buffer_to_physical(regs, self.scratch.vaddr);
        let last_v = self.scratch.vaddr + (self.scratch.len - 1);
        let last = self.translator.buffer_to_physical(regs, last_v);
        if last != first + (self.scratch.len as u32 - 1) {
            return Err(Error::UnsupportedGeometry(
                "DMA scratch buffer straddles an MMU region boundary",
            ));
        }
        Ok(first)
    }

    fn flash_physical(&self, addr: u32, len: usize) -> Result<u32> {
        self.translator
            .flash_to_physical(addr, len as u32)
            .ok_or(Error::AddressOutOfBounds { addr })
    }

    fn chunk_len(&self) -> usize {
        self.scratch.len as usize
    }
}

impl<H: Z180Bus> AccessStrategy for Z180Dma<H> {
    fn name(&self) -> &'static str {
        "Z180 DMA"
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_block(addr, &mut b)?;
        Ok(b[0])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.write_block(addr, &[value])
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        let src = self.flash_physical(addr, buf.len())?;
        let scratch = self.scratch_physical()?;
        let step = self.chunk_len();
        for (i, chunk) in buf.chunks_mut(step).enumerate() {
            let off = (i * step) as u32;
            self.bus.dma_copy(src + off, scratch, chunk.len() as u16)?;
            self.bus.load(self.scratch.vaddr, chunk);
        }
        Ok(())
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        let dst = self.flash_physical(addr, data.len())?;
        let scratch = self.scratch_physical()?;
        let step = self.chunk_len();
        for (i, chunk) in data.chunks(step).enumerate() {
            let off = (i * step) as u32;
            self.bus.store(self.scratch.vaddr, chunk);
            self.bus.dma_copy(scratch, dst + off, chunk.len() as u16)?;
        }
        Ok(())
    }

    fn verify_block(&mut self, addr: u32, expected: &[u8]) -> Result<bool> {
        let src = self.flash_physical(addr, expected.len())?;
        let scratch = self.scratch_physical()?;
        let step = self.chunk_len();
        for (i, chunk) in expected.chunks(step).enumerate() {
            let off = (i * step) as u32;
            let readback = &mut self.readback[..chunk.len()];
            self.bus.dma_copy(src + off, scratch, chunk.len() as u16)?;
            self.bus.load(self.scratch.vaddr, readback);
            if readback != chunk {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn delay_us(&mut self, us: u32) {
        self.bus.delay_us(us);
    }
}
