//! Address translation for the banked and DMA strategies

/// Where a linear flash address lands inside a banked window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankLocation {
    /// ROM bank to select
    pub bank: u16,
    /// Offset inside the window
    pub offset: u16,
    /// Bytes left in the window from `offset` onwards
    pub remaining: u32,
}

/// Linear address → (bank, offset) for a fixed-size window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowedBank {
    window_size: u32,
}

impl WindowedBank {
    /// Create a translator for a window of `window_size` bytes
    ///
    /// The window must be non-empty and no larger than the 64 KiB CPU
    /// address space.
    pub const fn new(window_size: u32) -> Self {
        assert!(window_size > 0 && window_size <= 0x1_0000);
        Self { window_size }
    }

    /// Window size in bytes
    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Locate `addr`, or `None` if the bank number doesn't fit in 16 bits
    pub fn locate(&self, addr: u32) -> Option<BankLocation> {
        let bank = u16::try_from(addr / self.window_size).ok()?;
        let offset = addr % self.window_size;
        Some(BankLocation {
            bank,
            offset: offset as u16,
            remaining: self.window_size - offset,
        })
    }
}

/// Z180 MMU configuration registers
///
/// The 64 KiB logical address space is split (low to high) into common
/// area 0, the bank area and common area 1. CBAR holds the start of the
/// bank area in its low nibble and the start of common area 1 in its high
/// nibble, both in 4 KiB pages. Common area 0 always starts at physical 0;
/// BBR and CBR give the physical base (in 4 KiB pages) of the other two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MmuRegisters {
    /// Common/Bank Area Register
    pub cbar: u8,
    /// Bank Base Register
    pub bbr: u8,
    /// Common Base Register
    pub cbr: u8,
}

/// Region of the logical address space a virtual address falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmuRegion {
    /// Common area 0 (identity mapped)
    CommonLow,
    /// Bank area (based at BBR)
    Banked,
    /// Common area 1 (based at CBR)
    CommonHigh,
}

impl MmuRegisters {
    /// Logical start of the bank area
    pub fn bank_start(&self) -> u32 {
        ((self.cbar & 0x0F) as u32) << 12
    }

    /// Logical start of common area 1
    pub fn common1_start(&self) -> u32 {
        ((self.cbar & 0xF0) as u32) << 8
    }

    /// Region containing `vaddr`
    pub fn region(&self, vaddr: u16) -> MmuRegion {
        let vaddr = vaddr as u32;
        if vaddr < self.bank_start() {
            MmuRegion::CommonLow
        } else if vaddr < self.common1_start() {
            MmuRegion::Banked
        } else {
            MmuRegion::CommonHigh
        }
    }

    /// Physical address backing `vaddr` under the current mapping
    ///
    /// The sum wraps at the top of the 20-bit physical space.
    pub fn virtual_to_physical(&self, vaddr: u16) -> u32 {
        let v = vaddr as u32;
        let phys = match self.region(vaddr) {
            MmuRegion::CommonLow => v,
            MmuRegion::Banked => ((self.bbr as u32) << 12) + v,
            MmuRegion::CommonHigh => ((self.cbr as u32) << 12) + v,
        };
        phys & (Z180_PHYSICAL_LIMIT - 1)
    }
}

/// Z180 physical address space is 20 bits wide
pub const Z180_PHYSICAL_LIMIT: u32 = 0x10_0000;

/// Linear flash address → Z180 physical address
///
/// The flash occupies physical memory from `flash_base` upwards and is
/// never remapped, so translation is an offset plus a bounds check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmaMapped {
    flash_base: u32,
}

impl DmaMapped {
    /// Translator for flash starting at physical `flash_base`
    pub const fn new(flash_base: u32) -> Self {
        Self { flash_base }
    }

    /// Physical address of a linear flash range, or `None` if any part of
    /// it falls outside the 1 MiB physical space
    pub fn flash_to_physical(&self, addr: u32, len: u32) -> Option<u32> {
        let start = self.flash_base.checked_add(addr)?;
        let end = start.checked_add(len)?;
        if end > Z180_PHYSICAL_LIMIT {
            return None;
        }
        Some(start)
    }

    /// Physical address of a logical buffer under the given mapping
    pub fn buffer_to_physical(&self, regs: MmuRegisters, vaddr: u16) -> u32 {
        regs.virtual_to_physical(vaddr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windowed_bank_locate() {
        let t = WindowedBank::new(0x8000);
        assert_eq!(
            t.locate(0),
            Some(BankLocation {
                bank: 0,
                offset: 0,
                remaining: 0x8000
            })
        );
        assert_eq!(
            t.locate(0x1_2345),
            Some(BankLocation {
                bank: 2,
                offset: 0x2345,
                remaining: 0x8000 - 0x2345
            })
        );
        assert_eq!(t.locate(0x7FFF).unwrap().remaining, 1);
    }

    #[test]
    fn test_mmu_regions() {
        // bank area at 0x4000, common 1 at 0xC000
        let regs = MmuRegisters {
            cbar: 0xC4,
            bbr: 0x80,
            cbr: 0x90,
        };
        assert_eq!(regs.region(0x3FFF), MmuRegion::CommonLow);
        assert_eq!(regs.region(0x4000), MmuRegion::Banked);
        assert_eq!(regs.region(0xBFFF), MmuRegion::Banked);
        assert_eq!(regs.region(0xC000), MmuRegion::CommonHigh);

        assert_eq!(regs.virtual_to_physical(0x1234), 0x1234);
        assert_eq!(regs.virtual_to_physical(0x4000), 0x80000 + 0x4000);
        assert_eq!(regs.virtual_to_physical(0xC010), 0x90000 + 0xC010);
    }

    #[test]
    fn test_mmu_everything_common1() {
        let regs = MmuRegisters {
            cbar: 0x00,
            bbr: 0x00,
            cbr: 0x80,
        };
        assert_eq!(regs.region(0x0000), MmuRegion::CommonHigh);
        assert_eq!(regs.virtual_to_physical(0xFFFF), 0x8FFFF);
    }

    #[test]
    fn test_mmu_wraps_at_one_megabyte() {
        let regs = MmuRegisters {
            cbar: 0xE8,
            bbr: 0xFC,
            cbr: 0xF8,
        };
        assert_eq!(regs.virtual_to_physical(0xF000), 0x0_7000);
        assert_eq!(regs.virtual_to_physical(0x8000), 0x0_4000);
        assert_eq!(regs.virtual_to_physical(0x7FFF), 0x7FFF);
    }

    #[test]
    fn test_dma_flash_bounds() {
        let t = DmaMapped::new(0);
        assert_eq!(t.flash_to_physical(0x7_FFFF, 1), Some(0x7_FFFF));
        assert_eq!(t.flash_to_physical(0xF_FFFF, 1), Some(0xF_FFFF));
        assert_eq!(t.flash_to_physical(0xF_FFFF, 2), None);
    }
}
