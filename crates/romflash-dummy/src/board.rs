//! Emulated single-board computers
//!
//! An [`EmulatedBoard`] wires one or more [`EmulatedChip`]s into the memory
//! map of a Z80 or Z180 system and exposes them through every interface the
//! access strategies need: BIOS bank switching, Z180 MMU and DMA, and a flat
//! memory window. The BIOS signatures that platform detection looks for are
//! planted in RAM according to the board kind.
//!
//! Physical memory map:
//!
//! | range | contents |
//! |---|---|
//! | `0x00000..0x80000` | flash chips, back to back |
//! | `0x80000..0x100000` | RAM |

use alloc::vec;
use alloc::vec::Vec;

use romflash_core::access::{BankBios, MemoryWindow, MmuRegisters, Z180Bus, BANK_WINDOW_SIZE};
use romflash_core::chip::ChipDescriptor;
use romflash_core::error::{Error, Result};
use romflash_core::flash::MAX_CHIPS;
use romflash_core::platform::{signatures, PlatformProbe};

use crate::chip::EmulatedChip;

/// Physical address where RAM starts
pub const RAM_BASE: u32 = 0x8_0000;
/// RAM size in bytes
pub const RAM_SIZE: u32 = 0x8_0000;
/// Bank numbers at or above this select RAM instead of ROM
pub const RAM_BANK_FLAG: u16 = 0x80;
/// Bank selected by the emulated BIOS when the program starts
pub const DEFAULT_USER_BANK: u16 = 0x8E;
/// Logical address the DMA strategy can use as scratch memory
pub const SCRATCH_VADDR: u16 = 0xD000;

/// Where a board's BIOS keeps its B/P ident string
const P112_BIOS_ENTRY: u16 = 0xE803;
/// Where a modern RomWBW keeps its ident block
const ROMWBW_IDENT_BLOCK: u16 = 0xFE00;

/// Kind of board to emulate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardKind {
    /// RomWBW 2.6+ (ident pointer at 0xFFFE)
    RomWbw,
    /// RomWBW before 2.6 (signature at 0x0040)
    RomWbwLegacy,
    /// UNA BIOS
    Una,
    /// P112 with B/P BIOS
    P112,
    /// Z180 with no recognisable BIOS
    Z180,
    /// Flash in a flat window (Linux-hosted board); no BIOS at all
    Mapped,
}

impl BoardKind {
    /// Every board kind
    pub const ALL: [BoardKind; 6] = [
        BoardKind::RomWbw,
        BoardKind::RomWbwLegacy,
        BoardKind::Una,
        BoardKind::P112,
        BoardKind::Z180,
        BoardKind::Mapped,
    ];

    /// Name used in platform strings
    pub fn name(self) -> &'static str {
        match self {
            BoardKind::RomWbw => "romwbw",
            BoardKind::RomWbwLegacy => "romwbw-legacy",
            BoardKind::Una => "una",
            BoardKind::P112 => "p112",
            BoardKind::Z180 => "z180",
            BoardKind::Mapped => "mapped",
        }
    }

    /// Parse a platform string name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(name))
    }

    fn is_z180(self) -> bool {
        self == BoardKind::Z180
    }

    fn mmu(self) -> MmuRegisters {
        if self.is_z180() {
            // 0x0000-0xBFFF banked to 0x80000, 0xC000-0xFFFF common to 0x90000
            MmuRegisters {
                cbar: 0xC0,
                bbr: 0x80,
                cbr: 0x84,
            }
        } else {
            // everything in common area 1, identity mapped onto RAM
            MmuRegisters {
                cbar: 0x00,
                bbr: 0x00,
                cbr: 0x80,
            }
        }
    }
}

/// Board configuration
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Board kind
    pub kind: BoardKind,
    /// Chip type fitted to every socket
    pub chip: ChipDescriptor,
    /// Number of chips
    pub chips: u32,
}

/// An emulated board
pub struct EmulatedBoard {
    kind: BoardKind,
    chips: Vec<EmulatedChip>,
    chip_size: u32,
    ram: Vec<u8>,
    bank: u16,
    mmu: MmuRegisters,
    dma_transfers: u32,
}

impl EmulatedBoard {
    /// Build a board with blank flash
    pub fn new(config: &BoardConfig) -> Result<Self> {
        if !(1..=MAX_CHIPS).contains(&config.chips) {
            return Err(Error::InvalidChipCount(config.chips));
        }
        config.chip.validate()?;
        let chip_size = config.chip.chip_size();
        let flash_len = chip_size as u64 * config.chips as u64;
        if config.kind.is_z180() && flash_len > RAM_BASE as u64 {
            return Err(Error::UnsupportedGeometry(
                "flash does not fit below RAM on a Z180 board",
            ));
        }

        let mut board = Self {
            kind: config.kind,
            chips: (0..config.chips)
                .map(|_| EmulatedChip::new(&config.chip))
                .collect(),
            chip_size,
            ram: vec![0u8; RAM_SIZE as usize],
            bank: DEFAULT_USER_BANK,
            mmu: config.kind.mmu(),
            dma_transfers: 0,
        };
        board.plant_signatures();
        log::debug!(
            "emulated {} board: {} x {} ({} KiB)",
            config.kind.name(),
            config.chips,
            config.chip.name,
            flash_len / 1024
        );
        Ok(board)
    }

    fn plant_signatures(&mut self) {
        use signatures::*;

        match self.kind {
            BoardKind::Una => self.cpu_write_u16(UNA_SIGNATURE_ADDR, UNA_SIGNATURE),
            BoardKind::P112 => {
                self.cpu_write_u16(WARM_BOOT_VECTOR, P112_BIOS_ENTRY);
                for (i, &b) in P112_IDENT.iter().enumerate() {
                    self.cpu_write(P112_BIOS_ENTRY + P112_IDENT_OFFSET + i as u16, b);
                }
            }
            BoardKind::RomWbw => {
                self.cpu_write_u16(ROMWBW_IDENT_PTR, ROMWBW_IDENT_BLOCK);
                self.cpu_write_u16(ROMWBW_IDENT_BLOCK, ROMWBW_SIGNATURE);
            }
            BoardKind::RomWbwLegacy => self.cpu_write_u16(ROMWBW_LEGACY_ADDR, ROMWBW_SIGNATURE),
            BoardKind::Z180 | BoardKind::Mapped => {}
        }
    }

    /// Board kind
    pub fn kind(&self) -> BoardKind {
        self.kind
    }

    /// Size of one chip in bytes
    pub fn chip_size(&self) -> u32 {
        self.chip_size
    }

    /// Size of all flash in bytes
    pub fn flash_len(&self) -> u32 {
        self.chip_size * self.chips.len() as u32
    }

    /// The fitted chips
    pub fn chips(&self) -> &[EmulatedChip] {
        &self.chips
    }

    /// Mutable access to one chip
    pub fn chip_mut(&mut self, index: usize) -> Option<&mut EmulatedChip> {
        self.chips.get_mut(index)
    }

    /// All flash contents, chip after chip
    pub fn flash_contents(&self) -> Vec<u8> {
        self.chips.iter().flat_map(|c| c.data().iter().copied()).collect()
    }

    /// Preload flash contents; extra data is ignored, missing data left blank
    pub fn load_flash(&mut self, data: &[u8]) {
        let size = self.chip_size as usize;
        for (chip, chunk) in self.chips.iter_mut().zip(data.chunks(size)) {
            chip.data_mut()[..chunk.len()].copy_from_slice(chunk);
        }
    }

    /// Bank currently selected in the BIOS window
    pub fn bank(&self) -> u16 {
        self.bank
    }

    /// Number of DMA transfers performed
    pub fn dma_transfers(&self) -> u32 {
        self.dma_transfers
    }

    fn flash_read(&mut self, linear: u32) -> u8 {
        let index = (linear / self.chip_size) as usize;
        match self.chips.get_mut(index) {
            Some(chip) => chip.read(linear % self.chip_size),
            None => 0xFF,
        }
    }

    fn flash_write(&mut self, linear: u32, value: u8) {
        let chip_size = self.chip_size;
        if let Some(chip) = self.chips.get_mut((linear / chip_size) as usize) {
            chip.write(linear % chip_size, value);
        }
    }

    fn phys_read(&mut self, phys: u32) -> u8 {
        if phys >= RAM_BASE {
            self.ram
                .get((phys - RAM_BASE) as usize)
                .copied()
                .unwrap_or(0xFF)
        } else {
            self.flash_read(phys)
        }
    }

    fn phys_write(&mut self, phys: u32, value: u8) {
        if phys >= RAM_BASE {
            if let Some(b) = self.ram.get_mut((phys - RAM_BASE) as usize) {
                *b = value;
            }
        } else {
            self.flash_write(phys, value);
        }
    }

    fn cpu_read(&mut self, vaddr: u16) -> u8 {
        let phys = self.mmu.virtual_to_physical(vaddr);
        self.phys_read(phys)
    }

    fn cpu_write(&mut self, vaddr: u16, value: u8) {
        let phys = self.mmu.virtual_to_physical(vaddr);
        self.phys_write(phys, value);
    }

    fn cpu_write_u16(&mut self, vaddr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.cpu_write(vaddr, lo);
        self.cpu_write(vaddr.wrapping_add(1), hi);
    }

    fn window_addr(&self, offset: u16) -> (bool, u32) {
        let offset = offset as u32 % BANK_WINDOW_SIZE;
        if self.bank >= RAM_BANK_FLAG {
            let bank = (self.bank - RAM_BANK_FLAG) as u32;
            (false, bank * BANK_WINDOW_SIZE + offset)
        } else {
            (true, self.bank as u32 * BANK_WINDOW_SIZE + offset)
        }
    }
}

impl PlatformProbe for EmulatedBoard {
    fn read_u16(&mut self, addr: u16) -> u16 {
        let lo = self.cpu_read(addr);
        let hi = self.cpu_read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    fn read_bytes(&mut self, addr: u16, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.cpu_read(addr.wrapping_add(i as u16));
        }
    }

    fn cpu_is_z180(&mut self) -> bool {
        self.kind.is_z180()
    }
}

impl BankBios for EmulatedBoard {
    fn current_bank(&mut self) -> u16 {
        self.bank
    }

    fn select_bank(&mut self, bank: u16) {
        self.bank = bank;
    }

    fn rom_bank_count(&mut self) -> u16 {
        (self.flash_len() / BANK_WINDOW_SIZE) as u16
    }

    fn window_read(&mut self, offset: u16) -> u8 {
        match self.window_addr(offset) {
            (true, linear) => self.flash_read(linear),
            (false, ram) => self.ram.get(ram as usize).copied().unwrap_or(0xFF),
        }
    }

    fn window_write(&mut self, offset: u16, value: u8) {
        match self.window_addr(offset) {
            (true, linear) => self.flash_write(linear, value),
            (false, ram) => {
                if let Some(b) = self.ram.get_mut(ram as usize) {
                    *b = value;
                }
            }
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}

impl Z180Bus for EmulatedBoard {
    fn mmu(&mut self) -> MmuRegisters {
        self.mmu
    }

    fn dma_copy(&mut self, src: u32, dst: u32, len: u16) -> Result<()> {
        let limit = RAM_BASE + RAM_SIZE;
        if src + len as u32 > limit {
            return Err(Error::AddressOutOfBounds { addr: src });
        }
        if dst + len as u32 > limit {
            return Err(Error::AddressOutOfBounds { addr: dst });
        }
        for i in 0..len as u32 {
            let v = self.phys_read(src + i);
            self.phys_write(dst + i, v);
        }
        self.dma_transfers += 1;
        Ok(())
    }

    fn load(&mut self, vaddr: u16, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.cpu_read(vaddr.wrapping_add(i as u16));
        }
    }

    fn store(&mut self, vaddr: u16, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.cpu_write(vaddr.wrapping_add(i as u16), b);
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}

impl MemoryWindow for EmulatedBoard {
    fn len(&self) -> usize {
        self.flash_len() as usize
    }

    fn read8(&mut self, offset: usize) -> u8 {
        self.flash_read(offset as u32)
    }

    fn write8(&mut self, offset: usize, value: u8) {
        self.flash_write(offset as u32, value);
    }

    fn delay_us(&mut self, _us: u32) {}
}
