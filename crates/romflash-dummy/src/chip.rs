//! Emulated parallel flash chip

use alloc::vec;
use alloc::vec::Vec;

use romflash_core::chip::{ChipDescriptor, EraseStrategy};
use romflash_core::protocol::commands;

/// Reads during which DQ6 toggles after a byte program
const PROGRAM_BUSY_READS: u32 = 2;
/// Reads during which DQ6 toggles after an erase or sector program
const ERASE_BUSY_READS: u32 = 6;

/// DQ6, the toggle bit
const TOGGLE_BIT: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmdState {
    Read,
    Unlock1,
    Unlock2,
    Autoselect,
    Program,
    SectorLoad,
    EraseSetup,
    EraseUnlock1,
    EraseUnlock2,
}

/// An erase the chip performed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseEvent {
    /// Whole chip
    Chip,
    /// Sector starting at the given chip offset
    Sector(u32),
}

/// One flash chip with the JEDEC software command interface
///
/// Command cycles are decoded on the low 15 address bits, as real parts do.
/// After a program or erase the chip stays busy for a few reads, toggling
/// DQ6 on each one.
pub struct EmulatedChip {
    device_id: u16,
    sector_size: u32,
    sector_load: bool,
    data: Vec<u8>,
    state: CmdState,
    busy_reads: u32,
    toggle: u8,
    stuck: bool,
    loaded: Vec<(u32, u8)>,
    erases: Vec<EraseEvent>,
    programs: u32,
}

impl EmulatedChip {
    /// Blank (all 0xFF) chip with the geometry of `desc`
    pub fn new(desc: &ChipDescriptor) -> Self {
        Self {
            device_id: desc.device_id,
            sector_size: desc.sector_size,
            sector_load: desc.strategy == EraseStrategy::ProgramWholeSector,
            data: vec![0xFF; desc.chip_size() as usize],
            state: CmdState::Read,
            busy_reads: 0,
            toggle: 0,
            stuck: false,
            loaded: Vec::new(),
            erases: Vec::new(),
            programs: 0,
        }
    }

    /// Chip size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Current contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Contents for direct manipulation, bypassing the command interface
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Erases performed so far
    pub fn erases(&self) -> &[EraseEvent] {
        &self.erases
    }

    /// Byte and sector program operations performed so far
    pub fn programs(&self) -> u32 {
        self.programs
    }

    /// Make the chip busy forever after its next operation
    pub fn set_stuck(&mut self, stuck: bool) {
        self.stuck = stuck;
    }

    /// Bus read at chip offset `off`
    pub fn read(&mut self, off: u32) -> u8 {
        if self.state == CmdState::SectorLoad {
            self.commit_sector_load();
        }

        if self.busy_reads > 0 {
            if !self.stuck {
                self.busy_reads -= 1;
            }
            self.toggle ^= TOGGLE_BIT;
            let value = self.data.get(off as usize).copied().unwrap_or(0xFF);
            return (value & !TOGGLE_BIT) | self.toggle;
        }

        if self.state == CmdState::Autoselect {
            return match off {
                commands::MANUFACTURER_ID_ADDR => (self.device_id >> 8) as u8,
                commands::DEVICE_ID_ADDR => self.device_id as u8,
                _ => 0x00,
            };
        }

        self.data.get(off as usize).copied().unwrap_or(0xFF)
    }

    /// Bus write at chip offset `off`
    pub fn write(&mut self, off: u32, value: u8) {
        if self.busy_reads > 0 {
            log::trace!("write to busy chip at 0x{:05X} ignored", off);
            return;
        }

        let cmd_addr = off & 0x7FFF;
        self.state = match (self.state, cmd_addr, value) {
            (CmdState::SectorLoad, _, v) => {
                self.loaded.push((off, v));
                CmdState::SectorLoad
            }
            (CmdState::Program, _, v) => {
                if let Some(b) = self.data.get_mut(off as usize) {
                    *b &= v;
                }
                self.programs += 1;
                self.busy_reads = PROGRAM_BUSY_READS;
                CmdState::Read
            }
            (CmdState::Autoselect, _, commands::RESET) => CmdState::Read,
            (CmdState::Read | CmdState::Autoselect, commands::UNLOCK_ADDR1, commands::UNLOCK_DATA1) => {
                CmdState::Unlock1
            }
            (CmdState::Unlock1, commands::UNLOCK_ADDR2, commands::UNLOCK_DATA2) => CmdState::Unlock2,
            (CmdState::Unlock2, commands::UNLOCK_ADDR1, commands::IDENTIFY) => CmdState::Autoselect,
            (CmdState::Unlock2, commands::UNLOCK_ADDR1, commands::PROGRAM) => {
                if self.sector_load {
                    self.loaded.clear();
                    CmdState::SectorLoad
                } else {
                    CmdState::Program
                }
            }
            (CmdState::Unlock2, commands::UNLOCK_ADDR1, commands::ERASE_SETUP) => {
                CmdState::EraseSetup
            }
            (CmdState::EraseSetup, commands::UNLOCK_ADDR1, commands::UNLOCK_DATA1) => {
                CmdState::EraseUnlock1
            }
            (CmdState::EraseUnlock1, commands::UNLOCK_ADDR2, commands::UNLOCK_DATA2) => {
                CmdState::EraseUnlock2
            }
            (CmdState::EraseUnlock2, commands::UNLOCK_ADDR1, commands::CHIP_ERASE) => {
                self.data.fill(0xFF);
                self.erases.push(EraseEvent::Chip);
                self.busy_reads = ERASE_BUSY_READS;
                CmdState::Read
            }
            (CmdState::EraseUnlock2, _, commands::SECTOR_ERASE) => {
                let start = off / self.sector_size * self.sector_size;
                let end = (start + self.sector_size).min(self.data.len() as u32);
                self.data[start as usize..end as usize].fill(0xFF);
                self.erases.push(EraseEvent::Sector(start));
                self.busy_reads = ERASE_BUSY_READS;
                CmdState::Read
            }
            _ => CmdState::Read,
        };
    }

    /// Latch the loaded bytes: the sector is erased and only loaded bytes
    /// are programmed
    fn commit_sector_load(&mut self) {
        self.state = CmdState::Read;
        let Some(&(first, _)) = self.loaded.first() else {
            return;
        };
        let start = first / self.sector_size * self.sector_size;
        let end = (start + self.sector_size).min(self.data.len() as u32);
        self.data[start as usize..end as usize].fill(0xFF);
        for &(off, v) in &self.loaded {
            if off >= start && off < end {
                self.data[off as usize] = v;
            }
        }
        self.loaded.clear();
        self.programs += 1;
        self.busy_reads = ERASE_BUSY_READS;
    }
}
