//! Command-decoding flash mock shared by the engine tests

use alloc::vec;
use alloc::vec::Vec;

use crate::access::AccessStrategy;
use crate::chip::{ChipDescriptor, EraseStrategy};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Read,
    Unlock1,
    Unlock2,
    Identify,
    Program,
    Load,
    Erase1,
    Erase2,
    Erase3,
}

/// Decodes JEDEC command cycles per chip and applies them to a flat memory
///
/// Operations complete instantly, so toggle polling always succeeds on the
/// first confirmation.
pub(crate) struct MockFlash {
    pub memory: Vec<u8>,
    pub ids: Vec<u16>,
    pub chip_size: u32,
    pub sector_size: u32,
    pub atmel: bool,
    /// (address, length) of every erase
    pub erases: Vec<(u32, u32)>,
    /// Number of byte program operations
    pub programmed: u32,
    /// Start address of every combined sector program
    pub sector_programs: Vec<u32>,
    pub installed: Option<u32>,
    pub limit: Option<u32>,
    states: Vec<State>,
    loads: Vec<(u32, u8)>,
}

impl MockFlash {
    pub fn new(ids: &[u16], chip_size: u32, sector_size: u32, atmel: bool) -> Self {
        Self {
            memory: vec![0xFF; (chip_size as usize) * ids.len()],
            ids: ids.to_vec(),
            chip_size,
            sector_size,
            atmel,
            erases: Vec::new(),
            programmed: 0,
            sector_programs: Vec::new(),
            installed: None,
            limit: None,
            states: vec![State::Read; ids.len()],
            loads: Vec::new(),
        }
    }

    pub fn single(id: u16, chip_size: u32) -> Self {
        Self::new(&[id], chip_size, 4096, false)
    }

    pub fn ganged(ids: &[u16], chip_size: u32) -> Self {
        Self::new(ids, chip_size, 4096, false)
    }

    pub fn for_chip(chip: &ChipDescriptor, count: usize) -> Self {
        let ids = vec![chip.device_id; count];
        Self::new(
            &ids,
            chip.chip_size(),
            chip.sector_size,
            chip.strategy == EraseStrategy::ProgramWholeSector,
        )
    }

    fn check(&self, addr: u32, len: usize) -> Result<usize> {
        let end = addr as usize + len;
        let limit = self.limit.map_or(self.memory.len(), |l| l as usize);
        if end > self.memory.len() || end > limit {
            return Err(Error::AddressOutOfBounds { addr });
        }
        Ok(addr as usize)
    }

    fn commit_load(&mut self, chip: usize) {
        if self.states[chip] != State::Load {
            return;
        }
        self.states[chip] = State::Read;
        let Some(&(first, _)) = self.loads.first() else {
            return;
        };
        let start = (first / self.sector_size * self.sector_size) as usize;
        let end = start + self.sector_size as usize;
        self.memory[start..end].fill(0xFF);
        for &(a, v) in &self.loads {
            self.memory[a as usize] = v;
        }
        self.sector_programs.push(start as u32);
        self.loads.clear();
    }
}

impl AccessStrategy for MockFlash {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn read_byte(&mut self, addr: u32) -> Result<u8> {
        let a = self.check(addr, 1)?;
        let chip = (addr / self.chip_size) as usize;
        self.commit_load(chip);
        if self.states[chip] == State::Identify {
            let id = self.ids[chip];
            return Ok(match addr % self.chip_size {
                0 => (id >> 8) as u8,
                1 => id as u8,
                _ => 0x00,
            });
        }
        Ok(self.memory[a])
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> Result<()> {
        self.check(addr, 1)?;
        let chip = (addr / self.chip_size) as usize;
        let off = addr % self.chip_size;
        let base = chip as u32 * self.chip_size;

        let next = match (self.states[chip], off, value) {
            (State::Load, _, v) => {
                self.loads.push((addr, v));
                State::Load
            }
            (State::Program, _, v) => {
                self.memory[addr as usize] &= v;
                self.programmed += 1;
                State::Read
            }
            (State::Identify, _, 0xF0) => State::Read,
            (State::Read | State::Identify, 0x5555, 0xAA) => State::Unlock1,
            (State::Unlock1, 0x2AAA, 0x55) => State::Unlock2,
            (State::Unlock2, 0x5555, 0x90) => State::Identify,
            (State::Unlock2, 0x5555, 0xA0) if self.atmel => State::Load,
            (State::Unlock2, 0x5555, 0xA0) => State::Program,
            (State::Unlock2, 0x5555, 0x80) => State::Erase1,
            (State::Erase1, 0x5555, 0xAA) => State::Erase2,
            (State::Erase2, 0x2AAA, 0x55) => State::Erase3,
            (State::Erase3, 0x5555, 0x10) => {
                let (s, e) = (base as usize, (base + self.chip_size) as usize);
                self.memory[s..e].fill(0xFF);
                self.erases.push((base, self.chip_size));
                State::Read
            }
            (State::Erase3, _, 0x30) => {
                let start = addr / self.sector_size * self.sector_size;
                let (s, e) = (start as usize, (start + self.sector_size) as usize);
                self.memory[s..e].fill(0xFF);
                self.erases.push((start, self.sector_size));
                State::Read
            }
            _ => State::Read,
        };
        self.states[chip] = next;
        Ok(())
    }

    fn read_block(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.read_byte(addr + i as u32)?;
        }
        Ok(())
    }

    fn write_block(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        for (i, &b) in data.iter().enumerate() {
            self.write_byte(addr + i as u32, b)?;
        }
        Ok(())
    }

    fn verify_block(&mut self, addr: u32, expected: &[u8]) -> Result<bool> {
        let a = self.check(addr, expected.len())?;
        Ok(self.memory[a..a + expected.len()] == *expected)
    }

    fn delay_us(&mut self, _us: u32) {}

    fn address_limit(&self) -> Option<u32> {
        self.limit
    }

    fn installed_rom_size(&mut self) -> Option<u32> {
        self.installed
    }
}
