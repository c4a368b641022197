//! Random-access block storage for ROM images
//!
//! Images are handled in 128-byte records, the CP/M file granularity. The
//! engine addresses records by absolute number and never assumes
//! sequential access.

use alloc::vec::Vec;

use crate::error::{Result, StorageError};

/// Size of one storage block in bytes
pub const BLOCK_SIZE: usize = 128;

/// Outcome of reading one block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStatus {
    /// The buffer was filled with data
    Data,
    /// The block lies past the end of the file
    Eof,
}

/// A file made of fixed-size blocks
pub trait BlockStore {
    /// Remove the file if it exists
    fn delete(&mut self) -> Result<()>;

    /// Create a new empty file and open it
    fn create(&mut self) -> Result<()>;

    /// Open an existing file
    fn open(&mut self) -> Result<()>;

    /// Flush and close the file
    fn close(&mut self) -> Result<()>;

    /// File size in whole blocks
    fn size_in_blocks(&mut self) -> Result<u32>;

    /// Read block `n` into `buf`
    fn read_block(&mut self, n: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<BlockStatus>;

    /// Write `buf` as block `n`
    fn write_block(&mut self, n: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()>;
}

/// In-memory block store
///
/// Used by tests and the emulated platforms. `open` fails until the store
/// has been created or given initial contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlockStore {
    data: Option<Vec<u8>>,
    is_open: bool,
}

impl MemoryBlockStore {
    /// Store that doesn't exist yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `data`, padded with 0xFF to a whole number of blocks
    pub fn with_contents(mut data: Vec<u8>) -> Self {
        let rem = data.len() % BLOCK_SIZE;
        if rem != 0 {
            data.resize(data.len() + BLOCK_SIZE - rem, 0xFF);
        }
        Self {
            data: Some(data),
            is_open: false,
        }
    }

    /// Current contents, if the file exists
    pub fn contents(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Take the contents out of the store
    pub fn into_contents(self) -> Option<Vec<u8>> {
        self.data
    }

    fn data_mut(&mut self) -> Result<&mut Vec<u8>> {
        if !self.is_open {
            return Err(StorageError::Io.into());
        }
        self.data.as_mut().ok_or(StorageError::NotFound.into())
    }
}

impl BlockStore for MemoryBlockStore {
    fn delete(&mut self) -> Result<()> {
        self.data = None;
        self.is_open = false;
        Ok(())
    }

    fn create(&mut self) -> Result<()> {
        self.data = Some(Vec::new());
        self.is_open = true;
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        if self.data.is_none() {
            return Err(StorageError::NotFound.into());
        }
        self.is_open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.is_open = false;
        Ok(())
    }

    fn size_in_blocks(&mut self) -> Result<u32> {
        let len = self.data_mut()?.len();
        Ok((len / BLOCK_SIZE) as u32)
    }

    fn read_block(&mut self, n: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<BlockStatus> {
        let data = self.data_mut()?;
        let start = n as usize * BLOCK_SIZE;
        match data.get(start..start + BLOCK_SIZE) {
            Some(block) => {
                buf.copy_from_slice(block);
                Ok(BlockStatus::Data)
            }
            None => Ok(BlockStatus::Eof),
        }
    }

    fn write_block(&mut self, n: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        let data = self.data_mut()?;
        let start = n as usize * BLOCK_SIZE;
        if data.len() < start + BLOCK_SIZE {
            data.resize(start + BLOCK_SIZE, 0xFF);
        }
        data[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }
}
