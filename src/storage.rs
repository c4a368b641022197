//! Image files as 128-byte block stores

use romflash_core::error::{Result, StorageError};
use romflash_core::storage::{BlockStatus, BlockStore, BLOCK_SIZE};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// A host file addressed in 128-byte blocks
///
/// A short final block reads back padded with 0xFF.
pub struct FileBlockStore {
    path: PathBuf,
    file: Option<File>,
}

impl FileBlockStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().ok_or(StorageError::Io.into())
    }
}

impl BlockStore for FileBlockStore {
    fn delete(&mut self) -> Result<()> {
        self.file = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                log::debug!("cannot delete {}: {}", self.path.display(), e);
                Err(StorageError::Io.into())
            }
        }
    }

    fn create(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)
            .map_err(|e| {
                log::debug!("cannot create {}: {}", self.path.display(), e);
                StorageError::CreateFailed
            })?;
        self.file = Some(file);
        Ok(())
    }

    fn open(&mut self) -> Result<()> {
        let file = File::open(&self.path).map_err(|e| {
            log::debug!("cannot open {}: {}", self.path.display(), e);
            StorageError::NotFound
        })?;
        self.file = Some(file);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.sync_all().map_err(|_| StorageError::Io)?;
        }
        Ok(())
    }

    fn size_in_blocks(&mut self) -> Result<u32> {
        let len = self
            .file()?
            .metadata()
            .map_err(|_| StorageError::Io)?
            .len();
        Ok(len.div_ceil(BLOCK_SIZE as u64) as u32)
    }

    fn read_block(&mut self, n: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<BlockStatus> {
        let read_failed = StorageError::ReadFailed { block: n };
        let file = self.file()?;
        file.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))
            .map_err(|_| read_failed)?;

        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(k) => filled += k,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(_) => return Err(read_failed.into()),
            }
        }
        if filled == 0 {
            return Ok(BlockStatus::Eof);
        }
        buf[filled..].fill(0xFF);
        Ok(BlockStatus::Data)
    }

    fn write_block(&mut self, n: u32, buf: &[u8; BLOCK_SIZE]) -> Result<()> {
        let write_failed = StorageError::WriteFailed { block: n };
        let file = self.file()?;
        file.seek(SeekFrom::Start(n as u64 * BLOCK_SIZE as u64))
            .map_err(|_| write_failed)?;
        file.write_all(buf).map_err(|_| write_failed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("romflash-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_short_last_block_is_padded() {
        let path = temp_path("short.rom");
        fs::write(&path, vec![0x11u8; BLOCK_SIZE + 10]).unwrap();

        let mut store = FileBlockStore::new(&path);
        store.open().unwrap();
        assert_eq!(store.size_in_blocks().unwrap(), 2);

        let mut buf = [0u8; BLOCK_SIZE];
        assert_eq!(store.read_block(1, &mut buf).unwrap(), BlockStatus::Data);
        assert_eq!(&buf[..10], &[0x11; 10]);
        assert!(buf[10..].iter().all(|&b| b == 0xFF));
        assert_eq!(store.read_block(2, &mut buf).unwrap(), BlockStatus::Eof);
        store.close().unwrap();
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_create_write_reopen() {
        let path = temp_path("rw.rom");
        let mut store = FileBlockStore::new(&path);
        store.delete().unwrap();
        assert_eq!(store.open(), Err(StorageError::NotFound.into()));

        store.create().unwrap();
        store.write_block(0, &[0xAA; BLOCK_SIZE]).unwrap();
        store.write_block(1, &[0x55; BLOCK_SIZE]).unwrap();
        store.close().unwrap();

        store.open().unwrap();
        let mut buf = [0u8; BLOCK_SIZE];
        store.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, [0x55; BLOCK_SIZE]);
        store.close().unwrap();

        store.delete().unwrap();
        assert!(!path.exists());
    }
}
