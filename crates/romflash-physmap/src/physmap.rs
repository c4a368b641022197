//! Physical memory mapping of the flash window
//!
//! The flash is reached through `/dev/mem`, opened with `O_SYNC` so that
//! every access goes straight to the bus. Mappings are page aligned; the
//! window handed out starts at the requested address.
//!
//! # Safety
//!
//! Writing to physical memory is inherently dangerous and requires root.
//! Only map the range the flash actually decodes at.

use std::time::Duration;

use romflash_core::access::MemoryWindow;

use crate::error::{PhysMapError, Result};

/// Default physical base of the flash window
pub const DEFAULT_BASE: u64 = 0xFFF0_0000;

/// Default window size (one 512 KiB part)
pub const DEFAULT_SIZE: usize = 512 * 1024;

fn check_window(phys_addr: u64, size: usize) -> Result<()> {
    if size == 0 || phys_addr.checked_add(size as u64).is_none() {
        return Err(PhysMapError::InvalidWindow {
            address: phys_addr,
            size,
        });
    }
    Ok(())
}

/// A mapped window of physical memory
#[cfg(target_os = "linux")]
pub struct PhysMap {
    /// Start of the requested window inside the mapping
    ptr: *mut u8,
    /// Requested window size
    len: usize,
    /// Size of the whole page-aligned mapping
    map_size: usize,
    /// Offset of `ptr` from the start of the mapping
    page_offset: usize,
    phys_addr: u64,
}

#[cfg(target_os = "linux")]
impl PhysMap {
    /// Map `size` bytes of physical memory starting at `phys_addr`
    pub fn new(phys_addr: u64, size: usize) -> Result<Self> {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;
        use std::os::unix::io::AsRawFd;

        check_window(phys_addr, size)?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open("/dev/mem")
            .map_err(PhysMapError::Open)?;

        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let page_mask = page_size - 1;
        let page_offset = (phys_addr as usize) & page_mask;
        let aligned_addr = phys_addr & !(page_mask as u64);
        let map_size = (size + page_offset + page_mask) & !page_mask;

        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                map_size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                aligned_addr as libc::off_t,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(PhysMapError::Map {
                address: phys_addr,
                size,
                source: std::io::Error::last_os_error(),
            });
        }

        log::debug!(
            "mapped {:#x} bytes of physical memory at {:#x}",
            size,
            phys_addr
        );

        Ok(Self {
            ptr: unsafe { (ptr as *mut u8).add(page_offset) },
            len: size,
            map_size,
            page_offset,
            phys_addr,
        })
    }

    /// Physical address of the window
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }
}

#[cfg(target_os = "linux")]
impl Drop for PhysMap {
    fn drop(&mut self) {
        unsafe {
            let base = self.ptr.sub(self.page_offset);
            libc::munmap(base as *mut libc::c_void, self.map_size);
        }
    }
}

// The mapping is plain device memory with no thread affinity
#[cfg(target_os = "linux")]
unsafe impl Send for PhysMap {}

#[cfg(target_os = "linux")]
impl MemoryWindow for PhysMap {
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn read8(&mut self, offset: usize) -> u8 {
        debug_assert!(offset < self.len);
        unsafe { core::ptr::read_volatile(self.ptr.add(offset)) }
    }

    #[inline]
    fn write8(&mut self, offset: usize, value: u8) {
        debug_assert!(offset < self.len);
        unsafe { core::ptr::write_volatile(self.ptr.add(offset), value) }
    }

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}

// Stub for other platforms
#[cfg(not(target_os = "linux"))]
pub struct PhysMap {
    _private: (),
}

#[cfg(not(target_os = "linux"))]
impl PhysMap {
    /// Always fails: `/dev/mem` is Linux only
    pub fn new(phys_addr: u64, size: usize) -> Result<Self> {
        check_window(phys_addr, size)?;
        Err(PhysMapError::NotSupported)
    }

    /// Physical address of the window
    pub fn phys_addr(&self) -> u64 {
        0
    }
}

#[cfg(not(target_os = "linux"))]
impl MemoryWindow for PhysMap {
    fn len(&self) -> usize {
        0
    }

    fn read8(&mut self, _offset: usize) -> u8 {
        0xFF
    }

    fn write8(&mut self, _offset: usize, _value: u8) {}

    fn delay_us(&mut self, us: u32) {
        std::thread::sleep(Duration::from_micros(us as u64));
    }
}
