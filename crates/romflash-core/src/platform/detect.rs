//! BIOS signature checks

use super::{AccessKind, PlatformProbe};
use crate::error::{Error, Result};

/// Addresses and values the detector looks for
pub mod signatures {
    /// UNA BIOS signature location
    pub const UNA_SIGNATURE_ADDR: u16 = 0xFFFD;
    /// UNA BIOS signature ("UN" as a little-endian word)
    pub const UNA_SIGNATURE: u16 = 0x554E;

    /// CP/M warm boot vector; the word here points into the BIOS
    pub const WARM_BOOT_VECTOR: u16 = 0x0001;
    /// Offset of the B/P BIOS ident string from the warm boot entry
    pub const P112_IDENT_OFFSET: u16 = 0x2E;
    /// B/P BIOS ident string
    pub const P112_IDENT: &[u8] = b"B/P-DX";

    /// RomWBW 2.6+ keeps a pointer to its ident block here
    pub const ROMWBW_IDENT_PTR: u16 = 0xFFFE;
    /// Older RomWBW keeps its signature at a fixed address in page zero
    pub const ROMWBW_LEGACY_ADDR: u16 = 0x0040;
    /// RomWBW signature word
    pub const ROMWBW_SIGNATURE: u16 = 0xA857;
}

use signatures::*;

/// Work out which access method the running system supports
///
/// Checks run in a fixed order and the first match wins. UNA goes first
/// because it can also satisfy the RomWBW checks.
pub fn detect(probe: &mut dyn PlatformProbe) -> Result<AccessKind> {
    if probe.read_u16(UNA_SIGNATURE_ADDR) == UNA_SIGNATURE {
        log::debug!("UNA BIOS signature found");
        return Ok(AccessKind::UnaBios);
    }

    let bios_entry = probe.read_u16(WARM_BOOT_VECTOR);
    let mut ident = [0u8; 6];
    probe.read_bytes(bios_entry.wrapping_add(P112_IDENT_OFFSET), &mut ident);
    if ident[..] == *P112_IDENT {
        log::debug!("B/P BIOS ident found at {:#06X}", bios_entry);
        return Ok(AccessKind::P112);
    }

    let ident_ptr = probe.read_u16(ROMWBW_IDENT_PTR);
    if probe.read_u16(ident_ptr) == ROMWBW_SIGNATURE {
        log::debug!("RomWBW ident block at {:#06X}", ident_ptr);
        return Ok(AccessKind::RomwbwModern);
    }

    if probe.read_u16(ROMWBW_LEGACY_ADDR) == ROMWBW_SIGNATURE {
        log::debug!("legacy RomWBW signature found");
        return Ok(AccessKind::RomwbwLegacy);
    }

    if probe.cpu_is_z180() {
        log::debug!("no BIOS signature, but the CPU is a Z180");
        return Ok(AccessKind::Z180Dma);
    }

    Err(Error::NoAccessMethod)
}

/// Use `forced` if given, otherwise [`detect`]
pub fn select(probe: &mut dyn PlatformProbe, forced: Option<AccessKind>) -> Result<AccessKind> {
    match forced {
        Some(kind) => {
            log::debug!("access method forced to {}", kind);
            Ok(kind)
        }
        None => detect(probe),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 64 KiB of fake memory
    struct FakeProbe {
        mem: [u8; 0x1_0000],
        z180: bool,
    }

    impl FakeProbe {
        fn new() -> Self {
            Self {
                mem: [0u8; 0x1_0000],
                z180: false,
            }
        }

        fn put_u16(&mut self, addr: u16, value: u16) {
            let [lo, hi] = value.to_le_bytes();
            self.mem[addr as usize] = lo;
            self.mem[addr.wrapping_add(1) as usize] = hi;
        }

        fn put_bytes(&mut self, addr: u16, data: &[u8]) {
            let a = addr as usize;
            self.mem[a..a + data.len()].copy_from_slice(data);
        }

        fn una(mut self) -> Self {
            self.put_u16(UNA_SIGNATURE_ADDR, UNA_SIGNATURE);
            self
        }

        fn p112(mut self) -> Self {
            self.put_u16(WARM_BOOT_VECTOR, 0xE803);
            self.put_bytes(0xE803 + P112_IDENT_OFFSET, P112_IDENT);
            self
        }

        fn romwbw(mut self) -> Self {
            self.put_u16(ROMWBW_IDENT_PTR, 0xFE00);
            self.put_u16(0xFE00, ROMWBW_SIGNATURE);
            self
        }

        fn romwbw_legacy(mut self) -> Self {
            self.put_u16(ROMWBW_LEGACY_ADDR, ROMWBW_SIGNATURE);
            self
        }

        fn z180(mut self) -> Self {
            self.z180 = true;
            self
        }
    }

    impl PlatformProbe for FakeProbe {
        fn read_u16(&mut self, addr: u16) -> u16 {
            u16::from_le_bytes([
                self.mem[addr as usize],
                self.mem[addr.wrapping_add(1) as usize],
            ])
        }

        fn read_bytes(&mut self, addr: u16, buf: &mut [u8]) {
            for (i, b) in buf.iter_mut().enumerate() {
                *b = self.mem[addr.wrapping_add(i as u16) as usize];
            }
        }

        fn cpu_is_z180(&mut self) -> bool {
            self.z180
        }
    }

    #[test]
    fn test_each_platform_alone() {
        assert_eq!(detect(&mut FakeProbe::new().una()), Ok(AccessKind::UnaBios));
        assert_eq!(detect(&mut FakeProbe::new().p112()), Ok(AccessKind::P112));
        assert_eq!(
            detect(&mut FakeProbe::new().romwbw()),
            Ok(AccessKind::RomwbwModern)
        );
        assert_eq!(
            detect(&mut FakeProbe::new().romwbw_legacy()),
            Ok(AccessKind::RomwbwLegacy)
        );
        assert_eq!(detect(&mut FakeProbe::new().z180()), Ok(AccessKind::Z180Dma));
        assert_eq!(detect(&mut FakeProbe::new()), Err(Error::NoAccessMethod));
    }

    #[test]
    fn test_detection_order() {
        // UNA last: its signature word overlaps the RomWBW ident pointer
        let mut everything = FakeProbe::new()
            .p112()
            .romwbw()
            .romwbw_legacy()
            .z180()
            .una();
        assert_eq!(detect(&mut everything), Ok(AccessKind::UnaBios));

        let mut no_una = FakeProbe::new().p112().romwbw().romwbw_legacy().z180();
        assert_eq!(detect(&mut no_una), Ok(AccessKind::P112));

        let mut romwbw_z180 = FakeProbe::new().romwbw().romwbw_legacy().z180();
        assert_eq!(detect(&mut romwbw_z180), Ok(AccessKind::RomwbwModern));

        let mut legacy_z180 = FakeProbe::new().romwbw_legacy().z180();
        assert_eq!(detect(&mut legacy_z180), Ok(AccessKind::RomwbwLegacy));
    }

    #[test]
    fn test_partial_p112_ident_ignored() {
        let mut probe = FakeProbe::new();
        probe.put_u16(WARM_BOOT_VECTOR, 0xE803);
        probe.put_bytes(0xE803 + P112_IDENT_OFFSET, b"B/P-D");
        assert_eq!(detect(&mut probe), Err(Error::NoAccessMethod));
    }

    #[test]
    fn test_select_forced() {
        let mut probe = FakeProbe::new().una();
        assert_eq!(
            select(&mut probe, Some(AccessKind::Z180Dma)),
            Ok(AccessKind::Z180Dma)
        );
        assert_eq!(select(&mut probe, None), Ok(AccessKind::UnaBios));
    }
}
