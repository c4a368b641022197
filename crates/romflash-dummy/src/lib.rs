//! romflash-dummy - Emulated boards for testing the flash programmer
//!
//! This crate emulates Z80 and Z180 single-board computers fitted with
//! JEDEC parallel flash. Each board plants the BIOS signatures of the
//! firmware it pretends to run, so the whole path from platform detection
//! through chip identification to the verify/erase/program engine can be
//! exercised without real hardware.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod board;
mod chip;

pub use board::{
    BoardConfig, BoardKind, EmulatedBoard, DEFAULT_USER_BANK, RAM_BANK_FLAG, RAM_BASE, RAM_SIZE,
    SCRATCH_VADDR,
};
pub use chip::{EmulatedChip, EraseEvent};

use alloc::boxed::Box;

use romflash_core::access::{
    AccessStrategy, BankLayout, BankSwitched, MemoryMapped, ScratchWindow, Z180Dma,
};
use romflash_core::error::Result;
use romflash_core::platform::AccessKind;

/// Wrap a board in the access strategy for `kind`
pub fn strategy_for(board: EmulatedBoard, kind: AccessKind) -> Result<Box<dyn AccessStrategy>> {
    if let Some(layout) = BankLayout::for_kind(kind) {
        return Ok(Box::new(BankSwitched::new(board, layout)));
    }
    match kind {
        AccessKind::Z180Dma => Ok(Box::new(Z180Dma::new(
            board,
            ScratchWindow::at(SCRATCH_VADDR),
        )?)),
        _ => Ok(Box::new(MemoryMapped::new(board))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;
    use romflash_core::chip::ChipCatalog;
    use romflash_core::error::Error;
    use romflash_core::flash::{probe, NoProgress, ProbeOptions};
    use romflash_core::platform::select;
    use romflash_core::protocol::PollLimit;
    use romflash_core::storage::{BlockStore, MemoryBlockStore};

    fn pattern(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed.wrapping_mul(2_654_435_761).max(1);
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x as u8
            })
            .collect()
    }

    fn board(kind: BoardKind, chip_id: u16, chips: u32) -> EmulatedBoard {
        let chip = ChipCatalog::builtin().lookup(chip_id).unwrap();
        EmulatedBoard::new(&BoardConfig { kind, chip, chips }).unwrap()
    }

    fn detected(mut board: EmulatedBoard) -> Box<dyn AccessStrategy> {
        let forced = (board.kind() == BoardKind::Mapped).then_some(AccessKind::MemoryMapped);
        let kind = select(&mut board, forced).unwrap();
        strategy_for(board, kind).unwrap()
    }

    fn image_store(data: Vec<u8>) -> MemoryBlockStore {
        let mut store = MemoryBlockStore::with_contents(data);
        store.open().unwrap();
        store
    }

    /// Write `image`, check the outcome, then read the flash back
    fn write_and_read_back(strategy: &mut dyn AccessStrategy, image: &[u8]) -> Vec<u8> {
        let catalog = ChipCatalog::builtin();
        let mut session = probe(strategy, &catalog, &ProbeOptions::default()).unwrap();
        let mut store = image_store(image.to_vec());

        let outcome = session.write_and_verify(&mut store, &mut NoProgress).unwrap();
        assert!(outcome.write.mismatched > 0);
        assert!(outcome.is_ok());
        assert_eq!(outcome.verify.unwrap().mismatched, 0);

        let mut readback = MemoryBlockStore::new();
        let n = session.read_to(&mut readback, &mut NoProgress).unwrap();
        assert_eq!(n as usize, image.len());
        readback.into_contents().unwrap()
    }

    #[test]
    fn test_round_trip_on_every_board() {
        for kind in BoardKind::ALL {
            if kind == BoardKind::P112 {
                continue;
            }
            let mut strategy = detected(board(kind, 0xBFB5, 1));
            let image = pattern(128 * 1024, kind as u32 + 1);
            let readback = write_and_read_back(&mut *strategy, &image);
            assert!(readback == image, "{:?}", kind);
        }
    }

    #[test]
    fn test_sector_program_chip_over_banks_and_dma() {
        for kind in [BoardKind::RomWbw, BoardKind::Z180] {
            let mut strategy = detected(board(kind, 0x1FD5, 1));
            let image = pattern(128 * 1024, 7);
            let readback = write_and_read_back(&mut *strategy, &image);
            assert!(readback == image, "{:?}", kind);
        }
    }

    #[test]
    fn test_whole_chip_erase_part() {
        let mut strategy = BankSwitched::new(board(BoardKind::Una, 0x1F05, 1), BankLayout::una());
        let image = pattern(128 * 1024, 3);
        let readback = write_and_read_back(&mut strategy, &image);
        assert!(readback == image);

        let board = strategy.into_inner();
        assert_eq!(board.chips()[0].erases(), &[EraseEvent::Chip]);
        assert_eq!(board.bank(), DEFAULT_USER_BANK);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let catalog = ChipCatalog::builtin();
        let image = pattern(128 * 1024, 9);
        let mut strategy = Z180Dma::new(
            board(BoardKind::Z180, 0xBFB5, 1),
            ScratchWindow::at(SCRATCH_VADDR),
        )
        .unwrap();

        let mut session = probe(&mut strategy, &catalog, &ProbeOptions::default()).unwrap();
        let mut store = image_store(image.clone());
        let first = session.write_and_verify(&mut store, &mut NoProgress).unwrap();
        assert_eq!(first.write.mismatched, 32);
        let second = session.write_and_verify(&mut store, &mut NoProgress).unwrap();
        assert_eq!(second.write.mismatched, 0);
        assert_eq!(second.write.processed, 32);
        assert!(second.verify.is_none());
        drop(session);

        let board = strategy.into_inner();
        assert_eq!(board.chips()[0].erases().len(), 32);
        assert_eq!(board.flash_contents(), image);
        assert!(board.dma_transfers() > 0);
    }

    #[test]
    fn test_changed_byte_touches_one_sector() {
        let catalog = ChipCatalog::builtin();
        let mut image = pattern(128 * 1024, 4);
        let mut b = board(BoardKind::RomWbw, 0xBFB5, 1);
        b.load_flash(&image);
        image[0x5123] ^= 0xFF;

        let mut strategy = BankSwitched::new(b, BankLayout::romwbw());
        let mut session = probe(&mut strategy, &catalog, &ProbeOptions::default()).unwrap();
        let mut store = image_store(image.clone());
        let outcome = session.write_and_verify(&mut store, &mut NoProgress).unwrap();
        assert_eq!(outcome.write.mismatched, 1);
        assert!(outcome.is_ok());
        drop(session);

        let board = strategy.into_inner();
        assert_eq!(board.chips()[0].erases(), &[EraseEvent::Sector(0x5000)]);
        assert_eq!(board.flash_contents(), image);
    }

    #[test]
    fn test_p112_only_reaches_first_window() {
        let catalog = ChipCatalog::builtin();
        let mut strategy = detected(board(BoardKind::P112, 0xBFB5, 1));
        assert_eq!(strategy.address_limit(), Some(32 * 1024));

        let image = pattern(128 * 1024, 5);
        let mut session = probe(&mut *strategy, &catalog, &ProbeOptions::default()).unwrap();
        assert_eq!(session.reachable_size(), 32 * 1024);

        let mut store = image_store(image.clone());
        let outcome = session.write_and_verify(&mut store, &mut NoProgress).unwrap();
        assert_eq!(outcome.write.processed, 8);
        assert!(outcome.write.partial);
        assert!(outcome.is_ok());

        let mut readback = MemoryBlockStore::new();
        assert_eq!(session.read_to(&mut readback, &mut NoProgress).unwrap(), 32 * 1024);
        assert_eq!(readback.contents().unwrap(), &image[..32 * 1024]);
    }

    #[test]
    fn test_romwbw_reports_ganged_chips() {
        let catalog = ChipCatalog::builtin();
        let mut strategy = detected(board(BoardKind::RomWbw, 0xBFB5, 2));
        let session = probe(&mut *strategy, &catalog, &ProbeOptions::default()).unwrap();
        assert_eq!(session.chip_count(), 2);
        assert_eq!(session.total_size(), 256 * 1024);
        drop(session);

        let image = pattern(256 * 1024, 6);
        let readback = write_and_read_back(&mut *strategy, &image);
        assert!(readback == image);
    }

    #[test]
    fn test_legacy_romwbw_needs_forced_count() {
        let catalog = ChipCatalog::builtin();
        let mut strategy = detected(board(BoardKind::RomWbwLegacy, 0xBFB5, 2));
        let session = probe(&mut *strategy, &catalog, &ProbeOptions::default()).unwrap();
        assert_eq!(session.chip_count(), 1);
        drop(session);

        let opts = ProbeOptions {
            chip_count: Some(2),
            ..Default::default()
        };
        let session = probe(&mut *strategy, &catalog, &opts).unwrap();
        assert_eq!(session.total_size(), 256 * 1024);
    }

    #[test]
    fn test_stuck_chip_times_out() {
        let catalog = ChipCatalog::builtin();
        let mut b = board(BoardKind::RomWbw, 0xBFB5, 1);
        b.chip_mut(0).unwrap().set_stuck(true);
        let mut strategy = strategy_for(b, AccessKind::RomwbwModern).unwrap();

        let opts = ProbeOptions {
            poll_limit: PollLimit::Bounded(100),
            ..Default::default()
        };
        let mut session = probe(&mut *strategy, &catalog, &opts).unwrap();
        let mut store = image_store(vec![0u8; 128 * 1024]);
        assert!(matches!(
            session.verify_and_write(&mut store, true, &mut NoProgress),
            Err(Error::HardwareTimeout { .. })
        ));
    }
}
