//! Progress reporting with indicatif
//!
//! Without `-v` a bar tracks bytes read or sectors examined. With `-v` the
//! bar is replaced by one log line per sector.

use indicatif::{ProgressBar, ProgressStyle};
use romflash_core::flash::{Pass, ProgressSink, SectorOutcome, VerifyReport};

/// Create a progress bar with custom phase message
fn create_bar(total: u64, counter: &str, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {} {}",
            counter, phase
        ))
        .map(|s| s.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    verbose: bool,
    bar: Option<ProgressBar>,
    pass: Pass,
    total: u32,
}

impl IndicatifProgress {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            bar: None,
            pass: Pass::Verify,
            total: 0,
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.bar.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressSink for IndicatifProgress {
    fn reading(&mut self, total_bytes: u32) {
        self.finish();
        if !self.verbose {
            self.bar = Some(create_bar(
                total_bytes as u64,
                "{bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                "Reading",
            ));
        }
    }

    fn read_progress(&mut self, bytes_read: u32) {
        match &self.bar {
            Some(pb) => pb.set_position(bytes_read as u64),
            None => log::debug!("Read {} KiB", bytes_read / 1024),
        }
    }

    fn sectors(&mut self, pass: Pass, total_sectors: u32) {
        self.finish();
        self.pass = pass;
        self.total = total_sectors;
        if !self.verbose {
            let phase = match pass {
                Pass::Write => "Writing",
                Pass::Verify => "Verifying",
            };
            self.bar = Some(create_bar(total_sectors as u64, "{pos}/{len} sectors", phase));
        }
    }

    fn sector_done(&mut self, sector: u32, addr: u32, outcome: SectorOutcome) {
        if let Some(pb) = &self.bar {
            pb.inc(1);
            return;
        }

        let what = match outcome {
            SectorOutcome::Unchanged => "ok",
            SectorOutcome::Mismatch => "MISMATCH",
            SectorOutcome::Reprogrammed => "reprogrammed",
        };
        let pass = match self.pass {
            Pass::Write => "Write",
            Pass::Verify => "Verify",
        };
        log::info!(
            "{}: sector {}/{} at 0x{:06X} {}",
            pass,
            sector + 1,
            self.total,
            addr,
            what
        );
    }

    fn complete(&mut self, report: &VerifyReport) {
        self.finish();
        if report.partial {
            log::debug!(
                "Pass ended after {} of {} sectors",
                report.processed,
                report.total
            );
        }
    }
}
