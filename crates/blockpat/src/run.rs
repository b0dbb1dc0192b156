//! Write and verify orchestration.
//!
//! [`write_pattern`] destructively overwrites the device with the generated
//! pattern, start to end, then forces a durability sync. [`verify_pattern`]
//! resets the generator, re-derives the expected sequence and compares the
//! device block by block, accumulating byte-granular correct/incorrect
//! totals. Comparison granularity is the whole block: a single differing
//! byte marks the entire block incorrect.
//!
//! Both phases are strictly sequential — the generator is a forward-only
//! cursor and device offsets only ever ascend. Any I/O failure aborts the
//! phase and propagates; verification mismatches never do.

use crate::device::ByteDevice;
use crate::error::{BlockpatError, Result};
use crate::geometry::Geometry;
use crate::pattern::PatternGenerator;
use crate::speed::SpeedAverager;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Emit a progress report every this many blocks.
const PROGRESS_INTERVAL_BLOCKS: u64 = 100;

/// Which phase a progress report belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Write,
    Verify,
}

impl Phase {
    /// Single-letter tag used in machine-parsable log lines
    /// (`W` for write, `R` for the read-back verify).
    #[must_use]
    pub fn parsable_tag(self) -> &'static str {
        match self {
            Self::Write => "W",
            Self::Verify => "R",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

/// A periodic progress snapshot handed to the [`ProgressSink`].
#[derive(Debug, Clone)]
pub struct Progress {
    pub phase: Phase,
    /// Time since the phase started.
    pub elapsed: Duration,
    /// Current byte position on the device.
    pub position: u64,
    /// Completion percentage, `0.0..=100.0`.
    pub percent_done: f64,
    /// Sliding-window throughput estimate in bytes/second.
    pub speed_bps: f64,
    /// Bytes verified correct so far (0 during the write phase).
    pub correct_bytes: u64,
    /// Bytes verified incorrect so far (0 during the write phase).
    pub incorrect_bytes: u64,
}

impl Progress {
    /// Running percent-correct; 0 when nothing has been compared yet.
    #[must_use]
    pub fn percent_correct(&self) -> f64 {
        let total = self.correct_bytes + self.incorrect_bytes;
        if total == 0 {
            return 0.0;
        }
        100.0 * self.correct_bytes as f64 / total as f64
    }
}

/// Receives progress reports and mismatch locations.
///
/// Formatting and log-file handling live with the implementer; the
/// orchestrators only compute.
pub trait ProgressSink {
    fn progress(&mut self, progress: &Progress);

    /// A verification mismatch at byte `offset`, zero-based block `block_index`.
    fn mismatch(&mut self, offset: u64, block_index: u64);
}

/// A sink that discards everything.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn progress(&mut self, _progress: &Progress) {}
    fn mismatch(&mut self, _offset: u64, _block_index: u64) {}
}

/// Final verification totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Bytes covered by matching block comparisons.
    pub correct_bytes: u64,
    /// Bytes covered by mismatching block comparisons.
    pub incorrect_bytes: u64,
    /// `incorrect_bytes / block_size`. An approximation: a mismatched
    /// partial tail is counted at its shorter length, so it can be
    /// undercounted here.
    pub approx_bad_blocks: u64,
}

impl VerifyReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.incorrect_bytes == 0
    }

    /// Percent of compared bytes that matched; 0 for an empty device.
    #[must_use]
    pub fn percent_correct(&self) -> f64 {
        let total = self.correct_bytes + self.incorrect_bytes;
        if total == 0 {
            return 0.0;
        }
        100.0 * self.correct_bytes as f64 / total as f64
    }
}

fn check_block_size(geometry: &Geometry, generator: &dyn PatternGenerator) -> Result<()> {
    if generator.block_size() != geometry.block_size() {
        return Err(BlockpatError::InvalidGeometry(format!(
            "generator block size {} does not match geometry block size {}",
            generator.block_size(),
            geometry.block_size()
        )));
    }
    Ok(())
}

/// Overwrite the device with the generated pattern and sync it.
///
/// Destroys prior device contents irreversibly; the caller is responsible
/// for confirmation. Writes proceed in strictly ascending block order, the
/// final partial block (if any) is truncated to the tail length, and the
/// device is synced before returning so a following verify reads durable
/// data.
pub fn write_pattern(
    device: &dyn ByteDevice,
    geometry: &Geometry,
    generator: &mut dyn PatternGenerator,
    sink: &mut dyn ProgressSink,
) -> Result<()> {
    check_block_size(geometry, generator)?;
    info!(
        disk_size = geometry.disk_size(),
        block_size = geometry.block_size(),
        full_blocks = geometry.full_blocks(),
        tail_len = geometry.tail_len(),
        "starting write phase"
    );

    let started = Instant::now();
    let mut averager = SpeedAverager::new();

    for block_no in 0..geometry.full_blocks() {
        let pos = geometry.offset_of(block_no);
        averager.add(pos);
        if block_no > 0 && block_no % PROGRESS_INTERVAL_BLOCKS == 0 {
            if let Some(speed_bps) = averager.real_speed() {
                sink.progress(&Progress {
                    phase: Phase::Write,
                    elapsed: started.elapsed(),
                    position: pos,
                    percent_done: geometry.percent_done(pos),
                    speed_bps,
                    correct_bytes: 0,
                    incorrect_bytes: 0,
                });
            }
        }
        let block = generator.next_block();
        device.write_all_at(pos, &block)?;
    }

    let tail = geometry.tail_len();
    if tail != 0 {
        let block = generator.next_block();
        device.write_all_at(geometry.offset_of(geometry.full_blocks()), &block[..tail])?;
    }

    device.sync()?;
    debug!(elapsed = ?started.elapsed(), "device synced");

    if let Some(speed_bps) = averager.real_speed() {
        sink.progress(&Progress {
            phase: Phase::Write,
            elapsed: started.elapsed(),
            position: geometry.disk_size(),
            percent_done: 100.0,
            speed_bps,
            correct_bytes: 0,
            incorrect_bytes: 0,
        });
    }
    info!(elapsed = ?started.elapsed(), "write phase finished");
    Ok(())
}

/// Compare the device against the regenerated pattern.
///
/// Resets the generator first, so the same instance used for the write
/// phase re-derives the identical sequence. Mismatches are reported to the
/// sink and counted; only I/O errors abort the scan.
pub fn verify_pattern(
    device: &dyn ByteDevice,
    geometry: &Geometry,
    generator: &mut dyn PatternGenerator,
    sink: &mut dyn ProgressSink,
) -> Result<VerifyReport> {
    check_block_size(geometry, generator)?;
    info!(
        disk_size = geometry.disk_size(),
        block_size = geometry.block_size(),
        "starting verify phase"
    );

    generator.reset();
    let started = Instant::now();
    let mut averager = SpeedAverager::new();
    let block_size = geometry.block_size();
    let mut readback = vec![0_u8; block_size];
    let mut correct_bytes: u64 = 0;
    let mut incorrect_bytes: u64 = 0;

    for block_no in 0..geometry.full_blocks() {
        let pos = geometry.offset_of(block_no);
        averager.add(pos);
        if block_no > 0 && block_no % PROGRESS_INTERVAL_BLOCKS == 0 {
            if let Some(speed_bps) = averager.real_speed() {
                sink.progress(&Progress {
                    phase: Phase::Verify,
                    elapsed: started.elapsed(),
                    position: pos,
                    percent_done: geometry.percent_done(pos),
                    speed_bps,
                    correct_bytes,
                    incorrect_bytes,
                });
            }
        }

        let expected = generator.next_block();
        device.read_exact_at(pos, &mut readback)?;
        if expected != readback {
            warn!(offset = pos, block = block_no, "verification mismatch");
            sink.mismatch(pos, block_no);
            incorrect_bytes += block_size as u64;
        } else {
            correct_bytes += block_size as u64;
        }
    }

    let tail = geometry.tail_len();
    if tail != 0 {
        let pos = geometry.offset_of(geometry.full_blocks());
        let expected = generator.next_block();
        device.read_exact_at(pos, &mut readback[..tail])?;
        if expected[..tail] != readback[..tail] {
            warn!(offset = pos, block = geometry.full_blocks(), "verification mismatch in tail");
            sink.mismatch(pos, geometry.full_blocks());
            incorrect_bytes += tail as u64;
        } else {
            correct_bytes += tail as u64;
        }
    }

    let report = VerifyReport {
        correct_bytes,
        incorrect_bytes,
        approx_bad_blocks: incorrect_bytes / block_size as u64,
    };
    info!(
        correct_bytes,
        incorrect_bytes,
        elapsed = ?started.elapsed(),
        "verify phase finished"
    );
    Ok(report)
}
