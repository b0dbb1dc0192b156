#![forbid(unsafe_code)]
//! Deterministic pattern write/verify testing for block devices.
//!
//! blockpat answers one question about a disk, flash card, or raw image
//! file: does it return exactly what was written, everywhere? It fills the
//! device with a seed-keyed pseudorandom pattern, syncs, then regenerates
//! the same pattern from the seed and compares the device contents block
//! by block, accumulating byte-granular correct/incorrect totals.
//!
//! The pattern never needs to be persisted: any block can be recomputed
//! from (seed, block index) alone, so a corrupted block is detected
//! independently of every other block.
//!
//! Crate layout:
//! - [`pattern`] — seed-keyed deterministic block generators
//! - [`device`] — flat byte-range device abstraction
//! - [`geometry`] — disk/block geometry (full blocks + partial tail)
//! - [`speed`] — sliding-window throughput estimation
//! - [`run`] — the write and verify orchestrators

pub mod device;
pub mod error;
pub mod geometry;
pub mod pattern;
pub mod run;
pub mod speed;

pub use device::{ByteDevice, FileByteDevice};
pub use error::{BlockpatError, Result};
pub use geometry::Geometry;
pub use pattern::{AesCbcGenerator, ChaCha20Generator, PatternGenerator, PatternKind};
pub use run::{NullSink, Phase, Progress, ProgressSink, VerifyReport, verify_pattern, write_pattern};
pub use speed::SpeedAverager;
