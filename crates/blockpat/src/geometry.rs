//! Disk/block geometry.
//!
//! A run covers `full_blocks` blocks of exactly `block_size` bytes plus an
//! optional partial tail of `tail_len` bytes, so that
//! `full_blocks * block_size + tail_len == disk_size` always holds.

use crate::error::{BlockpatError, Result};
use serde::Serialize;

/// Validated geometry of one test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    disk_size: u64,
    block_size: usize,
}

impl Geometry {
    /// Create a geometry. `block_size` must be nonzero.
    pub fn new(disk_size: u64, block_size: usize) -> Result<Self> {
        if block_size == 0 {
            return Err(BlockpatError::InvalidGeometry(
                "block_size must be nonzero".to_owned(),
            ));
        }
        Ok(Self {
            disk_size,
            block_size,
        })
    }

    #[must_use]
    pub fn disk_size(&self) -> u64 {
        self.disk_size
    }

    #[must_use]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of whole `block_size` blocks on the device.
    #[must_use]
    pub fn full_blocks(&self) -> u64 {
        self.disk_size / self.block_size as u64
    }

    /// Length of the final partial block, 0 when the device is aligned.
    #[must_use]
    pub fn tail_len(&self) -> usize {
        // block_size fits usize, so the remainder does too.
        (self.disk_size % self.block_size as u64) as usize
    }

    /// Byte offset of the given zero-based block number.
    #[must_use]
    pub fn offset_of(&self, block_no: u64) -> u64 {
        block_no * self.block_size as u64
    }

    /// Completion percentage for a byte position, in `0.0..=100.0`.
    #[must_use]
    pub fn percent_done(&self, position: u64) -> f64 {
        if self.disk_size == 0 {
            return 100.0;
        }
        100.0 * position as f64 / self.disk_size as f64
    }
}
