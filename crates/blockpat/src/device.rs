//! Flat byte-range device access.
//!
//! The target is addressed as a flat byte range through [`ByteDevice`],
//! with pread/pwrite semantics so offsets are explicit and no shared seek
//! position exists. [`FileByteDevice`] backs the trait with a regular file
//! or a raw block device node; handles close on drop on every exit path.

use crate::error::{BlockpatError, Result};
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::os::unix::fs::FileExt;
use std::path::Path;

/// Byte-addressed device for fixed-offset I/O.
pub trait ByteDevice {
    /// Total addressable length in bytes.
    fn len_bytes(&self) -> u64;

    /// Read exactly `buf.len()` bytes from `offset` into `buf`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Write all bytes in `buf` to `offset`.
    fn write_all_at(&self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Flush pending writes to stable storage.
    fn sync(&self) -> Result<()>;
}

/// File-backed byte device using `pread`/`pwrite` style I/O.
///
/// Length is determined by seeking to the end of the handle once at open
/// time. This is correct for raw block device nodes, where the metadata
/// length is reported as zero.
#[derive(Debug)]
pub struct FileByteDevice {
    file: File,
    len: u64,
    writable: bool,
}

impl FileByteDevice {
    /// Open `path` read-only (verify-only runs) or read-write.
    pub fn open(path: impl AsRef<Path>, read_only: bool) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(!read_only)
            .open(path.as_ref())?;
        let len = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            len,
            writable: !read_only,
        })
    }

    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    fn check_bounds(&self, offset: u64, len: usize, what: &str) -> Result<()> {
        let len = u64::try_from(len)
            .map_err(|_| BlockpatError::InvalidGeometry(format!("{what} length overflows u64")))?;
        let end = offset
            .checked_add(len)
            .ok_or_else(|| BlockpatError::InvalidGeometry(format!("{what} range overflows u64")))?;
        if end > self.len {
            return Err(BlockpatError::InvalidGeometry(format!(
                "{what} out of bounds: offset={offset} len={len} device_len={}",
                self.len
            )));
        }
        Ok(())
    }
}

impl ByteDevice for FileByteDevice {
    fn len_bytes(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.check_bounds(offset, buf.len(), "read")?;
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    fn write_all_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(BlockpatError::ReadOnly);
        }
        self.check_bounds(offset, buf.len(), "write")?;
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
