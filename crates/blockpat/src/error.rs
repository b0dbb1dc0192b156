//! Error types for blockpat.
//!
//! A single user-facing enum covers the whole library. I/O failures are
//! always fatal to the running phase and propagate unretried: a failing
//! read or write is exactly the device malfunction this tool exists to
//! surface. Verification mismatches are not errors — they are counted in
//! the [`crate::run::VerifyReport`] and the scan continues.

use thiserror::Error;

/// Unified error type for all blockpat operations.
#[derive(Debug, Error)]
pub enum BlockpatError {
    /// Operating system I/O error (wraps `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Disk/block geometry is invalid or an access fell outside the
    /// device's addressable range.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The requested block size cannot be produced by the selected
    /// pattern generator (e.g., not a multiple of the cipher block width).
    #[error("unsupported block size: {0}")]
    UnsupportedBlockSize(String),

    /// A write was attempted on a device handle opened read-only.
    #[error("device opened read-only")]
    ReadOnly,
}

/// Result alias using `BlockpatError`.
pub type Result<T> = std::result::Result<T, BlockpatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formatting() {
        let geom = BlockpatError::InvalidGeometry("block_size=0".into());
        assert_eq!(geom.to_string(), "invalid geometry: block_size=0");

        let bs = BlockpatError::UnsupportedBlockSize("100 is not a multiple of 16".into());
        assert!(bs.to_string().starts_with("unsupported block size:"));

        let ro = BlockpatError::ReadOnly;
        assert_eq!(ro.to_string(), "device opened read-only");
    }

    #[test]
    fn io_error_converts_via_from() {
        let io = std::io::Error::other("boom");
        let err: BlockpatError = io.into();
        assert!(matches!(err, BlockpatError::Io(_)));
        assert!(err.to_string().contains("boom"));
    }
}
