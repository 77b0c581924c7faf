//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of storage.
    #[error("read beyond end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current storage size.
        size: u64,
    },

    /// A write did not start at the zone's write pointer.
    #[error("non-sequential write: offset {offset}, write pointer {write_pointer}")]
    NotSequential {
        /// The requested write offset.
        offset: u64,
        /// The current write pointer of the zone.
        write_pointer: u64,
    },

    /// The operation is not supported by this backend.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The zone reset primitive failed.
    #[error("zone reset failed: {0}")]
    ZoneReset(String),
}

impl StorageError {
    /// Creates an I/O error for an invalid argument.
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::Io(io::Error::new(io::ErrorKind::InvalidInput, message.into()))
    }

    /// Returns true if this error means the target does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
