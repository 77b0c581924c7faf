//! Error types for the ZNS core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;
use zonewal_storage::StorageError;

/// Result type for core operations.
pub type ZnsResult<T> = Result<T, ZnsError>;

/// Errors that can occur in zone management and WAL redirection.
#[derive(Debug, Error)]
pub enum ZnsError {
    /// Storage backend error on a forwarded operation.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The mount path is missing or unreadable.
    #[error("mount path not found: {}", path.display())]
    NotFound {
        /// The path that could not be opened.
        path: PathBuf,
    },

    /// Buffer or pool allocation failed.
    #[error("out of memory: could not allocate {requested} bytes")]
    OutOfMemory {
        /// Number of bytes that were requested.
        requested: usize,
    },

    /// Every zone is bound to some other WAL.
    #[error("no free zone for WAL {wal}: all {zones} zones are allocated")]
    ResourceExhausted {
        /// The WAL that asked for a zone.
        wal: String,
        /// Size of the zone pool.
        zones: usize,
    },

    /// A buffered write would leave a hole in the log.
    #[error("write at offset {offset} would leave a gap after {buffered} buffered bytes")]
    WriteGap {
        /// The requested write offset.
        offset: u64,
        /// Logical size of the buffer when the write arrived.
        buffered: u64,
    },

    /// Appending buffered bytes to the zone failed.
    #[error("append to zone at offset {offset} failed: {source}")]
    WriteFailed {
        /// Zone offset of the failed append.
        offset: u64,
        /// The underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// The zone reset primitive failed or the zone could not be opened.
    #[error("reset of zone {} failed: {source}", path.display())]
    ResetFailed {
        /// The zone file that could not be reset.
        path: PathBuf,
        /// The underlying storage failure.
        #[source]
        source: StorageError,
    },

    /// The call is not valid in the current configuration.
    #[error("misuse: {message}")]
    Misuse {
        /// Description of why the call is invalid.
        message: String,
    },
}

impl ZnsError {
    /// Creates a misuse error.
    pub fn misuse(message: impl Into<String>) -> Self {
        Self::Misuse {
            message: message.into(),
        }
    }

    /// Creates a not-found error for a mount path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a reset-failed error.
    pub fn reset_failed(path: impl Into<PathBuf>, source: StorageError) -> Self {
        Self::ResetFailed {
            path: path.into(),
            source,
        }
    }

    /// Returns true for both causes of a failed WAL write: a gap in the
    /// buffer, or an append the zone refused.
    #[must_use]
    pub fn is_write_error(&self) -> bool {
        matches!(self, Self::WriteGap { .. } | Self::WriteFailed { .. })
    }
}
