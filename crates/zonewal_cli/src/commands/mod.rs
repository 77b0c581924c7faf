//! CLI command implementations.

pub mod inspect;
pub mod reset;

use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Zone id is not hex.
    #[error("invalid zone id '{0}': expected hex digits")]
    InvalidZoneId(String),

    /// No zone file with the given id under the mount.
    #[error("zone {id:04x} not found under {mount}")]
    UnknownZone {
        /// Requested zone id.
        id: u32,
        /// Mount that was scanned.
        mount: String,
    },

    /// Unknown output format.
    #[error("unknown format '{0}': expected text or json")]
    UnknownFormat(String),

    /// Zone layer failure.
    #[error(transparent)]
    Zns(#[from] zonewal_core::ZnsError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] zonewal_storage::StorageError),

    /// JSON encoding failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
