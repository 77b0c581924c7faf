//! # zonewal core
//!
//! Places write-ahead logs on zoned block devices exposed through zonefs.
//!
//! This crate provides:
//! - A zone pool that binds one zone file to each live WAL
//! - A sequential write buffer that turns random WAL writes into appends
//! - Zone reset when a WAL is deleted or truncated to zero
//! - [`ZnsVfs`], a file-system decorator tying the pieces together
//!
//! Files that are not WALs, and every file while ZNS mode is off, go to the
//! wrapped [`FileSystem`](zonewal_storage::FileSystem) unchanged.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod config;
mod error;
mod mode;
mod types;
mod vfs;
pub mod zone;

pub use buffer::{BufferPolicy, SequentialWriteBuffer};
pub use config::{ResetPolicy, ZnsConfig, DEFAULT_WAL_SUFFIX};
pub use error::{ZnsError, ZnsResult};
pub use mode::{validate_mount, WalSubsystem, ZnsMode};
pub use types::{PoolStats, WalName, ZoneInfo, ZoneState};
pub use vfs::{ZnsFile, ZnsVfs};
pub use zonewal_storage::DeviceCharacteristics;
pub use zone::{scan_zones, zone_file_name, DeleteOutcome, ZoneEntry, ZoneLifecycle, ZoneManager};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
