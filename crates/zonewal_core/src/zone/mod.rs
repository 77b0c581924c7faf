//! Zone pool management.
//!
//! - [`scanner`] discovers zone files under a mount path
//! - [`ZoneManager`] binds zones to WALs
//! - [`ZoneLifecycle`] resets zones when their WAL goes away

mod lifecycle;
mod manager;
pub mod scanner;

pub use lifecycle::{DeleteOutcome, ZoneLifecycle};
pub(crate) use manager::LeaseGrant;
pub use manager::ZoneManager;
pub use scanner::{scan_zones, zone_file_name, ZoneEntry};
