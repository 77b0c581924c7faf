//! # zonewal Testkit
//!
//! Test utilities for zonewal.
//!
//! This crate provides:
//! - Temporary zone mounts populated with zone files
//! - A file system that injects reset and write failures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use zonewal_testkit::prelude::*;
//!
//! #[test]
//! fn wal_lands_in_zone() {
//!     let mount = TempMount::new(2);
//!     let vfs = mount.vfs();
//!     let mut wal = vfs.open(&mount.data_path("main.db-wal"), OpenFlags::default()).unwrap();
//!     // ... test operations
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faults;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faults::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use zonewal_core::{ZnsConfig, ZnsError, ZnsVfs};
    pub use zonewal_storage::{FileSystem, OpenFlags};
}

pub use faults::*;
pub use fixtures::*;
pub use generators::*;
