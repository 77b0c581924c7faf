//! # zonewal storage
//!
//! File and file-system capabilities for zonewal.
//!
//! This crate provides the lowest-level storage abstraction. Backends are
//! **opaque byte stores** - they do not interpret the data they store.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (read, write, append, flush, sync)
//! - No knowledge of WAL formats or zone allocation
//! - Must be `Send + Sync` for concurrent access
//! - Zone rules (append-only, reset-to-reuse) are an adapter, not a backend
//!
//! ## Available Types
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//! - [`ZoneFile`] - Append-only adapter with zone reset
//! - [`OsFileSystem`] - Path-level operations against the OS
//!
//! ## Example
//!
//! ```rust
//! use zonewal_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"hello world").unwrap();
//! let data = backend.read_at(offset, 11).unwrap();
//! assert_eq!(&data, b"hello world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod fs;
mod memory;
mod zone;

pub use backend::{DeviceCharacteristics, StorageBackend, DEFAULT_SECTOR_SIZE};
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use fs::{FileSystem, OpenFlags, OsFileSystem};
pub use memory::InMemoryBackend;
pub use zone::{ZoneFile, ZoneStats};
