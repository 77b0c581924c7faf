//! File system capability.
//!
//! [`FileSystem`] is the path-level counterpart of [`StorageBackend`]: it
//! opens files, deletes them, answers access checks and exposes the zone
//! reset primitive. Layers that redirect some paths elsewhere wrap a
//! `FileSystem` and forward everything they do not intercept.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::file::FileBackend;
use std::fs::{self, File};
use std::path::Path;

/// Flags for [`FileSystem::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Create the file if it does not exist.
    pub create: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self { create: true }
    }
}

impl OpenFlags {
    /// Flags for opening a file that must already exist.
    #[must_use]
    pub const fn existing() -> Self {
        Self { create: false }
    }
}

/// Path-level file operations.
pub trait FileSystem: Send + Sync {
    /// Opens the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, or does not exist and
    /// `flags.create` is false.
    fn open(&self, path: &Path, flags: OpenFlags) -> StorageResult<Box<dyn StorageBackend>>;

    /// Deletes the file at `path`, optionally syncing the parent directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be removed.
    fn delete(&self, path: &Path, sync_dir: bool) -> StorageResult<()>;

    /// Returns whether a file exists at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if existence cannot be determined.
    fn exists(&self, path: &Path) -> StorageResult<bool>;

    /// Resets the zone file at `path`: its content is discarded and its
    /// write pointer returns to zero.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be opened and
    /// [`StorageError::ZoneReset`] if the reset itself fails.
    fn reset_zone(&self, path: &Path) -> StorageResult<()>;
}

/// [`FileSystem`] backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    /// Creates the OS file system handle.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn open(&self, path: &Path, flags: OpenFlags) -> StorageResult<Box<dyn StorageBackend>> {
        let backend = if flags.create {
            FileBackend::open(path)?
        } else {
            FileBackend::open_existing(path)?
        };
        Ok(Box::new(backend))
    }

    fn delete(&self, path: &Path, sync_dir: bool) -> StorageResult<()> {
        fs::remove_file(path)?;
        if sync_dir {
            if let Some(parent) = path.parent() {
                File::open(parent)?.sync_all()?;
            }
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> StorageResult<bool> {
        Ok(path.try_exists()?)
    }

    fn reset_zone(&self, path: &Path) -> StorageResult<()> {
        let mut zone = FileBackend::open_existing(path)?;
        zone.truncate(0)
            .map_err(|e| StorageError::ZoneReset(format!("{}: {e}", path.display())))
    }
}
