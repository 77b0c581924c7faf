//! Temporary zone mounts.
//!
//! A [`TempMount`] stands in for a zonefs sequential-zone directory: a
//! temporary directory holding empty zone files named `0000`, `0001`, and
//! so on, plus a separate directory for the database's own files.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use zonewal_core::{zone_file_name, ZnsConfig, ZnsVfs};
use zonewal_storage::{FileSystem, OsFileSystem};

/// A temporary zone mount with automatic cleanup.
pub struct TempMount {
    mount: TempDir,
    data: TempDir,
    zones: u32,
}

impl TempMount {
    /// Creates a mount holding `zones` empty zone files.
    pub fn new(zones: u32) -> Self {
        let mount = TempDir::new().expect("Failed to create mount directory");
        let data = TempDir::new().expect("Failed to create data directory");
        for id in 0..zones {
            fs::write(mount.path().join(zone_file_name(id)), b"").expect("Failed to create zone");
        }
        Self { mount, data, zones }
    }

    /// The mount directory.
    pub fn path(&self) -> &Path {
        self.mount.path()
    }

    /// Number of zone files created.
    pub fn zone_count(&self) -> u32 {
        self.zones
    }

    /// Path of zone `id`.
    pub fn zone_path(&self, id: u32) -> PathBuf {
        self.mount.path().join(zone_file_name(id))
    }

    /// Path of a database file named `name`, outside the mount.
    pub fn data_path(&self, name: &str) -> PathBuf {
        self.data.path().join(name)
    }

    /// Current contents of zone `id`.
    pub fn zone_contents(&self, id: u32) -> Vec<u8> {
        fs::read(self.zone_path(id)).expect("Failed to read zone")
    }

    /// Current size of zone `id`.
    pub fn zone_len(&self, id: u32) -> u64 {
        fs::metadata(self.zone_path(id))
            .expect("Failed to stat zone")
            .len()
    }

    /// Writes `data` straight into zone `id`, as if left by an earlier run.
    pub fn seed_zone(&self, id: u32, data: &[u8]) {
        fs::write(self.zone_path(id), data).expect("Failed to seed zone");
    }

    /// A [`ZnsVfs`] over the OS file system with ZNS mode on for this mount.
    pub fn vfs(&self) -> ZnsVfs {
        self.vfs_with(Arc::new(OsFileSystem::new()), ZnsConfig::default())
    }

    /// Like [`vfs`](Self::vfs), over `fs` and with `config`.
    pub fn vfs_with(&self, fs: Arc<dyn FileSystem>, config: ZnsConfig) -> ZnsVfs {
        let vfs = ZnsVfs::new(fs, config);
        vfs.use_zns(Some(self.path()))
            .expect("Failed to enable ZNS mode");
        vfs
    }
}
