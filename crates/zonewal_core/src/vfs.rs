//! WAL redirection over a [`FileSystem`].
//!
//! [`ZnsVfs`] decorates a file system. Every path the WAL subsystem does
//! not claim, and every path while ZNS mode is off, is forwarded to the
//! wrapped file system untouched. A WAL path under ZNS mode is instead
//! bound to a zone from the [`ZoneManager`], and its handle writes through
//! a [`SequentialWriteBuffer`].

use crate::buffer::{BufferPolicy, SequentialWriteBuffer};
use crate::config::ZnsConfig;
use crate::error::{ZnsError, ZnsResult};
use crate::mode::{validate_mount, WalSubsystem, ZnsMode};
use crate::types::WalName;
use crate::zone::{DeleteOutcome, LeaseGrant, ZoneLifecycle, ZoneManager};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use tracing::{debug, warn};
use zonewal_storage::{
    DeviceCharacteristics, FileSystem, OpenFlags, StorageBackend, ZoneFile, ZoneStats,
};

/// One open handle's share of a zone binding. The zone is freed when the
/// last lease on the binding drops.
#[derive(Debug)]
struct ZoneLease {
    zones: Weak<ZoneManager>,
    binding: u64,
}

impl Drop for ZoneLease {
    fn drop(&mut self) {
        if let Some(zones) = self.zones.upgrade() {
            zones.release_lease(self.binding);
        }
    }
}

struct ZonedWal {
    buffer: SequentialWriteBuffer<ZoneFile<Box<dyn StorageBackend>>>,
    sector_size: u32,
    _lease: ZoneLease,
}

impl Drop for ZonedWal {
    fn drop(&mut self) {
        let pending = self.buffer.pending();
        if pending > 0 {
            warn!(
                zone = %self.buffer.zone().display(),
                pending,
                "closing WAL with unflushed bytes"
            );
        }
    }
}

enum Handle {
    PassThrough(Box<dyn StorageBackend>),
    Zoned(ZonedWal),
}

/// A file opened through [`ZnsVfs`].
///
/// Redirected WAL handles buffer writes in memory; only `sync` and `flush`
/// write to the zone. Handles opened on the same WAL share its zone, which
/// is freed (not reset) when the last of them closes.
pub struct ZnsFile {
    path: PathBuf,
    handle: Handle,
}

impl ZnsFile {
    /// The path the file was opened with.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this handle writes to a zone.
    #[must_use]
    pub fn is_redirected(&self) -> bool {
        matches!(self.handle, Handle::Zoned(_))
    }

    /// The zone file backing this handle, if redirected.
    #[must_use]
    pub fn zone_path(&self) -> Option<&Path> {
        match &self.handle {
            Handle::Zoned(wal) => Some(wal.buffer.zone()),
            Handle::PassThrough(_) => None,
        }
    }

    /// Bytes written to the zone so far, if redirected.
    #[must_use]
    pub fn flushed_size(&self) -> Option<u64> {
        match &self.handle {
            Handle::Zoned(wal) => Some(wal.buffer.flushed_size()),
            Handle::PassThrough(_) => None,
        }
    }

    /// I/O counters of the zone, if redirected.
    #[must_use]
    pub fn zone_stats(&self) -> Option<ZoneStats> {
        match &self.handle {
            Handle::Zoned(wal) => Some(wal.buffer.region().stats()),
            Handle::PassThrough(_) => None,
        }
    }

    /// Reads `len` bytes at `offset`.
    ///
    /// Redirected handles read from the zone, so bytes not yet flushed are
    /// not visible.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    pub fn read(&self, offset: u64, len: usize) -> ZnsResult<Vec<u8>> {
        match &self.handle {
            Handle::PassThrough(file) => Ok(file.read_at(offset, len)?),
            Handle::Zoned(wal) => wal.buffer.read(offset, len),
        }
    }

    /// Writes `data` at `offset`.
    ///
    /// # Errors
    ///
    /// On a redirected handle, returns [`ZnsError::WriteGap`] if `offset`
    /// is past the logical end of the log.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> ZnsResult<()> {
        match &mut self.handle {
            Handle::PassThrough(file) => Ok(file.write_at(offset, data)?),
            Handle::Zoned(wal) => wal.buffer.write(offset, data),
        }
    }

    /// Sends buffered WAL bytes to the zone without a durability request.
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::WriteFailed`] if the zone refuses the append.
    pub fn flush(&mut self) -> ZnsResult<usize> {
        match &mut self.handle {
            Handle::PassThrough(file) => {
                file.flush()?;
                Ok(0)
            }
            Handle::Zoned(wal) => wal.buffer.flush(),
        }
    }

    /// Makes every write so far durable.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or syncing fails.
    pub fn sync(&mut self) -> ZnsResult<()> {
        match &mut self.handle {
            Handle::PassThrough(file) => Ok(file.sync()?),
            Handle::Zoned(wal) => wal.buffer.sync(),
        }
    }

    /// Returns the file size. For redirected handles this is the logical
    /// size, including bytes not yet flushed.
    ///
    /// # Errors
    ///
    /// Returns an error if the size of a pass-through file cannot be read.
    pub fn size(&self) -> ZnsResult<u64> {
        match &self.handle {
            Handle::PassThrough(file) => Ok(file.size()?),
            Handle::Zoned(wal) => Ok(wal.buffer.size()),
        }
    }

    /// Truncates the file.
    ///
    /// On a redirected handle, truncating to zero resets the zone and any
    /// other size is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResetFailed`] if the zone reset fails.
    pub fn truncate(&mut self, size: u64) -> ZnsResult<()> {
        match &mut self.handle {
            Handle::PassThrough(file) => Ok(file.truncate(size)?),
            Handle::Zoned(wal) => wal.buffer.truncate(size),
        }
    }

    /// Sector size of the device: the configured zone sector size when
    /// redirected, the wrapped file's otherwise.
    #[must_use]
    pub fn sector_size(&self) -> u32 {
        match &self.handle {
            Handle::Zoned(wal) => wal.sector_size,
            Handle::PassThrough(file) => file.sector_size(),
        }
    }

    /// Device capabilities for this handle. A redirected handle adds
    /// `sequential` and `safe_append` to those of its zone file.
    #[must_use]
    pub fn device_characteristics(&self) -> DeviceCharacteristics {
        match &self.handle {
            Handle::Zoned(wal) => wal.buffer.region().device_characteristics(),
            Handle::PassThrough(file) => file.device_characteristics(),
        }
    }

    /// Closes the file.
    ///
    /// A redirected handle gives up its share of the zone binding; bytes
    /// that were never flushed are discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if a pass-through file fails to flush.
    pub fn close(mut self) -> ZnsResult<()> {
        if let Handle::PassThrough(file) = &mut self.handle {
            file.flush()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ZnsFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZnsFile")
            .field("path", &self.path)
            .field("zone", &self.zone_path())
            .finish()
    }
}

/// File system decorator that redirects WAL files to zones.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use zonewal_core::{ZnsConfig, ZnsVfs};
/// use zonewal_storage::{OpenFlags, OsFileSystem};
///
/// let vfs = ZnsVfs::new(Arc::new(OsFileSystem::new()), ZnsConfig::default());
/// vfs.use_zns(Some(Path::new("/mnt/zonefs/seq")))?;
///
/// let mut wal = vfs.open(Path::new("/data/main.db-wal"), OpenFlags::default())?;
/// wal.write(0, b"header")?;
/// wal.sync()?;
/// # Ok::<(), zonewal_core::ZnsError>(())
/// ```
pub struct ZnsVfs {
    inner: Arc<dyn FileSystem>,
    wal: Arc<dyn WalSubsystem>,
    mode: Option<Arc<ZnsMode>>,
    zones: Arc<ZoneManager>,
    lifecycle: ZoneLifecycle,
    config: ZnsConfig,
}

impl ZnsVfs {
    /// Creates a decorator with its own [`ZnsMode`] switch, initially off.
    pub fn new(inner: Arc<dyn FileSystem>, config: ZnsConfig) -> Self {
        let mode = Arc::new(ZnsMode::new(config.wal_suffix.clone()));
        let wal: Arc<dyn WalSubsystem> = mode.clone();
        Self::build(inner, wal, Some(mode), config)
    }

    /// Creates a decorator that asks an external WAL subsystem whether and
    /// where to redirect.
    pub fn with_subsystem(
        inner: Arc<dyn FileSystem>,
        wal: Arc<dyn WalSubsystem>,
        config: ZnsConfig,
    ) -> Self {
        Self::build(inner, wal, None, config)
    }

    fn build(
        inner: Arc<dyn FileSystem>,
        wal: Arc<dyn WalSubsystem>,
        mode: Option<Arc<ZnsMode>>,
        config: ZnsConfig,
    ) -> Self {
        let zones = Arc::new(ZoneManager::new());
        let lifecycle = ZoneLifecycle::new(
            Arc::clone(&inner),
            Arc::clone(&zones),
            config.reset_policy,
        );
        Self {
            inner,
            wal,
            mode,
            zones,
            lifecycle,
            config,
        }
    }

    /// The zone pool.
    #[must_use]
    pub fn zones(&self) -> &Arc<ZoneManager> {
        &self.zones
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &ZnsConfig {
        &self.config
    }

    /// Turns ZNS mode on for `Some(mount)` and off for `None`.
    ///
    /// Enabling validates the mount and (re)scans its zones. Disabling
    /// destroys the pool; handles still open keep their buffers but no
    /// longer hold a binding.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::NotFound`] if the mount is missing and
    /// [`ZnsError::Misuse`] if it is not a directory.
    pub fn use_zns(&self, mount: Option<&Path>) -> ZnsResult<()> {
        match mount {
            Some(mount) => {
                validate_mount(mount)?;
                self.zones.init(mount)?;
                if let Some(mode) = &self.mode {
                    mode.enable(mount)?;
                }
            }
            None => {
                if let Some(mode) = &self.mode {
                    mode.disable();
                }
                self.zones.destroy();
            }
        }
        Ok(())
    }

    /// Opens `path`, redirecting it to a zone if it is a WAL under ZNS mode.
    ///
    /// Zone files are opened without create or truncate; a zone that still
    /// holds data is appended to.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResourceExhausted`] if no zone is free, or any
    /// error from the underlying file system.
    pub fn open(&self, path: &Path, flags: OpenFlags) -> ZnsResult<ZnsFile> {
        let Some(wal) = self.redirect(path) else {
            return Ok(ZnsFile {
                path: path.to_path_buf(),
                handle: Handle::PassThrough(self.inner.open(path, flags)?),
            });
        };

        self.sync_pool()?;
        let LeaseGrant {
            path: zone,
            binding,
            fresh,
        } = self.zones.acquire_lease(&wal)?;
        let lease = ZoneLease {
            zones: Arc::downgrade(&self.zones),
            binding,
        };

        let opened = self
            .inner
            .open(&zone, OpenFlags::existing())
            .map_err(ZnsError::from)
            .and_then(|file| ZoneFile::new(file).map_err(ZnsError::from))
            .and_then(|region| {
                SequentialWriteBuffer::new(&zone, region, BufferPolicy::from(&self.config))
            });
        // On error the lease drops here, freeing a fresh binding.
        let buffer = opened?;

        debug!(
            wal = %wal,
            zone = %zone.display(),
            fresh,
            flushed = buffer.flushed_size(),
            "WAL redirected to zone"
        );
        Ok(ZnsFile {
            path: path.to_path_buf(),
            handle: Handle::Zoned(ZonedWal {
                buffer,
                sector_size: self.config.sector_size,
                _lease: lease,
            }),
        })
    }

    /// Deletes `path`.
    ///
    /// A WAL under ZNS mode that holds a zone has the zone reset and
    /// released instead. A WAL without a zone is deleted from the wrapped
    /// file system if it exists there.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResetFailed`] under the strict reset policy, or
    /// any error from the underlying file system.
    pub fn delete(&self, path: &Path, sync_dir: bool) -> ZnsResult<()> {
        if let Some(wal) = self.redirect(path) {
            if self.lifecycle.delete_wal(&wal)? != DeleteOutcome::NotBound {
                return Ok(());
            }
            if !self.inner.exists(path)? {
                return Ok(());
            }
        }
        Ok(self.inner.delete(path, sync_dir)?)
    }

    /// Returns whether `path` exists. A WAL under ZNS mode exists while it
    /// is bound to a zone.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying file system.
    pub fn exists(&self, path: &Path) -> ZnsResult<bool> {
        if let Some(wal) = self.redirect(path) {
            if self.zones.lookup(&wal).is_some() {
                return Ok(true);
            }
        }
        Ok(self.inner.exists(path)?)
    }

    /// Resets the zone file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResetFailed`] if the reset fails.
    pub fn reset_zone(&self, path: &Path) -> ZnsResult<()> {
        self.lifecycle.reset_zone(path)
    }

    fn redirect(&self, path: &Path) -> Option<WalName> {
        if !self.wal.zns_enabled() || !self.wal.is_wal_file(path) {
            return None;
        }
        WalName::from_path(path)
    }

    /// Points the pool at the subsystem's current mount path, scanning it
    /// if the pool is empty or was built for another path.
    fn sync_pool(&self) -> ZnsResult<()> {
        let mount = self
            .wal
            .zns_mount_path()
            .ok_or_else(|| ZnsError::misuse("ZNS mode is enabled without a mount path"))?;
        self.zones.init(&mount)
    }
}

impl std::fmt::Debug for ZnsVfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZnsVfs")
            .field("zones", &self.zones)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
