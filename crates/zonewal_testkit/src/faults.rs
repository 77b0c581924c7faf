//! Fault injection for zone I/O.
//!
//! [`FaultyFileSystem`] wraps the OS file system. A shared [`FaultPlan`]
//! decides when zone resets and writes fail; flipping a flag affects every
//! file opened through the wrapper, including ones already open.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use zonewal_storage::{
    FileSystem, OpenFlags, OsFileSystem, StorageBackend, StorageError, StorageResult,
};

/// Switches for injected failures.
#[derive(Debug, Default)]
pub struct FaultPlan {
    fail_resets: AtomicBool,
    fail_writes: AtomicBool,
    fail_opens: AtomicBool,
    resets_attempted: AtomicUsize,
    writes_attempted: AtomicUsize,
}

impl FaultPlan {
    /// Creates a plan with every fault off.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Sets whether zone resets fail.
    pub fn set_fail_resets(&self, fail: bool) {
        self.fail_resets.store(fail, Ordering::SeqCst);
    }

    /// Sets whether writes fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Sets whether opens fail.
    pub fn set_fail_opens(&self, fail: bool) {
        self.fail_opens.store(fail, Ordering::SeqCst);
    }

    /// Zone resets attempted so far, failed or not.
    pub fn resets_attempted(&self) -> usize {
        self.resets_attempted.load(Ordering::SeqCst)
    }

    /// Writes attempted so far, failed or not.
    pub fn writes_attempted(&self) -> usize {
        self.writes_attempted.load(Ordering::SeqCst)
    }

    fn reset(&self) -> StorageResult<()> {
        self.resets_attempted.fetch_add(1, Ordering::SeqCst);
        if self.fail_resets.load(Ordering::SeqCst) {
            return Err(StorageError::ZoneReset("simulated reset failure".into()));
        }
        Ok(())
    }

    fn write(&self) -> StorageResult<()> {
        self.writes_attempted.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::Other,
                "simulated write failure",
            )));
        }
        Ok(())
    }
}

/// A [`FileSystem`] that fails on demand.
#[derive(Debug, Clone)]
pub struct FaultyFileSystem {
    inner: OsFileSystem,
    plan: Arc<FaultPlan>,
}

impl FaultyFileSystem {
    /// Wraps the OS file system, following `plan`.
    pub fn new(plan: Arc<FaultPlan>) -> Self {
        Self {
            inner: OsFileSystem::new(),
            plan,
        }
    }

    /// The fault plan.
    pub fn plan(&self) -> &Arc<FaultPlan> {
        &self.plan
    }
}

impl FileSystem for FaultyFileSystem {
    fn open(&self, path: &Path, flags: OpenFlags) -> StorageResult<Box<dyn StorageBackend>> {
        if self.plan.fail_opens.load(Ordering::SeqCst) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "simulated open failure",
            )));
        }
        let inner = self.inner.open(path, flags)?;
        Ok(Box::new(FaultyBackend {
            inner,
            plan: Arc::clone(&self.plan),
        }))
    }

    fn delete(&self, path: &Path, sync_dir: bool) -> StorageResult<()> {
        self.inner.delete(path, sync_dir)
    }

    fn exists(&self, path: &Path) -> StorageResult<bool> {
        self.inner.exists(path)
    }

    fn reset_zone(&self, path: &Path) -> StorageResult<()> {
        self.plan.reset()?;
        self.inner.reset_zone(path)
    }
}

/// A file opened through [`FaultyFileSystem`].
struct FaultyBackend {
    inner: Box<dyn StorageBackend>,
    plan: Arc<FaultPlan>,
}

impl StorageBackend for FaultyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        self.plan.write()?;
        self.inner.write_at(offset, data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size == 0 {
            self.plan.reset()?;
        }
        self.inner.truncate(new_size)
    }
}
