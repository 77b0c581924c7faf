//! Append-only zone adapter.
//!
//! A zone accepts writes only at its write pointer and can only be shrunk
//! by resetting it to empty. [`ZoneFile`] enforces those rules on top of
//! any [`StorageBackend`], so the same code path runs against a real zone
//! file on a zoned file system and against an in-memory stand-in.
//!
//! On a zoned file system, truncating a sequential zone file to zero
//! resets the zone, so [`ZoneFile::reset`] is expressed as `truncate(0)`
//! on the wrapped backend.

use crate::backend::{DeviceCharacteristics, StorageBackend};
use crate::error::{StorageError, StorageResult};

/// I/O counters for one open zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZoneStats {
    /// Total bytes written through this handle.
    pub bytes_appended: u64,
    /// Number of non-empty append writes issued.
    pub appends: u64,
    /// Number of successful zone resets.
    pub resets: u64,
}

/// A backend that only accepts sequential appends at its write pointer.
///
/// # Example
///
/// ```rust
/// use zonewal_storage::{InMemoryBackend, StorageBackend, StorageError, ZoneFile};
///
/// let mut zone = ZoneFile::new(InMemoryBackend::new()).unwrap();
/// zone.write_at(0, b"frame").unwrap();
/// assert!(matches!(
///     zone.write_at(0, b"again"),
///     Err(StorageError::NotSequential { .. })
/// ));
/// zone.reset().unwrap();
/// assert_eq!(zone.write_pointer(), 0);
/// ```
#[derive(Debug)]
pub struct ZoneFile<B> {
    inner: B,
    write_pointer: u64,
    stats: ZoneStats,
}

impl<B: StorageBackend> ZoneFile<B> {
    /// Wraps a backend; the write pointer starts at its current size.
    ///
    /// # Errors
    ///
    /// Returns an error if the size of the backend cannot be read.
    pub fn new(inner: B) -> StorageResult<Self> {
        let write_pointer = inner.size()?;
        Ok(Self {
            inner,
            write_pointer,
            stats: ZoneStats::default(),
        })
    }

    /// Returns the offset the next write must start at.
    #[must_use]
    pub fn write_pointer(&self) -> u64 {
        self.write_pointer
    }

    /// Returns the I/O counters of this handle.
    #[must_use]
    pub fn stats(&self) -> ZoneStats {
        self.stats
    }

    /// Returns the wrapped backend.
    #[must_use]
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Resets the zone: discards its content and rewinds the write pointer.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::ZoneReset`] if the device refuses the reset.
    pub fn reset(&mut self) -> StorageResult<()> {
        self.inner
            .truncate(0)
            .map_err(|e| StorageError::ZoneReset(e.to_string()))?;
        self.write_pointer = 0;
        self.stats.resets += 1;
        Ok(())
    }
}

impl<B: StorageBackend> StorageBackend for ZoneFile<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        if offset != self.write_pointer {
            return Err(StorageError::NotSequential {
                offset,
                write_pointer: self.write_pointer,
            });
        }
        if data.is_empty() {
            return Ok(());
        }

        self.inner.write_at(offset, data)?;
        self.write_pointer += data.len() as u64;
        self.stats.bytes_appended += data.len() as u64;
        self.stats.appends += 1;
        Ok(())
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.write_pointer;
        self.write_at(offset, data)?;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.write_pointer)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        if new_size == 0 {
            return self.reset();
        }
        Err(StorageError::Unsupported(format!(
            "zones cannot be truncated to {new_size} bytes, only reset"
        )))
    }

    fn sector_size(&self) -> u32 {
        self.inner.sector_size()
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        self.inner
            .device_characteristics()
            .union(DeviceCharacteristics {
                sequential: true,
                safe_append: true,
            })
    }
}
