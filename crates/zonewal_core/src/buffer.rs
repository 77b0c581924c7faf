//! Sequential write buffer.
//!
//! A WAL writer treats its file as random-access: it appends frames and
//! then patches bytes it already wrote (the header, checksums). A zone only
//! accepts appends at its write pointer. [`SequentialWriteBuffer`] sits in
//! between: every write lands in memory, and only the unflushed tail of the
//! buffer, `[flushed_size, size)`, is ever sent to the zone, in one
//! sequential append per flush.
//!
//! Rewrites below the flush frontier are accepted and kept in memory but
//! never reach the zone. Reads go to the zone directly, so only flushed
//! bytes are visible to them.

use crate::config::ZnsConfig;
use crate::error::{ZnsError, ZnsResult};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use zonewal_storage::StorageBackend;

/// Growth rules for the in-memory buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPolicy {
    /// Smallest capacity ever allocated.
    pub min_capacity: usize,
    /// Capacities are rounded up to a multiple of this.
    pub alignment: usize,
}

impl Default for BufferPolicy {
    fn default() -> Self {
        Self {
            min_capacity: 4096,
            alignment: 4096,
        }
    }
}

impl From<&ZnsConfig> for BufferPolicy {
    fn from(config: &ZnsConfig) -> Self {
        Self {
            min_capacity: config.min_buffer_capacity,
            alignment: config.buffer_alignment,
        }
    }
}

impl BufferPolicy {
    /// Capacity to grow to so that `needed` bytes fit: at least double the
    /// current capacity, at least `min_capacity`, rounded up to
    /// `alignment`. `None` on overflow.
    #[must_use]
    pub fn grown_capacity(&self, current: usize, needed: usize) -> Option<usize> {
        let target = needed
            .max(current.saturating_mul(2))
            .max(self.min_capacity);
        let alignment = self.alignment.max(1);
        target
            .checked_add(alignment - 1)
            .map(|t| t / alignment * alignment)
    }
}

/// Buffers WAL writes and flushes them to a zone as sequential appends.
///
/// `size()` is the logical size the WAL sees, including bytes not yet
/// flushed. `flushed_size() <= size()` always holds.
#[derive(Debug)]
pub struct SequentialWriteBuffer<B> {
    zone: PathBuf,
    region: B,
    buf: Vec<u8>,
    flushed: u64,
    policy: BufferPolicy,
}

impl<B: StorageBackend> SequentialWriteBuffer<B> {
    /// Creates a buffer over the open zone `region` stored at `zone`.
    ///
    /// The flush frontier starts at the zone's current size, so a zone
    /// that still holds an earlier log is appended to, not overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone size cannot be read or the initial
    /// buffer cannot be allocated.
    pub fn new(zone: impl Into<PathBuf>, region: B, policy: BufferPolicy) -> ZnsResult<Self> {
        let flushed = region.size()?;
        let len = usize::try_from(flushed).map_err(|_| ZnsError::OutOfMemory {
            requested: usize::MAX,
        })?;

        let mut buffer = Self {
            zone: zone.into(),
            region,
            buf: Vec::new(),
            flushed,
            policy,
        };
        buffer.reserve(len)?;
        buffer.buf.resize(len, 0);
        Ok(buffer)
    }

    /// Path of the zone this buffer flushes to.
    #[must_use]
    pub fn zone(&self) -> &Path {
        &self.zone
    }

    /// Returns the open zone.
    #[must_use]
    pub fn region(&self) -> &B {
        &self.region
    }

    /// Logical size: every byte written so far, flushed or not.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Bytes already written to the zone.
    #[must_use]
    pub fn flushed_size(&self) -> u64 {
        self.flushed
    }

    /// Bytes waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> u64 {
        self.size() - self.flushed
    }

    /// Current allocation of the in-memory buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Copies `data` into the buffer at `offset`.
    ///
    /// Writes may overlap earlier data or extend the end of the buffer, but
    /// must not start past it. The zone is not touched.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::WriteGap`] if `offset > size()`, leaving the
    /// buffer unchanged, or [`ZnsError::OutOfMemory`] if it cannot grow.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> ZnsResult<()> {
        let buffered = self.size();
        if offset > buffered {
            return Err(ZnsError::WriteGap { offset, buffered });
        }

        // offset <= buf.len(), so it fits in usize
        let start = offset as usize;
        let end = start
            .checked_add(data.len())
            .ok_or(ZnsError::OutOfMemory {
                requested: usize::MAX,
            })?;

        if end > self.buf.len() {
            self.reserve(end)?;
            self.buf.resize(end, 0);
        }
        self.buf[start..end].copy_from_slice(data);

        if offset < self.flushed {
            trace!(zone = %self.zone.display(), offset, len = data.len(), "rewrite below flush frontier");
        }
        Ok(())
    }

    /// Reads `len` bytes at `offset` straight from the zone.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the range has not been flushed or the
    /// read fails.
    pub fn read(&self, offset: u64, len: usize) -> ZnsResult<Vec<u8>> {
        Ok(self.region.read_at(offset, len)?)
    }

    /// Appends `[flushed_size, size)` to the zone at `flushed_size`.
    ///
    /// Returns the number of bytes written; zero, with no I/O, when nothing
    /// is pending.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::WriteFailed`] if the zone refuses the append.
    /// The frontier is not advanced, so the flush can be retried.
    pub fn flush(&mut self) -> ZnsResult<usize> {
        if self.pending() == 0 {
            return Ok(0);
        }

        let offset = self.flushed;
        let tail = &self.buf[offset as usize..];
        self.region
            .write_at(offset, tail)
            .map_err(|source| ZnsError::WriteFailed { offset, source })?;

        let written = tail.len();
        self.flushed = self.size();
        debug!(zone = %self.zone.display(), offset, written, "buffer flushed");
        Ok(written)
    }

    /// Flushes, then asks the zone to make the data durable. The durability
    /// request is skipped if the flush fails.
    ///
    /// # Errors
    ///
    /// Returns the flush error, or a storage error from the sync.
    pub fn sync(&mut self) -> ZnsResult<()> {
        self.flush()?;
        self.region.sync()?;
        Ok(())
    }

    /// Truncates the log.
    ///
    /// Truncating to zero resets the zone and discards every buffered
    /// byte. Any other size is accepted and ignored: a zone cannot be cut
    /// at an interior offset.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResetFailed`] if the zone reset fails; the
    /// buffer is then left as it was.
    pub fn truncate(&mut self, size: u64) -> ZnsResult<()> {
        if size > 0 {
            trace!(zone = %self.zone.display(), size, "ignoring interior truncate");
            return Ok(());
        }

        self.region
            .truncate(0)
            .map_err(|e| ZnsError::reset_failed(&self.zone, e))?;
        self.buf.clear();
        self.flushed = 0;
        debug!(zone = %self.zone.display(), "zone reset by truncate");
        Ok(())
    }

    fn reserve(&mut self, needed: usize) -> ZnsResult<()> {
        if needed <= self.buf.capacity() {
            return Ok(());
        }
        let target = self
            .policy
            .grown_capacity(self.buf.capacity(), needed)
            .ok_or(ZnsError::OutOfMemory { requested: needed })?;
        self.buf
            .try_reserve_exact(target - self.buf.len())
            .map_err(|_| ZnsError::OutOfMemory { requested: target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonewal_storage::{InMemoryBackend, StorageError, StorageResult, ZoneFile};

    fn buffer() -> SequentialWriteBuffer<ZoneFile<InMemoryBackend>> {
        let zone = ZoneFile::new(InMemoryBackend::new()).unwrap();
        SequentialWriteBuffer::new("0000", zone, BufferPolicy::default()).unwrap()
    }

    /// Zone whose appends fail until `healthy` is set.
    #[derive(Default)]
    struct FlakyZone {
        inner: InMemoryBackend,
        healthy: bool,
        syncs: usize,
    }

    impl StorageBackend for FlakyZone {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }

        fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
            if !self.healthy {
                return Err(StorageError::Io(std::io::Error::other("zone full")));
            }
            self.inner.write_at(offset, data)
        }

        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }

        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }

        fn sync(&mut self) -> StorageResult<()> {
            self.syncs += 1;
            Ok(())
        }

        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            if !self.healthy {
                return Err(StorageError::ZoneReset("device busy".into()));
            }
            self.inner.truncate(new_size)
        }
    }

    #[test]
    fn header_frame_rewrite_flush() {
        let mut buf = buffer();

        buf.write(0, &[1; 16]).unwrap();
        assert!(matches!(buf.write(32, &[2; 100]), Err(ZnsError::WriteGap { .. })));
        buf.write(16, &[0; 16]).unwrap();
        buf.write(32, &[2; 100]).unwrap();
        assert_eq!(buf.size(), 132);

        buf.write(0, &[3; 16]).unwrap();
        assert_eq!(buf.size(), 132);

        assert_eq!(buf.flush().unwrap(), 132);
        assert_eq!(buf.region().stats().appends, 1);
        assert_eq!(buf.region().inner().data()[..16], [3; 16]);

        assert_eq!(buf.flush().unwrap(), 0);
        assert_eq!(buf.region().stats().appends, 1);
        assert_eq!(buf.flushed_size(), 132);
    }

    #[test]
    fn gap_write_leaves_state_unchanged() {
        let mut buf = buffer();
        buf.write(0, b"abcd").unwrap();

        let err = buf.write(5, b"x").unwrap_err();
        assert!(err.is_write_error());
        assert_eq!(buf.size(), 4);
        assert_eq!(buf.pending(), 4);
    }

    #[test]
    fn write_at_end_appends() {
        let mut buf = buffer();
        buf.write(0, b"abc").unwrap();
        buf.write(3, b"def").unwrap();
        assert_eq!(buf.size(), 6);
    }

    #[test]
    fn only_frontier_is_flushed() {
        let mut buf = buffer();
        buf.write(0, b"first").unwrap();
        buf.flush().unwrap();

        buf.write(0, b"FIRST").unwrap();
        buf.write(5, b"second").unwrap();
        assert_eq!(buf.flush().unwrap(), 6);

        assert_eq!(buf.region().inner().data(), b"firstsecond".to_vec());
        assert_eq!(buf.region().stats().bytes_appended, 11);
    }

    #[test]
    fn capacity_grows_geometrically_and_aligned() {
        let mut buf = buffer();
        buf.write(0, &[0; 16]).unwrap();
        assert!(buf.capacity() >= 4096);

        buf.write(16, &[0; 4100]).unwrap();
        assert!(buf.capacity() >= 8192);
    }

    #[test]
    fn grown_capacity_rules() {
        let policy = BufferPolicy::default();
        assert_eq!(policy.grown_capacity(0, 1), Some(4096));
        assert_eq!(policy.grown_capacity(4096, 4097), Some(8192));
        assert_eq!(policy.grown_capacity(8192, 40_000), Some(40_960));

        let odd = BufferPolicy {
            min_capacity: 100,
            alignment: 64,
        };
        assert_eq!(odd.grown_capacity(0, 10), Some(128));
        assert_eq!(odd.grown_capacity(usize::MAX, usize::MAX), None);
    }

    #[test]
    fn reopen_appends_after_existing_data() {
        let zone = ZoneFile::new(InMemoryBackend::with_data(b"old".to_vec())).unwrap();
        let mut buf = SequentialWriteBuffer::new("0000", zone, BufferPolicy::default()).unwrap();
        assert_eq!(buf.size(), 3);
        assert_eq!(buf.flushed_size(), 3);

        buf.write(3, b"new").unwrap();
        buf.flush().unwrap();
        assert_eq!(buf.region().inner().data(), b"oldnew".to_vec());
    }

    #[test]
    fn reads_come_from_the_zone() {
        let mut buf = buffer();
        buf.write(0, b"hello").unwrap();
        assert!(buf.read(0, 5).is_err());

        buf.flush().unwrap();
        assert_eq!(buf.read(0, 5).unwrap(), b"hello");
    }

    #[test]
    fn failed_flush_keeps_frontier_and_can_retry() {
        let mut buf =
            SequentialWriteBuffer::new("0000", FlakyZone::default(), BufferPolicy::default())
                .unwrap();
        buf.write(0, b"frame").unwrap();

        let err = buf.flush().unwrap_err();
        assert!(matches!(err, ZnsError::WriteFailed { offset: 0, .. }));
        assert_eq!(buf.flushed_size(), 0);

        buf.region.healthy = true;
        assert_eq!(buf.flush().unwrap(), 5);
        assert_eq!(buf.flushed_size(), 5);
    }

    #[test]
    fn sync_skips_durability_when_flush_fails() {
        let mut buf =
            SequentialWriteBuffer::new("0000", FlakyZone::default(), BufferPolicy::default())
                .unwrap();
        buf.write(0, b"frame").unwrap();

        assert!(buf.sync().is_err());
        assert_eq!(buf.region().syncs, 0);

        buf.region.healthy = true;
        buf.sync().unwrap();
        assert_eq!(buf.region().syncs, 1);
    }

    #[test]
    fn truncate_zero_resets_zone() {
        let mut buf = buffer();
        buf.write(0, b"flushed").unwrap();
        buf.flush().unwrap();
        buf.write(7, b"pending").unwrap();

        buf.truncate(0).unwrap();
        assert_eq!(buf.size(), 0);
        assert_eq!(buf.flushed_size(), 0);
        assert_eq!(buf.region().write_pointer(), 0);
        assert_eq!(buf.region().stats().resets, 1);

        buf.write(0, b"fresh").unwrap();
        buf.flush().unwrap();
        assert_eq!(buf.region().inner().data(), b"fresh".to_vec());
    }

    #[test]
    fn interior_truncate_is_ignored() {
        let mut buf = buffer();
        buf.write(0, b"0123456789").unwrap();
        buf.flush().unwrap();

        buf.truncate(4).unwrap();
        assert_eq!(buf.size(), 10);
        assert_eq!(buf.region().stats().resets, 0);
    }

    #[test]
    fn failed_reset_leaves_buffer_intact() {
        let mut buf =
            SequentialWriteBuffer::new("0003", FlakyZone::default(), BufferPolicy::default())
                .unwrap();
        buf.write(0, b"frame").unwrap();

        let err = buf.truncate(0).unwrap_err();
        assert!(matches!(err, ZnsError::ResetFailed { ref path, .. } if path == Path::new("0003")));
        assert_eq!(buf.size(), 5);
    }
}
