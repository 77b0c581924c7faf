//! Storage backend trait definition.

use crate::error::StorageResult;

/// Sector size reported by backends that know nothing better.
pub const DEFAULT_SECTOR_SIZE: u32 = 4096;

/// Device capabilities of an open file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceCharacteristics {
    /// Writes reach the device in the order they were issued.
    pub sequential: bool,
    /// Appended bytes never expose garbage after a crash.
    pub safe_append: bool,
}

impl DeviceCharacteristics {
    /// Capabilities present in either `self` or `other`.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            sequential: self.sequential || other.sequential,
            safe_append: self.safe_append || other.safe_append,
        }
    }
}

/// A single open file, seen as a byte store.
///
/// Backends are **opaque byte stores**. They provide positional reads and
/// writes plus the durability and sizing operations a log writer needs.
/// Backends do not understand WAL frames or zones; zone rules are layered
/// on top by [`super::ZoneFile`].
///
/// # Invariants
///
/// - `append` returns the offset where data was written
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `flush` pushes buffered writes to the OS, `sync` makes them durable
/// - Backends must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For testing
/// - [`super::FileBackend`] - For OS files
/// - [`super::ZoneFile`] - Append-only adapter over another backend
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Writes `data` at `offset`, growing the storage if the write ends
    /// past the current size.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs or the backend refuses the
    /// offset (zones only accept writes at their write pointer).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Appends data to the end of the storage.
    ///
    /// Returns the offset where the data was written.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let offset = self.size()?;
        self.write_at(offset, data)?;
        Ok(offset)
    }

    /// Flushes all pending writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// This is a stronger guarantee than `flush`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Truncates the storage to the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The truncation fails
    /// - `new_size` is greater than current size
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Sector size of the device holding the storage.
    fn sector_size(&self) -> u32 {
        DEFAULT_SECTOR_SIZE
    }

    /// Capabilities of the device holding the storage.
    fn device_characteristics(&self) -> DeviceCharacteristics {
        DeviceCharacteristics::default()
    }
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        (**self).write_at(offset, data)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        (**self).truncate(new_size)
    }

    fn sector_size(&self) -> u32 {
        (**self).sector_size()
    }

    fn device_characteristics(&self) -> DeviceCharacteristics {
        (**self).device_characteristics()
    }
}
