//! Identifier and state types shared across the crate.

use std::fmt;
use std::path::{Path, PathBuf};

/// Identity of a logical WAL: the base name of its path.
///
/// Two handles refer to the same WAL exactly when their names compare
/// equal, wherever the paths they were opened with point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WalName(String);

impl WalName {
    /// Creates a WAL name from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Derives the WAL name from the last component of `path`.
    ///
    /// Returns `None` if the path has no file name.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.file_name()
            .map(|name| Self(name.to_string_lossy().into_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WalName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Allocation state of a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneState {
    /// Not bound to any WAL.
    Free,
    /// Bound to exactly one WAL.
    Allocated,
}

/// Point-in-time view of one zone in the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneInfo {
    /// Zone number parsed from the file name.
    pub id: u32,
    /// Absolute path of the zone file.
    pub path: PathBuf,
    /// Allocation state.
    pub state: ZoneState,
    /// The WAL bound to the zone, if allocated.
    pub occupant: Option<WalName>,
}

/// Pool occupancy counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total zones in the pool.
    pub zones: usize,
    /// Zones available for allocation.
    pub free: usize,
    /// Zones bound to a WAL.
    pub allocated: usize,
}
