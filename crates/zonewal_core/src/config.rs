//! ZNS redirection configuration.

/// Default WAL file suffix.
pub const DEFAULT_WAL_SUFFIX: &str = "-wal";

/// What happens to the WAL-to-zone mapping when the physical reset of a
/// deleted WAL's zone fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetPolicy {
    /// Free the zone anyway and report success. The zone may be handed to
    /// the next WAL still holding stale bytes.
    #[default]
    Lenient,
    /// Fail the delete and keep the zone bound to the WAL, so a stale zone
    /// is never reused.
    Strict,
}

/// Configuration for ZNS WAL redirection.
#[derive(Debug, Clone)]
pub struct ZnsConfig {
    /// Suffix identifying WAL files, matched case-insensitively.
    pub wal_suffix: String,

    /// Smallest capacity a write buffer grows to.
    pub min_buffer_capacity: usize,

    /// Buffer capacities are rounded up to a multiple of this.
    pub buffer_alignment: usize,

    /// Behaviour when a zone reset fails during delete.
    pub reset_policy: ResetPolicy,

    /// Sector size reported by redirected WAL handles.
    pub sector_size: u32,
}

impl Default for ZnsConfig {
    fn default() -> Self {
        Self {
            wal_suffix: DEFAULT_WAL_SUFFIX.to_string(),
            min_buffer_capacity: 4096,
            buffer_alignment: 4096,
            reset_policy: ResetPolicy::Lenient,
            sector_size: 4096,
        }
    }
}

impl ZnsConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the WAL file suffix.
    #[must_use]
    pub fn wal_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.wal_suffix = suffix.into();
        self
    }

    /// Sets the minimum buffer capacity.
    #[must_use]
    pub const fn min_buffer_capacity(mut self, bytes: usize) -> Self {
        self.min_buffer_capacity = bytes;
        self
    }

    /// Sets the buffer capacity alignment.
    #[must_use]
    pub const fn buffer_alignment(mut self, bytes: usize) -> Self {
        self.buffer_alignment = bytes;
        self
    }

    /// Sets the reset failure policy.
    #[must_use]
    pub const fn reset_policy(mut self, policy: ResetPolicy) -> Self {
        self.reset_policy = policy;
        self
    }

    /// Sets the reported sector size.
    #[must_use]
    pub const fn sector_size(mut self, bytes: u32) -> Self {
        self.sector_size = bytes;
        self
    }
}
