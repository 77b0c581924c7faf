//! Zone reset and WAL deletion.

use crate::config::ResetPolicy;
use crate::error::{ZnsError, ZnsResult};
use crate::types::WalName;
use crate::zone::manager::ZoneManager;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use zonewal_storage::FileSystem;

/// Result of deleting a WAL under ZNS mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The WAL had no zone; nothing was done.
    NotBound,
    /// The zone was reset and released.
    Reset {
        /// The zone that was freed.
        zone: PathBuf,
    },
    /// The reset failed but the zone was released anyway
    /// ([`ResetPolicy::Lenient`]). The zone may still hold stale bytes.
    ReleasedDirty {
        /// The zone that was freed.
        zone: PathBuf,
    },
}

/// Turns WAL deletion into zone reset plus release.
///
/// The reset runs without the pool lock held; the release happens after
/// it.
pub struct ZoneLifecycle {
    fs: Arc<dyn FileSystem>,
    zones: Arc<ZoneManager>,
    policy: ResetPolicy,
}

impl ZoneLifecycle {
    /// Creates a lifecycle adapter over `fs` and `zones`.
    pub fn new(fs: Arc<dyn FileSystem>, zones: Arc<ZoneManager>, policy: ResetPolicy) -> Self {
        Self { fs, zones, policy }
    }

    /// Resets the zone file at `path` to empty.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResetFailed`] if the zone cannot be opened or
    /// the reset primitive fails.
    pub fn reset_zone(&self, path: &Path) -> ZnsResult<()> {
        self.fs
            .reset_zone(path)
            .map_err(|e| ZnsError::reset_failed(path, e))?;
        debug!(zone = %path.display(), "zone reset");
        Ok(())
    }

    /// Deletes the WAL `wal`: resets its zone and frees the binding.
    ///
    /// Under [`ResetPolicy::Lenient`] the binding is freed even when the
    /// reset fails, and the call succeeds with
    /// [`DeleteOutcome::ReleasedDirty`]. Under [`ResetPolicy::Strict`] a
    /// failed reset is returned and the zone stays bound.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResetFailed`] only under the strict policy.
    pub fn delete_wal(&self, wal: &WalName) -> ZnsResult<DeleteOutcome> {
        let Some(zone) = self.zones.lookup(wal) else {
            return Ok(DeleteOutcome::NotBound);
        };

        match self.reset_zone(&zone) {
            Ok(()) => {
                self.zones.release_wal(wal);
                Ok(DeleteOutcome::Reset { zone })
            }
            Err(e) if self.policy == ResetPolicy::Lenient => {
                warn!(wal = %wal, error = %e, "zone reset failed, releasing zone anyway");
                self.zones.release_wal(wal);
                Ok(DeleteOutcome::ReleasedDirty { zone })
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for ZoneLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneLifecycle")
            .field("zones", &self.zones)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
