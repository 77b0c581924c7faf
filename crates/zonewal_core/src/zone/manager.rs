//! Zone pool and WAL-to-zone allocation.

use crate::error::{ZnsError, ZnsResult};
use crate::types::{PoolStats, WalName, ZoneInfo, ZoneState};
use crate::zone::scanner::scan_zones;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info};

/// One zone of the pool. Allocated exactly when `occupant` is set.
#[derive(Debug)]
struct Zone {
    id: u32,
    path: PathBuf,
    occupant: Option<WalName>,
    /// Identifies the current binding; unique for the manager's lifetime.
    binding: u64,
    /// Open handles sharing the current binding.
    handles: usize,
}

impl Zone {
    fn vacate(&mut self) -> Option<WalName> {
        self.handles = 0;
        self.occupant.take()
    }

    fn state(&self) -> ZoneState {
        if self.occupant.is_some() {
            ZoneState::Allocated
        } else {
            ZoneState::Free
        }
    }
}

/// One open handle's share of a zone binding, from
/// [`ZoneManager::acquire_lease`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LeaseGrant {
    pub(crate) path: PathBuf,
    pub(crate) binding: u64,
    /// Whether this call created the binding.
    pub(crate) fresh: bool,
}

#[derive(Debug)]
struct ZonePool {
    mount: PathBuf,
    zones: Vec<Zone>,
}

/// Owns the zone pool of one mount path and binds zones to WALs.
///
/// The pool is fixed at [`init`](Self::init): every zone file found under
/// the mount path, all free. From then on each zone is either free or
/// bound to exactly one [`WalName`], and no two zones share an occupant.
///
/// All bookkeeping happens under a single lock that is never held across
/// I/O. Directory scanning in `init` runs before the lock is taken.
///
/// # Example
///
/// ```rust,no_run
/// use zonewal_core::{WalName, ZoneManager};
/// use std::path::Path;
///
/// let zones = ZoneManager::open(Path::new("/mnt/zonefs/seq"))?;
/// let path = zones.acquire(&WalName::from("main.db-wal"))?;
/// // ... write the WAL into `path` ...
/// zones.release_wal(&WalName::from("main.db-wal"));
/// # Ok::<(), zonewal_core::ZnsError>(())
/// ```
#[derive(Debug, Default)]
pub struct ZoneManager {
    pool: Mutex<Option<ZonePool>>,
    next_binding: AtomicU64,
}

impl ZoneManager {
    /// Creates a manager with no pool. Every allocation fails with
    /// [`ZnsError::Misuse`] until [`init`](Self::init) succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager and initialises it from `mount`.
    ///
    /// # Errors
    ///
    /// See [`init`](Self::init).
    pub fn open(mount: &Path) -> ZnsResult<Self> {
        let manager = Self::new();
        manager.init(mount)?;
        Ok(manager)
    }

    /// Builds the pool from the zone files under `mount`.
    ///
    /// Re-initialising with the current mount path is a no-op; a different
    /// path replaces the existing pool and drops all of its bindings.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::NotFound`] if `mount` cannot be read and
    /// [`ZnsError::OutOfMemory`] if the pool cannot be allocated.
    pub fn init(&self, mount: &Path) -> ZnsResult<()> {
        if self.mount_path().as_deref() == Some(mount) {
            return Ok(());
        }

        let entries = scan_zones(mount)?;
        let mut zones = Vec::new();
        zones
            .try_reserve_exact(entries.len())
            .map_err(|_| ZnsError::OutOfMemory {
                requested: entries.len() * std::mem::size_of::<Zone>(),
            })?;
        zones.extend(entries.into_iter().map(|entry| Zone {
            id: entry.id,
            path: entry.path,
            occupant: None,
            binding: 0,
            handles: 0,
        }));

        let mut pool = self.pool.lock();
        if pool.as_ref().is_some_and(|p| p.mount == mount) {
            return Ok(());
        }
        if let Some(old) = pool.take() {
            info!(mount = %old.mount.display(), "replacing zone pool");
        }
        info!(mount = %mount.display(), zones = zones.len(), "zone pool initialised");
        *pool = Some(ZonePool {
            mount: mount.to_path_buf(),
            zones,
        });
        Ok(())
    }

    /// Drops the pool and every binding. Safe to call when uninitialised.
    pub fn destroy(&self) {
        if let Some(old) = self.pool.lock().take() {
            info!(mount = %old.mount.display(), "zone pool destroyed");
        }
    }

    /// Returns whether a pool is loaded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.pool.lock().is_some()
    }

    /// Returns the mount path of the loaded pool.
    #[must_use]
    pub fn mount_path(&self) -> Option<PathBuf> {
        self.pool.lock().as_ref().map(|p| p.mount.clone())
    }

    /// Returns the zone bound to `wal`, binding the first free zone if it
    /// has none yet.
    ///
    /// Acquiring again for a WAL that already holds a zone returns the same
    /// zone. Free zones are handed out first-fit in zone-number order.
    ///
    /// # Errors
    ///
    /// Returns [`ZnsError::ResourceExhausted`] if no zone is free, or
    /// [`ZnsError::Misuse`] if the manager has no pool.
    pub fn acquire(&self, wal: &WalName) -> ZnsResult<PathBuf> {
        self.bind(wal, false).map(|grant| grant.path)
    }

    /// Like [`acquire`](Self::acquire), and counts one more open handle on
    /// the binding. The binding outlives every handle but the last; see
    /// [`release_lease`](Self::release_lease).
    pub(crate) fn acquire_lease(&self, wal: &WalName) -> ZnsResult<LeaseGrant> {
        self.bind(wal, true)
    }

    /// Drops one handle from the binding `binding`, freeing the zone when
    /// it was the last.
    ///
    /// A binding that was already released, or that belonged to a pool
    /// since replaced, matches no zone and is ignored. Returns whether the
    /// zone was freed.
    pub(crate) fn release_lease(&self, binding: u64) -> bool {
        let mut guard = self.pool.lock();
        let Some(zone) = guard.as_mut().and_then(|pool| {
            pool.zones
                .iter_mut()
                .find(|z| z.occupant.is_some() && z.binding == binding)
        }) else {
            return false;
        };

        zone.handles = zone.handles.saturating_sub(1);
        if zone.handles > 0 {
            return false;
        }
        if let Some(wal) = zone.vacate() {
            debug!(wal = %wal, zone = zone.id, "zone released by last handle");
        }
        true
    }

    fn bind(&self, wal: &WalName, lease: bool) -> ZnsResult<LeaseGrant> {
        let mut guard = self.pool.lock();
        let pool = guard
            .as_mut()
            .ok_or_else(|| ZnsError::misuse("zone pool is not initialised"))?;

        if let Some(zone) = pool
            .zones
            .iter_mut()
            .find(|z| z.occupant.as_ref() == Some(wal))
        {
            if lease {
                zone.handles += 1;
            }
            return Ok(LeaseGrant {
                path: zone.path.clone(),
                binding: zone.binding,
                fresh: false,
            });
        }

        let total = pool.zones.len();
        let zone = pool
            .zones
            .iter_mut()
            .find(|z| z.occupant.is_none())
            .ok_or_else(|| ZnsError::ResourceExhausted {
                wal: wal.to_string(),
                zones: total,
            })?;

        zone.occupant = Some(wal.clone());
        zone.binding = self.next_binding.fetch_add(1, Ordering::Relaxed) + 1;
        zone.handles = usize::from(lease);
        debug!(wal = %wal, zone = zone.id, "zone acquired");
        Ok(LeaseGrant {
            path: zone.path.clone(),
            binding: zone.binding,
            fresh: true,
        })
    }

    /// Returns the zone currently bound to `wal`, without allocating.
    #[must_use]
    pub fn lookup(&self, wal: &WalName) -> Option<PathBuf> {
        self.pool.lock().as_ref().and_then(|pool| {
            pool.zones
                .iter()
                .find(|z| z.occupant.as_ref() == Some(wal))
                .map(|z| z.path.clone())
        })
    }

    /// Frees the zone bound to `wal`, whatever handles still share it.
    ///
    /// Returns whether a binding was removed; releasing an unbound WAL is a
    /// no-op.
    pub fn release_wal(&self, wal: &WalName) -> bool {
        self.release_where(|zone| zone.occupant.as_ref() == Some(wal))
    }

    /// Frees the zone whose file is `path`.
    ///
    /// Returns whether a binding was removed; releasing a free zone is a
    /// no-op.
    pub fn release_path(&self, path: &Path) -> bool {
        self.release_where(|zone| zone.path == path)
    }

    fn release_where(&self, mut predicate: impl FnMut(&Zone) -> bool) -> bool {
        let mut guard = self.pool.lock();
        let Some(pool) = guard.as_mut() else {
            return false;
        };

        match pool
            .zones
            .iter_mut()
            .find(|z| z.occupant.is_some() && predicate(z))
        {
            Some(zone) => {
                if let Some(wal) = zone.vacate() {
                    debug!(wal = %wal, zone = zone.id, "zone released");
                }
                true
            }
            None => false,
        }
    }

    /// Returns a view of every zone in pool order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ZoneInfo> {
        self.pool
            .lock()
            .as_ref()
            .map(|pool| {
                pool.zones
                    .iter()
                    .map(|z| ZoneInfo {
                        id: z.id,
                        path: z.path.clone(),
                        state: z.state(),
                        occupant: z.occupant.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns free and allocated zone counts.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let guard = self.pool.lock();
        let Some(pool) = guard.as_ref() else {
            return PoolStats::default();
        };
        let allocated = pool.zones.iter().filter(|z| z.occupant.is_some()).count();
        PoolStats {
            zones: pool.zones.len(),
            free: pool.zones.len() - allocated,
            allocated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::{tempdir, TempDir};

    fn mount_with_zones(count: u32) -> TempDir {
        let dir = tempdir().unwrap();
        for id in 0..count {
            fs::write(dir.path().join(format!("{id:04x}")), b"").unwrap();
        }
        dir
    }

    #[test]
    fn uninitialised_manager_refuses_allocation() {
        let zones = ZoneManager::new();
        let result = zones.acquire(&WalName::from("db-wal"));
        assert!(matches!(result, Err(ZnsError::Misuse { .. })));
        assert!(!zones.release_wal(&WalName::from("db-wal")));
        assert!(zones.snapshot().is_empty());
    }

    #[test]
    fn init_missing_mount_fails() {
        let dir = tempdir().unwrap();
        let zones = ZoneManager::new();
        let result = zones.init(&dir.path().join("nope"));
        assert!(matches!(result, Err(ZnsError::NotFound { .. })));
        assert!(!zones.is_initialized());
    }

    #[test]
    fn init_all_zones_free() {
        let mount = mount_with_zones(3);
        let zones = ZoneManager::open(mount.path()).unwrap();

        let stats = zones.stats();
        assert_eq!(stats.zones, 3);
        assert_eq!(stats.free, 3);
        assert!(zones
            .snapshot()
            .iter()
            .all(|z| z.state == ZoneState::Free && z.occupant.is_none()));
    }

    #[test]
    fn reinit_same_mount_keeps_bindings() {
        let mount = mount_with_zones(2);
        let zones = ZoneManager::open(mount.path()).unwrap();
        zones.acquire(&WalName::from("db-wal")).unwrap();

        zones.init(mount.path()).unwrap();
        assert_eq!(zones.stats().allocated, 1);
    }

    #[test]
    fn reinit_other_mount_replaces_pool() {
        let first = mount_with_zones(2);
        let second = mount_with_zones(5);
        let zones = ZoneManager::open(first.path()).unwrap();
        zones.acquire(&WalName::from("db-wal")).unwrap();

        zones.init(second.path()).unwrap();
        assert_eq!(zones.mount_path().unwrap(), second.path());
        assert_eq!(zones.stats().zones, 5);
        assert_eq!(zones.stats().allocated, 0);
    }

    #[test]
    fn acquire_is_first_fit_and_idempotent() {
        let mount = mount_with_zones(2);
        let zones = ZoneManager::open(mount.path()).unwrap();
        let db = WalName::from("db-wal");

        let first = zones.acquire(&db).unwrap();
        assert_eq!(first, mount.path().join("0000"));
        assert_eq!(zones.acquire(&db).unwrap(), first);
        assert_eq!(zones.stats().allocated, 1);
    }

    #[test]
    fn exhausted_pool_reports_resource_exhausted() {
        let mount = mount_with_zones(1);
        let zones = ZoneManager::open(mount.path()).unwrap();
        zones.acquire(&WalName::from("a-wal")).unwrap();

        let result = zones.acquire(&WalName::from("b-wal"));
        assert!(matches!(
            result,
            Err(ZnsError::ResourceExhausted { zones: 1, .. })
        ));
    }

    #[test]
    fn double_release_is_harmless() {
        let mount = mount_with_zones(2);
        let zones = ZoneManager::open(mount.path()).unwrap();
        let db = WalName::from("db-wal");
        zones.acquire(&db).unwrap();

        assert!(zones.release_wal(&db));
        assert!(!zones.release_wal(&db));
        assert_eq!(zones.stats().free, 2);
        assert_eq!(zones.snapshot()[0].state, ZoneState::Free);
    }

    #[test]
    fn lease_released_by_last_handle_only() {
        let mount = mount_with_zones(1);
        let zones = ZoneManager::open(mount.path()).unwrap();
        let db = WalName::from("db-wal");

        let first = zones.acquire_lease(&db).unwrap();
        let second = zones.acquire_lease(&db).unwrap();
        assert!(first.fresh);
        assert!(!second.fresh);
        assert_eq!(first.binding, second.binding);

        assert!(!zones.release_lease(first.binding));
        assert_eq!(zones.lookup(&db), Some(first.path.clone()));
        assert!(matches!(
            zones.acquire(&WalName::from("other-wal")),
            Err(ZnsError::ResourceExhausted { .. })
        ));

        assert!(zones.release_lease(second.binding));
        assert_eq!(zones.stats().free, 1);
    }

    #[test]
    fn stale_lease_leaves_new_binding_alone() {
        let mount = mount_with_zones(1);
        let zones = ZoneManager::open(mount.path()).unwrap();
        let db = WalName::from("db-wal");

        let old = zones.acquire_lease(&db).unwrap();
        assert!(zones.release_wal(&db));
        let new = zones.acquire_lease(&db).unwrap();
        assert_ne!(old.binding, new.binding);

        assert!(!zones.release_lease(old.binding));
        assert_eq!(zones.lookup(&db), Some(new.path));
    }

    #[test]
    fn lease_from_replaced_pool_is_ignored() {
        let mount = mount_with_zones(1);
        let zones = ZoneManager::open(mount.path()).unwrap();
        let db = WalName::from("db-wal");

        let old = zones.acquire_lease(&db).unwrap();
        zones.destroy();
        zones.init(mount.path()).unwrap();
        zones.acquire_lease(&db).unwrap();

        assert!(!zones.release_lease(old.binding));
        assert_eq!(zones.stats().allocated, 1);
    }

    #[test]
    fn release_by_path() {
        let mount = mount_with_zones(2);
        let zones = ZoneManager::open(mount.path()).unwrap();
        let path = zones.acquire(&WalName::from("db-wal")).unwrap();

        assert!(zones.release_path(&path));
        assert!(zones.lookup(&WalName::from("db-wal")).is_none());
        assert!(!zones.release_path(&path));
    }

    #[test]
    fn release_of_one_wal_keeps_others() {
        let mount = mount_with_zones(2);
        let zones = ZoneManager::open(mount.path()).unwrap();
        zones.acquire(&WalName::from("a-wal")).unwrap();
        let b = zones.acquire(&WalName::from("b-wal")).unwrap();

        zones.release_wal(&WalName::from("a-wal"));
        assert_eq!(zones.lookup(&WalName::from("b-wal")), Some(b));
    }

    #[test]
    fn destroy_is_idempotent() {
        let mount = mount_with_zones(1);
        let zones = ZoneManager::open(mount.path()).unwrap();
        zones.destroy();
        zones.destroy();
        assert!(!zones.is_initialized());
        assert_eq!(zones.stats(), PoolStats::default());
    }

    #[test]
    fn concurrent_acquire_never_double_books() {
        let mount = mount_with_zones(4);
        let zones = Arc::new(ZoneManager::open(mount.path()).unwrap());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let zones = Arc::clone(&zones);
                thread::spawn(move || zones.acquire(&WalName::new(format!("wal-{i}"))).ok())
            })
            .collect();

        let mut granted: Vec<PathBuf> = handles
            .into_iter()
            .filter_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(granted.len(), 4);

        granted.sort();
        granted.dedup();
        assert_eq!(granted.len(), 4);
    }
}
