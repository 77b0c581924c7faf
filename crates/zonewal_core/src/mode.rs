//! ZNS mode switch and the WAL subsystem queries.

use crate::config::DEFAULT_WAL_SUFFIX;
use crate::error::{ZnsError, ZnsResult};
use parking_lot::RwLock;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Questions the redirection layer asks the WAL subsystem.
///
/// Answers are read at every open, delete and access check and never
/// cached.
pub trait WalSubsystem: Send + Sync {
    /// Whether WAL files should be redirected to zones.
    fn zns_enabled(&self) -> bool;

    /// The configured zone mount path.
    fn zns_mount_path(&self) -> Option<PathBuf>;

    /// Whether `path` names a WAL file.
    fn is_wal_file(&self, path: &Path) -> bool;
}

/// Checks that `mount` exists and is a directory.
///
/// # Errors
///
/// Returns [`ZnsError::NotFound`] if the path does not exist and
/// [`ZnsError::Misuse`] if it is not a directory.
pub fn validate_mount(mount: &Path) -> ZnsResult<()> {
    let metadata = match std::fs::metadata(mount) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(ZnsError::not_found(mount)),
        Err(e) => return Err(e.into()),
    };
    if !metadata.is_dir() {
        return Err(ZnsError::misuse(format!(
            "zone mount path is not a directory: {}",
            mount.display()
        )));
    }
    Ok(())
}

/// The stock [`WalSubsystem`]: a switch holding the zone mount path, and a
/// file-name suffix test for WAL files.
///
/// # Example
///
/// ```rust,no_run
/// use zonewal_core::{WalSubsystem, ZnsMode};
/// use std::path::Path;
///
/// let mode = ZnsMode::default();
/// mode.enable(Path::new("/mnt/zonefs/seq"))?;
/// assert!(mode.is_wal_file(Path::new("/data/main.db-wal")));
/// # Ok::<(), zonewal_core::ZnsError>(())
/// ```
#[derive(Debug)]
pub struct ZnsMode {
    wal_suffix: String,
    mount: RwLock<Option<PathBuf>>,
}

impl Default for ZnsMode {
    fn default() -> Self {
        Self::new(DEFAULT_WAL_SUFFIX)
    }
}

impl ZnsMode {
    /// Creates a disabled switch recognising WAL files by `wal_suffix`.
    pub fn new(wal_suffix: impl Into<String>) -> Self {
        Self {
            wal_suffix: wal_suffix.into(),
            mount: RwLock::new(None),
        }
    }

    /// Enables redirection to the zones under `mount`.
    ///
    /// # Errors
    ///
    /// See [`validate_mount`]. The switch is unchanged on error.
    pub fn enable(&self, mount: &Path) -> ZnsResult<()> {
        validate_mount(mount)?;
        *self.mount.write() = Some(mount.to_path_buf());
        info!(mount = %mount.display(), "ZNS mode enabled");
        Ok(())
    }

    /// Disables redirection.
    pub fn disable(&self) {
        if self.mount.write().take().is_some() {
            info!("ZNS mode disabled");
        }
    }
}

impl WalSubsystem for ZnsMode {
    fn zns_enabled(&self) -> bool {
        self.mount.read().is_some()
    }

    fn zns_mount_path(&self) -> Option<PathBuf> {
        self.mount.read().clone()
    }

    fn is_wal_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        let suffix = self.wal_suffix.as_bytes();
        let name = name.as_bytes();
        name.len() > suffix.len()
            && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
    }
}
