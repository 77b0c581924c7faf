//! Reset command implementation.

use super::CommandError;
use std::path::Path;
use std::sync::Arc;
use zonewal_core::{scan_zones, ResetPolicy, ZoneLifecycle, ZoneManager};
use tracing::info;
use zonewal_storage::OsFileSystem;

/// Parses a zone id given as hex, with or without a `0x` prefix.
pub fn parse_zone_id(raw: &str) -> Result<u32, CommandError> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    u32::from_str_radix(digits, 16).map_err(|_| CommandError::InvalidZoneId(raw.to_string()))
}

/// Resets zone `zone` under `mount`.
pub fn run(mount: &Path, zone: &str) -> Result<(), CommandError> {
    let id = parse_zone_id(zone)?;
    let entry = scan_zones(mount)?
        .into_iter()
        .find(|entry| entry.id == id)
        .ok_or_else(|| CommandError::UnknownZone {
            id,
            mount: mount.display().to_string(),
        })?;

    info!("Resetting zone {:04x} under {:?}", id, mount);
    let lifecycle = ZoneLifecycle::new(
        Arc::new(OsFileSystem::new()),
        Arc::new(ZoneManager::new()),
        ResetPolicy::Strict,
    );
    lifecycle.reset_zone(&entry.path)?;
    println!("Reset zone {:04x} ({})", id, entry.path.display());
    Ok(())
}
