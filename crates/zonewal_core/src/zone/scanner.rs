//! Zone directory discovery.
//!
//! A zoned file system exposes each zone as a file directly under the
//! mount path, named by its zone number in four lowercase hex digits:
//!
//! ```text
//! <mount>/
//! ├─ 0000
//! ├─ 0001
//! └─ ...
//! ```
//!
//! Anything else in the directory is ignored.

use crate::error::{ZnsError, ZnsResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of hex digits in a zone file name.
pub const ZONE_NAME_WIDTH: usize = 4;

/// A zone file found under the mount path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneEntry {
    /// Zone number.
    pub id: u32,
    /// Path of the zone file.
    pub path: PathBuf,
}

/// Returns the file name of zone `id`.
#[must_use]
pub fn zone_file_name(id: u32) -> String {
    format!("{id:0width$x}", width = ZONE_NAME_WIDTH)
}

/// Parses a zone file name; `None` unless it is exactly four lowercase
/// hex digits.
#[must_use]
pub fn parse_zone_name(name: &str) -> Option<u32> {
    let well_formed = name.len() == ZONE_NAME_WIDTH
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !well_formed {
        return None;
    }
    u32::from_str_radix(name, 16).ok()
}

/// Lists the zone files under `mount`, ordered by zone number.
///
/// # Errors
///
/// Returns [`ZnsError::NotFound`] if `mount` cannot be opened as a
/// directory, or an I/O error if reading an entry fails.
pub fn scan_zones(mount: &Path) -> ZnsResult<Vec<ZoneEntry>> {
    let entries = fs::read_dir(mount).map_err(|_| ZnsError::not_found(mount))?;

    let mut zones = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        if let Some(id) = name.to_str().and_then(parse_zone_name) {
            zones.push(ZoneEntry {
                id,
                path: entry.path(),
            });
        }
    }

    zones.sort_by_key(|zone| zone.id);
    Ok(zones)
}
