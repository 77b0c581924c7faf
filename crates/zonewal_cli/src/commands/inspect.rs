//! Inspect command implementation.

use super::CommandError;
use serde::Serialize;
use std::path::Path;
use zonewal_core::scan_zones;
use zonewal_storage::{FileBackend, StorageBackend};

/// Pool inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Mount path.
    pub mount: String,
    /// Number of zones found.
    pub zone_count: usize,
    /// Zones holding data.
    pub used_count: usize,
    /// Total bytes across all zones.
    pub total_size: u64,
    /// Per-zone details.
    pub zones: Vec<ZoneReport>,
}

/// One zone file.
#[derive(Debug, Serialize)]
pub struct ZoneReport {
    /// Zone id.
    pub id: u32,
    /// Zone file path.
    pub path: String,
    /// Bytes written to the zone.
    pub size: u64,
}

/// Scans `mount` and gathers zone sizes.
pub fn inspect(mount: &Path) -> Result<InspectResult, CommandError> {
    let entries = scan_zones(mount)?;
    let mut zones = Vec::with_capacity(entries.len());
    for entry in entries {
        let size = FileBackend::open_existing(&entry.path)?.size()?;
        zones.push(ZoneReport {
            id: entry.id,
            path: entry.path.display().to_string(),
            size,
        });
    }

    Ok(InspectResult {
        mount: mount.display().to_string(),
        zone_count: zones.len(),
        used_count: zones.iter().filter(|z| z.size > 0).count(),
        total_size: zones.iter().map(|z| z.size).sum(),
        zones,
    })
}

/// Runs the inspect command.
pub fn run(mount: &Path, format: &str) -> Result<(), CommandError> {
    let result = inspect(mount)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => print_text_output(&result),
        other => return Err(CommandError::UnknownFormat(other.to_string())),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("zonewal Zone Pool");
    println!("=================");
    println!();
    println!("Mount: {}", result.mount);
    println!(
        "Zones: {} ({} holding data)",
        result.zone_count, result.used_count
    );
    println!("Total: {}", format_size(result.total_size));
    println!();
    for zone in &result.zones {
        println!("  [{:04x}] {:>10}  {}", zone.id, format_size(zone.size), zone.path);
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
