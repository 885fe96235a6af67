//! Disk space lookup via `sysinfo`.

use std::path::Path;
use sysinfo::Disks;
use tracing::debug;

use crate::error::{MigrationError, Result};
use crate::library::DiskSpaceProbe;

/// Disk space information.
#[derive(Debug, Clone)]
pub struct DiskSpaceInfo {
    /// Total space in bytes.
    pub total: u64,
    /// Free space in bytes.
    pub free: u64,
    /// Mount point of the matched disk.
    pub mount_point: String,
}

/// Look up the disk holding `path`.
///
/// Picks the disk with the longest mount point that prefixes `path`. Fails
/// when no disk matches or the match reports zero capacity.
pub fn disk_space_for_path(path: &Path) -> Result<DiskSpaceInfo> {
    let disks = Disks::new_with_refreshed_list();
    let path_str = path.to_string_lossy();

    let mut best_match: Option<(&sysinfo::Disk, usize)> = None;
    for disk in disks.list() {
        let mount_point = disk.mount_point().to_string_lossy();
        if path_str.starts_with(mount_point.as_ref()) {
            let match_len = mount_point.len();
            if best_match.map_or(true, |(_, len)| match_len > len) {
                best_match = Some((disk, match_len));
            }
        }
    }

    let disk = best_match.map(|(disk, _)| disk).ok_or_else(|| {
        MigrationError::Other(format!("No mounted disk holds {}", path.display()))
    })?;
    if disk.total_space() == 0 {
        return Err(MigrationError::Other(format!(
            "Disk {} reports no capacity",
            disk.mount_point().display()
        )));
    }

    let info = DiskSpaceInfo {
        total: disk.total_space(),
        free: disk.available_space(),
        mount_point: disk.mount_point().to_string_lossy().to_string(),
    };
    debug!(
        "Disk for {}: {} ({} free of {})",
        path.display(),
        info.mount_point,
        info.free,
        info.total
    );
    Ok(info)
}

/// [`DiskSpaceProbe`] backed by the system disk list.
#[derive(Debug, Default, Clone)]
pub struct SysinfoDiskProbe;

impl SysinfoDiskProbe {
    pub fn new() -> Self {
        Self
    }
}

impl DiskSpaceProbe for SysinfoDiskProbe {
    fn available_space(&self, path: &Path) -> Result<u64> {
        disk_space_for_path(path).map(|info| info.free)
    }
}
