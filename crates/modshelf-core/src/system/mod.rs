//! System utilities: disk space lookup and size formatting.

mod disk;
mod size;

pub use disk::{disk_space_for_path, DiskSpaceInfo, SysinfoDiskProbe};
pub use size::format_size;
