//! Destination library - where migrated mods, nodes and files land.
//!
//! ```text
//! Collaborator traits (traits.rs)
//!     │
//!     ├── JsonLibraryStore   - ModRepository + ClassificationService + SettingsStore
//!     ├── FsCopyService      - FileCopyService
//!     ├── MagicArchiveService - ArchiveService
//!     └── SysinfoDiskProbe   - DiskSpaceProbe (crate::system)
//! ```

mod archive;
mod atomic;
mod files;
mod hashing;
mod store;
mod traits;
mod types;

pub use archive::{detect_from_header, MagicArchiveService};
pub use atomic::{atomic_read_json, atomic_write_json};
pub use files::FsCopyService;
pub use hashing::{fingerprint_archive, fingerprint_archive_async, ArchiveFingerprint};
pub use store::JsonLibraryStore;
pub use traits::{
    ArchiveService, ClassificationService, DiskSpaceProbe, FileCopyService, ModRepository,
    SettingsStore,
};
pub use types::*;

use crate::config::LibraryLayout;
use std::path::{Path, PathBuf};

/// Paths of a destination library rooted at one directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryPaths {
    root: PathBuf,
}

impl LibraryPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join(LibraryLayout::ARCHIVES_DIR)
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.root.join(LibraryLayout::PREVIEWS_DIR)
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.root.join(LibraryLayout::THUMBNAILS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join(LibraryLayout::LOGS_DIR)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join(LibraryLayout::BACKUP_DIR)
    }

    pub fn store_file(&self) -> PathBuf {
        self.root.join(LibraryLayout::STORE_FILE)
    }

    pub fn rules_file(&self) -> PathBuf {
        self.root.join(LibraryLayout::RULES_FILE)
    }
}
