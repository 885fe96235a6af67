//! Collaborator seams consumed by the migration pipeline.
//!
//! The pipeline only talks to the destination through these traits, so a
//! host application can plug in its own storage while tests use the
//! bundled JSON and filesystem implementations.

use async_trait::async_trait;
use std::path::Path;

use super::types::{
    ArchiveMode, ArchiveType, ClassificationNode, CopyOutcome, ModRecord, NewMod, NewNode,
};
use crate::error::Result;

/// Mod records of the destination library.
#[async_trait]
pub trait ModRepository: Send + Sync {
    /// Return the mod with `new_mod.id`, creating it first if needed.
    ///
    /// The boolean is `true` when the record was created by this call.
    async fn get_or_create_mod(&self, new_mod: NewMod) -> Result<(ModRecord, bool)>;

    /// All mods filed under `category` (exact match).
    async fn get_by_category(&self, category: &str) -> Result<Vec<ModRecord>>;

    /// Every distinct tag known to the library.
    async fn get_all_tags(&self) -> Result<Vec<String>>;
}

/// The classification tree. Tree invariants are the implementor's concern.
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn create_node(&self, node: NewNode) -> Result<ClassificationNode>;

    /// First node whose name equals `name` exactly.
    async fn get_node_by_name(&self, name: &str) -> Result<Option<ClassificationNode>>;

    /// The node named `name` directly under `parent_id` (`None` for roots).
    async fn find_node(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<ClassificationNode>>;

    async fn set_node_thumbnail(&self, node_id: &str, thumbnail: &Path) -> Result<()>;
}

/// File transfer into the destination library.
///
/// Both operations create intermediate directories and never overwrite an
/// existing destination file.
#[async_trait]
pub trait FileCopyService: Send + Sync {
    async fn copy_file(&self, src: &Path, dest: &Path, mode: ArchiveMode) -> Result<CopyOutcome>;

    /// Copy a directory tree, returning the number of files copied.
    async fn copy_directory(&self, src: &Path, dest: &Path) -> Result<usize>;
}

/// Archive inspection. Extraction is out of scope.
#[async_trait]
pub trait ArchiveService: Send + Sync {
    async fn detect_archive_type(&self, path: &Path) -> Result<ArchiveType>;

    /// Relative paths of the files inside the archive, if the implementation can list them.
    async fn list_entries(&self, _path: &Path) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Key-value application settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_setting(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

/// Free-space lookup used by the pre-flight check.
pub trait DiskSpaceProbe: Send + Sync {
    /// Bytes available to the current user on the volume holding `path`.
    fn available_space(&self, path: &Path) -> Result<u64>;
}
