//! Filesystem implementation of [`FileCopyService`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::traits::FileCopyService;
use super::types::{ArchiveMode, CopyOutcome};
use crate::error::{MigrationError, Result};

/// Copies files with `tokio::fs`, never overwriting existing destinations.
#[derive(Debug, Default, Clone)]
pub struct FsCopyService;

impl FsCopyService {
    pub fn new() -> Self {
        Self
    }

    async fn ensure_parent(dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MigrationError::io_with_path(e, parent))?;
        }
        Ok(())
    }
}

/// Relative paths under `src` in walk order, flagged `true` for directories.
/// Entries that are neither files nor directories are left out.
fn walk_tree(src: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| MigrationError::Io {
            message: format!("Failed to walk {}: {}", src.display(), e),
            path: e.path().map(Path::to_path_buf),
            source: None,
        })?;
        let file_type = entry.file_type();
        if !file_type.is_dir() && !file_type.is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(src).map_err(|_| {
            MigrationError::Other(format!(
                "{} is not inside {}",
                entry.path().display(),
                src.display()
            ))
        })?;
        entries.push((relative.to_path_buf(), file_type.is_dir()));
    }
    Ok(entries)
}

#[async_trait]
impl FileCopyService for FsCopyService {
    async fn copy_file(&self, src: &Path, dest: &Path, mode: ArchiveMode) -> Result<CopyOutcome> {
        if tokio::fs::try_exists(dest).await.unwrap_or(false) {
            debug!("Destination exists, skipping: {}", dest.display());
            return Ok(CopyOutcome::Skipped);
        }
        if !src.is_file() {
            return Err(MigrationError::NotFound(src.to_path_buf()));
        }

        Self::ensure_parent(dest).await?;

        // Hard link first, copy when the volumes differ
        if mode == ArchiveMode::Link {
            let (link_src, link_dest) = (src.to_path_buf(), dest.to_path_buf());
            let linked = tokio::task::spawn_blocking(move || std::fs::hard_link(link_src, link_dest))
                .await
                .map_err(|e| MigrationError::Other(format!("Link task failed: {}", e)))?;
            match linked {
                Ok(()) => return Ok(CopyOutcome::Linked),
                Err(e) => debug!("Hard link failed ({}), copying {}", e, src.display()),
            }
        }

        tokio::fs::copy(src, dest).await.map_err(|e| MigrationError::Io {
            message: format!("Failed to copy {} -> {}", src.display(), dest.display()),
            path: Some(src.to_path_buf()),
            source: Some(e),
        })?;
        Ok(CopyOutcome::Copied)
    }

    async fn copy_directory(&self, src: &Path, dest: &Path) -> Result<usize> {
        if !src.is_dir() {
            return Err(MigrationError::NotFound(src.to_path_buf()));
        }

        tokio::fs::create_dir_all(dest)
            .await
            .map_err(|e| MigrationError::io_with_path(e, dest))?;

        let walk_root = src.to_path_buf();
        let entries = tokio::task::spawn_blocking(move || walk_tree(&walk_root))
            .await
            .map_err(|e| MigrationError::Other(format!("Directory walk task failed: {}", e)))??;

        let mut copied = 0;
        for (relative, is_dir) in entries {
            let target = dest.join(&relative);
            if is_dir {
                tokio::fs::create_dir_all(&target)
                    .await
                    .map_err(|e| MigrationError::io_with_path(e, &target))?;
            } else if self
                .copy_file(&src.join(&relative), &target, ArchiveMode::Copy)
                .await?
                .transferred()
            {
                copied += 1;
            }
        }

        debug!(
            "Copied {} files from {} to {}",
            copied,
            src.display(),
            dest.display()
        );
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_creates_parents_and_skips_existing() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("a1");
        std::fs::write(&src, b"archive").unwrap();
        let dest = temp.path().join("lib/archives/a1");

        let service = FsCopyService::new();
        let first = service.copy_file(&src, &dest, ArchiveMode::Copy).await.unwrap();
        assert_eq!(first, CopyOutcome::Copied);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive");

        std::fs::write(&src, b"changed").unwrap();
        let second = service.copy_file(&src, &dest, ArchiveMode::Copy).await.unwrap();
        assert_eq!(second, CopyOutcome::Skipped);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive");
    }

    #[tokio::test]
    async fn test_link_mode_leaves_source_in_place() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("b2");
        std::fs::write(&src, b"data").unwrap();
        let dest = temp.path().join("out/b2");

        let outcome = FsCopyService::new()
            .copy_file(&src, &dest, ArchiveMode::Link)
            .await
            .unwrap();
        assert!(outcome.transferred());
        assert!(src.exists());
        assert_eq!(std::fs::read(&dest).unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_copy_missing_source_is_not_found() {
        let temp = TempDir::new().unwrap();
        let result = FsCopyService::new()
            .copy_file(&temp.path().join("nope"), &temp.path().join("out"), ArchiveMode::Copy)
            .await;
        assert!(matches!(result, Err(MigrationError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_copy_directory_counts_new_files_only() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("thumbnail");
        std::fs::create_dir_all(src.join("Characters")).unwrap();
        std::fs::write(src.join("root.png"), b"1").unwrap();
        std::fs::write(src.join("Characters/keqing.png"), b"2").unwrap();
        let dest = temp.path().join("lib/thumbnails");

        let service = FsCopyService::new();
        assert_eq!(service.copy_directory(&src, &dest).await.unwrap(), 2);
        assert!(dest.join("Characters/keqing.png").exists());
        assert_eq!(service.copy_directory(&src, &dest).await.unwrap(), 0);
    }
}
