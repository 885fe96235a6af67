//! Step 6: copy preview images.
//!
//! ```text
//! resources/preview/<id>.<ext>         -> previews/<mod id>/preview1.<ext>
//! resources/preview/<id>/<file>.<ext>  -> previews/<mod id>/<file>.<ext>
//! ```
//!
//! `<mod id>` is the destination id from step 5 when the legacy identifier
//! was migrated, otherwise the legacy identifier itself. Existing files are
//! never overwritten.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::MigrationStep;
use crate::config::{LegacyLayout, MigrationConfig};
use crate::error::{MigrationError, Result};
use crate::library::ArchiveMode;
use crate::migration::context::{MigrationServices, RunContext};
use crate::migration::types::StepKind;

pub struct MigratePreviewsStep;

/// One planned copy.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PreviewCopy {
    legacy_id: String,
    src: PathBuf,
    /// File name inside the mod's preview folder
    file_name: String,
}

fn is_image(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

fn sorted_entries(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    paths.sort();
    paths
}

/// Plan both passes over the preview root: direct files first, then
/// one-level subfolders.
fn plan_copies(root: &Path, extensions: &[String]) -> Vec<PreviewCopy> {
    let entries = sorted_entries(root);
    let mut copies = Vec::new();

    for path in entries.iter().filter(|p| p.is_file() && is_image(p, extensions)) {
        let (Some(stem), Some(ext)) = (path.file_stem(), path.extension()) else {
            continue;
        };
        copies.push(PreviewCopy {
            legacy_id: stem.to_string_lossy().to_string(),
            src: path.clone(),
            file_name: format!(
                "{}.{}",
                MigrationConfig::PRIMARY_PREVIEW_STEM,
                ext.to_string_lossy()
            ),
        });
    }

    for dir in entries.iter().filter(|p| p.is_dir()) {
        let Some(id) = dir.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };
        for path in sorted_entries(dir)
            .into_iter()
            .filter(|p| p.is_file() && is_image(p, extensions))
        {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
                continue;
            };
            copies.push(PreviewCopy {
                legacy_id: id.clone(),
                src: path,
                file_name,
            });
        }
    }
    copies
}

#[async_trait]
impl MigrationStep for MigratePreviewsStep {
    fn kind(&self) -> StepKind {
        StepKind::Previews
    }

    async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()> {
        let root = ctx
            .options
            .source
            .join(LegacyLayout::RESOURCES_DIR)
            .join(LegacyLayout::PREVIEW_DIR);
        if !root.is_dir() {
            ctx.info(format!("No preview directory at {}", root.display()))
                .await;
            return Ok(());
        }

        let extensions = ctx.options.preview_extensions.clone();
        let plan_root = root.clone();
        let copies = tokio::task::spawn_blocking(move || plan_copies(&plan_root, &extensions))
            .await
            .map_err(|e| MigrationError::Other(format!("Preview scan task failed: {}", e)))?;
        let dest_root = ctx.library.previews_dir();
        let total = copies.len();

        for (position, copy) in copies.iter().enumerate() {
            ctx.cancel.check()?;

            let folder = ctx
                .migrated_mods
                .get(&copy.legacy_id)
                .cloned()
                .unwrap_or_else(|| copy.legacy_id.clone());
            let dest = dest_root.join(&folder).join(&copy.file_name);

            match services
                .files
                .copy_file(&copy.src, &dest, ArchiveMode::Copy)
                .await
            {
                Ok(outcome) if outcome.transferred() => ctx.result.previews_copied += 1,
                Ok(_) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    ctx.record_error(format!(
                        "Failed to copy preview {}: {}",
                        copy.src.display(),
                        e
                    ))
                    .await
                }
            }
            ctx.report(&copy.file_name, position + 1, total);
        }

        ctx.info(format!(
            "Previews: {} of {} copied",
            ctx.result.previews_copied, total
        ))
        .await;
        Ok(())
    }
}
