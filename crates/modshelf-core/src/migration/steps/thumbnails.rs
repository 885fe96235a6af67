//! Step 4: copy the thumbnail tree and attach thumbnails to nodes.

use async_trait::async_trait;
use tracing::debug;

use super::MigrationStep;
use crate::config::LegacyLayout;
use crate::error::{MigrationError, Result};
use crate::legacy::load_redirection;
use crate::migration::context::{MigrationServices, RunContext};
use crate::migration::types::StepKind;

pub struct MigrateThumbnailsStep;

#[async_trait]
impl MigrationStep for MigrateThumbnailsStep {
    fn kind(&self) -> StepKind {
        StepKind::Thumbnails
    }

    async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()> {
        let src = ctx.environment_path()?.join(LegacyLayout::THUMBNAIL_DIR);
        if !src.is_dir() {
            ctx.info(format!("No thumbnail directory at {}", src.display()))
                .await;
            return Ok(());
        }

        let dest = ctx.library.thumbnails_dir();
        match services.files.copy_directory(&src, &dest).await {
            Ok(copied) => ctx.info(format!("Copied {} thumbnail files", copied)).await,
            Err(e) => {
                // Files copied before the failure can still be attached below
                ctx.record_error(format!("Thumbnail copy incomplete: {}", e))
                    .await
            }
        }

        // The mapping is resolved here; the destination never reads it.
        let stale = dest.join(LegacyLayout::REDIRECTION_FILE);
        if let Err(e) = tokio::fs::remove_file(&stale).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                ctx.warn(format!(
                    "Could not remove copied redirection file: {}",
                    MigrationError::io_with_path(e, &stale)
                ))
                .await;
            }
        }

        let redirection = src.join(LegacyLayout::REDIRECTION_FILE);
        let map = match load_redirection(&redirection, &ctx.options.preview_extensions).await {
            Ok(Some(map)) => map,
            Ok(None) => {
                ctx.info("No redirection file, thumbnails copied without attachments")
                    .await;
                return Ok(());
            }
            Err(e) => {
                ctx.warn(format!(
                    "Redirection file unreadable, thumbnails copied without attachments: {}",
                    e
                ))
                .await;
                return Ok(());
            }
        };

        for collision in &map.collisions {
            ctx.warn(format!(
                "Thumbnail key '{}' maps to both {} and {}; keeping {}",
                collision.key,
                collision.kept.display(),
                collision.discarded.display(),
                collision.kept.display()
            ))
            .await;
        }
        for missing in &map.missing_dirs {
            ctx.info(format!(
                "Thumbnail folder '{}' listed in redirection file does not exist",
                missing.display()
            ))
            .await;
        }

        let total = map.len();
        for (index, entry) in map.entries().enumerate() {
            ctx.report(&entry.key, index + 1, total);

            let Some(node_id) = ctx.created_nodes.get(&entry.key).cloned() else {
                debug!("No classification named '{}', skipping thumbnail", entry.key);
                continue;
            };
            let thumbnail = dest.join(&entry.relative_path);
            if !thumbnail.is_file() {
                ctx.info(format!(
                    "Thumbnail for '{}' not found at {}",
                    entry.key,
                    thumbnail.display()
                ))
                .await;
                continue;
            }

            match services
                .classifications
                .set_node_thumbnail(&node_id, &thumbnail)
                .await
            {
                Ok(()) => ctx.result.thumbnails_attached += 1,
                Err(e) => {
                    ctx.info(format!("Could not attach thumbnail to '{}': {}", entry.key, e))
                        .await
                }
            }
        }

        ctx.info(format!(
            "Attached {} thumbnails ({} redirection entries)",
            ctx.result.thumbnails_attached, total
        ))
        .await;
        Ok(())
    }
}
