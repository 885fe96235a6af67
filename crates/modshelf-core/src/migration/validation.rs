//! Pre-flight and post-migration checks.

use std::path::Path;
use tracing::debug;

use super::analyzer::SourceAnalyzer;
use super::context::RunContext;
use super::types::{RunResult, StepKind};
use crate::error::{MigrationError, Result};
use crate::library::DiskSpaceProbe;
use crate::system::format_size;

/// Nearest existing ancestor of `path`, used to pick the volume to probe.
fn existing_ancestor(path: &Path) -> &Path {
    path.ancestors()
        .find(|p| p.exists())
        .unwrap_or(path)
}

/// Reject the run when `required` bytes exceed the free space at `target`.
///
/// The size is an approximation: the archives and previews of the legacy
/// source against the volume holding the destination library.
pub fn check_disk_space(probe: &dyn DiskSpaceProbe, target: &Path, required: u64) -> Result<u64> {
    let available = probe.available_space(existing_ancestor(target))?;
    debug!(
        "Disk space check at {}: {} required, {} available",
        target.display(),
        required,
        available
    );
    if required > available {
        return Err(MigrationError::InsufficientDiskSpace {
            required,
            available,
        });
    }
    Ok(available)
}

/// Source must be a valid legacy installation and the destination volume
/// must have room. Stores the analysis in the context for step 1.
pub async fn preflight(ctx: &mut RunContext, probe: &dyn DiskSpaceProbe) -> Result<()> {
    let source = ctx.options.source.clone();
    if !source.is_dir() {
        return Err(MigrationError::InvalidSource {
            path: source,
            reason: "source path does not exist".to_string(),
        });
    }

    let analysis = SourceAnalyzer::new(ctx.options.preview_extensions.clone())
        .analyze(&source, ctx.options.environment.as_deref())
        .await;
    if !analysis.is_valid {
        let reason = analysis.errors.join("; ");
        ctx.analysis = Some(analysis);
        return Err(MigrationError::InvalidSource {
            path: source,
            reason,
        });
    }

    let required = analysis.required_space();
    ctx.analysis = Some(analysis);
    match check_disk_space(probe, ctx.library.root(), required) {
        Ok(available) => {
            ctx.info(format!(
                "Pre-flight passed: {} needed, {} free",
                format_size(required),
                format_size(available)
            ))
            .await
        }
        Err(e @ MigrationError::InsufficientDiskSpace { .. }) => return Err(e),
        Err(e) => {
            ctx.warn(format!("Free disk space could not be determined: {}", e))
                .await
        }
    }
    Ok(())
}

/// Warnings for enabled categories that produced nothing.
pub fn post_migration_findings(ctx: &RunContext) -> Vec<String> {
    let options = &ctx.options;
    let result: &RunResult = &ctx.result;
    let mut findings = Vec::new();

    if options.is_enabled(StepKind::Archives) && result.mods_migrated == 0 {
        findings.push("No mods were migrated".to_string());
    }
    if options.is_enabled(StepKind::Previews) && result.previews_copied == 0 {
        findings.push("No preview images were copied (they may already exist)".to_string());
    }
    if options.is_enabled(StepKind::Classifications)
        && result.classification_entries_created == 0
        && ctx.created_nodes.is_empty()
    {
        findings.push("No classification entries were migrated".to_string());
    }
    findings
}

/// Log the post-migration verdict. Never fails the run.
pub async fn validate_results(ctx: &mut RunContext) {
    for finding in post_migration_findings(ctx) {
        ctx.warn(finding).await;
    }
    if ctx.result.errors.is_empty() {
        ctx.info("Post-migration validation passed").await;
    } else {
        ctx.log
            .warn(format!(
                "Post-migration validation: {} item(s) failed, see errors above",
                ctx.result.errors.len()
            ))
            .await;
    }
}
