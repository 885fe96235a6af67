//! Step 1: analyze the legacy source and resolve the environment.

use async_trait::async_trait;

use super::MigrationStep;
use crate::config::LegacyLayout;
use crate::error::{MigrationError, Result};
use crate::migration::analyzer::{environment_path, SourceAnalyzer};
use crate::migration::context::{MigrationServices, RunContext};
use crate::migration::types::StepKind;

/// Reuses an analysis already stored by pre-flight validation when it
/// describes the same source.
pub struct AnalyzeSourceStep;

#[async_trait]
impl MigrationStep for AnalyzeSourceStep {
    fn kind(&self) -> StepKind {
        StepKind::AnalyzeSource
    }

    async fn run(&self, ctx: &mut RunContext, _services: &MigrationServices) -> Result<()> {
        let source = ctx.options.source.clone();
        let analysis = match ctx.analysis.take() {
            Some(analysis) if analysis.source == source => analysis,
            _ => {
                SourceAnalyzer::new(ctx.options.preview_extensions.clone())
                    .analyze(&source, ctx.options.environment.as_deref())
                    .await
            }
        };

        if !analysis.is_valid {
            let reason = analysis.errors.join("; ");
            ctx.analysis = Some(analysis);
            return Err(MigrationError::InvalidSource {
                path: source,
                reason,
            });
        }

        let environment = analysis
            .active_environment
            .clone()
            .unwrap_or_else(|| LegacyLayout::DEFAULT_ENVIRONMENT.to_string());
        ctx.environment_path = Some(environment_path(&source, &environment));

        for warning in &analysis.warnings {
            ctx.warn(warning.clone()).await;
        }
        ctx.info(format!(
            "Source {}: environment '{}', {} mods ({}), {} previews ({}), cache {}",
            source.display(),
            environment,
            analysis.mod_count,
            analysis.total_archive_size_formatted,
            analysis.preview_count,
            analysis.total_preview_size_formatted,
            analysis.cache_size_formatted
        ))
        .await;

        ctx.analysis = Some(analysis);
        Ok(())
    }
}
