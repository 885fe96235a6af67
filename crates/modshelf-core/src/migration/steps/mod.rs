//! The six migration steps and the pipeline that sequences them.
//!
//! Steps run strictly in order against one [`RunContext`]. Each can be
//! toggled off through [`RunOptions`](super::RunOptions) except the first,
//! which is also the only step allowed to abort the run on bad input.

mod analyze;
mod archives;
mod classifications;
mod configuration;
mod previews;
mod thumbnails;

pub use analyze::AnalyzeSourceStep;
pub use archives::MigrateArchivesStep;
pub use classifications::MigrateClassificationsStep;
pub use configuration::MigrateConfigurationStep;
pub use previews::MigratePreviewsStep;
pub use thumbnails::MigrateThumbnailsStep;

use async_trait::async_trait;

use super::context::{MigrationServices, RunContext};
use super::types::{RunState, StepKind};
use crate::error::Result;

/// One unit of the pipeline.
#[async_trait]
pub trait MigrationStep: Send + Sync {
    fn kind(&self) -> StepKind;

    async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()>;
}

/// Fixed, ordered sequence of steps.
pub struct StepPipeline {
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Default for StepPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl StepPipeline {
    /// Steps 1-6 in their canonical order.
    pub fn standard() -> Self {
        Self {
            steps: vec![
                Box::new(AnalyzeSourceStep),
                Box::new(MigrateConfigurationStep),
                Box::new(MigrateClassificationsStep),
                Box::new(MigrateThumbnailsStep),
                Box::new(MigrateArchivesStep),
                Box::new(MigratePreviewsStep),
            ],
        }
    }

    pub fn kinds(&self) -> Vec<StepKind> {
        self.steps.iter().map(|s| s.kind()).collect()
    }

    /// Run every enabled step. Stops at the first error.
    pub async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()> {
        for step in &self.steps {
            ctx.cancel.check()?;

            let kind = step.kind();
            if !ctx.options.is_enabled(kind) {
                ctx.info(format!("Skipping {} (disabled)", kind)).await;
                ctx.result.skipped_steps.push(kind);
                continue;
            }
            if kind != StepKind::AnalyzeSource {
                ctx.environment_path()?;
            }

            ctx.set_state(RunState::Running(kind), kind.label()).await;
            step.run(ctx, services).await?;
            ctx.report(format!("{} finished", kind.label()), 1, 1);
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use crate::cancel::CancellationToken;
    use crate::library::LibraryPaths;
    use crate::migration::context::{MigrationServices, RunContext};
    use crate::migration::log::MigrationLog;
    use crate::migration::progress::ProgressReporter;
    use crate::migration::types::RunOptions;

    pub fn context(source: &Path, library: &Path) -> RunContext {
        RunContext::new(
            RunOptions::new(source),
            LibraryPaths::new(library),
            MigrationLog::detached(),
            ProgressReporter::silent(),
            CancellationToken::new(),
        )
    }

    pub fn services(library: &Path) -> MigrationServices {
        MigrationServices::local(&LibraryPaths::new(library)).unwrap()
    }

    /// Context whose environment is already resolved to `<source>/home/Default`.
    pub fn analyzed_context(source: &Path, library: &Path) -> RunContext {
        let mut ctx = context(source, library);
        ctx.environment_path = Some(source.join("home").join("Default"));
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::error::MigrationError;
    use tempfile::TempDir;

    #[test]
    fn test_standard_order() {
        assert_eq!(StepPipeline::standard().kinds(), StepKind::ALL.to_vec());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_step() {
        let temp = TempDir::new().unwrap();
        let mut ctx = context(temp.path(), &temp.path().join("lib"));
        ctx.cancel.cancel();
        let services = services(&temp.path().join("lib"));

        let result = StepPipeline::standard().run(&mut ctx, &services).await;
        assert!(matches!(result, Err(MigrationError::Cancelled)));
        assert!(ctx.analysis.is_none());
    }

    #[tokio::test]
    async fn test_disabled_steps_are_recorded() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        std::fs::create_dir_all(source.join("resources/mods")).unwrap();
        let library = temp.path().join("lib");

        let mut ctx = context(&source, &library);
        ctx.options.migrate_configuration = false;
        ctx.options.migrate_classifications = false;
        ctx.options.migrate_archives = false;
        ctx.options.migrate_previews = false;

        StepPipeline::standard()
            .run(&mut ctx, &services(&library))
            .await
            .unwrap();
        assert_eq!(
            ctx.result.skipped_steps,
            vec![
                StepKind::Configuration,
                StepKind::Classifications,
                StepKind::Thumbnails,
                StepKind::Archives,
                StepKind::Previews
            ]
        );
        assert!(ctx.environment_path.is_some());
    }
}
