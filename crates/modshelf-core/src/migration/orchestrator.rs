//! Entry point for analyzing and migrating a legacy installation.
//!
//! ```text
//! migrate(options)
//!     │
//!     ├── pre-flight      source valid, disk space
//!     ├── StepPipeline    steps 1-6
//!     ├── validation      non-zero counts, error summary
//!     └── finalization    post-run action
//! ```
//!
//! Every error raised along the way ends here and becomes a failed
//! [`RunResult`]; `migrate` itself never returns an error.

use chrono::{Local, Utc};
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::analyzer::SourceAnalyzer;
use super::context::{MigrationServices, RunContext};
use super::log::MigrationLog;
use super::progress::{ProgressRecord, ProgressReporter};
use super::steps::StepPipeline;
use super::types::{LegacyAnalysis, PostRunAction, RunOptions, RunResult, RunState};
use super::validation::{preflight, validate_results};
use crate::cancel::CancellationToken;
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::library::LibraryPaths;

/// Runs analyses and migrations into one destination library.
pub struct MigrationOrchestrator {
    library: LibraryPaths,
    services: MigrationServices,
    pipeline: StepPipeline,
}

impl MigrationOrchestrator {
    pub fn new(library: LibraryPaths, services: MigrationServices) -> Self {
        Self {
            library,
            services,
            pipeline: StepPipeline::standard(),
        }
    }

    /// Orchestrator using the bundled JSON store and filesystem services.
    pub fn local(library_root: impl AsRef<Path>) -> Result<Self> {
        let library = LibraryPaths::new(library_root.as_ref());
        let services = MigrationServices::local(&library)?;
        Ok(Self::new(library, services))
    }

    pub fn library(&self) -> &LibraryPaths {
        &self.library
    }

    pub fn services(&self) -> &MigrationServices {
        &self.services
    }

    /// Inspect `source` without writing anything.
    pub async fn analyze(
        &self,
        source: &Path,
        environment: Option<&str>,
        progress: Option<mpsc::UnboundedSender<ProgressRecord>>,
    ) -> LegacyAnalysis {
        let mut reporter = ProgressReporter::new(progress);
        reporter.stage(RunState::Pending, format!("Analyzing {}", source.display()));

        let extensions = MigrationConfig::PREVIEW_EXTENSIONS
            .iter()
            .map(|e| e.to_string())
            .collect();
        let analysis = SourceAnalyzer::new(extensions)
            .analyze(source, environment)
            .await;

        let final_state = if analysis.is_valid {
            RunState::Complete
        } else {
            RunState::Error
        };
        reporter.stage(final_state, "Analysis finished");
        analysis
    }

    /// Migrate a legacy installation. Failures are reported in the result.
    pub async fn migrate(
        &self,
        options: RunOptions,
        progress: Option<mpsc::UnboundedSender<ProgressRecord>>,
        cancel: CancellationToken,
    ) -> RunResult {
        let started = Instant::now();
        let log = match MigrationLog::create(&self.library.logs_dir()).await {
            Ok(log) => log,
            Err(e) => {
                warn!("Migration log unavailable, continuing without it: {}", e);
                MigrationLog::detached()
            }
        };

        let mut ctx = RunContext::new(
            options,
            self.library.clone(),
            log,
            ProgressReporter::new(progress),
            cancel,
        );
        ctx.set_state(
            RunState::Pending,
            format!(
                "Migrating {} into {}",
                ctx.options.source.display(),
                self.library.root().display()
            ),
        )
        .await;

        match self.run(&mut ctx).await {
            Ok(()) => {
                ctx.result.success = true;
                ctx.set_state(RunState::Complete, "Migration complete").await;
            }
            Err(e) => {
                let failed_in = ctx.state();
                ctx.result.success = false;
                ctx.log
                    .error(format!("Migration failed during {}: {}", failed_in, e))
                    .await;
                ctx.result.errors.push(e.to_string());
                ctx.set_state(RunState::Error, e.to_string()).await;
            }
        }

        ctx.result.finished_at = Some(Utc::now());
        ctx.result.duration_ms = started.elapsed().as_millis() as u64;
        ctx.info(format!(
            "Result: {} mods, {} archives, {} previews, {} classification entries, {} warnings, {} errors in {} ms",
            ctx.result.mods_migrated,
            ctx.result.archives_copied,
            ctx.result.previews_copied,
            ctx.result.classification_entries_created,
            ctx.result.warnings.len(),
            ctx.result.errors.len(),
            ctx.result.duration_ms
        ))
        .await;
        info!(
            "Migration {} in {} ms",
            if ctx.result.success { "succeeded" } else { "failed" },
            ctx.result.duration_ms
        );
        ctx.result
    }

    async fn run(&self, ctx: &mut RunContext) -> Result<()> {
        preflight(ctx, self.services.disk.as_ref()).await?;
        self.pipeline.run(ctx, &self.services).await?;

        ctx.set_state(RunState::Finalizing, "Validating and finalizing")
            .await;
        validate_results(ctx).await;
        self.finalize(ctx).await
    }

    /// Apply the post-run action. The legacy tree is only ever read.
    async fn finalize(&self, ctx: &mut RunContext) -> Result<()> {
        match ctx.options.post_action {
            PostRunAction::Keep => {
                ctx.info("Legacy installation kept as is").await;
            }
            PostRunAction::Backup => {
                let env_path = ctx.environment_path()?.to_path_buf();
                let env_name = env_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                let dest = self
                    .library
                    .backup_dir()
                    .join(Local::now().format("%Y%m%d-%H%M%S").to_string())
                    .join(env_name);
                if env_path.is_dir() {
                    let copied = self.services.files.copy_directory(&env_path, &dest).await?;
                    ctx.info(format!(
                        "Backed up {} legacy files to {}",
                        copied,
                        dest.display()
                    ))
                    .await;
                } else {
                    ctx.warn(format!(
                        "Nothing to back up, {} does not exist",
                        env_path.display()
                    ))
                    .await;
                }
            }
            PostRunAction::Delete => {
                ctx.warn("Post-run action 'delete' is not performed; the legacy installation was left untouched")
                    .await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_analyze_reports_progress() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("legacy/resources")).unwrap();
        let orchestrator = MigrationOrchestrator::local(temp.path().join("lib")).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let analysis = orchestrator
            .analyze(&temp.path().join("legacy"), None, Some(tx))
            .await;
        assert!(analysis.is_valid);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.stage, RunState::Pending);
        let last = rx.recv().await.unwrap();
        assert_eq!(last.stage, RunState::Complete);
        assert!(!temp.path().join("lib/logs").exists());
    }

    #[tokio::test]
    async fn test_invalid_source_becomes_failed_result() {
        let temp = TempDir::new().unwrap();
        let orchestrator = MigrationOrchestrator::local(temp.path().join("lib")).unwrap();

        let result = orchestrator
            .migrate(
                RunOptions::new(temp.path().join("missing")),
                None,
                CancellationToken::new(),
            )
            .await;
        assert!(!result.success);
        assert_eq!(result.final_state, RunState::Error);
        assert!(!result.errors.is_empty());
        assert!(result.log_path.unwrap().exists());
    }

    #[tokio::test]
    async fn test_delete_action_is_only_a_warning() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        std::fs::create_dir_all(source.join("resources/mods")).unwrap();
        std::fs::create_dir_all(source.join("home/Default")).unwrap();
        std::fs::write(source.join("home/Default/configuration"), "language = en\n").unwrap();
        let orchestrator = MigrationOrchestrator::local(temp.path().join("lib")).unwrap();

        let options = RunOptions {
            post_action: PostRunAction::Delete,
            ..RunOptions::new(&source)
        };
        let result = orchestrator
            .migrate(options, None, CancellationToken::new())
            .await;
        assert!(result.success);
        assert!(result.warnings.iter().any(|w| w.contains("delete")));
        assert!(source.join("home/Default/configuration").exists());
    }

    #[tokio::test]
    async fn test_backup_copies_environment() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        std::fs::create_dir_all(source.join("resources/mods")).unwrap();
        std::fs::create_dir_all(source.join("home/Default/classification")).unwrap();
        std::fs::write(source.join("home/Default/classification/Elements"), "Fire\n").unwrap();
        let library = temp.path().join("lib");
        let orchestrator = MigrationOrchestrator::local(&library).unwrap();

        let options = RunOptions {
            post_action: PostRunAction::Backup,
            ..RunOptions::new(&source)
        };
        let result = orchestrator
            .migrate(options, None, CancellationToken::new())
            .await;
        assert!(result.success);

        let backups: Vec<_> = std::fs::read_dir(library.join("legacy-backup"))
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(backups.len(), 1);
        assert!(backups[0]
            .path()
            .join("Default/classification/Elements")
            .exists());
    }
}
