//! Shared state threaded through the step pipeline.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::log::MigrationLog;
use super::progress::ProgressReporter;
use super::types::{LegacyAnalysis, RunOptions, RunResult, RunState};
use crate::cancel::CancellationToken;
use crate::error::{MigrationError, Result};
use crate::library::{
    ArchiveService, ClassificationService, DiskSpaceProbe, FileCopyService, FsCopyService,
    JsonLibraryStore, LibraryPaths, MagicArchiveService, ModRepository, SettingsStore,
};
use crate::rules::ClassificationRuleEngine;
use crate::system::SysinfoDiskProbe;

/// Destination collaborators used by the steps.
#[derive(Clone)]
pub struct MigrationServices {
    pub mods: Arc<dyn ModRepository>,
    pub classifications: Arc<dyn ClassificationService>,
    pub files: Arc<dyn FileCopyService>,
    pub archives: Arc<dyn ArchiveService>,
    pub settings: Arc<dyn SettingsStore>,
    pub disk: Arc<dyn DiskSpaceProbe>,
}

impl MigrationServices {
    /// The bundled implementations, storing into `library`.
    pub fn local(library: &LibraryPaths) -> Result<Self> {
        let store = Arc::new(JsonLibraryStore::open(library.store_file())?);
        Ok(Self {
            mods: store.clone(),
            classifications: store.clone(),
            settings: store,
            files: Arc::new(FsCopyService::new()),
            archives: Arc::new(MagicArchiveService::new()),
            disk: Arc::new(SysinfoDiskProbe::new()),
        })
    }

    /// Replace the disk probe.
    pub fn with_disk_probe(mut self, disk: Arc<dyn DiskSpaceProbe>) -> Self {
        self.disk = disk;
        self
    }
}

/// Mutable state of one run. Created per `migrate` call and dropped after.
///
/// Which step writes what:
///
/// | Step | Writes |
/// |------|--------|
/// | 1 | `analysis`, `environment_path` |
/// | 2 | `result.warnings` |
/// | 3 | `result.classification_entries_created`, `created_nodes`, `rules` |
/// | 4 | `result.thumbnails_attached` |
/// | 5 | `result.mods_migrated`, `result.archives_copied`, `migrated_mods` |
/// | 6 | `result.previews_copied` |
pub struct RunContext {
    pub options: RunOptions,
    pub library: LibraryPaths,
    pub analysis: Option<LegacyAnalysis>,
    pub environment_path: Option<PathBuf>,
    pub result: RunResult,
    pub log: MigrationLog,
    pub progress: ProgressReporter,
    pub cancel: CancellationToken,
    /// Classification node ids by name, created or reused in step 3
    pub created_nodes: BTreeMap<String, String>,
    /// Destination mod id by legacy identifier
    pub migrated_mods: BTreeMap<String, String>,
    pub rules: Option<ClassificationRuleEngine>,
}

impl RunContext {
    pub fn new(
        options: RunOptions,
        library: LibraryPaths,
        log: MigrationLog,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Self {
        let mut result = RunResult::new(chrono::Utc::now());
        result.log_path = log.path().map(Path::to_path_buf);
        Self {
            options,
            library,
            analysis: None,
            environment_path: None,
            result,
            log,
            progress,
            cancel,
            created_nodes: BTreeMap::new(),
            migrated_mods: BTreeMap::new(),
            rules: None,
        }
    }

    /// The legacy environment directory resolved by step 1.
    pub fn environment_path(&self) -> Result<&Path> {
        self.environment_path.as_deref().ok_or_else(|| MigrationError::Validation {
            field: "environment_path".to_string(),
            message: "source has not been analyzed yet".to_string(),
        })
    }

    pub fn state(&self) -> RunState {
        self.result.final_state
    }

    /// Move the state machine and announce it.
    pub async fn set_state(&mut self, state: RunState, task: impl Into<String>) {
        let task = task.into();
        self.result.final_state = state;
        self.log.info(format!("[{}] {}", state, task)).await;
        self.progress.stage(state, task);
    }

    /// Item-level progress inside the current state.
    pub fn report(&mut self, task: impl Into<String>, processed: usize, total: usize) {
        let state = self.result.final_state;
        self.progress.report(state, task, processed, total);
    }

    pub async fn info(&self, message: impl AsRef<str>) {
        self.log.info(message).await;
    }

    /// Record a warning in the result and the log.
    pub async fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log.warn(&message).await;
        self.result.warnings.push(message);
    }

    /// Record a per-item error. The run continues.
    pub async fn record_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log.error(&message).await;
        self.result.errors.push(message);
    }
}
