//! Inputs, outputs and state of a migration run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::MigrationConfig;
use crate::legacy::LegacyConfiguration;
use crate::library::ArchiveMode;

/// What happens to the legacy installation after a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostRunAction {
    /// Leave the legacy installation alone (default)
    #[default]
    Keep,
    /// Copy the legacy environment into the library's backup area
    Backup,
    /// Requested deletion. Never executed; recorded as a warning.
    Delete,
}

impl PostRunAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostRunAction::Keep => "keep",
            PostRunAction::Backup => "backup",
            PostRunAction::Delete => "delete",
        }
    }
}

impl FromStr for PostRunAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(PostRunAction::Keep),
            "backup" => Ok(PostRunAction::Backup),
            "delete" => Ok(PostRunAction::Delete),
            other => Err(format!("unknown post-run action: {other}")),
        }
    }
}

/// Immutable input of one `migrate` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunOptions {
    /// Root of the legacy installation
    pub source: PathBuf,
    /// Environment to migrate; the first one found when `None`
    pub environment: Option<String>,
    pub migrate_archives: bool,
    /// Carry index metadata (name, category, tags, ...) onto migrated mods
    pub migrate_metadata: bool,
    pub migrate_previews: bool,
    pub migrate_configuration: bool,
    pub migrate_classifications: bool,
    pub archive_mode: ArchiveMode,
    pub post_action: PostRunAction,
    /// Recognized image extensions, lowercase, without the dot
    pub preview_extensions: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            environment: None,
            migrate_archives: true,
            migrate_metadata: true,
            migrate_previews: true,
            migrate_configuration: true,
            migrate_classifications: true,
            archive_mode: ArchiveMode::default(),
            post_action: PostRunAction::default(),
            preview_extensions: MigrationConfig::PREVIEW_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl RunOptions {
    /// Options with every category enabled.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    /// Whether `step` should run under these options.
    pub fn is_enabled(&self, step: StepKind) -> bool {
        match step {
            StepKind::AnalyzeSource => true,
            StepKind::Configuration => self.migrate_configuration,
            StepKind::Classifications | StepKind::Thumbnails => self.migrate_classifications,
            StepKind::Archives => self.migrate_archives,
            StepKind::Previews => self.migrate_previews,
        }
    }
}

/// Read-only summary of a legacy installation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyAnalysis {
    pub source: PathBuf,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub environments: Vec<String>,
    pub active_environment: Option<String>,
    pub mod_count: usize,
    pub total_archive_size: u64,
    pub total_archive_size_formatted: String,
    pub preview_count: usize,
    pub total_preview_size: u64,
    pub total_preview_size_formatted: String,
    pub cache_size: u64,
    pub cache_size_formatted: String,
    pub configuration: Option<LegacyConfiguration>,
}

impl LegacyAnalysis {
    /// Bytes the pre-flight check expects the run to write.
    pub fn required_space(&self) -> u64 {
        self.total_archive_size.saturating_add(self.total_preview_size)
    }
}

/// The six pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    AnalyzeSource,
    Configuration,
    Classifications,
    Thumbnails,
    Archives,
    Previews,
}

impl StepKind {
    pub const ALL: [StepKind; 6] = [
        StepKind::AnalyzeSource,
        StepKind::Configuration,
        StepKind::Classifications,
        StepKind::Thumbnails,
        StepKind::Archives,
        StepKind::Previews,
    ];

    /// 1-based position in the pipeline.
    pub fn number(&self) -> usize {
        match self {
            StepKind::AnalyzeSource => 1,
            StepKind::Configuration => 2,
            StepKind::Classifications => 3,
            StepKind::Thumbnails => 4,
            StepKind::Archives => 5,
            StepKind::Previews => 6,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StepKind::AnalyzeSource => "Analyze source",
            StepKind::Configuration => "Migrate configuration",
            StepKind::Classifications => "Migrate classifications",
            StepKind::Thumbnails => "Migrate classification thumbnails",
            StepKind::Archives => "Migrate mod archives",
            StepKind::Previews => "Migrate mod previews",
        }
    }

    /// Overall percent range covered by this step.
    pub fn percent_band(&self) -> (f32, f32) {
        match self {
            StepKind::AnalyzeSource => (0.0, 5.0),
            StepKind::Configuration => (5.0, 10.0),
            StepKind::Classifications => (10.0, 20.0),
            StepKind::Thumbnails => (20.0, 30.0),
            StepKind::Archives => (30.0, 80.0),
            StepKind::Previews => (80.0, 95.0),
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} ({})", self.number(), self.label())
    }
}

/// Run state machine.
///
/// `Pending -> Running(1..6) -> Finalizing -> Complete`, or `Error` from any
/// state. Cancellation ends in `Error` like any other failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Pending,
    Running(StepKind),
    Finalizing,
    Complete,
    Error,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Error)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Pending => write!(f, "pending"),
            RunState::Running(step) => write!(f, "{}", step),
            RunState::Finalizing => write!(f, "finalizing"),
            RunState::Complete => write!(f, "complete"),
            RunState::Error => write!(f, "error"),
        }
    }
}

/// Accumulated outcome of a run. Counters only ever grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub mods_migrated: usize,
    pub archives_copied: usize,
    pub previews_copied: usize,
    pub classification_entries_created: usize,
    pub thumbnails_attached: usize,
    pub success: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub skipped_steps: Vec<StepKind>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    pub log_path: Option<PathBuf>,
    pub final_state: RunState,
}

impl RunResult {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            mods_migrated: 0,
            archives_copied: 0,
            previews_copied: 0,
            classification_entries_created: 0,
            thumbnails_attached: 0,
            success: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            skipped_steps: Vec::new(),
            started_at,
            finished_at: None,
            duration_ms: 0,
            log_path: None,
            final_state: RunState::Pending,
        }
    }
}
