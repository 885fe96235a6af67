//! Legacy installation migration.
//!
//! ```text
//! MigrationOrchestrator
//!     │
//!     ├── validation       pre-flight and post-migration checks
//!     ├── StepPipeline     six sequential steps over one RunContext
//!     │     └── steps      analyze, configuration, classifications,
//!     │                    thumbnails, archives, previews
//!     ├── SourceAnalyzer   read-only scan of the legacy root
//!     ├── MigrationLog     per-run append-only log file
//!     └── ProgressReporter stage / percent updates to the caller
//! ```

mod analyzer;
mod context;
mod log;
mod orchestrator;
mod progress;
pub mod steps;
mod types;
mod validation;

pub use analyzer::{environment_path, scan_flat, scan_recursive, SizeTally, SourceAnalyzer};
pub use context::{MigrationServices, RunContext};
pub use log::MigrationLog;
pub use orchestrator::MigrationOrchestrator;
pub use progress::{ProgressRecord, ProgressReporter};
pub use steps::{MigrationStep, StepPipeline};
pub use types::{
    LegacyAnalysis, PostRunAction, RunOptions, RunResult, RunState, StepKind,
};
pub use validation::{check_disk_space, post_migration_findings, preflight, validate_results};
