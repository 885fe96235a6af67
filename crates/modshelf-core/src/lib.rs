//! Modshelf Core - headless library for mod storage and legacy migration.
//!
//! This crate inspects an installation of the predecessor mod manager and
//! converts its file-based data (archives, previews, sharded metadata,
//! classification files, thumbnail redirections) into a Modshelf library.
//! The legacy installation is only ever read.
//!
//! # Example
//!
//! ```rust,ignore
//! use modshelf_core::{CancellationToken, MigrationOrchestrator, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> modshelf_core::Result<()> {
//!     let orchestrator = MigrationOrchestrator::local("/path/to/library")?;
//!
//!     let analysis = orchestrator.analyze("/path/to/legacy".as_ref(), None, None).await;
//!     println!("Found {} mods ({})", analysis.mod_count, analysis.total_archive_size_formatted);
//!
//!     let result = orchestrator
//!         .migrate(RunOptions::new("/path/to/legacy"), None, CancellationToken::new())
//!         .await;
//!     println!("Migrated {} mods", result.mods_migrated);
//!
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod error;
pub mod legacy;
pub mod library;
pub mod migration;
pub mod rules;
pub mod system;

// Re-export commonly used types
pub use cancel::{CancellationToken, CancelledError};
pub use error::{MigrationError, Result};
pub use library::{
    ArchiveMode, ArchiveType, ClassificationNode, JsonLibraryStore, LibraryPaths, ModRecord,
};
pub use migration::{
    LegacyAnalysis, MigrationOrchestrator, MigrationServices, PostRunAction, ProgressRecord,
    RunOptions, RunResult, RunState, StepKind,
};
pub use rules::{AutoDetectionRule, ClassificationRuleEngine, RuleStore};
pub use system::format_size;
