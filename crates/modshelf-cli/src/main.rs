//! Modshelf CLI - analyze and migrate legacy mod manager installations.
//!
//! Progress lines go to stderr; the analysis or result goes to stdout, as
//! text or as JSON with `--json`.

mod render;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use modshelf_core::{
    ArchiveMode, CancellationToken, MigrationOrchestrator, PostRunAction, RunOptions,
};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "modshelf")]
#[command(about = "Migrate a legacy mod manager installation into a Modshelf library")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inspect a legacy installation without writing anything
    Analyze {
        /// Root of the legacy installation
        source: PathBuf,

        /// Environment to inspect (defaults to the first one found)
        #[arg(long)]
        environment: Option<String>,
    },
    /// Migrate a legacy installation into a library
    Migrate(MigrateArgs),
}

#[derive(Args, Debug)]
struct MigrateArgs {
    /// Root of the legacy installation
    source: PathBuf,

    /// Destination library (defaults to the user data directory)
    #[arg(long)]
    library: Option<PathBuf>,

    /// Environment to migrate (defaults to the first one found)
    #[arg(long)]
    environment: Option<String>,

    #[arg(long)]
    skip_archives: bool,

    #[arg(long)]
    skip_metadata: bool,

    #[arg(long)]
    skip_previews: bool,

    #[arg(long)]
    skip_configuration: bool,

    #[arg(long)]
    skip_classifications: bool,

    /// copy, move (performed as copy) or link
    #[arg(long, default_value = "copy")]
    archive_mode: ArchiveMode,

    /// keep, backup or delete (never performed)
    #[arg(long, default_value = "keep")]
    post_action: PostRunAction,
}

impl MigrateArgs {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            environment: self.environment.clone(),
            migrate_archives: !self.skip_archives,
            migrate_metadata: !self.skip_metadata,
            migrate_previews: !self.skip_previews,
            migrate_configuration: !self.skip_configuration,
            migrate_classifications: !self.skip_classifications,
            archive_mode: self.archive_mode,
            post_action: self.post_action,
            ..RunOptions::new(&self.source)
        }
    }
}

fn default_library_root() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("modshelf"))
        .unwrap_or_else(|| PathBuf::from("modshelf-library"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Command::Analyze {
            source,
            environment,
        } => {
            let orchestrator = MigrationOrchestrator::local(default_library_root())
                .context("Failed to open library")?;
            let analysis = orchestrator
                .analyze(&source, environment.as_deref(), None)
                .await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print!("{}", render::analysis(&analysis));
            }
            if !analysis.is_valid {
                std::process::exit(1);
            }
        }
        Command::Migrate(args) => {
            let library = args.library.clone().unwrap_or_else(default_library_root);
            info!("Library root: {}", library.display());
            let orchestrator = MigrationOrchestrator::local(&library)
                .with_context(|| format!("Failed to open library at {}", library.display()))?;

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, cancelling migration");
                    ctrl_c_token.cancel();
                }
            });

            let (tx, mut rx) = mpsc::unbounded_channel();
            let printer = tokio::spawn(async move {
                while let Some(record) = rx.recv().await {
                    eprintln!("{}", render::progress(&record));
                }
            });

            let result = orchestrator
                .migrate(args.run_options(), Some(tx), cancel)
                .await;
            // The sender is dropped with the run, which ends the printer
            let _ = printer.await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render::result(&result));
            }
            if !result.success {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "modshelf",
            "migrate",
            "/legacy",
            "--library",
            "/lib",
            "--skip-previews",
            "--archive-mode",
            "link",
            "--post-action",
            "backup",
        ])
        .unwrap();

        let Command::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        let options = args.run_options();
        assert_eq!(options.source, PathBuf::from("/legacy"));
        assert!(!options.migrate_previews);
        assert!(options.migrate_archives);
        assert_eq!(options.archive_mode, ArchiveMode::Link);
        assert_eq!(options.post_action, PostRunAction::Backup);
        assert_eq!(args.library, Some(PathBuf::from("/lib")));
    }

    #[test]
    fn test_invalid_archive_mode_rejected() {
        let parsed = Cli::try_parse_from(["modshelf", "migrate", "/legacy", "--archive-mode", "teleport"]);
        assert!(parsed.is_err());
    }
}
