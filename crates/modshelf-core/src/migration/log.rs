//! Append-only per-run log file.
//!
//! Each line is `[<RFC3339 timestamp>] [<LEVEL>] <message>`. Lines are also
//! mirrored to `tracing`. A failed write only produces a warning.

use chrono::{Local, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::MigrationConfig;
use crate::error::{MigrationError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Single-writer log for one migration run.
#[derive(Debug)]
pub struct MigrationLog {
    path: Option<PathBuf>,
    file: Mutex<Option<File>>,
}

impl MigrationLog {
    /// Open `migration-<YYYYMMDD-HHMMSS>.log` inside `logs_dir`.
    pub async fn create(logs_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(logs_dir)
            .await
            .map_err(|e| MigrationError::io_with_path(e, logs_dir))?;

        let name = format!(
            "{}{}.log",
            MigrationConfig::LOG_FILE_PREFIX,
            Local::now().format("%Y%m%d-%H%M%S")
        );
        let path = logs_dir.join(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| MigrationError::io_with_path(e, &path))?;

        debug!("Migration log: {}", path.display());
        Ok(Self {
            path: Some(path),
            file: Mutex::new(Some(file)),
        })
    }

    /// A log that only mirrors to `tracing`.
    pub fn detached() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub async fn info(&self, message: impl AsRef<str>) {
        self.write(Level::Info, message.as_ref()).await;
    }

    pub async fn warn(&self, message: impl AsRef<str>) {
        self.write(Level::Warn, message.as_ref()).await;
    }

    pub async fn error(&self, message: impl AsRef<str>) {
        self.write(Level::Error, message.as_ref()).await;
    }

    async fn write(&self, level: Level, message: &str) {
        match level {
            Level::Info => info!("{}", message),
            Level::Warn => warn!("{}", message),
            Level::Error => error!("{}", message),
        }

        let mut guard = self.file.lock().await;
        let Some(file) = guard.as_mut() else {
            return;
        };
        let line = format!(
            "[{}] [{}] {}\n",
            Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level.as_str(),
            message
        );
        let written = match file.write_all(line.as_bytes()).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!("Failed to write migration log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lines_are_appended_with_level() {
        let temp = TempDir::new().unwrap();
        let log = MigrationLog::create(&temp.path().join("logs")).await.unwrap();
        log.info("Starting migration").await;
        log.warn("Archive for A1 not found").await;
        log.error("Copy failed").await;

        let path = log.path().unwrap().to_path_buf();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("migration-") && name.ends_with(".log"));

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with('[') && lines[0].ends_with("[INFO] Starting migration"));
        assert!(lines[1].contains("[WARN] Archive for A1 not found"));
        assert!(lines[2].contains("[ERROR] Copy failed"));
    }

    #[tokio::test]
    async fn test_detached_log_has_no_path() {
        let log = MigrationLog::detached();
        log.info("only traced").await;
        assert!(log.path().is_none());
    }
}
