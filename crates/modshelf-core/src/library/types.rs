//! Destination library records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// How a legacy archive is brought into the destination archive area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    /// Plain copy (default)
    #[default]
    Copy,
    /// Requested move. The legacy tree is read-only, so this copies.
    Move,
    /// Hard link when source and destination share a filesystem, copy otherwise
    Link,
}

impl ArchiveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveMode::Copy => "copy",
            ArchiveMode::Move => "move",
            ArchiveMode::Link => "link",
        }
    }
}

impl FromStr for ArchiveMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "copy" => Ok(ArchiveMode::Copy),
            "move" => Ok(ArchiveMode::Move),
            "link" => Ok(ArchiveMode::Link),
            other => Err(format!("unknown archive mode: {other}")),
        }
    }
}

/// Container format of a mod archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveType {
    Zip,
    #[serde(rename = "7z")]
    SevenZip,
    Rar,
    Gzip,
    Tar,
    #[default]
    Unknown,
}

impl ArchiveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArchiveType::Zip => "zip",
            ArchiveType::SevenZip => "7z",
            ArchiveType::Rar => "rar",
            ArchiveType::Gzip => "gzip",
            ArchiveType::Tar => "tar",
            ArchiveType::Unknown => "unknown",
        }
    }

    /// Parse the loose type hints found in legacy metadata (`"zip"`, `".7z"`, `"RAR"`).
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().trim_start_matches('.').to_lowercase().as_str() {
            "zip" => ArchiveType::Zip,
            "7z" | "7zip" | "sevenzip" => ArchiveType::SevenZip,
            "rar" => ArchiveType::Rar,
            "gz" | "gzip" | "tgz" => ArchiveType::Gzip,
            "tar" => ArchiveType::Tar,
            _ => ArchiveType::Unknown,
        }
    }
}

/// A mod as stored in the destination library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub archive_path: PathBuf,
    #[serde(default)]
    pub archive_type: ArchiveType,
    /// SHA-256 of the archive contents
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Content identifier used by the legacy installation
    #[serde(default)]
    pub legacy_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input to [`ModRepository::get_or_create_mod`](super::ModRepository::get_or_create_mod).
#[derive(Debug, Clone, Default)]
pub struct NewMod {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub archive_path: PathBuf,
    pub archive_type: ArchiveType,
    pub sha256: Option<String>,
    pub tags: Vec<String>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub legacy_id: Option<String>,
}

impl NewMod {
    pub(crate) fn into_record(self) -> ModRecord {
        ModRecord {
            id: self.id,
            name: self.name,
            category: self.category,
            archive_path: self.archive_path,
            archive_type: self.archive_type,
            sha256: self.sha256,
            tags: self.tags,
            author: self.author,
            url: self.url,
            description: self.description,
            legacy_id: self.legacy_id,
            created_at: Utc::now(),
        }
    }
}

/// A node of the classification tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Ordering among siblings (lower sorts first)
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub thumbnail: Option<PathBuf>,
}

/// Input to [`ClassificationService::create_node`](super::ClassificationService::create_node).
#[derive(Debug, Clone)]
pub struct NewNode {
    pub name: String,
    pub parent_id: Option<String>,
    pub priority: i32,
}

/// Result of a single copy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Linked,
    /// Destination already existed and was left untouched
    Skipped,
}

impl CopyOutcome {
    /// Whether new bytes landed at the destination.
    pub fn transferred(&self) -> bool {
        !matches!(self, CopyOutcome::Skipped)
    }
}
