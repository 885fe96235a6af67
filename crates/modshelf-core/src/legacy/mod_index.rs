//! Sharded legacy mod index.
//!
//! The legacy app split its mod metadata across one JSON file per period
//! (`modsIndex/2025-11`, `modsIndex/2026-01`, ...). A shard is either an
//! object keyed by content identifier or an array of objects carrying an
//! `id`/`sha` field. Shards are merged by identifier in file-name order and
//! later shards win field by field.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ScanOutcome;
use crate::error::{MigrationError, Result};

/// Accept a string, number or boolean; anything else reads as absent.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Accept an array of scalars or one comma-separated string.
fn lenient_tags<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let tags: Vec<String> = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s.split(',').map(str::to_string).collect(),
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => return Ok(None),
    };
    let tags: Vec<String> = tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(Some(tags))
}

/// One mod as described by the legacy index.
///
/// Scalar fields tolerate loose typing (an epoch `addTime`, a numeric
/// `author`); values of the wrong shape read as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyModEntry {
    /// Content identifier (also the archive file name under `resources/mods`)
    #[serde(default, alias = "sha", deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_tags")]
    pub tags: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub archive_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub add_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub preview: Option<String>,
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

impl LegacyModEntry {
    /// Overlay the fields present in `newer` onto `self`.
    pub fn merge_from(&mut self, newer: LegacyModEntry) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if newer.$field.is_some() { self.$field = newer.$field; })*
            };
        }
        overlay!(name, category, author, url, description, tags, archive_type, add_time, preview);
    }

    /// Display name, falling back to the identifier.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.id)
    }
}

/// Merged view of every shard, keyed by content identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModIndex {
    entries: BTreeMap<String, LegacyModEntry>,
    shards_loaded: usize,
}

impl ModIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one shard's entries; later calls win on identifier collisions.
    pub fn merge_shard(&mut self, entries: Vec<LegacyModEntry>) {
        for entry in entries {
            match self.entries.get_mut(&entry.id) {
                Some(existing) => existing.merge_from(entry),
                None => {
                    self.entries.insert(entry.id.clone(), entry);
                }
            }
        }
        self.shards_loaded += 1;
    }

    pub fn get(&self, id: &str) -> Option<&LegacyModEntry> {
        self.entries.get(id)
    }

    /// Entries in identifier order.
    pub fn entries(&self) -> impl Iterator<Item = &LegacyModEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn shards_loaded(&self) -> usize {
        self.shards_loaded
    }
}

/// Parse the text of one shard.
///
/// Fails only when the shard is not JSON or not a container. Entries that do
/// not deserialize are dropped and reported in the warnings.
pub fn parse_shard(text: &str) -> Result<ScanOutcome<Vec<LegacyModEntry>>> {
    let value: Value = serde_json::from_str(text)?;

    let mut outcome = ScanOutcome::new(Vec::new());
    match value {
        Value::Object(map) => {
            for (id, body) in map {
                match serde_json::from_value::<LegacyModEntry>(body) {
                    Ok(mut entry) => {
                        entry.id = id;
                        outcome.value.push(entry);
                    }
                    Err(e) => outcome.warn(format!("Skipping index entry {}: {}", id, e)),
                }
            }
        }
        Value::Array(items) => {
            for (position, item) in items.into_iter().enumerate() {
                match serde_json::from_value::<LegacyModEntry>(item) {
                    Ok(entry) if entry.id.trim().is_empty() => {
                        debug!("Skipping index entry without identifier");
                    }
                    Ok(entry) => outcome.value.push(entry),
                    Err(e) => {
                        outcome.warn(format!("Skipping index entry #{}: {}", position + 1, e))
                    }
                }
            }
        }
        _ => {
            return Err(MigrationError::Validation {
                field: "modsIndex".to_string(),
                message: "shard must be a JSON object or array".to_string(),
            })
        }
    }
    Ok(outcome)
}

/// Shard files in `dir`, sorted by file name.
fn shard_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| MigrationError::io_with_path(e, dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load and merge every shard in `dir`.
///
/// Never fails: a missing or unlistable directory yields an empty index, and
/// unreadable or malformed shards are skipped. Everything skipped is reported
/// in the warnings.
pub async fn load_mod_index(dir: &Path) -> ScanOutcome<ModIndex> {
    let mut outcome = ScanOutcome::new(ModIndex::new());
    if !dir.is_dir() {
        outcome.warn(format!("Mod index directory not found: {}", dir.display()));
        return outcome;
    }

    let shards = match shard_files(dir) {
        Ok(shards) => shards,
        Err(e) => {
            warn!("Cannot list mod index: {}", e);
            outcome.warn(format!("Mod index unreadable: {}", e));
            return outcome;
        }
    };

    for shard in shards {
        let bytes = match tokio::fs::read(&shard).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read index shard {}: {}", shard.display(), e);
                outcome.warn(format!("Unreadable index shard {}: {}", shard.display(), e));
                continue;
            }
        };
        match parse_shard(&String::from_utf8_lossy(&bytes)) {
            Ok(parsed) => {
                debug!(
                    "Loaded {} entries from shard {}",
                    parsed.value.len(),
                    shard.display()
                );
                for warning in parsed.warnings {
                    outcome.warn(format!("{}: {}", shard.display(), warning));
                }
                outcome.value.merge_shard(parsed.value);
            }
            Err(e) => {
                warn!("Skipping malformed index shard {}: {}", shard.display(), e);
                outcome.warn(format!("Malformed index shard {}: {}", shard.display(), e));
            }
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_object_shard() {
        let entries =
            parse_shard(r#"{"A1": {"name": "Keqing Outfit", "category": "Fire", "tags": ["skin"]}}"#)
                .unwrap()
                .value;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "A1");
        assert_eq!(entries[0].category.as_deref(), Some("Fire"));
        assert_eq!(entries[0].tags, Some(vec!["skin".to_string()]));
    }

    #[test]
    fn test_parse_array_shard_accepts_sha_alias() {
        let entries =
            parse_shard(r#"[{"sha": "B2", "name": "Wave"}, {"name": "no id"}]"#)
                .unwrap()
                .value;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "B2");
    }

    #[test]
    fn test_parse_rejects_scalar_shard() {
        assert!(parse_shard("42").is_err());
        assert!(parse_shard("not json").is_err());
    }

    #[test]
    fn test_loose_field_types_are_accepted() {
        let parsed = parse_shard(
            r#"{"A1": {"name": "x", "addTime": 1700000000, "tags": "skin, outfit", "author": 7}}"#,
        )
        .unwrap();
        assert!(parsed.is_clean());
        let entry = &parsed.value[0];
        assert_eq!(entry.add_time.as_deref(), Some("1700000000"));
        assert_eq!(entry.tags, Some(vec!["skin".to_string(), "outfit".to_string()]));
        assert_eq!(entry.author.as_deref(), Some("7"));
    }

    #[test]
    fn test_bad_entry_does_not_drop_shard() {
        let parsed = parse_shard(
            r#"{"A1": {"name": "Ember"}, "B2": "not an object", "C3": {"name": {"nested": 1}}}"#,
        )
        .unwrap();
        let ids: Vec<&str> = parsed.value.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["A1", "C3"]);
        assert!(parsed.value[1].name.is_none());
        assert_eq!(parsed.warnings.len(), 1);
        assert!(parsed.warnings[0].contains("B2"));
    }

    #[test]
    fn test_later_shard_wins_field_by_field() {
        let mut index = ModIndex::new();
        index.merge_shard(parse_shard(r#"{"A1": {"name": "Old", "category": "Fire", "author": "x"}}"#).unwrap().value);
        index.merge_shard(parse_shard(r#"{"A1": {"name": "New", "category": "Water"}}"#).unwrap().value);

        let entry = index.get("A1").unwrap();
        assert_eq!(entry.name.as_deref(), Some("New"));
        assert_eq!(entry.category.as_deref(), Some("Water"));
        assert_eq!(entry.author.as_deref(), Some("x"));
        assert_eq!(index.len(), 1);
        assert_eq!(index.shards_loaded(), 2);
    }

    #[test]
    fn test_display_name_falls_back_to_id() {
        let entry = LegacyModEntry {
            id: "A1".into(),
            name: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(entry.display_name(), "A1");
    }

    #[tokio::test]
    async fn test_load_merges_in_file_name_order() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("modsIndex");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("2026-02"), r#"{"A1": {"category": "Water"}}"#).unwrap();
        std::fs::write(dir.join("2026-01"), r#"{"A1": {"category": "Fire"}, "B2": {}}"#).unwrap();
        std::fs::write(dir.join("2026-03"), "{broken").unwrap();

        let outcome = load_mod_index(&dir).await;
        assert_eq!(outcome.value.len(), 2);
        assert_eq!(outcome.value.get("A1").unwrap().category.as_deref(), Some("Water"));
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_load_missing_directory_warns() {
        let temp = TempDir::new().unwrap();
        let outcome = load_mod_index(&temp.path().join("modsIndex")).await;
        assert!(outcome.value.is_empty());
        assert!(!outcome.warnings.is_empty());
    }
}
