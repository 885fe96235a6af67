//! Thumbnail redirection mini-language.
//!
//! The legacy `thumbnail/redirection.ini` maps classification names to
//! images under the thumbnail directory:
//!
//! ```text
//! ; comment (lines starting with ; / or \ are comments)
//! Characters/*            register every image in Characters/ under its file stem
//! Keqing = special/kq.png explicit mapping, always wins over wildcard entries
//! ```
//!
//! Wildcard lines only add keys that are not present yet, so the first folder
//! to provide a stem keeps it. Stems that collide inside wildcard expansion
//! are reported in [`RedirectionMap::collisions`] rather than silently chosen.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use crate::error::{MigrationError, Result};

/// Where a mapping came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectionSource {
    Explicit,
    Wildcard,
}

/// One resolved `name -> relative path` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionEntry {
    pub key: String,
    /// Path relative to the thumbnail directory, `/`-separated
    pub relative_path: PathBuf,
    pub source: RedirectionSource,
}

/// Two wildcard-expanded images that produced the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionCollision {
    pub key: String,
    pub kept: PathBuf,
    pub discarded: PathBuf,
}

/// Line counts from a statistics pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionStats {
    pub total_lines: usize,
    pub empty_lines: usize,
    pub comment_lines: usize,
    pub wildcard_lines: usize,
    pub explicit_lines: usize,
    pub invalid_lines: usize,
}

/// Result of parsing a redirection file.
#[derive(Debug, Clone, Default)]
pub struct RedirectionMap {
    entries: BTreeMap<String, RedirectionEntry>,
    pub collisions: Vec<RedirectionCollision>,
    /// Wildcard folders that do not exist under the thumbnail directory
    pub missing_dirs: Vec<PathBuf>,
}

impl RedirectionMap {
    pub fn get(&self, key: &str) -> Option<&RedirectionEntry> {
        self.entries.get(key)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &RedirectionEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Empty,
    Comment,
    Wildcard(PathBuf),
    Explicit { key: &'a str, path: PathBuf },
    Invalid,
}

/// Turn a legacy path (either separator) into a safe relative path.
fn relative_path(raw: &str) -> Option<PathBuf> {
    let normalized = raw.trim().trim_matches('"').replace('\\', "/");
    let path = PathBuf::from(normalized.trim_matches('/'));
    let safe = path
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    safe.then_some(path)
}

fn classify(line: &str) -> Line<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    if line.starts_with(';') || line.starts_with('/') || line.starts_with('\\') {
        return Line::Comment;
    }

    if let Some((key, path)) = line.split_once('=') {
        let key = key.trim();
        return match relative_path(path) {
            Some(path) if !key.is_empty() && !path.as_os_str().is_empty() => {
                Line::Explicit { key, path }
            }
            _ => Line::Invalid,
        };
    }

    if let Some(dir) = line.strip_suffix('*') {
        return match relative_path(dir) {
            Some(dir) => Line::Wildcard(dir),
            None => Line::Invalid,
        };
    }
    Line::Invalid
}

/// Count line kinds without touching the filesystem.
pub fn redirection_stats(text: &str) -> RedirectionStats {
    let mut stats = RedirectionStats::default();
    for line in text.lines() {
        stats.total_lines += 1;
        match classify(line) {
            Line::Empty => stats.empty_lines += 1,
            Line::Comment => stats.comment_lines += 1,
            Line::Wildcard(_) => stats.wildcard_lines += 1,
            Line::Explicit { .. } => stats.explicit_lines += 1,
            Line::Invalid => stats.invalid_lines += 1,
        }
    }
    stats
}

fn is_recognized_image(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Images directly inside `dir`, sorted by file name.
fn images_in(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| MigrationError::io_with_path(e, dir))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_recognized_image(path, extensions))
        .collect();
    images.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(images)
}

/// Parse redirection text whose relative paths resolve against `thumbnail_dir`.
pub fn parse_redirection(text: &str, thumbnail_dir: &Path, extensions: &[String]) -> RedirectionMap {
    let mut map = RedirectionMap::default();
    let mut explicit: Vec<RedirectionEntry> = Vec::new();

    for (number, line) in text.lines().enumerate() {
        match classify(line) {
            Line::Wildcard(dir) => {
                let folder = thumbnail_dir.join(&dir);
                let images = match images_in(&folder, extensions) {
                    Ok(images) => images,
                    Err(e) => {
                        debug!("Wildcard folder unavailable ({}): {}", folder.display(), e);
                        map.missing_dirs.push(dir);
                        continue;
                    }
                };
                for image in images {
                    let (Some(stem), Some(file_name)) = (image.file_stem(), image.file_name()) else {
                        continue;
                    };
                    let key = stem.to_string_lossy().to_string();
                    let relative = dir.join(file_name);
                    match map.entries.get(&key) {
                        Some(existing) => {
                            warn!(
                                "Redirection key '{}' already maps to {}; ignoring {}",
                                key,
                                existing.relative_path.display(),
                                relative.display()
                            );
                            map.collisions.push(RedirectionCollision {
                                key,
                                kept: existing.relative_path.clone(),
                                discarded: relative,
                            });
                        }
                        None => {
                            map.entries.insert(
                                key.clone(),
                                RedirectionEntry {
                                    key,
                                    relative_path: relative,
                                    source: RedirectionSource::Wildcard,
                                },
                            );
                        }
                    }
                }
            }
            Line::Explicit { key, path } => explicit.push(RedirectionEntry {
                key: key.to_string(),
                relative_path: path,
                source: RedirectionSource::Explicit,
            }),
            Line::Invalid => debug!("Ignoring invalid redirection line {}: {}", number + 1, line),
            Line::Empty | Line::Comment => {}
        }
    }

    // Explicit mappings are applied last so they override wildcard entries
    // regardless of where they appear in the file.
    for entry in explicit {
        map.entries.insert(entry.key.clone(), entry);
    }
    map
}

/// Load and parse a redirection file. A missing file yields `None`.
///
/// The file is decoded lossily; keys outside UTF-8 simply will not match
/// any node name.
pub async fn load_redirection(path: &Path, extensions: &[String]) -> Result<Option<RedirectionMap>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(MigrationError::io_with_path(e, path)),
    };
    let text = String::from_utf8_lossy(&bytes);
    let stats = redirection_stats(&text);
    debug!(
        "{}: {} lines ({} wildcard, {} explicit, {} invalid)",
        path.display(),
        stats.total_lines,
        stats.wildcard_lines,
        stats.explicit_lines,
        stats.invalid_lines
    );
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(Some(parse_redirection(&text, base, extensions)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["png".into(), "jpg".into()]
    }

    fn thumbnail_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("Characters")).unwrap();
        std::fs::create_dir_all(root.join("Alt")).unwrap();
        std::fs::write(root.join("Characters/Keqing.png"), b"").unwrap();
        std::fs::write(root.join("Characters/Fire.JPG"), b"").unwrap();
        std::fs::write(root.join("Characters/notes.txt"), b"").unwrap();
        std::fs::write(root.join("Alt/Keqing.jpg"), b"").unwrap();
        std::fs::write(root.join("Root.png"), b"").unwrap();
        temp
    }

    #[test]
    fn test_classify_lines() {
        assert_eq!(classify("   "), Line::Empty);
        assert_eq!(classify("; note"), Line::Comment);
        assert_eq!(classify("// note"), Line::Comment);
        assert_eq!(classify("\\ note"), Line::Comment);
        assert_eq!(classify("Characters\\*"), Line::Wildcard(PathBuf::from("Characters")));
        assert_eq!(classify("*"), Line::Wildcard(PathBuf::new()));
        assert_eq!(
            classify("Keqing = a\\b.png"),
            Line::Explicit {
                key: "Keqing",
                path: PathBuf::from("a/b.png")
            }
        );
        assert_eq!(classify("= a.png"), Line::Invalid);
        assert_eq!(classify("Keqing = ../escape.png"), Line::Invalid);
        assert_eq!(classify("just words"), Line::Invalid);
    }

    #[test]
    fn test_stats_pass() {
        let text = "; header\n\nCharacters/*\nKeqing = kq.png\n/ another\nbogus\n";
        let stats = redirection_stats(text);
        assert_eq!(
            stats,
            RedirectionStats {
                total_lines: 6,
                empty_lines: 1,
                comment_lines: 2,
                wildcard_lines: 1,
                explicit_lines: 1,
                invalid_lines: 1,
            }
        );
    }

    #[test]
    fn test_wildcard_registers_recognized_images() {
        let temp = thumbnail_tree();
        let map = parse_redirection("Characters/*", temp.path(), &exts());
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.get("Fire").unwrap().relative_path,
            PathBuf::from("Characters/Fire.JPG")
        );
        assert!(map.get("notes").is_none());
    }

    #[test]
    fn test_explicit_overrides_wildcard_in_either_order() {
        let temp = thumbnail_tree();
        for text in [
            "Keqing = Root.png\nCharacters/*",
            "Characters/*\nKeqing = Root.png",
        ] {
            let map = parse_redirection(text, temp.path(), &exts());
            let entry = map.get("Keqing").unwrap();
            assert_eq!(entry.relative_path, PathBuf::from("Root.png"));
            assert_eq!(entry.source, RedirectionSource::Explicit);
        }
    }

    #[test]
    fn test_wildcard_collision_keeps_first_and_reports() {
        let temp = thumbnail_tree();
        let map = parse_redirection("Characters/*\nAlt/*", temp.path(), &exts());
        assert_eq!(
            map.get("Keqing").unwrap().relative_path,
            PathBuf::from("Characters/Keqing.png")
        );
        assert_eq!(map.collisions.len(), 1);
        assert_eq!(map.collisions[0].discarded, PathBuf::from("Alt/Keqing.jpg"));
    }

    #[test]
    fn test_missing_wildcard_folder_is_recorded() {
        let temp = thumbnail_tree();
        let map = parse_redirection("Weapons/*\n*", temp.path(), &exts());
        assert_eq!(map.missing_dirs, vec![PathBuf::from("Weapons")]);
        assert_eq!(map.get("Root").unwrap().relative_path, PathBuf::from("Root.png"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let loaded = load_redirection(&temp.path().join("redirection.ini"), &exts())
            .await
            .unwrap();
        assert!(loaded.is_none());
    }
}
