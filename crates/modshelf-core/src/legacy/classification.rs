//! Legacy classification files.
//!
//! Every file in `classification/` is one top-level category named after the
//! file (extension dropped). Each non-empty line is a child category, kept in
//! source order.

use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

use super::ScanOutcome;
use crate::error::MigrationError;

/// A top-level category and its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyCategory {
    pub name: String,
    pub children: Vec<String>,
}

/// Child names from the text of one classification file.
///
/// Lines are trimmed; blank lines and repeated names are dropped.
pub fn parse_classification_lines(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(|line| line.trim().trim_start_matches('\u{feff}'))
        .filter(|line| !line.is_empty())
        .filter(|line| seen.insert(line.to_string()))
        .map(str::to_string)
        .collect()
}

/// Load every category file in `dir`, ordered by file name.
///
/// Files are decoded lossily, so legacy encodings still yield their ASCII
/// names. A file that cannot be read is skipped with a warning.
pub async fn load_classifications(dir: &Path) -> ScanOutcome<Vec<LegacyCategory>> {
    let mut outcome = ScanOutcome::new(Vec::new());
    let mut files: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(e) => {
            outcome.warn(MigrationError::io_with_path(e, dir).to_string());
            return outcome;
        }
    };
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    for path in files {
        let Some(name) = path.file_stem().map(|s| s.to_string_lossy().trim().to_string()) else {
            continue;
        };
        if name.is_empty() {
            continue;
        }

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                outcome.warn(format!(
                    "Skipping classification file: {}",
                    MigrationError::io_with_path(e, &path)
                ));
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        if matches!(text, Cow::Owned(_)) {
            outcome.warn(format!(
                "Classification file {} is not valid UTF-8; unreadable characters were replaced",
                path.display()
            ));
        }
        let children = parse_classification_lines(&text);
        debug!("Category {}: {} children", name, children.len());
        outcome.value.push(LegacyCategory { name, children });
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_lines_keeps_order_and_drops_blanks() {
        let children = parse_classification_lines("Fire\n\n  Water \r\nFire\nEarth\n");
        assert_eq!(children, vec!["Fire", "Water", "Earth"]);
    }

    #[tokio::test]
    async fn test_load_categories_from_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("classification");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Elements"), "Fire\nWater\n").unwrap();
        std::fs::write(dir.join("Characters.txt"), "Keqing\n").unwrap();

        let scan = load_classifications(&dir).await;
        assert!(scan.is_clean());
        let categories = scan.value;
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].name, "Characters");
        assert_eq!(categories[1].name, "Elements");
        assert_eq!(categories[1].children, vec!["Fire", "Water"]);
    }

    #[tokio::test]
    async fn test_load_missing_directory_warns() {
        let temp = TempDir::new().unwrap();
        let scan = load_classifications(&temp.path().join("missing")).await;
        assert!(scan.value.is_empty());
        assert_eq!(scan.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_file_is_decoded_lossily() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("classification");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Elements"), "Fire\n").unwrap();
        std::fs::write(dir.join("Chars"), b"\xbf\xcc\xc7\xe7\nKeqing\n").unwrap();

        let scan = load_classifications(&dir).await;
        assert_eq!(scan.value.len(), 2);
        assert_eq!(scan.value[0].name, "Chars");
        assert_eq!(scan.value[0].children.len(), 2);
        assert_eq!(scan.value[0].children[1], "Keqing");
        assert_eq!(scan.value[1].children, vec!["Fire"]);
        assert!(scan.warnings.iter().any(|w| w.contains("UTF-8")));
    }
}
