//! Read-only inspection of a legacy installation.

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::types::LegacyAnalysis;
use crate::config::LegacyLayout;
use crate::legacy::{load_configuration, ScanOutcome};
use crate::system::format_size;

/// File count and byte total of one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeTally {
    pub files: usize,
    pub bytes: u64,
}

impl SizeTally {
    fn add(&mut self, bytes: u64) {
        self.files += 1;
        self.bytes += bytes;
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|known| known.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Files directly inside `dir`. Nothing is read beyond metadata.
pub fn scan_flat(dir: &Path) -> ScanOutcome<SizeTally> {
    let mut outcome = ScanOutcome::new(SizeTally::default());
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            outcome.warn(format!("Cannot list {}: {}", dir.display(), e));
            return outcome;
        }
    };

    for entry in entries {
        match entry.and_then(|e| e.metadata()) {
            Ok(meta) if meta.is_file() => outcome.value.add(meta.len()),
            Ok(_) => {}
            Err(e) => outcome.warn(format!("Cannot stat entry in {}: {}", dir.display(), e)),
        }
    }
    outcome
}

/// Files under `dir` at any depth, optionally filtered by extension.
///
/// I/O errors on a subtree become warnings and the count is best-effort.
pub fn scan_recursive(dir: &Path, extensions: Option<&[String]>) -> ScanOutcome<SizeTally> {
    let mut outcome = ScanOutcome::new(SizeTally::default());
    for entry in WalkDir::new(dir).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                outcome.warn(format!("Partial scan of {}: {}", dir.display(), e));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(extensions) = extensions {
            if !has_extension(entry.path(), extensions) {
                continue;
            }
        }
        match entry.metadata() {
            Ok(meta) => outcome.value.add(meta.len()),
            Err(e) => outcome.warn(format!("Cannot stat {}: {}", entry.path().display(), e)),
        }
    }
    outcome
}

/// Names of the subdirectories of `home`, sorted.
fn list_environments(home: &Path) -> ScanOutcome<Vec<String>> {
    let mut outcome = ScanOutcome::new(Vec::new());
    match std::fs::read_dir(home) {
        Ok(entries) => {
            for entry in entries.filter_map(|e| e.ok()) {
                if entry.path().is_dir() {
                    outcome.value.push(entry.file_name().to_string_lossy().to_string());
                }
            }
            outcome.value.sort();
        }
        Err(e) => outcome.warn(format!("Cannot list environments in {}: {}", home.display(), e)),
    }
    outcome
}

/// Inspects a legacy root and produces a [`LegacyAnalysis`].
#[derive(Debug, Clone)]
pub struct SourceAnalyzer {
    preview_extensions: Vec<String>,
}

impl SourceAnalyzer {
    pub fn new(preview_extensions: Vec<String>) -> Self {
        Self { preview_extensions }
    }

    /// Analyze `source`. `environment` overrides the active environment.
    pub async fn analyze(&self, source: &Path, environment: Option<&str>) -> LegacyAnalysis {
        let mut analysis = LegacyAnalysis {
            source: source.to_path_buf(),
            ..Default::default()
        };

        if !source.is_dir() {
            analysis
                .errors
                .push(format!("Source path does not exist: {}", source.display()));
            return Self::finish(analysis);
        }

        let resources = source.join(LegacyLayout::RESOURCES_DIR);
        if !resources.is_dir() {
            analysis.errors.push(format!(
                "Required directory missing: {}",
                resources.display()
            ));
            return Self::finish(analysis);
        }
        if let Err(e) = std::fs::read_dir(&resources) {
            analysis
                .errors
                .push(format!("Cannot read {}: {}", resources.display(), e));
            return Self::finish(analysis);
        }
        analysis.is_valid = true;

        let home = source.join(LegacyLayout::HOME_DIR);
        if home.is_dir() {
            let envs = list_environments(&home);
            analysis.warnings.extend(envs.warnings);
            analysis.environments = envs.value;
        } else {
            analysis.warnings.push(format!(
                "Home directory missing ({}); assuming a single '{}' environment",
                home.display(),
                LegacyLayout::DEFAULT_ENVIRONMENT
            ));
        }
        if analysis.environments.is_empty() {
            analysis
                .environments
                .push(LegacyLayout::DEFAULT_ENVIRONMENT.to_string());
        }

        let active = match environment {
            Some(name) if analysis.environments.iter().any(|e| e == name) => name.to_string(),
            Some(name) => {
                analysis.warnings.push(format!(
                    "Environment '{}' not found; using '{}'",
                    name, analysis.environments[0]
                ));
                analysis.environments[0].clone()
            }
            None => analysis.environments[0].clone(),
        };

        let mods = scan_flat(&resources.join(LegacyLayout::MODS_DIR));
        analysis.warnings.extend(mods.warnings);
        analysis.mod_count = mods.value.files;
        analysis.total_archive_size = mods.value.bytes;

        let preview_dir = resources.join(LegacyLayout::PREVIEW_DIR);
        if preview_dir.is_dir() {
            let previews = scan_recursive(&preview_dir, Some(&self.preview_extensions));
            analysis.warnings.extend(previews.warnings);
            analysis.preview_count = previews.value.files;
            analysis.total_preview_size = previews.value.bytes;
        }

        let cache_dir = resources.join(LegacyLayout::CACHE_DIR);
        if cache_dir.is_dir() {
            let cache = scan_recursive(&cache_dir, None);
            analysis.warnings.extend(cache.warnings);
            analysis.cache_size = cache.value.bytes;
        }

        let config_path = environment_path(source, &active).join(LegacyLayout::CONFIGURATION_FILE);
        match load_configuration(&config_path).await {
            Ok(config) => analysis.configuration = config,
            Err(e) => {
                warn!("Ignoring unreadable legacy configuration: {}", e);
                analysis
                    .warnings
                    .push(format!("Legacy configuration could not be parsed: {}", e));
            }
        }

        analysis.active_environment = Some(active);
        info!(
            "Analyzed {}: {} mods ({}), {} previews, {} environment(s)",
            source.display(),
            analysis.mod_count,
            format_size(analysis.total_archive_size),
            analysis.preview_count,
            analysis.environments.len()
        );
        Self::finish(analysis)
    }

    fn finish(mut analysis: LegacyAnalysis) -> LegacyAnalysis {
        analysis.total_archive_size_formatted = format_size(analysis.total_archive_size);
        analysis.total_preview_size_formatted = format_size(analysis.total_preview_size);
        analysis.cache_size_formatted = format_size(analysis.cache_size);
        if !analysis.is_valid {
            debug!("Invalid legacy source: {:?}", analysis.errors);
        }
        analysis
    }
}

/// `<source>/home/<environment>`.
pub fn environment_path(source: &Path, environment: &str) -> PathBuf {
    source.join(LegacyLayout::HOME_DIR).join(environment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["png".into(), "jpg".into()]
    }

    #[tokio::test]
    async fn test_missing_resources_is_invalid() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("home/Default")).unwrap();

        let analysis = SourceAnalyzer::new(exts()).analyze(temp.path(), None).await;
        assert!(!analysis.is_valid);
        assert!(!analysis.errors.is_empty());
        assert!(analysis.active_environment.is_none());
    }

    #[tokio::test]
    async fn test_missing_source_is_invalid() {
        let temp = TempDir::new().unwrap();
        let analysis = SourceAnalyzer::new(exts())
            .analyze(&temp.path().join("nope"), None)
            .await;
        assert!(!analysis.is_valid);
        assert_eq!(analysis.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_home_implies_default_environment() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("resources/mods")).unwrap();

        let analysis = SourceAnalyzer::new(exts()).analyze(temp.path(), None).await;
        assert!(analysis.is_valid);
        assert_eq!(analysis.active_environment.as_deref(), Some("Default"));
        assert_eq!(analysis.warnings.len(), 1);
        assert!(analysis.warnings[0].contains("Home directory missing"));
    }

    #[tokio::test]
    async fn test_counts_and_sizes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("resources/mods")).unwrap();
        std::fs::create_dir_all(root.join("resources/preview/B2")).unwrap();
        std::fs::create_dir_all(root.join("resources/cache/x")).unwrap();
        std::fs::create_dir_all(root.join("home/Alpha")).unwrap();
        std::fs::create_dir_all(root.join("home/Beta")).unwrap();
        std::fs::write(root.join("resources/mods/A1"), vec![0u8; 100]).unwrap();
        std::fs::write(root.join("resources/mods/B2"), vec![0u8; 50]).unwrap();
        std::fs::write(root.join("resources/preview/A1.png"), vec![0u8; 10]).unwrap();
        std::fs::write(root.join("resources/preview/B2/shot.JPG"), vec![0u8; 5]).unwrap();
        std::fs::write(root.join("resources/preview/B2/readme.txt"), b"x").unwrap();
        std::fs::write(root.join("resources/cache/x/blob"), vec![0u8; 7]).unwrap();
        std::fs::write(root.join("home/Beta/configuration"), "language = en\n").unwrap();

        let analysis = SourceAnalyzer::new(exts())
            .analyze(root, Some("Beta"))
            .await;
        assert!(analysis.is_valid);
        assert_eq!(analysis.environments, vec!["Alpha", "Beta"]);
        assert_eq!(analysis.active_environment.as_deref(), Some("Beta"));
        assert_eq!(analysis.mod_count, 2);
        assert_eq!(analysis.total_archive_size, 150);
        assert_eq!(analysis.preview_count, 2);
        assert_eq!(analysis.total_preview_size, 15);
        assert_eq!(analysis.cache_size, 7);
        assert_eq!(analysis.total_archive_size_formatted, "150 bytes");
        assert_eq!(
            analysis.configuration.unwrap().language.as_deref(),
            Some("en")
        );
    }

    #[tokio::test]
    async fn test_first_environment_is_default_choice() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("resources")).unwrap();
        std::fs::create_dir_all(temp.path().join("home/Zeta")).unwrap();
        std::fs::create_dir_all(temp.path().join("home/Alpha")).unwrap();

        let analysis = SourceAnalyzer::new(exts()).analyze(temp.path(), Some("Missing")).await;
        assert_eq!(analysis.active_environment.as_deref(), Some("Alpha"));
        assert!(analysis.warnings.iter().any(|w| w.contains("Missing")));
    }
}
