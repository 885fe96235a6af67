//! Centralized configuration for Modshelf.
//!
//! Directory and file names of the legacy installation and of the destination
//! library, plus the tunables of the migration pipeline.

/// On-disk layout of a legacy installation.
///
/// ```text
/// <root>/resources/mods/<identifier>
/// <root>/resources/preview/<identifier>.<ext>
/// <root>/resources/preview/<identifier>/<file>.<ext>
/// <root>/resources/cache/**
/// <root>/home/<environment>/modsIndex/*
/// <root>/home/<environment>/classification/<category>
/// <root>/home/<environment>/thumbnail/** + redirection.ini
/// <root>/home/<environment>/configuration
/// ```
pub struct LegacyLayout;

impl LegacyLayout {
    pub const RESOURCES_DIR: &'static str = "resources";
    pub const HOME_DIR: &'static str = "home";
    pub const MODS_DIR: &'static str = "mods";
    pub const PREVIEW_DIR: &'static str = "preview";
    pub const CACHE_DIR: &'static str = "cache";
    pub const MODS_INDEX_DIR: &'static str = "modsIndex";
    pub const CLASSIFICATION_DIR: &'static str = "classification";
    pub const THUMBNAIL_DIR: &'static str = "thumbnail";
    pub const REDIRECTION_FILE: &'static str = "redirection.ini";
    pub const CONFIGURATION_FILE: &'static str = "configuration";
    pub const DEFAULT_ENVIRONMENT: &'static str = "Default";
}

/// On-disk layout of the destination library.
pub struct LibraryLayout;

impl LibraryLayout {
    pub const ARCHIVES_DIR: &'static str = "archives";
    pub const PREVIEWS_DIR: &'static str = "previews";
    pub const THUMBNAILS_DIR: &'static str = "thumbnails";
    pub const LOGS_DIR: &'static str = "logs";
    pub const BACKUP_DIR: &'static str = "legacy-backup";
    pub const STORE_FILE: &'static str = "library.json";
    pub const RULES_FILE: &'static str = "auto_detection_rules.json";
}

/// Migration pipeline tunables.
pub struct MigrationConfig;

impl MigrationConfig {
    /// Image extensions recognized as previews and thumbnails (lowercase).
    pub const PREVIEW_EXTENSIONS: &'static [&'static str] =
        &["png", "jpg", "jpeg", "gif", "webp", "bmp"];
    /// Priority assigned to rules synthesized from legacy classification files.
    pub const MIGRATED_RULE_PRIORITY: i32 = 50;
    /// File name prefix of the per-run log.
    pub const LOG_FILE_PREFIX: &'static str = "migration-";
    /// Name given to the first preview found directly under the preview root.
    pub const PRIMARY_PREVIEW_STEM: &'static str = "preview1";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_extensions_are_lowercase() {
        for ext in MigrationConfig::PREVIEW_EXTENSIONS {
            assert_eq!(*ext, ext.to_lowercase());
            assert!(!ext.starts_with('.'));
        }
    }
}
