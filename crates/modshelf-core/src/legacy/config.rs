//! Legacy configuration parser.
//!
//! The legacy `configuration` file is a loose key-value list:
//!
//! ```text
//! # comment
//! language = en
//! gameDirectory: "D:\Games\3dmigoto"
//! autoRefresh = true
//! ```
//!
//! Some installations wrote the same keys as a flat JSON object, which is
//! accepted too. Only known keys are mapped; everything else is counted and
//! ignored so newer legacy versions still parse.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MigrationError, Result};

/// Typed view of the legacy settings the migration cares about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyConfiguration {
    pub language: Option<String>,
    pub theme: Option<String>,
    pub game_path: Option<PathBuf>,
    pub mods_path: Option<PathBuf>,
    /// Environment the legacy app had selected
    pub environment: Option<String>,
    pub auto_refresh: Option<bool>,
    pub preview_size: Option<u32>,
    pub window_width: Option<u32>,
    pub window_height: Option<u32>,
    /// Number of keys that were present but not recognized
    #[serde(default)]
    pub ignored_keys: usize,
}

impl LegacyConfiguration {
    /// Settings to carry over into the destination, as `(key, value)` pairs.
    pub fn to_settings(&self) -> Vec<(&'static str, serde_json::Value)> {
        let mut settings = Vec::new();
        if let Some(language) = &self.language {
            settings.push(("language", language.clone().into()));
        }
        if let Some(theme) = &self.theme {
            settings.push(("theme", theme.clone().into()));
        }
        if let Some(game_path) = &self.game_path {
            settings.push(("game_path", game_path.display().to_string().into()));
        }
        if let Some(mods_path) = &self.mods_path {
            settings.push(("mods_path", mods_path.display().to_string().into()));
        }
        if let Some(environment) = &self.environment {
            settings.push(("legacy_environment", environment.clone().into()));
        }
        if let Some(auto_refresh) = self.auto_refresh {
            settings.push(("auto_refresh", auto_refresh.into()));
        }
        if let Some(preview_size) = self.preview_size {
            settings.push(("preview_size", preview_size.into()));
        }
        if let Some(width) = self.window_width {
            settings.push(("window_width", width.into()));
        }
        if let Some(height) = self.window_height {
            settings.push(("window_height", height.into()));
        }
        settings
    }

    fn apply(&mut self, key: &str, value: &str) {
        let normalized: String = key
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "language" | "lang" => self.language = non_empty(value),
            "theme" => self.theme = non_empty(value),
            "gamedirectory" | "gamepath" | "gamedir" => self.game_path = non_empty(value).map(PathBuf::from),
            "modsdirectory" | "modspath" | "modsdir" => self.mods_path = non_empty(value).map(PathBuf::from),
            "currentenvironment" | "environment" => self.environment = non_empty(value),
            "autorefresh" => self.auto_refresh = parse_bool(key, value),
            "previewsize" => self.preview_size = parse_u32(key, value),
            "windowwidth" => self.window_width = parse_u32(key, value),
            "windowheight" => self.window_height = parse_u32(key, value),
            _ => {
                debug!("Ignoring unknown legacy configuration key: {}", key);
                self.ignored_keys += 1;
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_bool(key: &str, value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            debug!("Ignoring non-boolean value for {}: {}", key, value);
            None
        }
    }
}

fn parse_u32(key: &str, value: &str) -> Option<u32> {
    value
        .parse()
        .map_err(|_| debug!("Ignoring non-numeric value for {}: {}", key, value))
        .ok()
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Parse the text of a legacy configuration file.
pub fn parse_configuration(text: &str) -> Result<LegacyConfiguration> {
    if text.trim_start().starts_with('{') {
        return parse_json_configuration(text);
    }

    let mut config = LegacyConfiguration::default();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let split_at = match (line.find('='), line.find(':')) {
            (Some(eq), Some(colon)) => eq.min(colon),
            (Some(eq), None) => eq,
            (None, Some(colon)) => colon,
            (None, None) => {
                debug!("Skipping malformed configuration line: {}", line);
                continue;
            }
        };
        let key = line[..split_at].trim();
        let value = unquote(&line[split_at + 1..]);
        if key.is_empty() {
            continue;
        }
        config.apply(key, value);
    }
    Ok(config)
}

fn parse_json_configuration(text: &str) -> Result<LegacyConfiguration> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let object = value.as_object().ok_or_else(|| MigrationError::Validation {
        field: "configuration".to_string(),
        message: "expected a JSON object".to_string(),
    })?;

    let mut config = LegacyConfiguration::default();
    for (key, value) in object {
        let text = match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => {
                config.ignored_keys += 1;
                continue;
            }
        };
        config.apply(key, text.trim());
    }
    Ok(config)
}

/// Load and parse a configuration file. A missing file yields `None`.
pub async fn load_configuration(path: &Path) -> Result<Option<LegacyConfiguration>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => parse_configuration(&String::from_utf8_lossy(&bytes)).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MigrationError::io_with_path(e, path)),
    }
}
