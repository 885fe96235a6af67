//! Persisted auto-detection rules.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::engine::{AutoDetectionRule, ClassificationRuleEngine};
use crate::error::Result;
use crate::library::{atomic_read_json, atomic_write_json};

#[derive(Debug, Default, Serialize, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<AutoDetectionRule>,
}

/// Rules shipped with a fresh library.
pub fn default_rules() -> Vec<AutoDetectionRule> {
    vec![
        AutoDetectionRule::new("Weapons", "*weapon*", "Weapons", 20),
        AutoDetectionRule::new("User Interface", "*/ui/*", "UI", 20),
        AutoDetectionRule::new("Shader Fixes", "*shaderfix*", "Shader Fixes", 30),
        AutoDetectionRule::new("Effects", "*vfx*", "Effects", 10),
        AutoDetectionRule::new("Characters", "*character*", "Characters", 5),
    ]
}

/// Flat, ordered rule collection backed by a JSON file.
///
/// Mutations append and never re-sort.
#[derive(Debug)]
pub struct RuleStore {
    path: PathBuf,
    rules: Vec<AutoDetectionRule>,
}

impl RuleStore {
    /// Load the rule file, creating it with [`default_rules`] when absent.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match atomic_read_json::<RuleFile>(&path)? {
            Some(file) => {
                debug!("Loaded {} rules from {}", file.rules.len(), path.display());
                Ok(Self {
                    path,
                    rules: file.rules,
                })
            }
            None => {
                let store = Self {
                    path,
                    rules: default_rules(),
                };
                store.save()?;
                info!("Created default rule file at {}", store.path.display());
                Ok(store)
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rules(&self) -> &[AutoDetectionRule] {
        &self.rules
    }

    /// Append a rule. Returns `false` if a rule with the same name exists.
    pub fn add_rule(&mut self, rule: AutoDetectionRule) -> bool {
        if self.rules.iter().any(|r| r.name == rule.name) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn save(&self) -> Result<()> {
        let file = RuleFile {
            rules: self.rules.clone(),
        };
        atomic_write_json(&self.path, &file, true)
    }

    /// Compile the stored rules into a matcher.
    pub fn engine(&self) -> Result<ClassificationRuleEngine> {
        ClassificationRuleEngine::from_rules(self.rules.iter().cloned())
    }
}
