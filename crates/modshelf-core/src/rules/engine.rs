//! Priority-ordered, first-match category resolution.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use super::pattern::WildcardPattern;
use crate::error::Result;

/// A wildcard pattern that files a mod under a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDetectionRule {
    pub name: String,
    pub pattern: String,
    pub category: String,
    /// Higher priority rules are evaluated first
    #[serde(default)]
    pub priority: i32,
}

impl AutoDetectionRule {
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        category: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            category: category.into(),
            priority,
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    rule: AutoDetectionRule,
    pattern: WildcardPattern,
}

/// Which rule matched which file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    pub rule_name: String,
    pub category: String,
    pub matched_path: String,
}

/// Holds compiled rules in insertion order.
///
/// Priority is resolved at match time only; adding rules never reorders the
/// stored list. Rules with equal priority are tried in insertion order. For a
/// single rule, files are tried in the order the caller supplies them, which
/// for directory listings depends on the platform.
#[derive(Debug, Clone, Default)]
pub struct ClassificationRuleEngine {
    rules: Vec<CompiledRule>,
}

impl ClassificationRuleEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile every rule; fails on the first invalid pattern.
    pub fn from_rules<I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = AutoDetectionRule>,
    {
        let mut engine = Self::new();
        for rule in rules {
            engine.add_rule(rule)?;
        }
        Ok(engine)
    }

    pub fn add_rule(&mut self, rule: AutoDetectionRule) -> Result<()> {
        let pattern = WildcardPattern::compile(&rule.pattern)?;
        self.rules.push(CompiledRule { rule, pattern });
        Ok(())
    }

    /// Rules in stored (insertion) order.
    pub fn rules(&self) -> impl Iterator<Item = &AutoDetectionRule> {
        self.rules.iter().map(|c| &c.rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Resolve the category for a mod from its relative file paths.
    pub fn resolve<P: AsRef<Path>>(&self, files: &[P]) -> Option<RuleMatch> {
        let mut ordered: Vec<&CompiledRule> = self.rules.iter().collect();
        ordered.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));

        for compiled in ordered {
            for file in files {
                let path = file.as_ref().to_string_lossy();
                if compiled.pattern.matches(&path) {
                    debug!(
                        "Rule '{}' matched {} -> {}",
                        compiled.rule.name, path, compiled.rule.category
                    );
                    return Some(RuleMatch {
                        rule_name: compiled.rule.name.clone(),
                        category: compiled.rule.category.clone(),
                        matched_path: path.to_string(),
                    });
                }
            }
        }
        None
    }

    /// Convenience wrapper returning only the category.
    pub fn resolve_category<P: AsRef<Path>>(&self, files: &[P]) -> Option<String> {
        self.resolve(files).map(|m| m.category)
    }
}
