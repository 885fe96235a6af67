//! Auto-detection rules: wildcard patterns that infer a mod's category.

mod engine;
mod pattern;
mod store;

pub use engine::{AutoDetectionRule, ClassificationRuleEngine, RuleMatch};
pub use pattern::WildcardPattern;
pub use store::{default_rules, RuleStore};
