//! Wildcard pattern compilation.
//!
//! `*` matches any run of characters (including `/`), `?` matches exactly one
//! character, everything else is literal. Matching is case-insensitive and
//! anchored to the whole relative path.

use regex::Regex;

use crate::error::{MigrationError, Result};

/// A compiled, anchored, case-insensitive wildcard.
#[derive(Debug, Clone)]
pub struct WildcardPattern {
    source: String,
    regex: Regex,
}

impl WildcardPattern {
    pub fn compile(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(MigrationError::InvalidPattern {
                pattern: pattern.to_string(),
                message: "pattern is empty".to_string(),
            });
        }

        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("(?is)^");
        let mut literal = String::new();
        for c in pattern.chars() {
            match c {
                '*' | '?' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str(if c == '*' { ".*" } else { "." });
                }
                '\\' => literal.push('/'),
                _ => literal.push(c),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|e| MigrationError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Test a relative path; `\` separators are treated as `/`.
    pub fn matches(&self, relative_path: &str) -> bool {
        if relative_path.contains('\\') {
            self.regex.is_match(&relative_path.replace('\\', "/"))
        } else {
            self.regex.is_match(relative_path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_matches_across_directories() {
        let pattern = WildcardPattern::compile("*Keqing*").unwrap();
        assert!(pattern.matches("mods/KeqingOutfit/texture.dds"));
        assert!(!pattern.matches("mods/Other/texture.dds"));
    }

    #[test]
    fn test_case_insensitive() {
        let pattern = WildcardPattern::compile("*keqing*").unwrap();
        assert!(pattern.matches("MODS/KEQINGOUTFIT/TEXTURE.DDS"));
    }

    #[test]
    fn test_match_is_anchored() {
        let pattern = WildcardPattern::compile("*.ini").unwrap();
        assert!(pattern.matches("mods/a/merged.ini"));
        assert!(!pattern.matches("mods/a/merged.ini.bak"));

        let exact = WildcardPattern::compile("mods/a").unwrap();
        assert!(!exact.matches("prefix/mods/a"));
    }

    #[test]
    fn test_question_mark_is_single_character() {
        let pattern = WildcardPattern::compile("v?.dds").unwrap();
        assert!(pattern.matches("v1.dds"));
        assert!(!pattern.matches("v10.dds"));
        assert!(!pattern.matches("v.dds"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let pattern = WildcardPattern::compile("*(hq)+[1].dds").unwrap();
        assert!(pattern.matches("tex/(hq)+[1].dds"));
        assert!(!pattern.matches("tex/hq1.dds"));
    }

    #[test]
    fn test_backslash_paths() {
        let pattern = WildcardPattern::compile("mods\\*\\*.ini").unwrap();
        assert!(pattern.matches("mods\\Keqing\\merged.ini"));
        assert!(pattern.matches("mods/Keqing/merged.ini"));
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(
            WildcardPattern::compile("  "),
            Err(MigrationError::InvalidPattern { .. })
        ));
    }
}
