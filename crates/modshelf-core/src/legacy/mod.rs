//! Decoders for the legacy installation's file formats.
//!
//! Four independent parsers, none of which writes anywhere:
//! - [`config`] - the `configuration` key-value file
//! - [`mod_index`] - sharded `modsIndex/*` metadata, merged by identifier
//! - [`classification`] - one category per file, one child per line
//! - [`redirection`] - the thumbnail `redirection.ini` mini-language

pub mod classification;
pub mod config;
pub mod mod_index;
pub mod redirection;

pub use classification::{load_classifications, parse_classification_lines, LegacyCategory};
pub use config::{load_configuration, parse_configuration, LegacyConfiguration};
pub use mod_index::{load_mod_index, parse_shard, LegacyModEntry, ModIndex};
pub use redirection::{
    load_redirection, parse_redirection, redirection_stats, RedirectionCollision,
    RedirectionEntry, RedirectionMap, RedirectionSource, RedirectionStats,
};

/// A best-effort scan result: the value plus anything that went wrong on the way.
///
/// Callers decide whether the warnings matter; the scan itself never fails
/// because of them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> ScanOutcome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}
