//! Step 5: copy mod archives and create destination mod records.
//!
//! Entries are processed one at a time in identifier order. A missing
//! archive is skipped with a warning; any other per-entry failure is recorded
//! as an error and the loop moves on. Cancellation is checked before every
//! entry.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::MigrationStep;
use crate::config::LegacyLayout;
use crate::error::Result;
use crate::legacy::{load_mod_index, LegacyModEntry};
use crate::library::{
    fingerprint_archive_async, ArchiveMode, ArchiveService, ArchiveType, NewMod,
};
use crate::migration::context::{MigrationServices, RunContext};
use crate::migration::types::StepKind;
use crate::rules::{ClassificationRuleEngine, RuleStore};

pub struct MigrateArchivesStep;

enum EntryOutcome {
    Migrated { mod_id: String, transferred: bool },
    MissingArchive(PathBuf),
}

/// Map legacy tags onto tags the library already knows, ignoring case.
///
/// Unknown tags are kept as written and become known for later entries.
pub fn normalize_tags(tags: &[String], known: &mut Vec<String>) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let canonical = match known.iter().find(|k| k.eq_ignore_ascii_case(tag)) {
            Some(existing) => existing.clone(),
            None => {
                known.push(tag.to_string());
                tag.to_string()
            }
        };
        if !normalized.iter().any(|t| t.eq_ignore_ascii_case(&canonical)) {
            normalized.push(canonical);
        }
    }
    normalized
}

/// Ask the rule engine for a category using the archive's listing.
async fn detect_category(
    archives: &dyn ArchiveService,
    rules: &ClassificationRuleEngine,
    archive: &Path,
    name: &str,
) -> Option<String> {
    let mut files = match archives.list_entries(archive).await {
        Ok(entries) => entries
            .into_iter()
            .map(|entry| format!("mods/{}/{}", name, entry.replace('\\', "/")))
            .collect(),
        Err(e) => {
            debug!("Cannot list {}: {}", archive.display(), e);
            Vec::new()
        }
    };
    files.push(format!("mods/{}", name));
    rules.resolve(&files).map(|m| m.category)
}

async fn migrate_entry(
    ctx: &RunContext,
    services: &MigrationServices,
    rules: &ClassificationRuleEngine,
    known_tags: &mut Vec<String>,
    entry: &LegacyModEntry,
) -> Result<EntryOutcome> {
    let src = ctx
        .options
        .source
        .join(LegacyLayout::RESOURCES_DIR)
        .join(LegacyLayout::MODS_DIR)
        .join(&entry.id);
    if !src.is_file() {
        return Ok(EntryOutcome::MissingArchive(src));
    }

    let hinted = entry
        .archive_type
        .as_deref()
        .map(ArchiveType::from_hint)
        .unwrap_or_default();
    let archive_type = match hinted {
        ArchiveType::Unknown => services.archives.detect_archive_type(&src).await?,
        known => known,
    };

    let fingerprint = fingerprint_archive_async(&src).await?;
    let mod_id = fingerprint.mod_id();
    let dest = ctx.library.archives_dir().join(&mod_id);
    let outcome = services
        .files
        .copy_file(&src, &dest, ctx.options.archive_mode)
        .await?;

    let with_metadata = ctx.options.migrate_metadata;
    let name = if with_metadata {
        entry.display_name().to_string()
    } else {
        entry.id.clone()
    };
    let indexed_category = entry
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| with_metadata && !c.is_empty())
        .map(str::to_string);
    let category = match indexed_category {
        Some(category) => Some(category),
        None => detect_category(services.archives.as_ref(), rules, &src, &name).await,
    };
    let tags = if with_metadata {
        normalize_tags(entry.tags.as_deref().unwrap_or_default(), known_tags)
    } else {
        Vec::new()
    };

    let new_mod = NewMod {
        id: mod_id.clone(),
        name,
        category,
        archive_path: dest,
        archive_type,
        sha256: Some(fingerprint.sha256),
        tags,
        author: entry.author.clone().filter(|_| with_metadata),
        url: entry.url.clone().filter(|_| with_metadata),
        description: entry.description.clone().filter(|_| with_metadata),
        legacy_id: Some(entry.id.clone()),
    };
    let (record, created) = services.mods.get_or_create_mod(new_mod).await?;
    debug!(
        "Mod {} -> {} ({}, {})",
        entry.id,
        record.id,
        record.archive_type.as_str(),
        if created { "created" } else { "existing" }
    );

    Ok(EntryOutcome::Migrated {
        mod_id: record.id,
        transferred: outcome.transferred(),
    })
}

#[async_trait]
impl MigrationStep for MigrateArchivesStep {
    fn kind(&self) -> StepKind {
        StepKind::Archives
    }

    async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()> {
        let index_dir = ctx.environment_path()?.join(LegacyLayout::MODS_INDEX_DIR);
        let scan = load_mod_index(&index_dir).await;
        for warning in scan.warnings {
            ctx.warn(warning).await;
        }
        let index = scan.value;

        let rules = match ctx.rules.clone() {
            Some(rules) => rules,
            None => match RuleStore::load_or_default(ctx.library.rules_file())
                .and_then(|store| store.engine())
            {
                Ok(rules) => rules,
                Err(e) => {
                    ctx.warn(format!("Auto-detection rules unavailable: {}", e))
                        .await;
                    ClassificationRuleEngine::new()
                }
            },
        };

        if ctx.options.archive_mode == ArchiveMode::Move {
            ctx.warn("Archive mode 'move' copies archives; the legacy installation is never modified")
                .await;
        }

        let mut known_tags = match services.mods.get_all_tags().await {
            Ok(tags) => tags,
            Err(e) => {
                debug!("Existing tags unavailable: {}", e);
                Vec::new()
            }
        };

        let total = index.len();
        ctx.info(format!(
            "Migrating {} indexed mods from {} shard(s)",
            total,
            index.shards_loaded()
        ))
        .await;

        for (position, entry) in index.entries().enumerate() {
            ctx.cancel.check()?;
            ctx.report(entry.display_name(), position, total);

            match migrate_entry(ctx, services, &rules, &mut known_tags, entry).await {
                Ok(EntryOutcome::Migrated { mod_id, transferred }) => {
                    ctx.result.mods_migrated += 1;
                    if transferred {
                        ctx.result.archives_copied += 1;
                    }
                    ctx.migrated_mods.insert(entry.id.clone(), mod_id);
                }
                Ok(EntryOutcome::MissingArchive(path)) => {
                    ctx.warn(format!(
                        "Archive for {} not found at {}, skipping",
                        entry.id,
                        path.display()
                    ))
                    .await;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    ctx.record_error(format!("Failed to migrate mod {}: {}", entry.id, e))
                        .await;
                }
            }
            ctx.report(entry.display_name(), position + 1, total);
        }

        ctx.info(format!(
            "Archives: {} mods migrated, {} archives copied",
            ctx.result.mods_migrated, ctx.result.archives_copied
        ))
        .await;
        Ok(())
    }
}
