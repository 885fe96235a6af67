//! Step 3: classification files become nodes and auto-detection rules.
//!
//! Every category file yields one parent node and one child node per line.
//! Each `(category, child)` pair also yields a rule `*<child>*` that files
//! matching mods under the child. Nodes that already exist are reused so a
//! re-run creates nothing new.

use async_trait::async_trait;

use super::MigrationStep;
use crate::config::{LegacyLayout, MigrationConfig};
use crate::error::Result;
use crate::legacy::load_classifications;
use crate::library::{ClassificationNode, ClassificationService, NewNode};
use crate::migration::context::{MigrationServices, RunContext};
use crate::migration::types::StepKind;
use crate::rules::{AutoDetectionRule, RuleStore};

pub struct MigrateClassificationsStep;

/// Find a node by name under `parent_id`, creating it when absent.
///
/// Returns the node and whether it was created.
async fn get_or_create_node(
    service: &dyn ClassificationService,
    name: &str,
    parent_id: Option<&str>,
    priority: i32,
) -> Result<(ClassificationNode, bool)> {
    if let Some(existing) = service.find_node(name, parent_id).await? {
        return Ok((existing, false));
    }
    let node = service
        .create_node(NewNode {
            name: name.to_string(),
            parent_id: parent_id.map(str::to_string),
            priority,
        })
        .await?;
    Ok((node, true))
}

/// Append `rules` to the library's rule file and load the merged engine into
/// the context. Returns how many rules were new.
fn persist_rules(ctx: &mut RunContext, rules: Vec<AutoDetectionRule>) -> Result<usize> {
    let mut store = RuleStore::load_or_default(ctx.library.rules_file())?;
    let added = rules.into_iter().filter(|r| store.add_rule(r.clone())).count();
    store.save()?;
    ctx.rules = Some(store.engine()?);
    Ok(added)
}

#[async_trait]
impl MigrationStep for MigrateClassificationsStep {
    fn kind(&self) -> StepKind {
        StepKind::Classifications
    }

    async fn run(&self, ctx: &mut RunContext, services: &MigrationServices) -> Result<()> {
        let dir = ctx.environment_path()?.join(LegacyLayout::CLASSIFICATION_DIR);
        if !dir.is_dir() {
            ctx.warn(format!(
                "Classification directory not found: {}",
                dir.display()
            ))
            .await;
            return Ok(());
        }

        let scan = load_classifications(&dir).await;
        for warning in scan.warnings {
            ctx.warn(warning).await;
        }
        let categories = scan.value;
        let total: usize = categories.iter().map(|c| 1 + c.children.len()).sum();
        let mut processed = 0;
        let mut rules = Vec::new();

        for (category_index, category) in categories.iter().enumerate() {
            processed += 1;
            let parent = match get_or_create_node(
                services.classifications.as_ref(),
                &category.name,
                None,
                category_index as i32,
            )
            .await
            {
                Ok((parent, created)) => {
                    if created {
                        ctx.result.classification_entries_created += 1;
                    }
                    parent
                }
                Err(e) => {
                    ctx.record_error(format!(
                        "Failed to migrate category '{}': {}",
                        category.name, e
                    ))
                    .await;
                    processed += category.children.len();
                    ctx.report(&category.name, processed, total);
                    continue;
                }
            };
            ctx.created_nodes.insert(parent.name.clone(), parent.id.clone());
            ctx.report(&category.name, processed, total);

            for (child_index, child) in category.children.iter().enumerate() {
                processed += 1;
                match get_or_create_node(
                    services.classifications.as_ref(),
                    child,
                    Some(&parent.id),
                    child_index as i32,
                )
                .await
                {
                    Ok((node, created)) => {
                        if created {
                            ctx.result.classification_entries_created += 1;
                        }
                        ctx.created_nodes.entry(node.name.clone()).or_insert(node.id);
                        rules.push(AutoDetectionRule::new(
                            format!("{}/{}", category.name, child),
                            format!("*{}*", child),
                            child.clone(),
                            MigrationConfig::MIGRATED_RULE_PRIORITY,
                        ));
                    }
                    Err(e) => {
                        ctx.record_error(format!(
                            "Failed to migrate classification '{}/{}': {}",
                            category.name, child, e
                        ))
                        .await
                    }
                }
                ctx.report(format!("{}/{}", category.name, child), processed, total);
            }
        }

        let added = match persist_rules(ctx, rules) {
            Ok(added) => added,
            Err(e) => {
                ctx.warn(format!("Migrated auto-detection rules were not saved: {}", e))
                    .await;
                0
            }
        };

        ctx.info(format!(
            "Classifications: {} categories, {} nodes created, {} rules added",
            categories.len(),
            ctx.result.classification_entries_created,
            added
        ))
        .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::library::JsonLibraryStore;
    use tempfile::TempDir;

    fn write_elements(source: &std::path::Path) {
        let dir = source.join("home/Default/classification");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Elements"), "Fire\nWater\n").unwrap();
    }

    #[tokio::test]
    async fn test_creates_parent_children_and_rules() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        write_elements(&source);
        let library = temp.path().join("lib");

        let mut ctx = analyzed_context(&source, &library);
        let services = services(&library);
        MigrateClassificationsStep.run(&mut ctx, &services).await.unwrap();

        assert_eq!(ctx.result.classification_entries_created, 3);
        assert_eq!(ctx.created_nodes.len(), 3);

        let engine = ctx.rules.as_ref().unwrap();
        assert_eq!(
            engine.resolve_category(&["mods/FireSword/a.ini"]).as_deref(),
            Some("Fire")
        );

        let fire = services
            .classifications
            .get_node_by_name("Fire")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fire.parent_id.as_deref(), ctx.created_nodes.get("Elements").map(String::as_str));
    }

    #[tokio::test]
    async fn test_rerun_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        write_elements(&source);
        let library = temp.path().join("lib");

        let services = services(&library);
        let mut first = analyzed_context(&source, &library);
        MigrateClassificationsStep.run(&mut first, &services).await.unwrap();
        let mut second = analyzed_context(&source, &library);
        MigrateClassificationsStep.run(&mut second, &services).await.unwrap();

        assert_eq!(second.result.classification_entries_created, 0);
        assert_eq!(second.created_nodes, first.created_nodes);
        let store = RuleStore::load_or_default(library.join("auto_detection_rules.json")).unwrap();
        assert_eq!(
            store.rules().iter().filter(|r| r.name == "Elements/Fire").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_shared_child_name_rerun_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        let dir = source.join("home/Default/classification");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("Elements"), "Fire\n").unwrap();
        std::fs::write(dir.join("Weapons"), "Fire\n").unwrap();
        let library = temp.path().join("lib");
        let services = services(&library);

        let mut created = Vec::new();
        for _ in 0..3 {
            let mut ctx = analyzed_context(&source, &library);
            MigrateClassificationsStep.run(&mut ctx, &services).await.unwrap();
            created.push(ctx.result.classification_entries_created);
        }

        assert_eq!(created, vec![4, 0, 0]);
        let store = JsonLibraryStore::open(library.join("library.json")).unwrap();
        assert_eq!(store.nodes().await.len(), 4);
    }

    #[tokio::test]
    async fn test_non_utf8_category_does_not_abort() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("legacy");
        write_elements(&source);
        let dir = source.join("home/Default/classification");
        std::fs::write(dir.join("Chars"), b"\xbf\xcc\xc7\xe7\n").unwrap();
        let library = temp.path().join("lib");

        let mut ctx = analyzed_context(&source, &library);
        MigrateClassificationsStep
            .run(&mut ctx, &services(&library))
            .await
            .unwrap();

        // Chars + its lossy child, Elements + Fire + Water
        assert_eq!(ctx.result.classification_entries_created, 5);
        assert!(ctx.created_nodes.contains_key("Fire"));
        assert!(ctx.result.warnings.iter().any(|w| w.contains("UTF-8")));
        assert!(ctx.result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_warning() {
        let temp = TempDir::new().unwrap();
        let library = temp.path().join("lib");
        let mut ctx = analyzed_context(temp.path(), &library);

        MigrateClassificationsStep
            .run(&mut ctx, &services(&library))
            .await
            .unwrap();
        assert_eq!(ctx.result.classification_entries_created, 0);
        assert_eq!(ctx.result.warnings.len(), 1);
        assert!(JsonLibraryStore::open(library.join("library.json"))
            .unwrap()
            .nodes()
            .await
            .is_empty());
    }
}
