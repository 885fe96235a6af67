//! JSON-backed destination store.
//!
//! Holds mods, classification nodes and settings in one `library.json`
//! document. Every mutation rewrites the document atomically.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::atomic::{atomic_read_json, atomic_write_json};
use super::traits::{ClassificationService, ModRepository, SettingsStore};
use super::types::{ClassificationNode, ModRecord, NewMod, NewNode};
use crate::error::{MigrationError, Result};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct LibraryDocument {
    #[serde(default)]
    mods: Vec<ModRecord>,
    #[serde(default)]
    nodes: Vec<ClassificationNode>,
    #[serde(default)]
    settings: BTreeMap<String, serde_json::Value>,
}

/// Destination store persisted as a single JSON document.
pub struct JsonLibraryStore {
    path: PathBuf,
    doc: RwLock<LibraryDocument>,
}

impl JsonLibraryStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = atomic_read_json::<LibraryDocument>(&path)?.unwrap_or_default();
        debug!(
            "Opened library store {} ({} mods, {} nodes)",
            path.display(),
            doc.mods.len(),
            doc.nodes.len()
        );
        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored mod.
    pub async fn mods(&self) -> Vec<ModRecord> {
        self.doc.read().await.mods.clone()
    }

    /// Snapshot of every classification node.
    pub async fn nodes(&self) -> Vec<ClassificationNode> {
        self.doc.read().await.nodes.clone()
    }

    pub async fn setting(&self, key: &str) -> Option<serde_json::Value> {
        self.doc.read().await.settings.get(key).cloned()
    }

    /// Write `doc` on the blocking pool. Callers hold the write guard so
    /// writes land in mutation order.
    async fn persist(&self, doc: &LibraryDocument) -> Result<()> {
        let path = self.path.clone();
        let doc = doc.clone();
        tokio::task::spawn_blocking(move || atomic_write_json(&path, &doc, false))
            .await
            .map_err(|e| MigrationError::Other(format!("Library write task failed: {}", e)))?
    }
}

#[async_trait]
impl ModRepository for JsonLibraryStore {
    async fn get_or_create_mod(&self, new_mod: NewMod) -> Result<(ModRecord, bool)> {
        let mut doc = self.doc.write().await;
        if let Some(existing) = doc.mods.iter().find(|m| m.id == new_mod.id) {
            return Ok((existing.clone(), false));
        }

        let record = new_mod.into_record();
        doc.mods.push(record.clone());
        self.persist(&doc).await?;
        Ok((record, true))
    }

    async fn get_by_category(&self, category: &str) -> Result<Vec<ModRecord>> {
        let doc = self.doc.read().await;
        Ok(doc
            .mods
            .iter()
            .filter(|m| m.category.as_deref() == Some(category))
            .cloned()
            .collect())
    }

    async fn get_all_tags(&self) -> Result<Vec<String>> {
        let doc = self.doc.read().await;
        let tags: BTreeSet<String> = doc.mods.iter().flat_map(|m| m.tags.iter().cloned()).collect();
        Ok(tags.into_iter().collect())
    }
}

#[async_trait]
impl ClassificationService for JsonLibraryStore {
    async fn create_node(&self, node: NewNode) -> Result<ClassificationNode> {
        let mut doc = self.doc.write().await;
        let created = ClassificationNode {
            id: uuid::Uuid::new_v4().to_string(),
            name: node.name,
            parent_id: node.parent_id,
            priority: node.priority,
            thumbnail: None,
        };
        doc.nodes.push(created.clone());
        self.persist(&doc).await?;
        Ok(created)
    }

    async fn get_node_by_name(&self, name: &str) -> Result<Option<ClassificationNode>> {
        let doc = self.doc.read().await;
        Ok(doc.nodes.iter().find(|n| n.name == name).cloned())
    }

    async fn find_node(
        &self,
        name: &str,
        parent_id: Option<&str>,
    ) -> Result<Option<ClassificationNode>> {
        let doc = self.doc.read().await;
        Ok(doc
            .nodes
            .iter()
            .find(|n| n.name == name && n.parent_id.as_deref() == parent_id)
            .cloned())
    }

    async fn set_node_thumbnail(&self, node_id: &str, thumbnail: &Path) -> Result<()> {
        let mut doc = self.doc.write().await;
        let node = doc
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or_else(|| {
                MigrationError::collaborator(
                    "classification service",
                    format!("node {} does not exist", node_id),
                )
            })?;
        node.thumbnail = Some(thumbnail.to_path_buf());
        self.persist(&doc).await
    }
}

#[async_trait]
impl SettingsStore for JsonLibraryStore {
    async fn set_setting(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let mut doc = self.doc.write().await;
        doc.settings.insert(key.to_string(), value);
        self.persist(&doc).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_mod(id: &str, category: Option<&str>, tags: &[&str]) -> NewMod {
        NewMod {
            id: id.to_string(),
            name: format!("mod {id}"),
            category: category.map(str::to_string),
            archive_path: PathBuf::from(format!("/lib/archives/{id}")),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = JsonLibraryStore::open(temp.path().join("library.json")).unwrap();

        let (first, created) = store.get_or_create_mod(new_mod("a1", None, &[])).await.unwrap();
        assert!(created);
        let (second, created) = store.get_or_create_mod(new_mod("a1", None, &[])).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(store.mods().await.len(), 1);
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("library.json");
        {
            let store = JsonLibraryStore::open(&path).unwrap();
            store.get_or_create_mod(new_mod("a1", Some("Fire"), &["outfit"])).await.unwrap();
            let node = store
                .create_node(NewNode {
                    name: "Elements".into(),
                    parent_id: None,
                    priority: 0,
                })
                .await
                .unwrap();
            store
                .set_node_thumbnail(&node.id, Path::new("/lib/thumbnails/elements.png"))
                .await
                .unwrap();
            store.set_setting("language", "en".into()).await.unwrap();
        }

        let store = JsonLibraryStore::open(&path).unwrap();
        assert_eq!(store.get_by_category("Fire").await.unwrap().len(), 1);
        assert_eq!(store.get_all_tags().await.unwrap(), vec!["outfit".to_string()]);
        let node = store.get_node_by_name("Elements").await.unwrap().unwrap();
        assert_eq!(node.thumbnail, Some(PathBuf::from("/lib/thumbnails/elements.png")));
        assert_eq!(store.setting("language").await, Some("en".into()));
    }

    #[tokio::test]
    async fn test_find_node_matches_parent() {
        let temp = TempDir::new().unwrap();
        let store = JsonLibraryStore::open(temp.path().join("library.json")).unwrap();
        let mut parents = Vec::new();
        for name in ["Elements", "Weapons"] {
            parents.push(
                store
                    .create_node(NewNode {
                        name: name.into(),
                        parent_id: None,
                        priority: 0,
                    })
                    .await
                    .unwrap(),
            );
        }
        for parent in &parents {
            store
                .create_node(NewNode {
                    name: "Fire".into(),
                    parent_id: Some(parent.id.clone()),
                    priority: 0,
                })
                .await
                .unwrap();
        }

        let under_weapons = store
            .find_node("Fire", Some(&parents[1].id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(under_weapons.parent_id.as_deref(), Some(parents[1].id.as_str()));
        assert!(store.find_node("Fire", None).await.unwrap().is_none());
        assert!(store.find_node("Elements", None).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_thumbnail_for_unknown_node_fails() {
        let temp = TempDir::new().unwrap();
        let store = JsonLibraryStore::open(temp.path().join("library.json")).unwrap();
        let result = store.set_node_thumbnail("missing", Path::new("x.png")).await;
        assert!(result.is_err());
    }
}
