//! Template and batch persistence.
//!
//! Both collections are stored as whole JSON documents under a fixed key.
//! Data that cannot be parsed is logged and treated as an empty collection
//! so a corrupt store never blocks the tool.

use crate::error::{AppError, Result};
use crate::model::{AssetBatch, Template};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, error};

pub const TEMPLATES_KEY: &str = "massgen_templates";
pub const BATCHES_KEY: &str = "massgen_assets";

/// Raw key/value storage for JSON documents.
pub trait Repository {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileRepository {
    dir: PathBuf,
}

impl FileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl Repository for FileRepository {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Store(format!("{}: {}", path.display(), e))),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AppError::Store(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|e| AppError::Store(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), bytes = value.len(), "saved");
        Ok(())
    }
}

/// In-process storage, used by tests and previews.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for MemoryRepository {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

fn load_list<T: DeserializeOwned>(repo: &dyn Repository, key: &str) -> Result<Vec<T>> {
    let Some(content) = repo.load(key)? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&content) {
        Ok(items) => Ok(items),
        Err(e) => {
            error!(key, error = %e, "stored data is unreadable, starting empty");
            Ok(Vec::new())
        }
    }
}

fn save_list<T: Serialize>(repo: &dyn Repository, key: &str, items: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(items)?;
    repo.save(key, &json)
}

/// Saved templates, in insertion order.
pub struct TemplateStore<'r> {
    repo: &'r dyn Repository,
}

impl<'r> TemplateStore<'r> {
    pub fn new(repo: &'r dyn Repository) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<Template>> {
        load_list(self.repo, TEMPLATES_KEY)
    }

    pub fn get(&self, id: &str) -> Result<Template> {
        self.list()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::NotFound(format!("template '{}'", id)))
    }

    pub fn add(&self, template: Template) -> Result<()> {
        let mut templates = self.list()?;
        if templates.iter().any(|t| t.id == template.id) {
            return Err(AppError::Store(format!("template '{}' already exists", template.id)));
        }
        templates.push(template);
        save_list(self.repo, TEMPLATES_KEY, &templates)
    }

    /// Replace the stored template with the same id, stamping `updated_at`.
    pub fn update(&self, mut template: Template) -> Result<Template> {
        let mut templates = self.list()?;
        let slot = templates
            .iter_mut()
            .find(|t| t.id == template.id)
            .ok_or_else(|| AppError::NotFound(format!("template '{}'", template.id)))?;
        template.updated_at = Utc::now();
        *slot = template.clone();
        save_list(self.repo, TEMPLATES_KEY, &templates)?;
        Ok(template)
    }

    /// Remove a template. Batches generated from it are kept.
    pub fn delete(&self, id: &str) -> Result<()> {
        let mut templates = self.list()?;
        let before = templates.len();
        templates.retain(|t| t.id != id);
        if templates.len() == before {
            return Err(AppError::NotFound(format!("template '{}'", id)));
        }
        save_list(self.repo, TEMPLATES_KEY, &templates)
    }
}

/// Generated batches, newest first.
pub struct BatchStore<'r> {
    repo: &'r dyn Repository,
}

impl<'r> BatchStore<'r> {
    pub fn new(repo: &'r dyn Repository) -> Self {
        Self { repo }
    }

    pub fn list(&self) -> Result<Vec<AssetBatch>> {
        load_list(self.repo, BATCHES_KEY)
    }

    pub fn get(&self, id: &str) -> Result<AssetBatch> {
        self.list()?
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| AppError::NotFound(format!("batch '{}'", id)))
    }

    pub fn add(&self, batch: AssetBatch) -> Result<()> {
        let mut batches = self.list()?;
        batches.insert(0, batch);
        save_list(self.repo, BATCHES_KEY, &batches)
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut batches = self.list()?;
        let before = batches.len();
        batches.retain(|b| b.id != id);
        if batches.len() == before {
            return Err(AppError::NotFound(format!("batch '{}'", id)));
        }
        save_list(self.repo, BATCHES_KEY, &batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TemplateKind;
    use pretty_assertions::assert_eq;

    fn template(id: &str) -> Template {
        let mut t = Template::new(TemplateKind::Badge, id);
        t.id = id.to_string();
        t
    }

    fn batch(id: &str) -> AssetBatch {
        let mut b = AssetBatch::new(&template("t1"), Vec::new());
        b.id = id.to_string();
        b
    }

    #[test]
    fn templates_round_trip_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::new(dir.path());
        let store = TemplateStore::new(&repo);

        assert!(store.list().unwrap().is_empty());
        store.add(template("a")).unwrap();
        store.add(template("b")).unwrap();
        assert!(dir.path().join("massgen_templates.json").exists());

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.get("b").unwrap().name, "b");
    }

    #[test]
    fn update_replaces_and_stamps() {
        let repo = MemoryRepository::new();
        let store = TemplateStore::new(&repo);
        let mut t = template("a");
        let created = t.updated_at;
        store.add(t.clone()).unwrap();

        t.name = "Renamed".to_string();
        let saved = store.update(t).unwrap();
        assert!(saved.updated_at >= created);
        assert_eq!(store.get("a").unwrap().name, "Renamed");
    }

    #[test]
    fn duplicate_and_missing_ids_are_errors() {
        let repo = MemoryRepository::new();
        let store = TemplateStore::new(&repo);
        store.add(template("a")).unwrap();
        assert!(matches!(store.add(template("a")), Err(AppError::Store(_))));
        assert!(matches!(store.get("zzz"), Err(AppError::NotFound(_))));
        assert!(matches!(store.delete("zzz"), Err(AppError::NotFound(_))));
        store.delete("a").unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn batches_are_newest_first() {
        let repo = MemoryRepository::new();
        let store = BatchStore::new(&repo);
        store.add(batch("first")).unwrap();
        store.add(batch("second")).unwrap();
        let ids: Vec<_> = store.list().unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, vec!["second", "first"]);

        store.delete("second").unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn deleting_template_keeps_its_batches() {
        let repo = MemoryRepository::new();
        TemplateStore::new(&repo).add(template("t1")).unwrap();
        BatchStore::new(&repo).add(batch("b1")).unwrap();
        TemplateStore::new(&repo).delete("t1").unwrap();
        assert_eq!(BatchStore::new(&repo).get("b1").unwrap().template_id, "t1");
    }

    #[test]
    fn unreadable_data_counts_as_empty() {
        let repo = MemoryRepository::new();
        repo.save(TEMPLATES_KEY, "{ not json").unwrap();
        assert!(TemplateStore::new(&repo).list().unwrap().is_empty());
    }
}
