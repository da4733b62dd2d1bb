//! Document store - the whole collection in one JSON file
//!
//! Every operation is load, mutate in memory, save. With [`LockMode::None`]
//! nothing serializes that sequence: two writers that load the same snapshot
//! both save, and the later save wins (lost update).
//! [`LockMode::Advisory`] holds an exclusive lock across load-mutate-save.

use crate::id::{new_id, ItemId};
use crate::item::{Item, ItemFields, NewItem};
use crate::storage::{Backend, ItemStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persisted container shape: `{ "items": [ {id, name, price}, ... ] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub items: Vec<Item>,
}

impl Collection {
    fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }
}

/// Mutual exclusion around load-mutate-save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// No exclusion; concurrent writers race
    #[default]
    None,
    /// In-process mutex plus an exclusive OS file lock on `<file>.lock`
    Advisory,
}

/// JSON-file backed item store
pub struct DocumentStore {
    path: PathBuf,
    lock_mode: LockMode,
    guard: Mutex<()>,
}

impl DocumentStore {
    /// Store backed by `path`; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_mode: LockMode::None,
            guard: Mutex::new(()),
        }
    }

    pub fn with_lock_mode(mut self, lock_mode: LockMode) -> Self {
        self.lock_mode = lock_mode;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted collection; a missing file is an empty collection
    pub fn load(&self) -> Result<Collection> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No document at {}, starting empty", self.path.display());
                return Ok(Collection::default());
            }
            Err(e) => return Err(unavailable(&self.path, e)),
        };

        let collection: Collection = serde_json::from_str(&contents).map_err(|e| {
            Error::CorruptState(format!("{}: {}", self.path.display(), e))
        })?;

        let mut seen = HashSet::new();
        for item in &collection.items {
            item.fields().validate().map_err(|e| {
                Error::CorruptState(format!("{}: item {}: {}", self.path.display(), item.id, e))
            })?;
            if !seen.insert(&item.id) {
                return Err(Error::CorruptState(format!(
                    "{}: duplicate id {}",
                    self.path.display(),
                    item.id
                )));
            }
        }

        Ok(collection)
    }

    /// Replace the persisted collection (temp file + rename)
    pub fn save(&self, collection: &Collection) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| unavailable(parent, e))?;
            }
        }

        let contents = serde_json::to_string_pretty(collection)
            .map_err(|e| Error::CorruptState(e.to_string()))?;

        let tmp = self.sibling(&format!("{}.tmp", new_id()));
        fs::write(&tmp, contents).map_err(|e| unavailable(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(unavailable(&self.path, e));
        }
        Ok(())
    }

    /// Run one load-mutate-save unit, under the lock when one is configured
    fn exclusive<T>(&self, op: impl FnOnce() -> Result<T>) -> Result<T> {
        match self.lock_mode {
            LockMode::None => op(),
            LockMode::Advisory => {
                let _held = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                let _file_lock = FileLock::acquire(&self.sibling("lock"))?;
                op()
            }
        }
    }

    /// `<dir>/<file name>.<suffix>`
    fn sibling(&self, suffix: &str) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "items".to_string());
        self.path.with_file_name(format!("{}.{}", name, suffix))
    }
}

impl ItemStore for DocumentStore {
    fn backend(&self) -> Backend {
        Backend::Document
    }

    fn create(&self, item: NewItem) -> Result<Item> {
        item.fields.validate()?;

        self.exclusive(|| {
            let mut collection = self.load()?;
            let taken: HashSet<&ItemId> = collection.items.iter().map(|i| &i.id).collect();

            let mut id = item.id.unwrap_or_else(new_id);
            while taken.contains(&id) {
                tracing::warn!("Item id {} already taken, drawing a new one", id);
                id = new_id();
            }

            let created = Item::new(id, item.fields);
            collection.items.push(created.clone());
            self.save(&collection)?;

            tracing::info!("Created item {} in {}", created.id, self.path.display());
            Ok(created)
        })
    }

    fn list(&self) -> Result<Vec<Item>> {
        tracing::debug!("Listing items from {}", self.path.display());
        Ok(self.load()?.items)
    }

    fn get(&self, id: &ItemId) -> Result<Item> {
        self.load()?
            .items
            .into_iter()
            .find(|item| &item.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    fn update(&self, id: &ItemId, fields: ItemFields) -> Result<Item> {
        fields.validate()?;

        self.exclusive(|| {
            let mut collection = self.load()?;
            let idx = collection
                .position(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;

            collection.items[idx].apply(fields);
            let updated = collection.items[idx].clone();
            self.save(&collection)?;

            tracing::info!("Updated item {}", id);
            Ok(updated)
        })
    }

    fn delete(&self, id: &ItemId) -> Result<Item> {
        self.exclusive(|| {
            let mut collection = self.load()?;
            let idx = collection
                .position(id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;

            let removed = collection.items.remove(idx);
            self.save(&collection)?;

            tracing::info!("Deleted item {}", id);
            Ok(removed)
        })
    }
}

fn unavailable(path: &Path, err: io::Error) -> Error {
    Error::Unavailable(format!("{}: {}", path.display(), err))
}

/// Exclusive advisory lock on a sidecar file, released when the file closes
struct FileLock {
    _file: fs::File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map_err(|e| unavailable(path, e))?;
        file.lock().map_err(|e| unavailable(path, e))?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::sync::Arc;

    fn temp_store() -> (tempfile::TempDir, DocumentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("data.json"));
        (dir, store)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let (_dir, store) = temp_store();
        assert_eq!(store.load().unwrap(), Collection::default());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_file() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load().unwrap_err().kind(), ErrorKind::CorruptState);

        fs::write(store.path(), r#"{"things": []}"#).unwrap();
        assert_eq!(store.list().unwrap_err().kind(), ErrorKind::CorruptState);

        fs::write(
            store.path(),
            r#"{"items": [{"id": "a", "name": "x", "price": 1}, {"id": "a", "name": "y", "price": 2}]}"#,
        )
        .unwrap();
        assert_eq!(store.load().unwrap_err().kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn test_price_survives_reload_bit_for_bit() {
        let (_dir, store) = temp_store();
        let price = 1175.4621790330661_f64;
        let created = store.create(NewItem::new("Widget", price)).unwrap();

        let read = store.get(&created.id).unwrap();
        assert_eq!(read, created);
        assert_eq!(read.price.to_bits(), price.to_bits());
    }

    #[test]
    fn test_unreachable_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "plain file").unwrap();

        let store = DocumentStore::new(blocker.join("data.json"));
        assert_eq!(store.load().unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(
            store.create(NewItem::new("Widget", 1.0)).unwrap_err().kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(fs::read_to_string(&blocker).unwrap(), "plain file");

        let store = DocumentStore::new(dir.path());
        assert_eq!(store.list().unwrap_err().kind(), ErrorKind::Unavailable);
        assert_eq!(
            store.create(NewItem::new("Widget", 1.0)).unwrap_err().kind(),
            ErrorKind::Unavailable
        );
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_persisted_layout() {
        let (_dir, store) = temp_store();
        let created = store.create(NewItem::new("Widget", 9.99)).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\n  \"items\""));
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "items": [{ "id": created.id.as_str(), "name": "Widget", "price": 9.99 }]
            })
        );
    }

    #[test]
    fn test_reads_existing_document() {
        let (_dir, store) = temp_store();
        fs::write(
            store.path(),
            r#"{"items": [{"id": "a", "name": "Apple", "price": 1.5}]}"#,
        )
        .unwrap();

        let items = store.list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_str(), "a");
        assert_eq!(items[0].price, 1.5);
    }

    #[test]
    fn test_insertion_order() {
        let (_dir, store) = temp_store();
        for name in ["c", "a", "b"] {
            store.create(NewItem::new(name, 1.0)).unwrap();
        }
        let names: Vec<String> = store.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_caller_id_kept_when_free() {
        let (_dir, store) = temp_store();
        let created = store.create(NewItem::new("Widget", 1.0).with_id("sku-1")).unwrap();
        assert_eq!(created.id.as_str(), "sku-1");
    }

    #[test]
    fn test_colliding_caller_id_is_rerolled() {
        let (_dir, store) = temp_store();
        let first = store.create(NewItem::new("Widget", 1.0).with_id("sku-1")).unwrap();
        let second = store.create(NewItem::new("Gadget", 2.0).with_id("sku-1")).unwrap();

        assert_eq!(first.id.as_str(), "sku-1");
        assert_ne!(second.id, first.id);
        assert_eq!(store.get(&first.id).unwrap().name, "Widget");
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path().join("nested/deeper/data.json"));
        store.create(NewItem::new("Widget", 1.0)).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn test_stale_snapshot_overwrites_newer_state() {
        let (_dir, store) = temp_store();
        let snapshot = store.load().unwrap();

        store.create(NewItem::new("Widget", 9.99)).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);

        // A writer holding the older snapshot saves last and wins.
        store.save(&snapshot).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_advisory_lock_serializes_writers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        let stores: Vec<Arc<DocumentStore>> = (0..2)
            .map(|_| Arc::new(DocumentStore::new(&path).with_lock_mode(LockMode::Advisory)))
            .collect();

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = stores[t % 2].clone();
                std::thread::spawn(move || {
                    for i in 0..10 {
                        store.create(NewItem::new(format!("{t}-{i}"), i as f64)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(stores[0].list().unwrap().len(), 80);
    }
}
