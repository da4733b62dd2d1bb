//! Storage Layer - interchangeable item persistence backends
//!
//! Two backends implement [`ItemStore`]:
//! - `document`: one JSON container `{ "items": [...] }`, loaded and rewritten wholesale per operation
//! - `relational`: SQLite table `items(id, name, price)`, one transaction per operation

pub mod document;
pub mod relational;
pub mod schema;

pub use document::{Collection, DocumentStore, LockMode};
pub use relational::{RelationalOptions, RelationalStore};

use crate::config::Settings;
use crate::id::ItemId;
use crate::item::{Item, ItemFields, NewItem};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Capability interface every persistence backend provides.
///
/// Errors surface unchanged; no backend retries.
pub trait ItemStore: Send + Sync {
    /// Which backend this is
    fn backend(&self) -> Backend;

    /// Persist a new item and return the stored record
    fn create(&self, item: NewItem) -> Result<Item>;

    /// All live items, in backend-defined order
    fn list(&self) -> Result<Vec<Item>>;

    /// Fetch one item, `NotFound` if absent
    fn get(&self, id: &ItemId) -> Result<Item>;

    /// Replace name and price of an existing item, keeping its id
    fn update(&self, id: &ItemId, fields: ItemFields) -> Result<Item>;

    /// Remove an item and return what was removed
    fn delete(&self, id: &ItemId) -> Result<Item>;
}

/// Backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Document,
    Relational,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Document => "document",
            Backend::Relational => "relational",
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "document" | "doc" | "json" | "file" => Ok(Backend::Document),
            "relational" | "sql" | "sqlite" | "db" => Ok(Backend::Relational),
            _ => Err(Error::Config(format!("Unknown backend: {}", s))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Open the backend selected by `settings`.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn ItemStore>> {
    match settings.backend {
        Backend::Document => {
            let store = DocumentStore::new(&settings.data_file).with_lock_mode(
                if settings.lock_documents {
                    LockMode::Advisory
                } else {
                    LockMode::None
                },
            );
            Ok(Arc::new(store))
        }
        Backend::Relational => {
            let options = RelationalOptions {
                tls_insecure: settings.tls_insecure,
                ..RelationalOptions::default()
            };
            let store = RelationalStore::connect(&settings.database_url, options)?;
            Ok(Arc::new(store))
        }
    }
}
