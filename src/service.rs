//! Item service - the one operation surface callers bind to
//!
//! Holds whichever [`ItemStore`] is active and passes inputs, outputs and
//! errors through untouched. No retries, no swallowing.

use crate::config::Settings;
use crate::id::ItemId;
use crate::item::{Item, ItemFields, NewItem};
use crate::storage::{self, Backend, ItemStore};
use crate::Result;
use std::sync::Arc;
use tracing::{debug_span, info_span};

#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn ItemStore>,
}

impl ItemService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Open the backend named in `settings`
    pub fn open(settings: &Settings) -> Result<Self> {
        Ok(Self::new(storage::open_store(settings)?))
    }

    pub fn backend(&self) -> Backend {
        self.store.backend()
    }

    pub fn create(&self, item: NewItem) -> Result<Item> {
        let _span = info_span!("create", backend = %self.backend()).entered();
        self.store.create(item)
    }

    pub fn list(&self) -> Result<Vec<Item>> {
        let _span = debug_span!("list", backend = %self.backend()).entered();
        self.store.list()
    }

    pub fn get(&self, id: &ItemId) -> Result<Item> {
        let _span = debug_span!("get", backend = %self.backend(), %id).entered();
        self.store.get(id)
    }

    pub fn update(&self, id: &ItemId, fields: ItemFields) -> Result<Item> {
        let _span = info_span!("update", backend = %self.backend(), %id).entered();
        self.store.update(id, fields)
    }

    pub fn delete(&self, id: &ItemId) -> Result<Item> {
        let _span = info_span!("delete", backend = %self.backend(), %id).entered();
        self.store.delete(id)
    }
}
