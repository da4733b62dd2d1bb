//! Item types - the one persisted record and its input payloads
//!
//! - `Item`: a stored record (`id`, `name`, `price`)
//! - `ItemFields`: everything except the id, used for full replacement on update
//! - `NewItem`: fields for create, optionally carrying a caller-chosen id

use crate::id::ItemId;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A persisted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Immutable identity, unique across the live collection
    pub id: ItemId,
    /// Non-empty label
    pub name: String,
    /// Price; no sign constraint is enforced
    pub price: f64,
}

impl Item {
    pub fn new(id: ItemId, fields: ItemFields) -> Self {
        Self {
            id,
            name: fields.name,
            price: fields.price,
        }
    }

    /// Replace every field except `id`.
    pub fn apply(&mut self, fields: ItemFields) {
        self.name = fields.name;
        self.price = fields.price;
    }

    pub fn fields(&self) -> ItemFields {
        ItemFields {
            name: self.name.clone(),
            price: self.price,
        }
    }
}

/// Replacement payload for every non-identity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFields {
    pub name: String,
    pub price: f64,
}

impl ItemFields {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }

    /// Reject values that cannot be stored faithfully.
    ///
    /// Negative prices pass: the record format has never constrained sign.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidItem("name must not be empty".to_string()));
        }
        if !self.price.is_finite() {
            return Err(Error::InvalidItem(format!(
                "price must be a finite number, got {}",
                self.price
            )));
        }
        Ok(())
    }
}

/// Input for create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    #[serde(flatten)]
    pub fields: ItemFields,
}

impl NewItem {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            fields: ItemFields::new(name, price),
        }
    }

    /// Request a specific id instead of a generated one.
    pub fn with_id(mut self, id: impl Into<ItemId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_id() {
        let mut item = Item::new(ItemId::from("a1"), ItemFields::new("Widget", 9.99));
        item.apply(ItemFields::new("Gadget", 1.0));

        assert_eq!(item.id.as_str(), "a1");
        assert_eq!(item.name, "Gadget");
        assert_eq!(item.price, 1.0);
    }

    #[test]
    fn test_validation() {
        assert!(ItemFields::new("Widget", 9.99).validate().is_ok());
        assert!(ItemFields::new("Refund", -5.0).validate().is_ok());
        assert!(ItemFields::new("   ", 1.0).validate().is_err());
        assert!(ItemFields::new("Widget", f64::NAN).validate().is_err());
        assert!(ItemFields::new("Widget", f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_item_json_shape() {
        let item = Item::new(ItemId::from("a1"), ItemFields::new("Widget", 9.99));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "id": "a1", "name": "Widget", "price": 9.99 })
        );
    }

    #[test]
    fn test_new_item_optional_id() {
        let parsed: NewItem =
            serde_json::from_str(r#"{"name": "Widget", "price": 2.5}"#).unwrap();
        assert!(parsed.id.is_none());
        assert_eq!(parsed.fields.name, "Widget");

        let with_id = NewItem::new("Widget", 2.5).with_id("fixed");
        assert_eq!(with_id.id.unwrap().as_str(), "fixed");
    }
}
