//! Item identity - opaque, immutable identifiers for stored items
//!
//! Generated ids are random 128-bit UUIDs (v4) in canonical hyphenated form:
//! - `3f2b8c1e-9d4a-4b7e-8c21-5a6f0e9d1b42`
//!
//! Caller-supplied ids are accepted verbatim; nothing about their shape is checked.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of an [`Item`](crate::Item).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for ItemId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Draw a fresh random identifier.
pub fn new_id() -> ItemId {
    ItemId(Uuid::new_v4().to_string())
}
