//! # Itemstore - Item Persistence Engine
//!
//! Persists named, priced items and exposes create/list/update/delete
//! to tool-calling agents.
//!
//! Itemstore provides:
//! - Stable random identities for new records
//! - A document backend that rewrites one JSON container per mutation
//! - A relational backend with one SQLite transaction per operation
//! - An item service binding either backend to one operation surface
//! - An MCP stdio server publishing the operations as tools

pub mod id;
pub mod item;
pub mod storage;
pub mod service;
pub mod server;
pub mod config;
pub mod output;
pub mod ui;

// Re-exports for convenient access
pub use id::{new_id, ItemId};
pub use item::{Item, ItemFields, NewItem};
pub use service::ItemService;
pub use storage::{Backend, DocumentStore, ItemStore, LockMode, RelationalStore};

/// Result type alias for Itemstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Itemstore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Item id already exists: {0}")]
    Conflict(String),

    #[error("Corrupt state: {0}")]
    CorruptState(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid item: {0}")]
    InvalidItem(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Coarse classification of an [`Error`], independent of the backend that raised it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    CorruptState,
    Unavailable,
    Invalid,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::CorruptState(_) => ErrorKind::CorruptState,
            Error::Unavailable(_) => ErrorKind::Unavailable,
            Error::InvalidItem(_) | Error::Config(_) => ErrorKind::Invalid,
            Error::Storage(_) => ErrorKind::Internal,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::CannotOpen)
            | Some(ErrorCode::DatabaseBusy)
            | Some(ErrorCode::DatabaseLocked)
            | Some(ErrorCode::PermissionDenied)
            | Some(ErrorCode::ReadOnly)
            | Some(ErrorCode::SystemIoFailure) => Error::Unavailable(err.to_string()),
            Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt) => {
                Error::CorruptState(err.to_string())
            }
            _ => Error::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::NotFound("a".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::Conflict("a".into()).kind(), ErrorKind::Conflict);
        assert_eq!(Error::InvalidItem("a".into()).kind(), ErrorKind::Invalid);
        assert_eq!(
            Error::CorruptState("bad json".into()).kind(),
            ErrorKind::CorruptState
        );
    }

    #[test]
    fn test_sqlite_busy_is_unavailable() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert_eq!(Error::from(err).kind(), ErrorKind::Unavailable);
    }
}
