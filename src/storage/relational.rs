//! Relational store - one SQLite row per item, one transaction per operation
//!
//! Each call opens its own connection (the session), begins a transaction,
//! and leaves through exactly one of commit (success) or rollback (any error,
//! including `NotFound`). Uniqueness of ids is left to the primary key.

use crate::id::{new_id, ItemId};
use crate::item::{Item, ItemFields, NewItem};
use crate::storage::{schema, Backend, ItemStore};
use crate::{Error, Result};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

/// Connection tuning for [`RelationalStore`]
#[derive(Debug, Clone)]
pub struct RelationalOptions {
    /// How long a session waits on a locked database before giving up
    pub busy_timeout: Duration,
    /// Accept an encrypted transport whose server certificate cannot be validated.
    ///
    /// This downgrades trust and is never on by default. The embedded SQLite
    /// engine has no network transport, so beyond a warning at connect time it
    /// changes nothing here.
    pub tls_insecure: bool,
}

impl Default for RelationalOptions {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_secs(5),
            tls_insecure: false,
        }
    }
}

/// Where sessions connect to
#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    File(PathBuf),
    /// Shared-cache in-memory database URI
    Memory(String),
}

/// SQLite-backed item store
pub struct RelationalStore {
    target: Target,
    options: RelationalOptions,
    /// Keeps a shared in-memory database alive between sessions
    _keeper: Option<Mutex<Connection>>,
}

impl RelationalStore {
    /// Connect using a connection string (`sqlite://PATH`, `sqlite:PATH`,
    /// `sqlite::memory:` or a bare path)
    pub fn connect(url: &str, options: RelationalOptions) -> Result<Self> {
        if options.tls_insecure {
            tracing::warn!(
                "TLS certificate validation disabled for {}; server identity will not be verified",
                url
            );
        }

        match parse_database_url(url)? {
            Target::File(path) => Self::open_with(path, options),
            Target::Memory(_) => Self::open_in_memory_with(options),
        }
    }

    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path.to_path_buf(), RelationalOptions::default())
    }

    /// Open a private in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with(RelationalOptions::default())
    }

    fn open_with(path: PathBuf, options: RelationalOptions) -> Result<Self> {
        let store = Self {
            target: Target::File(path),
            options,
            _keeper: None,
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn open_in_memory_with(options: RelationalOptions) -> Result<Self> {
        let uri = format!("file:itemstore-{}?mode=memory&cache=shared", new_id());
        let keeper = Connection::open(&uri)?;
        let store = Self {
            target: Target::Memory(uri),
            options,
            _keeper: Some(Mutex::new(keeper)),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema (idempotent)
    fn initialize_schema(&self) -> Result<()> {
        self.with_session("initialize_schema", |tx| {
            for stmt in schema::all_schema_statements() {
                tx.execute(stmt, [])?;
            }
            Ok(())
        })
    }

    /// Open a fresh connection for one operation
    fn session(&self) -> Result<Connection> {
        let conn = match &self.target {
            Target::File(path) => Connection::open(path),
            Target::Memory(uri) => Connection::open(uri),
        }?;
        conn.busy_timeout(self.options.busy_timeout)?;
        Ok(conn)
    }

    /// Run `op` inside one transaction: commit on `Ok`, roll back on `Err`.
    pub(crate) fn with_session<T>(
        &self,
        name: &str,
        op: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut conn = self.session()?;
        let tx = conn.transaction()?;

        match op(&tx) {
            Ok(value) => {
                tx.commit()?;
                tracing::debug!("Committed {}", name);
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    tracing::warn!("Rollback of {} failed: {}", name, rollback_err);
                } else {
                    tracing::debug!("Rolled back {}: {}", name, err);
                }
                Err(err)
            }
        }
    }

    fn fetch(tx: &Transaction<'_>, id: &ItemId) -> Result<Option<Item>> {
        let sql = format!("{} WHERE id = ?1", schema::SELECT_ITEMS);
        let item = tx
            .query_row(&sql, [id.as_str()], |row| Ok(row_to_item(row)))
            .optional()?;
        item.transpose()
    }
}

impl ItemStore for RelationalStore {
    fn backend(&self) -> Backend {
        Backend::Relational
    }

    fn create(&self, item: NewItem) -> Result<Item> {
        item.fields.validate()?;
        let id = item.id.unwrap_or_else(new_id);
        let created = Item::new(id, item.fields);

        self.with_session("create", |tx| {
            tx.execute(
                "INSERT INTO items (id, name, price) VALUES (?1, ?2, ?3)",
                params![created.id.as_str(), created.name, created.price],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(rusqlite::ErrorCode::ConstraintViolation) => {
                    Error::Conflict(created.id.to_string())
                }
                _ => Error::from(e),
            })?;
            Ok(())
        })?;

        tracing::info!("Created item {}", created.id);
        Ok(created)
    }

    fn list(&self) -> Result<Vec<Item>> {
        self.with_session("list", |tx| {
            let sql = format!("{} ORDER BY rowid", schema::SELECT_ITEMS);
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt.query_map([], |row| Ok(row_to_item(row)))?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row??);
            }
            Ok(items)
        })
    }

    fn get(&self, id: &ItemId) -> Result<Item> {
        self.with_session("get", |tx| {
            Self::fetch(tx, id)?.ok_or_else(|| Error::NotFound(id.to_string()))
        })
    }

    fn update(&self, id: &ItemId, fields: ItemFields) -> Result<Item> {
        fields.validate()?;

        let updated = self.with_session("update", |tx| {
            let mut item = Self::fetch(tx, id)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
            item.apply(fields);
            tx.execute(
                "UPDATE items SET name = ?1, price = ?2 WHERE id = ?3",
                params![item.name, item.price, item.id.as_str()],
            )?;
            Ok(item)
        })?;

        tracing::info!("Updated item {}", id);
        Ok(updated)
    }

    fn delete(&self, id: &ItemId) -> Result<Item> {
        let removed = self.with_session("delete", |tx| {
            let item = Self::fetch(tx, id)?.ok_or_else(|| Error::NotFound(id.to_string()))?;
            tx.execute("DELETE FROM items WHERE id = ?1", [id.as_str()])?;
            Ok(item)
        })?;

        tracing::info!("Deleted item {}", id);
        Ok(removed)
    }
}

/// Map a row to an item; rows that fail validation are corrupt state
fn row_to_item(row: &Row<'_>) -> Result<Item> {
    let id: String = row.get(0)?;
    let fields = ItemFields {
        name: row.get(1)?,
        price: row.get(2)?,
    };
    fields
        .validate()
        .map_err(|e| Error::CorruptState(format!("items row {}: {}", id, e)))?;
    Ok(Item::new(ItemId::from(id), fields))
}

fn parse_database_url(url: &str) -> Result<Target> {
    let url = url.trim();
    if url == "sqlite::memory:" || url == ":memory:" {
        return Ok(Target::Memory(String::new()));
    }

    let path = if let Some(rest) = url.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = url.strip_prefix("sqlite:") {
        rest
    } else if let Some((scheme, _)) = url.split_once("://") {
        return Err(Error::Unavailable(format!(
            "unsupported database scheme: {}",
            scheme
        )));
    } else {
        url
    };

    if path.is_empty() {
        return Err(Error::Config(format!("database url has no path: {}", url)));
    }
    Ok(Target::File(PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_database_url() {
        assert_eq!(
            parse_database_url("sqlite://items.db").unwrap(),
            Target::File(PathBuf::from("items.db"))
        );
        assert_eq!(
            parse_database_url("sqlite:///var/lib/items.db").unwrap(),
            Target::File(PathBuf::from("/var/lib/items.db"))
        );
        assert_eq!(
            parse_database_url("data/items.db").unwrap(),
            Target::File(PathBuf::from("data/items.db"))
        );
        assert!(matches!(
            parse_database_url("sqlite::memory:").unwrap(),
            Target::Memory(_)
        ));
        assert_eq!(
            parse_database_url("postgresql://db.example.com/items")
                .unwrap_err()
                .kind(),
            ErrorKind::Unavailable
        );
        assert!(parse_database_url("sqlite://").is_err());
    }

    #[test]
    fn test_caller_id_is_used() {
        let store = RelationalStore::open_in_memory().unwrap();
        let created = store.create(NewItem::new("Widget", 1.0).with_id("sku-1")).unwrap();
        assert_eq!(created.id.as_str(), "sku-1");
    }

    #[test]
    fn test_duplicate_id_is_conflict_and_rolled_back() {
        let store = RelationalStore::open_in_memory().unwrap();
        let first = store.create(NewItem::new("Widget", 1.0).with_id("sku-1")).unwrap();

        let err = store
            .create(NewItem::new("Gadget", 2.0).with_id("sku-1"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.list().unwrap(), vec![first]);
    }

    #[test]
    fn test_failed_session_leaves_rows_untouched() {
        let store = RelationalStore::open_in_memory().unwrap();
        let before = store.create(NewItem::new("Widget", 9.99)).unwrap();

        let result: Result<()> = store.with_session("partial", |tx| {
            tx.execute(
                "INSERT INTO items (id, name, price) VALUES ('tmp', 'Half', 1.0)",
                [],
            )?;
            tx.execute("DELETE FROM items WHERE id = ?1", [before.id.as_str()])?;
            Err(Error::Unavailable("connection dropped".to_string()))
        });

        assert!(result.is_err());
        assert_eq!(store.list().unwrap(), vec![before]);
    }

    #[test]
    fn test_not_found_rolls_back_and_releases() {
        let dir = tempfile::tempdir().unwrap();
        let store = RelationalStore::open(&dir.path().join("items.db")).unwrap();

        let err = store
            .update(&ItemId::from("missing"), ItemFields::new("X", 1.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        // A leaked transaction would keep the write lock and block this insert.
        store.create(NewItem::new("Widget", 1.0)).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.db");

        let created = {
            let store = RelationalStore::open(&path).unwrap();
            store.create(NewItem::new("Widget", 9.99)).unwrap()
        };

        let store = RelationalStore::connect(
            &format!("sqlite://{}", path.display()),
            RelationalOptions::default(),
        )
        .unwrap();
        assert_eq!(store.get(&created.id).unwrap(), created);
    }

    #[test]
    fn test_tls_insecure_is_accepted_explicitly() {
        let options = RelationalOptions {
            tls_insecure: true,
            ..RelationalOptions::default()
        };
        let store = RelationalStore::connect("sqlite::memory:", options).unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/items.db");
        let err = RelationalStore::open(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.db");
        std::fs::write(&path, "this is not a sqlite database\n".repeat(64)).unwrap();

        let err = RelationalStore::open(&path).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CorruptState);
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let store = RelationalStore::open_in_memory().unwrap();
        store
            .with_session("seed", |tx| {
                tx.execute(
                    "INSERT INTO items (id, name, price) VALUES ('bad', '', 1.0)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.list().unwrap_err().kind(), ErrorKind::CorruptState);
    }
}
