//! Database schema definitions

/// SQL to create the items table
pub const CREATE_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS items (
    id VARCHAR(36) PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    price REAL NOT NULL
)
"#;

pub const SELECT_ITEMS: &str = "SELECT id, name, price FROM items";

/// All schema creation statements
pub fn all_schema_statements() -> Vec<&'static str> {
    vec![CREATE_ITEMS_TABLE]
}
