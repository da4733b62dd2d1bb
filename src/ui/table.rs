use crate::config::Settings;
use crate::item::Item;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct ItemRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Price")]
    pub price: String,
}

impl From<&Item> for ItemRow {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            price: format!("{:.2}", item.price),
        }
    }
}

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Setting")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

/// Items as a rounded table; empty string for no items
pub fn items_table(items: &[Item]) -> String {
    if items.is_empty() {
        return String::new();
    }
    let rows: Vec<ItemRow> = items.iter().map(ItemRow::from).collect();
    Table::new(rows).with(Style::rounded()).to_string()
}

pub fn settings_table(settings: &Settings) -> String {
    let mut builder = TableBuilder::new();
    builder.add_row("backend", settings.backend.as_str());
    builder.add_row("data_file", &settings.data_file.display().to_string());
    builder.add_row("database_url", &settings.database_url);
    builder.add_row("tls_insecure", &settings.tls_insecure.to_string());
    builder.add_row("lock_documents", &settings.lock_documents.to_string());
    builder.build()
}
