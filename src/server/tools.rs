//! Tool surface - named tool calls with primitive arguments
//!
//! Transport-free: takes a tool name and JSON arguments, runs the matching
//! item service operation, and renders the result as text plus structured data.

use crate::item::{Item, ItemFields, NewItem};
use crate::service::ItemService;
use crate::{ErrorKind, ItemId};
use serde::Deserialize;
use serde_json::{json, Value};

pub const ADD_ITEM: &str = "add_item";
pub const LIST_ITEMS: &str = "list_items";
pub const EDIT_ITEM: &str = "edit_item";
pub const REMOVE_ITEM: &str = "remove_item";

pub const EMPTY_LISTING: &str = "No items found.";

/// Name, description and JSON schema of one tool
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Rendered result of a tool call
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub data: Value,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Failed(#[from] crate::Error),
}

impl ToolError {
    /// Whether the caller can fix the failure by changing its arguments
    pub fn is_caller_error(&self) -> bool {
        match self {
            ToolError::UnknownTool(_) | ToolError::InvalidArguments { .. } => true,
            ToolError::Failed(err) => matches!(
                err.kind(),
                ErrorKind::NotFound | ErrorKind::Conflict | ErrorKind::Invalid
            ),
        }
    }
}

#[derive(Deserialize)]
struct AddItemArgs {
    name: String,
    price: f64,
}

#[derive(Deserialize)]
struct EditItemArgs {
    #[serde(alias = "item_id")]
    id: String,
    name: String,
    price: f64,
}

#[derive(Deserialize)]
struct RemoveItemArgs {
    #[serde(alias = "item_id")]
    id: String,
}

pub fn tool_definitions() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: ADD_ITEM,
            description: "Add a new item with an auto-generated ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "price": { "type": "number" }
                },
                "required": ["name", "price"]
            }),
        },
        ToolSpec {
            name: LIST_ITEMS,
            description: "List all items",
            input_schema: json!({
                "type": "object",
                "properties": {}
            }),
        },
        ToolSpec {
            name: EDIT_ITEM,
            description: "Edit an item by ID, replacing its name and price",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" },
                    "name": { "type": "string" },
                    "price": { "type": "number" }
                },
                "required": ["id", "name", "price"]
            }),
        },
        ToolSpec {
            name: REMOVE_ITEM,
            description: "Delete an item by ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "id": { "type": "string" }
                },
                "required": ["id"]
            }),
        },
    ]
}

pub fn call_tool(
    service: &ItemService,
    name: &str,
    arguments: Option<Value>,
) -> Result<ToolOutput, ToolError> {
    let arguments = arguments.unwrap_or_else(|| json!({}));
    tracing::debug!("Tool call {} {}", name, arguments);

    match name {
        ADD_ITEM => {
            let args: AddItemArgs = parse_args(name, arguments)?;
            let item = service.create(NewItem::new(args.name, args.price))?;
            Ok(single(format!("Created {}", describe(&item)), &item))
        }
        LIST_ITEMS => {
            let items = service.list()?;
            Ok(listing(&items))
        }
        EDIT_ITEM => {
            let args: EditItemArgs = parse_args(name, arguments)?;
            let item = service.update(
                &ItemId::from(args.id),
                ItemFields::new(args.name, args.price),
            )?;
            Ok(single(format!("Updated {}", describe(&item)), &item))
        }
        REMOVE_ITEM => {
            let args: RemoveItemArgs = parse_args(name, arguments)?;
            let item = service.delete(&ItemId::from(args.id))?;
            Ok(single(format!("Deleted {}", describe(&item)), &item))
        }
        other => Err(ToolError::UnknownTool(other.to_string())),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: &str, arguments: Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn describe(item: &Item) -> String {
    format!("{} (price: {}, id: {})", item.name, item.price, item.id)
}

fn single(text: String, item: &Item) -> ToolOutput {
    ToolOutput {
        text,
        data: json!({ "item": item }),
    }
}

fn listing(items: &[Item]) -> ToolOutput {
    let text = if items.is_empty() {
        EMPTY_LISTING.to_string()
    } else {
        items
            .iter()
            .map(|item| format!("- {}\n", describe(item)))
            .collect()
    };
    ToolOutput {
        text,
        data: json!({ "items": items }),
    }
}
