//! Tool surface: the item operations published to tool-calling agents

pub mod mcp;
pub mod tools;

pub use mcp::McpService;
pub use tools::{call_tool, tool_definitions, ToolError, ToolOutput};
