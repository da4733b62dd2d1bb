use crate::server::tools::{self, ToolError};
use crate::service::ItemService;
use mcp_sdk_rs::server::{Server, ServerHandler};
use mcp_sdk_rs::types::{
    Tool, ToolResult, ListToolsResult,
    Implementation, ClientCapabilities, ServerCapabilities
};
use mcp_sdk_rs::error::ErrorCode;
use mcp_sdk_rs::transport::stdio::StdioTransport;
use mcp_sdk_rs::error::Error;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use serde::Deserialize;

#[derive(Deserialize)]
struct CallToolRequest {
    name: String,
    arguments: Option<Value>,
}

/// MCP server publishing the item tools over stdio
#[derive(Clone)]
pub struct McpService {
    service: ItemService,
}

impl McpService {
    pub fn new(service: ItemService) -> Self {
        Self { service }
    }

    pub async fn run_stdio(&self) -> anyhow::Result<()> {
        let (read_tx, read_rx) = mpsc::channel::<String>(32);
        let (write_tx, mut write_rx) = mpsc::channel::<String>(32);

        // Stdin reader
        tokio::spawn(async move {
            let stdin = tokio::io::stdin();
            let mut reader = BufReader::new(stdin).lines();
            while let Ok(Some(line)) = reader.next_line().await {
                if read_tx.send(line).await.is_err() {
                    break;
                }
            }
        });

        // Stdout writer
        tokio::spawn(async move {
            let mut stdout = tokio::io::stdout();
            while let Some(msg) = write_rx.recv().await {
                let _ = stdout.write_all(msg.as_bytes()).await;
                let _ = stdout.write_all(b"\n").await;
                let _ = stdout.flush().await;
            }
        });

        tracing::info!("Serving item tools over stdio ({} backend)", self.service.backend());
        let transport = StdioTransport::new(read_rx, write_tx);
        let server = Server::new(Arc::new(transport), Arc::new(self.clone()));
        server.start().await?;
        Ok(())
    }

    fn list_tools(&self) -> Result<Value, Error> {
        let tools = tools::tool_definitions()
            .into_iter()
            .map(|spec| -> Result<Tool, Error> {
                Ok(Tool {
                    name: spec.name.to_string(),
                    description: spec.description.to_string(),
                    input_schema: serde_json::from_value(spec.input_schema)
                        .map_err(|e| Error::protocol(ErrorCode::ParseError, e.to_string()))?,
                    annotations: None,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let result = ListToolsResult { tools, next_cursor: None };
        serde_json::to_value(result).map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value, Error> {
        let req: CallToolRequest = params.and_then(|v| serde_json::from_value(v).ok())
            .ok_or(Error::protocol(ErrorCode::InvalidParams, "Missing params"))?;

        // Store calls are blocking file/SQLite I/O.
        let service = self.service.clone();
        let name = req.name.clone();
        let output = tokio::task::spawn_blocking(move || {
            tools::call_tool(&service, &name, req.arguments)
        })
        .await
        .map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))?
        .map_err(|e| to_protocol_error(&req.name, e))?;

        let result = ToolResult {
            content: Vec::new(),
            structured_content: Some(serde_json::json!([
                {
                    "type": "text",
                    "text": output.text,
                },
                {
                    "type": "json",
                    "data": output.data,
                }
            ])),
        };

        serde_json::to_value(result).map_err(|e| Error::protocol(ErrorCode::InternalError, e.to_string()))
    }
}

fn to_protocol_error(tool: &str, err: ToolError) -> Error {
    let code = match &err {
        ToolError::UnknownTool(_) => ErrorCode::MethodNotFound,
        _ if err.is_caller_error() => {
            tracing::debug!("Tool {} rejected: {}", tool, err);
            ErrorCode::InvalidParams
        }
        _ => {
            tracing::error!("Tool {} failed: {}", tool, err);
            ErrorCode::InternalError
        }
    };
    Error::protocol(code, err.to_string())
}

#[async_trait]
impl ServerHandler for McpService {
    async fn initialize(
        &self,
        _implementation: Implementation,
        _capabilities: ClientCapabilities
    ) -> Result<ServerCapabilities, Error> {
        Ok(ServerCapabilities::default())
    }

    async fn shutdown(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn handle_method(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        match method {
            "tools/list" => self.list_tools(),
            "tools/call" => self.call_tool(params).await,
            _ => Err(Error::protocol(ErrorCode::MethodNotFound, method.to_string()))
        }
    }
}
