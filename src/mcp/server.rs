// MCP Server - newline-delimited JSON-RPC over stdio
use super::{tools::ToolRegistry, types::*};
use crate::errors::{JsonRpcError, PipelineError};
use anyhow::Result;
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

pub struct McpServer {
    tools: ToolRegistry,
}

impl McpServer {
    pub fn new(tools: ToolRegistry) -> Self {
        Self { tools }
    }

    pub async fn run(self) -> Result<()> {
        info!("MCP server listening on stdio");
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    /// Serves one request per line until the reader hits EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!(request = line, "Received request");

            let Some(response) = self.handle_line(line).await else {
                continue;
            };

            let response_str = serde_json::to_string(&response)?;
            debug!(response = %response_str, "Sending response");

            writer.write_all(response_str.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("MCP server shutting down");
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed JSON-RPC message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError {
                        code: -32700,
                        message: format!("Parse error: {}", e),
                        data: None,
                    },
                ));
            }
        };

        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        let result = match request.method.as_str() {
            "initialize" => Ok(self.initialize(request.params)),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.list_tools() })),
            "tools/call" => self.call_tool(request.params).await,
            other => Err(JsonRpcError {
                code: -32601,
                message: format!("Method not found: {}", other),
                data: None,
            }),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn initialize(&self, params: Option<Value>) -> Value {
        let client_info = params
            .and_then(|p| p.get("clientInfo").cloned())
            .and_then(|c| serde_json::from_value::<ClientInfo>(c).ok());

        if let Some(client) = &client_info {
            info!(client = %client.name, version = %client.version, "MCP client connected");
        }

        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    /// Operation failures come back as `isError` results, not JSON-RPC errors.
    async fn call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| {
            PipelineError::validation("Missing params").to_jsonrpc_error()
        })?;
        let call: ToolCallRequest = serde_json::from_value(params).map_err(|e| {
            PipelineError::validation(format!("Invalid tools/call params: {}", e)).to_jsonrpc_error()
        })?;

        if !self.tools.contains(&call.name) {
            return Err(PipelineError::ToolNotFound(call.name).to_jsonrpc_error());
        }

        let result = match self.tools.call_tool(&call.name, call.arguments).await {
            Ok(value) => ToolCallResult::success(
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            ),
            Err(e) => {
                error!(tool = %call.name, error = %e, "Tool call failed");
                ToolCallResult::error(e.to_string())
            }
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError {
            code: -32603,
            message: e.to_string(),
            data: None,
        })
    }
}
