// Bitbucket Pipelines MCP Service
// Exposes list/trigger/status/stop for Bitbucket Pipelines over REST, a
// single-envelope tool endpoint and an MCP stdio transport

pub mod api;
pub mod bitbucket;
pub mod config;
pub mod errors;
pub mod mcp;
pub mod pipelines;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ServiceConfig;
pub use errors::{PipelineError, PipelineResult};
pub use mcp::{McpServer, ToolRegistry};
pub use pipelines::PipelineService;
