// MCP Protocol Module
pub mod server;
pub mod tools;
pub mod types;

pub use server::McpServer;
pub use tools::ToolRegistry;
pub use types::*;
