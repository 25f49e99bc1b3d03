// Pipeline Error Types
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

/// The four pipeline operations, named the way they appear in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListPipelines,
    TriggerPipeline,
    GetPipelineStatus,
    StopPipeline,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListPipelines => "list pipelines",
            Operation::TriggerPipeline => "trigger pipeline",
            Operation::GetPipelineStatus => "get pipeline status",
            Operation::StopPipeline => "stop pipeline",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classification of a non-2xx Bitbucket response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamKind {
    NotFound,
    /// 403 from stopPipeline
    PermissionDenied,
    /// 400 from stopPipeline: the pipeline already finished
    NotRunning,
    Other,
}

impl UpstreamKind {
    pub fn classify(operation: Operation, status: u16) -> Self {
        match (operation, status) {
            (_, 404) => UpstreamKind::NotFound,
            (Operation::StopPipeline, 403) => UpstreamKind::PermissionDenied,
            (Operation::StopPipeline, 400) => UpstreamKind::NotRunning,
            _ => UpstreamKind::Other,
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{0}")]
    Validation(String),

    #[error("Failed to {}: {} - {}", .operation, .status, compact_json(.body))]
    Upstream {
        operation: Operation,
        status: u16,
        body: Value,
        kind: UpstreamKind,
    },

    #[error("Failed to {operation}: {message}")]
    Transport {
        operation: Operation,
        message: String,
    },

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("{0}")]
    Unauthorized(String),
}

fn compact_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl PipelineError {
    pub fn validation(message: impl Into<String>) -> Self {
        PipelineError::Validation(message.into())
    }

    pub fn upstream(operation: Operation, status: u16, body: Value) -> Self {
        PipelineError::Upstream {
            operation,
            status,
            body,
            kind: UpstreamKind::classify(operation, status),
        }
    }

    /// Upstream status, when Bitbucket answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Upstream response body, forwarded as error details.
    pub fn details(&self) -> Option<&Value> {
        match self {
            PipelineError::Upstream { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn upstream_kind(&self) -> Option<UpstreamKind> {
        match self {
            PipelineError::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn to_jsonrpc_error(&self) -> JsonRpcError {
        let code = match self {
            PipelineError::ToolNotFound(_) => -32601,
            PipelineError::Validation(_) => -32602,
            _ => -32603,
        };
        JsonRpcError {
            code,
            message: self.to_string(),
            data: self.details().cloned(),
        }
    }
}
