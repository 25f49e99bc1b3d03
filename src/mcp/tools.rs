// Tool Registry - the four named pipeline tools
use super::types::McpTool;
use crate::{
    bitbucket::{types::REF_TARGET_TYPE, PipelineSelector, PipelineVariable},
    errors::{PipelineError, PipelineResult},
    pipelines::{ListPipelinesParams, PipelineRefParams, PipelineService, TriggerPipelineParams},
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub const LIST_PIPELINES: &str = "mcp_bitbucket_list_pipelines";
pub const TRIGGER_PIPELINE: &str = "mcp_bitbucket_trigger_pipeline";
pub const GET_PIPELINE_STATUS: &str = "mcp_bitbucket_get_pipeline_status";
pub const STOP_PIPELINE: &str = "mcp_bitbucket_stop_pipeline";

pub const TOOL_NAMES: [&str; 4] = [
    LIST_PIPELINES,
    TRIGGER_PIPELINE,
    GET_PIPELINE_STATUS,
    STOP_PIPELINE,
];

#[derive(Clone)]
pub struct ToolRegistry {
    service: PipelineService,
}

/// Bitbucket-shaped target accepted by the trigger tool.
#[derive(Debug, Deserialize)]
struct ToolTarget {
    #[serde(rename = "type")]
    target_type: Option<String>,
    ref_type: Option<String>,
    ref_name: Option<String>,
    commit: Option<ToolCommit>,
    selector: Option<PipelineSelector>,
}

#[derive(Debug, Deserialize)]
struct ToolCommit {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TriggerToolParams {
    workspace: Option<String>,
    repo_slug: Option<String>,
    branch: Option<String>,
    commit: Option<String>,
    target: Option<ToolTarget>,
    selector: Option<PipelineSelector>,
    variables: Option<Vec<PipelineVariable>>,
}

impl TriggerToolParams {
    fn into_params(self) -> PipelineResult<TriggerPipelineParams> {
        let mut params = TriggerPipelineParams {
            workspace: self.workspace,
            repo_slug: self.repo_slug,
            branch: self.branch,
            commit: self.commit,
            selector: self.selector,
            variables: self.variables,
        };

        let Some(target) = self.target else {
            return Ok(params);
        };
        if params.branch.is_some() || params.commit.is_some() {
            return Err(PipelineError::validation(
                "Specify either target or branch/commit, not both",
            ));
        }

        match target.target_type.as_deref() {
            Some(REF_TARGET_TYPE) => {}
            Some(other) => {
                return Err(PipelineError::validation(format!(
                    "Unsupported target type '{}'; expected '{}'",
                    other, REF_TARGET_TYPE
                )))
            }
            None => return Err(PipelineError::validation("target.type is required")),
        }

        match (target.ref_type.as_deref(), target.ref_name, target.commit) {
            (Some("branch"), Some(name), None) => params.branch = Some(name),
            (Some(other), Some(_), None) => {
                return Err(PipelineError::validation(format!(
                    "Unsupported target.ref_type '{}'; expected 'branch'",
                    other
                )))
            }
            (None, None, Some(commit)) => params.commit = Some(commit.hash),
            (_, _, Some(_)) => {
                return Err(PipelineError::validation(
                    "target must reference either a branch or a commit, not both",
                ))
            }
            _ => {
                return Err(PipelineError::validation(
                    "target requires ref_type and ref_name, or commit.hash",
                ))
            }
        }

        if target.selector.is_some() {
            if params.selector.is_some() {
                return Err(PipelineError::validation(
                    "selector given both inside and outside target",
                ));
            }
            params.selector = target.selector;
        }
        Ok(params)
    }
}

fn parse_params<T: DeserializeOwned>(tool: &str, params: Value) -> PipelineResult<T> {
    let params = match params {
        Value::Null => json!({}),
        Value::Object(_) => params,
        _ => {
            return Err(PipelineError::validation(format!(
                "Parameters for {} must be an object",
                tool
            )))
        }
    };
    serde_json::from_value(params).map_err(|e| {
        PipelineError::validation(format!("Invalid parameters for {}: {}", tool, e))
    })
}

fn repo_properties() -> Value {
    json!({
        "workspace": {
            "type": "string",
            "description": "Bitbucket workspace; defaults to BITBUCKET_WORKSPACE"
        },
        "repo_slug": {
            "type": "string",
            "description": "Repository slug; defaults to BITBUCKET_REPO_SLUG"
        }
    })
}

fn with_repo_properties(mut properties: Value) -> Value {
    if let (Value::Object(props), Value::Object(repo)) = (&mut properties, repo_properties()) {
        for (key, value) in repo {
            props.insert(key, value);
        }
    }
    properties
}

impl ToolRegistry {
    pub fn new(service: PipelineService) -> Self {
        Self { service }
    }

    pub fn contains(&self, name: &str) -> bool {
        TOOL_NAMES.contains(&name)
    }

    pub fn list_tools(&self) -> Vec<McpTool> {
        vec![
            McpTool {
                name: LIST_PIPELINES.to_string(),
                description: "List Bitbucket Pipelines with pagination support".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": with_repo_properties(json!({
                        "sort": {
                            "type": "string",
                            "description": "Sort field, prefix with '-' for descending",
                            "default": "-created_on"
                        },
                        "page": {
                            "type": "integer",
                            "description": "Page number for pagination",
                            "minimum": 1,
                            "default": 1
                        },
                        "pagelen": {
                            "type": "integer",
                            "description": "Number of items per page",
                            "minimum": 1,
                            "maximum": 100,
                            "default": 10
                        }
                    }))
                }),
            },
            McpTool {
                name: TRIGGER_PIPELINE.to_string(),
                description: "Trigger a new Bitbucket Pipeline".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": with_repo_properties(json!({
                        "branch": {
                            "type": "string",
                            "description": "Branch to run the pipeline on"
                        },
                        "commit": {
                            "type": "string",
                            "description": "Commit hash to run the pipeline on"
                        },
                        "target": {
                            "type": "object",
                            "description": "Pipeline target configuration, as Bitbucket expects it",
                            "properties": {
                                "type": { "type": "string", "enum": [REF_TARGET_TYPE] },
                                "ref_type": { "type": "string", "enum": ["branch"] },
                                "ref_name": { "type": "string" },
                                "commit": {
                                    "type": "object",
                                    "properties": { "hash": { "type": "string" } },
                                    "required": ["hash"]
                                },
                                "selector": {
                                    "type": "object",
                                    "properties": {
                                        "type": { "type": "string" },
                                        "pattern": { "type": "string" }
                                    },
                                    "required": ["type", "pattern"]
                                }
                            },
                            "required": ["type"]
                        },
                        "selector": {
                            "type": "object",
                            "description": "Custom pipeline selector",
                            "properties": {
                                "type": { "type": "string" },
                                "pattern": { "type": "string" }
                            },
                            "required": ["type", "pattern"]
                        },
                        "variables": {
                            "type": "array",
                            "description": "Optional pipeline variables",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "key": { "type": "string" },
                                    "value": { "type": "string" },
                                    "secured": { "type": "boolean" }
                                },
                                "required": ["key", "value"]
                            }
                        }
                    }))
                }),
            },
            McpTool {
                name: GET_PIPELINE_STATUS.to_string(),
                description: "Get the status of a specific Bitbucket Pipeline".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": with_repo_properties(json!({
                        "uuid": { "type": "string", "description": "UUID of the pipeline" }
                    })),
                    "required": ["uuid"]
                }),
            },
            McpTool {
                name: STOP_PIPELINE.to_string(),
                description: "Stop a running Bitbucket Pipeline".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": with_repo_properties(json!({
                        "uuid": { "type": "string", "description": "UUID of the pipeline to stop" }
                    })),
                    "required": ["uuid"]
                }),
            },
        ]
    }

    /// Looks up `name` and runs it. Unknown names fail before any outbound call.
    pub async fn call_tool(&self, name: &str, params: Value) -> PipelineResult<Value> {
        info!(tool = name, "Calling tool");
        match name {
            LIST_PIPELINES => {
                let params: ListPipelinesParams = parse_params(name, params)?;
                self.service.list_pipelines(params).await
            }
            TRIGGER_PIPELINE => {
                let params: TriggerToolParams = parse_params(name, params)?;
                self.service.trigger_pipeline(params.into_params()?).await
            }
            GET_PIPELINE_STATUS => {
                let params: PipelineRefParams = parse_params(name, params)?;
                self.service.get_pipeline_status(params).await
            }
            STOP_PIPELINE => {
                let params: PipelineRefParams = parse_params(name, params)?;
                self.service.stop_pipeline(params).await
            }
            _ => Err(PipelineError::ToolNotFound(name.to_string())),
        }
    }
}
