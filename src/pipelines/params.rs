// Shared parameter structs; both front ends translate into these
use crate::bitbucket::{PipelineSelector, PipelineVariable};
use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ListPipelinesParams {
    pub workspace: Option<String>,
    pub repo_slug: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub pagelen: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TriggerPipelineParams {
    pub workspace: Option<String>,
    pub repo_slug: Option<String>,
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub selector: Option<PipelineSelector>,
    pub variables: Option<Vec<PipelineVariable>>,
}

/// Identifies one pipeline run, for status and stop.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PipelineRefParams {
    pub workspace: Option<String>,
    pub repo_slug: Option<String>,
    pub uuid: Option<String>,
}
