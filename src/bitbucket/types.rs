// Bitbucket Pipelines request shapes
use serde::{Deserialize, Serialize};

pub const REF_TARGET_TYPE: &str = "pipeline_ref_target";
pub const BRANCH_REF_TYPE: &str = "branch";
pub const COMMIT_TYPE: &str = "commit";

/// Workspace and repository a call is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub workspace: String,
    pub repo_slug: String,
}

impl RepoRef {
    pub fn new(workspace: impl Into<String>, repo_slug: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            repo_slug: repo_slug.into(),
        }
    }
}

/// Selects a custom or pattern-matched pipeline from bitbucket-pipelines.yml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSelector {
    #[serde(rename = "type")]
    pub selector_type: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    #[serde(rename = "type")]
    pub commit_type: String,
    pub hash: String,
}

/// What a pipeline runs against: a branch head or a specific commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineTarget {
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<CommitRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selector: Option<PipelineSelector>,
}

impl PipelineTarget {
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            target_type: REF_TARGET_TYPE.to_string(),
            ref_type: Some(BRANCH_REF_TYPE.to_string()),
            ref_name: Some(name.into()),
            commit: None,
            selector: None,
        }
    }

    pub fn commit(hash: impl Into<String>) -> Self {
        Self {
            target_type: REF_TARGET_TYPE.to_string(),
            ref_type: None,
            ref_name: None,
            commit: Some(CommitRef {
                commit_type: COMMIT_TYPE.to_string(),
                hash: hash.into(),
            }),
            selector: None,
        }
    }

    pub fn with_selector(mut self, selector: Option<PipelineSelector>) -> Self {
        self.selector = selector;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineVariable {
    pub key: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secured: Option<bool>,
}

/// Body of `POST /repositories/{workspace}/{repo_slug}/pipelines/`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRequest {
    pub target: PipelineTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<PipelineVariable>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    pub sort: String,
    pub page: u32,
    pub pagelen: u32,
}
