// Pipeline operations shared by the REST and tool front ends
// Each one validates its parameters, makes one PipelineApi call and hands the
// upstream body back untouched

pub mod params;

pub use params::{ListPipelinesParams, PipelineRefParams, TriggerPipelineParams};

use crate::{
    bitbucket::{BitbucketClient, ListQuery, PipelineApi, PipelineRequest, PipelineTarget, RepoRef},
    config::ServiceConfig,
    errors::{PipelineError, PipelineResult},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_SORT: &str = "-created_on";
pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PAGELEN: u32 = 10;
pub const MAX_PAGELEN: u32 = 100;

#[derive(Clone)]
pub struct PipelineService {
    api: Arc<dyn PipelineApi>,
    defaults: RepoRef,
}

impl PipelineService {
    pub fn new(api: Arc<dyn PipelineApi>, defaults: RepoRef) -> Self {
        Self { api, defaults }
    }

    pub fn from_config(config: &ServiceConfig) -> PipelineResult<Self> {
        let client = BitbucketClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            RepoRef::new(config.workspace.clone(), config.repo_slug.clone()),
        ))
    }

    fn resolve_repo(&self, workspace: Option<String>, repo_slug: Option<String>) -> PipelineResult<RepoRef> {
        let workspace = non_empty("workspace", workspace)?.unwrap_or_else(|| self.defaults.workspace.clone());
        let repo_slug = non_empty("repo_slug", repo_slug)?.unwrap_or_else(|| self.defaults.repo_slug.clone());
        Ok(RepoRef::new(workspace, repo_slug))
    }

    pub async fn list_pipelines(&self, params: ListPipelinesParams) -> PipelineResult<Value> {
        let repo = self.resolve_repo(params.workspace, params.repo_slug)?;

        let page = match params.page {
            None => DEFAULT_PAGE,
            Some(page) if page >= 1 && page <= u32::MAX as i64 => page as u32,
            Some(_) => return Err(PipelineError::validation("page must be a positive integer")),
        };
        let pagelen = match params.pagelen {
            None => DEFAULT_PAGELEN,
            Some(len) if len >= 1 && len <= MAX_PAGELEN as i64 => len as u32,
            Some(_) => {
                return Err(PipelineError::validation(format!(
                    "pagelen must be between 1 and {}",
                    MAX_PAGELEN
                )))
            }
        };
        let sort = non_empty("sort", params.sort)?.unwrap_or_else(|| DEFAULT_SORT.to_string());

        let query = ListQuery { sort, page, pagelen };
        info!(
            workspace = %repo.workspace,
            repo_slug = %repo.repo_slug,
            page = query.page,
            pagelen = query.pagelen,
            "Listing pipelines"
        );
        self.api.list_pipelines(&repo, &query).await
    }

    pub async fn trigger_pipeline(&self, params: TriggerPipelineParams) -> PipelineResult<Value> {
        let repo = self.resolve_repo(params.workspace, params.repo_slug)?;

        let branch = non_empty("branch", params.branch)?;
        let commit = non_empty("commit", params.commit)?;
        let target = match (branch, commit) {
            (Some(branch), None) => PipelineTarget::branch(branch),
            (None, Some(commit)) => PipelineTarget::commit(commit),
            (None, None) => {
                return Err(PipelineError::validation(
                    "Either branch or commit must be specified",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(PipelineError::validation(
                    "Only one of branch or commit may be specified",
                ))
            }
        };

        if let Some(selector) = &params.selector {
            if selector.selector_type.trim().is_empty() || selector.pattern.trim().is_empty() {
                return Err(PipelineError::validation(
                    "selector requires both type and pattern",
                ));
            }
        }

        if let Some(variables) = &params.variables {
            if variables.iter().any(|v| v.key.trim().is_empty()) {
                return Err(PipelineError::validation("Every variable requires a key"));
            }
        }

        let request = PipelineRequest {
            target: target.with_selector(params.selector),
            variables: params.variables,
        };
        info!(
            workspace = %repo.workspace,
            repo_slug = %repo.repo_slug,
            "Triggering pipeline"
        );
        self.api.run_pipeline(&repo, &request).await
    }

    pub async fn get_pipeline_status(&self, params: PipelineRefParams) -> PipelineResult<Value> {
        let repo = self.resolve_repo(params.workspace, params.repo_slug)?;
        let uuid = required_uuid(params.uuid)?;

        info!(workspace = %repo.workspace, repo_slug = %repo.repo_slug, %uuid, "Fetching pipeline status");
        self.api.get_pipeline(&repo, &uuid).await
    }

    pub async fn stop_pipeline(&self, params: PipelineRefParams) -> PipelineResult<Value> {
        let repo = self.resolve_repo(params.workspace, params.repo_slug)?;
        let uuid = required_uuid(params.uuid)?;

        info!(workspace = %repo.workspace, repo_slug = %repo.repo_slug, %uuid, "Stopping pipeline");
        self.api.stop_pipeline(&repo, &uuid).await
    }
}

/// Absent is fine, present-but-blank is not.
fn non_empty(field: &str, value: Option<String>) -> PipelineResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(PipelineError::validation(format!(
            "{} must not be empty",
            field
        ))),
        other => Ok(other),
    }
}

fn required_uuid(uuid: Option<String>) -> PipelineResult<String> {
    non_empty("uuid", uuid)?.ok_or_else(|| PipelineError::validation("uuid is required"))
}
