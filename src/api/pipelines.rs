// REST handlers for /api/pipelines
use super::{error::ApiResult, AppState};
use crate::{
    bitbucket::{PipelineSelector, PipelineVariable},
    errors::PipelineError,
    pipelines::{ListPipelinesParams, PipelineRefParams, TriggerPipelineParams},
};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::Value;

/// `workspace` and `repo_slug` are mandatory query parameters on every route.
#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub workspace: Option<String>,
    pub repo_slug: Option<String>,
}

impl RepoQuery {
    fn require(self) -> Result<(String, String), PipelineError> {
        let workspace = self
            .workspace
            .ok_or_else(|| PipelineError::validation("workspace is required"))?;
        let repo_slug = self
            .repo_slug
            .ok_or_else(|| PipelineError::validation("repo_slug is required"))?;
        Ok((workspace, repo_slug))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListPipelinesQuery {
    pub workspace: Option<String>,
    pub repo_slug: Option<String>,
    pub sort: Option<String>,
    pub page: Option<i64>,
    pub pagelen: Option<i64>,
}

/// REST callers may send variables as a plain `{key: value}` map or as
/// Bitbucket's `[{key, value, secured}]` list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VariablesInput {
    List(Vec<PipelineVariable>),
    Map(serde_json::Map<String, Value>),
}

impl VariablesInput {
    fn into_variables(self) -> Vec<PipelineVariable> {
        match self {
            VariablesInput::List(list) => list,
            VariablesInput::Map(map) => map
                .into_iter()
                .map(|(key, value)| PipelineVariable {
                    key,
                    value: match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    },
                    secured: Some(false),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TriggerBody {
    pub branch: Option<String>,
    pub commit: Option<String>,
    pub selector: Option<PipelineSelector>,
    pub variables: Option<VariablesInput>,
}

/// GET /api/pipelines
pub async fn list(state: web::Data<AppState>, query: web::Query<ListPipelinesQuery>) -> ApiResult<HttpResponse> {
    let query = query.into_inner();
    let (workspace, repo_slug) = RepoQuery {
        workspace: query.workspace,
        repo_slug: query.repo_slug,
    }
    .require()?;

    let result = state
        .service
        .list_pipelines(ListPipelinesParams {
            workspace: Some(workspace),
            repo_slug: Some(repo_slug),
            sort: query.sort,
            page: query.page,
            pagelen: query.pagelen,
        })
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/pipelines
pub async fn trigger(
    state: web::Data<AppState>,
    query: web::Query<RepoQuery>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let (workspace, repo_slug) = query.into_inner().require()?;

    let body: TriggerBody = if body.iter().all(u8::is_ascii_whitespace) {
        TriggerBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| PipelineError::validation(format!("Invalid request body: {}", e)))?
    };

    let result = state
        .service
        .trigger_pipeline(TriggerPipelineParams {
            workspace: Some(workspace),
            repo_slug: Some(repo_slug),
            branch: body.branch,
            commit: body.commit,
            selector: body.selector,
            variables: body.variables.map(VariablesInput::into_variables),
        })
        .await?;
    Ok(HttpResponse::Created().json(result))
}

/// GET /api/pipelines/{uuid}
pub async fn status(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RepoQuery>,
) -> ApiResult<HttpResponse> {
    let (workspace, repo_slug) = query.into_inner().require()?;
    let result = state
        .service
        .get_pipeline_status(PipelineRefParams {
            workspace: Some(workspace),
            repo_slug: Some(repo_slug),
            uuid: Some(path.into_inner()),
        })
        .await?;
    Ok(HttpResponse::Ok().json(result))
}

/// POST /api/pipelines/{uuid}/stop
pub async fn stop(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<RepoQuery>,
) -> ApiResult<HttpResponse> {
    let (workspace, repo_slug) = query.into_inner().require()?;
    let result = state
        .service
        .stop_pipeline(PipelineRefParams {
            workspace: Some(workspace),
            repo_slug: Some(repo_slug),
            uuid: Some(path.into_inner()),
        })
        .await?;
    Ok(HttpResponse::Ok().json(result))
}
