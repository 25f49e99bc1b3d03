// Pipeline API Trait - the outbound seam the operations call through
use super::types::{ListQuery, PipelineRequest, RepoRef};
use crate::errors::PipelineResult;
use async_trait::async_trait;
use serde_json::Value;

/// One method per Bitbucket pipelines endpoint. Implementations return the
/// upstream JSON body untouched on 2xx.
#[async_trait]
pub trait PipelineApi: Send + Sync {
    async fn list_pipelines(&self, repo: &RepoRef, query: &ListQuery) -> PipelineResult<Value>;

    async fn run_pipeline(&self, repo: &RepoRef, request: &PipelineRequest) -> PipelineResult<Value>;

    async fn get_pipeline(&self, repo: &RepoRef, uuid: &str) -> PipelineResult<Value>;

    async fn stop_pipeline(&self, repo: &RepoRef, uuid: &str) -> PipelineResult<Value>;
}
