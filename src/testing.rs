// Test support: a recording stand-in for the Bitbucket API
use crate::bitbucket::{ListQuery, PipelineApi, PipelineRequest, RepoRef};
use crate::errors::PipelineResult;
use crate::pipelines::PipelineService;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(RepoRef, ListQuery),
    Run(RepoRef, PipelineRequest),
    Get(RepoRef, String),
    Stop(RepoRef, String),
}

type Responder = Box<dyn Fn(&Call) -> PipelineResult<Value> + Send + Sync>;

pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    respond: Responder,
}

impl FakeApi {
    pub fn ok(body: Value) -> Arc<Self> {
        Self::with(move |_| Ok(body.clone()))
    }

    pub fn with<F>(respond: F) -> Arc<Self>
    where
        F: Fn(&Call) -> PipelineResult<Value> + Send + Sync + 'static,
    {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            respond: Box::new(respond),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> PipelineResult<Value> {
        let result = (self.respond)(&call);
        self.calls.lock().unwrap().push(call);
        result
    }
}

#[async_trait]
impl PipelineApi for FakeApi {
    async fn list_pipelines(&self, repo: &RepoRef, query: &ListQuery) -> PipelineResult<Value> {
        self.record(Call::List(repo.clone(), query.clone()))
    }

    async fn run_pipeline(&self, repo: &RepoRef, request: &PipelineRequest) -> PipelineResult<Value> {
        self.record(Call::Run(repo.clone(), request.clone()))
    }

    async fn get_pipeline(&self, repo: &RepoRef, uuid: &str) -> PipelineResult<Value> {
        self.record(Call::Get(repo.clone(), uuid.to_string()))
    }

    async fn stop_pipeline(&self, repo: &RepoRef, uuid: &str) -> PipelineResult<Value> {
        self.record(Call::Stop(repo.clone(), uuid.to_string()))
    }
}

pub fn default_repo() -> RepoRef {
    RepoRef::new("test-workspace", "test-repo")
}

pub fn service(api: Arc<FakeApi>) -> PipelineService {
    PipelineService::new(api, default_repo())
}
