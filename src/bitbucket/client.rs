// Bitbucket Client - authenticated reqwest client for the pipelines endpoints
use super::api_trait::PipelineApi;
use super::types::{ListQuery, PipelineRequest, RepoRef};
use crate::{
    config::{AccessToken, ServiceConfig},
    errors::{Operation, PipelineError, PipelineResult},
};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{RequestBuilder, Url};
use serde_json::Value;
use tracing::{debug, error, warn};

pub const REDACTED_AUTHORIZATION: &str = "Bearer [REDACTED]";

#[derive(Debug, Clone)]
pub struct BitbucketClient {
    client: reqwest::Client,
    base_url: Url,
    token: AccessToken,
}

impl BitbucketClient {
    pub fn new(config: &ServiceConfig) -> PipelineResult<Self> {
        Self::with_base_url(config.api_url.clone(), config.access_token.clone())
    }

    pub fn with_base_url(base_url: Url, token: AccessToken) -> PipelineResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose())).map_err(|_| {
            PipelineError::Configuration(
                "BITBUCKET_ACCESS_TOKEN contains characters not allowed in a header".to_string(),
            )
        })?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// `{base}/repositories/{workspace}/{repo_slug}/pipelines/{tail..}` with
    /// every segment percent-encoded.
    fn pipelines_url(&self, repo: &RepoRef, tail: &[&str]) -> PipelineResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PipelineError::Configuration(format!(
                    "API base URL cannot carry a path: {}",
                    self.base_url
                ))
            })?
            .pop_if_empty()
            .extend([
                "repositories",
                repo.workspace.as_str(),
                repo.repo_slug.as_str(),
                "pipelines",
            ])
            .extend(tail);
        Ok(url)
    }

    /// Scrubs the access token out of anything headed for a log line or a caller.
    pub fn redact(&self, text: &str) -> String {
        let token = self.token.expose();
        if token.is_empty() {
            return text.to_string();
        }
        text.replace(token, "[REDACTED]")
    }

    fn transport_error(&self, operation: Operation, err: &reqwest::Error) -> PipelineError {
        PipelineError::Transport {
            operation,
            message: self.redact(&err.to_string()),
        }
    }

    async fn execute(&self, operation: Operation, builder: RequestBuilder) -> PipelineResult<Value> {
        let request = builder
            .build()
            .map_err(|e| self.transport_error(operation, &e))?;
        let method = request.method().clone();
        let url = request.url().clone();

        debug!(%method, %url, "Calling Bitbucket API");

        let response = match self.client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let err = self.transport_error(operation, &e);
                error!(
                    %method,
                    %url,
                    authorization = REDACTED_AUTHORIZATION,
                    error = %err,
                    "Bitbucket API request failed"
                );
                return Err(err);
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(operation, &e))?;

        if status.is_success() {
            return Ok(parse_body(&text));
        }

        // Error bodies end up in messages and logs; upstream may echo credentials
        let text = self.redact(&text);
        let body = parse_body(&text);

        if status.is_server_error() {
            error!(
                %method,
                %url,
                status = status.as_u16(),
                body = %text,
                authorization = REDACTED_AUTHORIZATION,
                "Bitbucket API error"
            );
        } else {
            warn!(
                %method,
                %url,
                status = status.as_u16(),
                "Bitbucket API rejected request"
            );
        }

        Err(PipelineError::upstream(operation, status.as_u16(), body))
    }
}

/// Bitbucket answers JSON; anything else is kept as a JSON string.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

#[async_trait]
impl PipelineApi for BitbucketClient {
    async fn list_pipelines(&self, repo: &RepoRef, query: &ListQuery) -> PipelineResult<Value> {
        let url = self.pipelines_url(repo, &[""])?;
        self.execute(Operation::ListPipelines, self.client.get(url).query(query))
            .await
    }

    async fn run_pipeline(&self, repo: &RepoRef, request: &PipelineRequest) -> PipelineResult<Value> {
        let url = self.pipelines_url(repo, &[""])?;
        self.execute(Operation::TriggerPipeline, self.client.post(url).json(request))
            .await
    }

    async fn get_pipeline(&self, repo: &RepoRef, uuid: &str) -> PipelineResult<Value> {
        let url = self.pipelines_url(repo, &[uuid])?;
        self.execute(Operation::GetPipelineStatus, self.client.get(url))
            .await
    }

    async fn stop_pipeline(&self, repo: &RepoRef, uuid: &str) -> PipelineResult<Value> {
        let url = self.pipelines_url(repo, &[uuid, "stopPipeline"])?;
        self.execute(Operation::StopPipeline, self.client.post(url))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitbucket::types::PipelineTarget;
    use crate::errors::UpstreamKind;
    use actix_web::{dev::ServerHandle, web, App, HttpRequest, HttpResponse, HttpServer};
    use serde_json::json;
    use std::collections::HashMap;

    const TOKEN: &str = "test-token";

    fn auth_header(req: &HttpRequest) -> Value {
        req.headers()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| json!(v))
            .unwrap_or(Value::Null)
    }

    async fn list(req: HttpRequest, query: web::Query<HashMap<String, String>>) -> HttpResponse {
        HttpResponse::Ok().json(json!({
            "authorization": auth_header(&req),
            "accept": req.headers().get("accept").and_then(|v| v.to_str().ok()),
            "query": query.into_inner(),
            "path": req.path(),
        }))
    }

    async fn create(body: web::Json<Value>) -> HttpResponse {
        HttpResponse::Created().json(json!({ "received": body.into_inner() }))
    }

    async fn status(req: HttpRequest, path: web::Path<(String, String, String)>) -> HttpResponse {
        let (_, _, uuid) = path.into_inner();
        match uuid.as_str() {
            "echo" => HttpResponse::InternalServerError().json(json!({
                "error": { "message": "internal failure", "request_authorization": auth_header(&req) }
            })),
            "non-existent-uuid" => HttpResponse::NotFound()
                .json(json!({ "error": { "message": "Pipeline not found" } })),
            "ordered" => HttpResponse::Ok()
                .content_type("application/json")
                .body(r#"{"uuid":"ordered","state":{"name":"COMPLETED"},"build_number":7}"#),
            _ => HttpResponse::Ok().json(json!({ "uuid": uuid, "state": { "name": "IN_PROGRESS" } })),
        }
    }

    async fn stop(path: web::Path<(String, String, String)>) -> HttpResponse {
        let (_, _, uuid) = path.into_inner();
        match uuid.as_str() {
            "valid-uuid" => HttpResponse::Forbidden().json(json!({
                "error": { "message": "You do not have permission to stop this pipeline" }
            })),
            "completed-pipeline-uuid" => HttpResponse::BadRequest().json(json!({
                "error": { "message": "Pipeline is not in a running state" }
            })),
            "broken" => HttpResponse::ServiceUnavailable().body("upstream down"),
            _ => HttpResponse::NoContent().finish(),
        }
    }

    fn fake_bitbucket(cfg: &mut web::ServiceConfig) {
        cfg.route("/2.0/repositories/{ws}/{repo}/pipelines/", web::get().to(list))
            .route("/2.0/repositories/{ws}/{repo}/pipelines/", web::post().to(create))
            .route("/2.0/repositories/{ws}/{repo}/pipelines/{uuid}", web::get().to(status))
            .route(
                "/2.0/repositories/{ws}/{repo}/pipelines/{uuid}/stopPipeline",
                web::post().to(stop),
            );
    }

    async fn start_upstream() -> (BitbucketClient, ServerHandle) {
        let server = HttpServer::new(|| App::new().configure(fake_bitbucket))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let base = Url::parse(&format!("http://{}/2.0", addr)).unwrap();
        let client = BitbucketClient::with_base_url(base, AccessToken::new(TOKEN)).unwrap();
        (client, handle)
    }

    fn repo() -> RepoRef {
        RepoRef::new("test-workspace", "test-repo")
    }

    #[test]
    fn builds_percent_encoded_pipeline_urls() {
        let client = BitbucketClient::with_base_url(
            Url::parse("https://api.bitbucket.org/2.0/").unwrap(),
            AccessToken::new(TOKEN),
        )
        .unwrap();

        let list = client.pipelines_url(&repo(), &[""]).unwrap();
        assert_eq!(
            list.as_str(),
            "https://api.bitbucket.org/2.0/repositories/test-workspace/test-repo/pipelines/"
        );

        let stop = client
            .pipelines_url(&repo(), &["{1234-abcd}", "stopPipeline"])
            .unwrap();
        assert_eq!(
            stop.as_str(),
            "https://api.bitbucket.org/2.0/repositories/test-workspace/test-repo/pipelines/%7B1234-abcd%7D/stopPipeline"
        );
    }

    #[test]
    fn redacts_token() {
        let client = BitbucketClient::with_base_url(
            Url::parse("https://api.bitbucket.org/2.0").unwrap(),
            AccessToken::new(TOKEN),
        )
        .unwrap();
        assert_eq!(
            client.redact("header was Bearer test-token"),
            "header was Bearer [REDACTED]"
        );
    }

    #[actix_web::test]
    async fn list_forwards_pagination_and_bearer_header() {
        let (client, handle) = start_upstream().await;

        let query = ListQuery {
            sort: "-created_on".to_string(),
            page: 2,
            pagelen: 25,
        };
        let body = client.list_pipelines(&repo(), &query).await.unwrap();

        assert_eq!(body["authorization"], "Bearer test-token");
        assert_eq!(body["accept"], "application/json");
        assert_eq!(body["path"], "/2.0/repositories/test-workspace/test-repo/pipelines/");
        assert_eq!(
            body["query"],
            json!({ "sort": "-created_on", "page": "2", "pagelen": "25" })
        );

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn trigger_posts_json_body() {
        let (client, handle) = start_upstream().await;

        let request = PipelineRequest {
            target: PipelineTarget::branch("main"),
            variables: None,
        };
        let body = client.run_pipeline(&repo(), &request).await.unwrap();
        assert_eq!(
            body,
            json!({
                "received": {
                    "target": {
                        "type": "pipeline_ref_target",
                        "ref_type": "branch",
                        "ref_name": "main"
                    }
                }
            })
        );

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn success_body_is_passed_through_verbatim() {
        let (client, handle) = start_upstream().await;

        let body = client.get_pipeline(&repo(), "ordered").await.unwrap();
        assert_eq!(
            serde_json::to_string(&body).unwrap(),
            r#"{"uuid":"ordered","state":{"name":"COMPLETED"},"build_number":7}"#
        );

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn not_found_keeps_status_and_body() {
        let (client, handle) = start_upstream().await;

        let err = client
            .get_pipeline(&repo(), "non-existent-uuid")
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"Failed to get pipeline status: 404 - {"error":{"message":"Pipeline not found"}}"#
        );
        assert_eq!(err.upstream_kind(), Some(UpstreamKind::NotFound));

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn stop_distinguishes_permission_and_not_running() {
        let (client, handle) = start_upstream().await;

        let denied = client.stop_pipeline(&repo(), "valid-uuid").await.unwrap_err();
        assert_eq!(
            denied.to_string(),
            r#"Failed to stop pipeline: 403 - {"error":{"message":"You do not have permission to stop this pipeline"}}"#
        );
        assert_eq!(denied.upstream_kind(), Some(UpstreamKind::PermissionDenied));

        let finished = client
            .stop_pipeline(&repo(), "completed-pipeline-uuid")
            .await
            .unwrap_err();
        assert_eq!(
            finished.to_string(),
            r#"Failed to stop pipeline: 400 - {"error":{"message":"Pipeline is not in a running state"}}"#
        );
        assert_eq!(finished.upstream_kind(), Some(UpstreamKind::NotRunning));

        let broken = client.stop_pipeline(&repo(), "broken").await.unwrap_err();
        assert_eq!(
            broken.to_string(),
            r#"Failed to stop pipeline: 503 - "upstream down""#
        );

        let stopped = client.stop_pipeline(&repo(), "running").await.unwrap();
        assert_eq!(stopped, Value::Null);

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn server_error_keeps_token_out_of_message() {
        let (client, handle) = start_upstream().await;

        let err = client.get_pipeline(&repo(), "echo").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(!err.to_string().contains(TOKEN));
        assert_eq!(
            err.details().unwrap()["error"]["request_authorization"],
            "Bearer [REDACTED]"
        );

        handle.stop(false).await;
    }

    #[actix_web::test]
    async fn network_failure_has_message_only() {
        let client = BitbucketClient::with_base_url(
            Url::parse("http://127.0.0.1:1/2.0").unwrap(),
            AccessToken::new(TOKEN),
        )
        .unwrap();

        let query = ListQuery {
            sort: "-created_on".to_string(),
            page: 1,
            pagelen: 10,
        };
        let err = client.list_pipelines(&repo(), &query).await.unwrap_err();

        assert!(matches!(err, PipelineError::Transport { .. }));
        assert!(err.to_string().starts_with("Failed to list pipelines: "));
        assert!(err.status().is_none());
        assert!(!err.to_string().contains(TOKEN));
    }
}
