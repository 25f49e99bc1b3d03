// HTTP front ends: authenticated REST under /api, /mcp tool dispatch and
// liveness checks, all calling the same PipelineService

pub mod auth;
pub mod error;
pub mod health;
pub mod mcp;
pub mod pipelines;

pub use error::ApiError;

use crate::{config::AccessToken, mcp::ToolRegistry, pipelines::PipelineService};
use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    error::InternalError,
    middleware, web, App, Error, HttpResponse,
};
use serde_json::json;
use tracing_actix_web::TracingLogger;

/// Shared, immutable application state.
#[derive(Clone)]
pub struct AppState {
    pub service: PipelineService,
    pub tools: ToolRegistry,
    pub token: AccessToken,
}

impl AppState {
    pub fn new(service: PipelineService, token: AccessToken) -> Self {
        Self {
            tools: ToolRegistry::new(service.clone()),
            service,
            token,
        }
    }
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/", web::get().to(health::health))
        .route("/health", web::get().to(health::health))
        .route("/mcp", web::post().to(mcp::dispatch))
        .route("/mcp/tools", web::get().to(mcp::list_tools))
        .service(
            web::scope("/api")
                .wrap(middleware::from_fn(auth::require_token))
                .route("/pipelines", web::get().to(pipelines::list))
                .route("/pipelines", web::post().to(pipelines::trigger))
                .route("/pipelines/{uuid}", web::get().to(pipelines::status))
                .route("/pipelines/{uuid}/stop", web::post().to(pipelines::stop)),
        );
}

/// The full HTTP application. Hardening headers wrap CORS so preflight
/// responses carry them too.
pub fn app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(Cors::permissive())
        .wrap(security_headers())
        .wrap(TracingLogger::default())
        .app_data(state)
        .configure(routes)
}

/// Response hardening applied to every response.
pub fn security_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-Frame-Options", "DENY"))
        .add(("Referrer-Policy", "no-referrer"))
}

fn bad_request(message: String) -> actix_web::Error {
    InternalError::from_response(
        message.clone(),
        HttpResponse::BadRequest().json(json!({ "error": message })),
    )
    .into()
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}
