// POST /mcp - single-envelope tool dispatch
use super::AppState;
use crate::errors::PipelineError;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::error;

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

pub async fn dispatch(state: web::Data<AppState>, request: web::Json<DispatchRequest>) -> HttpResponse {
    let request = request.into_inner();
    let tool = request.tool.unwrap_or_default();

    if !state.tools.contains(&tool) {
        return HttpResponse::BadRequest().json(json!({
            "error": PipelineError::ToolNotFound(tool).to_string()
        }));
    }

    match state
        .tools
        .call_tool(&tool, request.params.unwrap_or_else(|| json!({})))
        .await
    {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => {
            error!(tool = %tool, error = %e, "Error executing tool");
            let status = match &e {
                PipelineError::Validation(_) => actix_web::http::StatusCode::BAD_REQUEST,
                _ => actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
            };
            HttpResponse::build(status).json(json!({
                "error": e.to_string(),
                "details": e.details().cloned().unwrap_or(Value::Null)
            }))
        }
    }
}

/// GET /mcp/tools
pub async fn list_tools(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "tools": state.tools.list_tools() }))
}
