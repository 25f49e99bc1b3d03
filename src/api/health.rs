// Liveness checks
use actix_web::HttpResponse;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

/// GET / and GET /health
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }))
}
