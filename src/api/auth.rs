// Bearer / Basic credential check for the /api scope
use super::{error::ApiError, AppState};
use crate::errors::{PipelineError, PipelineResult};
use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::AUTHORIZATION,
    middleware::Next,
    web, Error, ResponseError,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::warn;

fn unauthorized(message: &str) -> PipelineError {
    PipelineError::Unauthorized(message.to_string())
}

/// Pulls the presented token out of an Authorization header value.
///
/// For Basic credentials the password is the token and the username is
/// ignored, matching Bitbucket's app-password convention.
pub fn presented_token(header: Option<&str>) -> PipelineResult<String> {
    let header = header.ok_or_else(|| unauthorized("No authorization token provided"))?;

    if let Some(token) = header.strip_prefix("Bearer ") {
        return Ok(token.trim().to_string());
    }

    if let Some(encoded) = header.strip_prefix("Basic ") {
        let invalid = || unauthorized("Invalid authorization token");
        let decoded = STANDARD.decode(encoded.trim()).map_err(|_| invalid())?;
        let decoded = String::from_utf8(decoded).map_err(|_| invalid())?;
        let (_username, password) = decoded.split_once(':').ok_or_else(invalid)?;
        return Ok(password.to_string());
    }

    Err(unauthorized("Invalid authorization format"))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub fn check_authorization(header: Option<&str>, expected: &str) -> PipelineResult<()> {
    let token = presented_token(header)?;
    if constant_time_eq(token.as_bytes(), expected.as_bytes()) {
        Ok(())
    } else {
        Err(unauthorized("Invalid authorization token"))
    }
}

pub async fn require_token(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let Some(state) = req.app_data::<web::Data<AppState>>() else {
        let err = ApiError(PipelineError::Configuration("application state missing".to_string()));
        return Ok(req.into_response(err.error_response()).map_into_right_body());
    };

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    if let Err(err) = check_authorization(header, state.token.expose()) {
        warn!(path = %req.path(), reason = %err, "Rejected unauthenticated request");
        return Ok(req
            .into_response(ApiError(err).error_response())
            .map_into_right_body());
    }

    let res = next.call(req).await?;
    Ok(res.map_into_left_body())
}
