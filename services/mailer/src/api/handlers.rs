use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::mail::is_valid_address;
use crate::quota::UsageSnapshot;

use super::types::{ErrorResponse, SendMailRequest, SendMailResponse};
use super::ApiState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Domain outcomes, including rejections, are reported in the body with a
/// 200 status.
pub async fn send_mail(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SendMailRequest>,
) -> Json<SendMailResponse> {
    let response = match state.relay.send(&request.into()).await {
        Ok(outcome) => SendMailResponse::from(outcome),
        Err(err) => {
            debug!(code = err.code(), error = %err, "send request rejected");
            SendMailResponse::from(err)
        }
    };

    Json(response)
}

pub async fn get_quota(
    State(state): State<Arc<ApiState>>,
    Path(identity): Path<String>,
) -> ApiResult<UsageSnapshot> {
    if !is_valid_address(&identity) {
        return Err(bad_request(
            "invalid_identity",
            "identity must be an email address",
        ));
    }

    Ok(Json(state.relay.quota().snapshot(&identity)))
}

pub async fn health_check() -> ApiResult<serde_json::Value> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": "bulk-relay-mailer"
    })))
}

fn bad_request(code: &str, message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
            code: code.to_string(),
            details: None,
        }),
    )
}
