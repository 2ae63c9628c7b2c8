//! Private user probe
//!
//! Accepts any non-blank token under the case-sensitive `Bearer` scheme and
//! returns a fixed demo user. The token itself is not verified.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// `Cache-Control` for per-user responses
pub const PRIVATE_NO_STORE: &str = "private, no-store, max-age=0";

/// Demo user payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoUser {
    pub user_id: String,
    pub email: String,
    /// Unix time in milliseconds
    pub ts: i64,
}

impl DemoUser {
    pub fn now() -> Self {
        Self {
            user_id: "demo-user".to_string(),
            email: "demo@example.com".to_string(),
            ts: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// The scheme must be exactly `Bearer` and the token non-blank
fn has_bearer_token(headers: &HeaderMap) -> bool {
    let case_sensitive_scheme = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "));

    case_sensitive_scheme
        && headers
            .typed_get::<Authorization<Bearer>>()
            .is_some_and(|auth| !auth.token().trim().is_empty())
}

/// GET /api/private-user
pub async fn private_user(headers: HeaderMap) -> Response {
    let cache_control = [(header::CACHE_CONTROL, PRIVATE_NO_STORE)];

    if !has_bearer_token(&headers) {
        return (
            StatusCode::UNAUTHORIZED,
            cache_control,
            Json(json!({ "error": "Unauthorized" })),
        )
            .into_response();
    }

    (StatusCode::OK, cache_control, Json(DemoUser::now())).into_response()
}
