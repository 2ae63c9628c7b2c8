//! Error types for the storefront server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use storefront_core::CoreError;
use thiserror::Error;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Core error: {0}")]
    Core(CoreError),

    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        parameter: Option<String>,
        code: Option<&'static str>,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// HTTP status this error is rendered with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ServerError::Core(_)
            | ServerError::Config(_)
            | ServerError::Io(_)
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn describe(&self) -> (&'static str, &'static str, Option<Value>) {
        match self {
            ServerError::InvalidRequest {
                message,
                parameter,
                code,
            } => (
                "invalid_request",
                "Check the query parameters: size and rounds must be positive integers",
                Some(json!({
                    "parameter": parameter,
                    "error_code": code,
                    "message": message
                })),
            ),
            ServerError::Core(core_err) => (
                "core_error",
                "An error occurred while running the workload",
                Some(json!({
                    "error_code": core_err.code(),
                    "component": "workload"
                })),
            ),
            ServerError::Config(msg) => (
                "configuration_error",
                "Contact system administrator - server configuration issue",
                Some(json!({
                    "component": "server_config",
                    "message": msg
                })),
            ),
            ServerError::Io(err) => (
                "io_error",
                "Check file system permissions and disk space",
                Some(json!({ "message": err.to_string() })),
            ),
            ServerError::Internal(msg) => (
                "internal_server_error",
                "Contact support if this error persists",
                Some(json!({ "message": msg })),
            ),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (error_type, suggestion, details) = self.describe();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let now = chrono::Utc::now();
        let mut error_response = json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
                "code": status.as_u16(),
                "suggestion": suggestion,
                "timestamp": now.timestamp(),
                "request_id": format!("req_{:x}", now.timestamp_millis())
            }
        });

        if let Some(details) = details {
            error_response["error"]["details"] = details;
        }

        (status, Json(error_response)).into_response()
    }
}

/// Invalid input becomes a 400; everything else stays a core failure
impl From<CoreError> for ServerError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidInput {
                code,
                message,
                parameter_name,
                ..
            } => ServerError::InvalidRequest {
                message,
                parameter: parameter_name,
                code: Some(code),
            },
            other => ServerError::Core(other),
        }
    }
}
