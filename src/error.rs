use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Where the client is sent when no session is active.
pub const AUTH_ENTRY_POINT: &str = "/auth";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Failed to load {0}")]
    RemoteRead(String),

    #[error("Failed to save {0}")]
    RemoteWrite(String),

    #[error("Timed out while {0}")]
    Timeout(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,

    #[error("Bad request: {0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut redirect = None;
        let (status, message) = match self {
            AppError::AuthRequired => {
                redirect = Some(AUTH_ENTRY_POINT);
                (StatusCode::UNAUTHORIZED, "Please sign in to continue".to_string())
            }
            AppError::RemoteRead(what) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to load {}", what),
            ),
            AppError::RemoteWrite(what) => (
                StatusCode::BAD_GATEWAY,
                format!("Failed to save {}", what),
            ),
            AppError::Timeout(what) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("Timed out while {}", what),
            ),
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                )
            }
            AppError::Config(msg) => {
                error!("configuration error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message,
            redirect,
        });

        (status, body).into_response()
    }
}
