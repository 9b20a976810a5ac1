use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hm_core::HazardError;
use hm_core::error::{EventError, MediaError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub code: &'static str,
    pub message: String,
    pub correlation_id: Option<String>,
}

pub fn map_error(
    err: &HazardError,
    correlation_id: Option<String>,
) -> (StatusCode, Json<ErrorEnvelope>) {
    let (status, code, message) = match err {
        HazardError::Event(event) => map_event_error(event),
        HazardError::Media(media) => map_media_error(media),
        HazardError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            message.clone(),
        ),
    };
    if status.is_server_error() {
        tracing::error!(
            correlation_id = correlation_id.as_deref().unwrap_or("-"),
            code,
            error = %message,
            "request failed"
        );
    }

    (
        status,
        Json(ErrorEnvelope {
            code,
            message,
            correlation_id,
        }),
    )
}

pub fn error_response(err: &HazardError, correlation_id: Option<String>) -> Response {
    map_error(err, correlation_id).into_response()
}

fn map_event_error(err: &EventError) -> (StatusCode, &'static str, String) {
    match err {
        EventError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        EventError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
        EventError::Storage { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            err.to_string(),
        ),
    }
}

fn map_media_error(err: &MediaError) -> (StatusCode, &'static str, String) {
    match err {
        MediaError::NotFound => (StatusCode::NOT_FOUND, "not_found", err.to_string()),
        MediaError::InvalidInput { .. } => {
            (StatusCode::BAD_REQUEST, "invalid_input", err.to_string())
        }
        MediaError::Storage { .. } | MediaError::ReleaseFailed { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "storage_error",
            err.to_string(),
        ),
    }
}
