use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::media::MediaError;
use crate::storage::StorageError;
use crate::views::ViewError;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct ValidationErrorResponse {
    pub errors: Vec<String>,
}

/// Every failure an API handler can return
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request validation failed")]
    Validation(Vec<String>),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("image exceeds the {0} byte limit")]
    PayloadTooLarge(usize),
    #[error("image uploads are not configured")]
    UploadsDisabled,
    #[error("image upload failed")]
    Upload(#[source] anyhow::Error),
    #[error("too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::UploadsDisabled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upload(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        match self {
            ApiError::Validation(errors) => {
                (status, Json(ValidationErrorResponse { errors })).into_response()
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                error_body(status, "Internal server error".to_string())
            }
            ApiError::Upload(e) => {
                tracing::error!("Image upload failed: {e:#}");
                error_body(status, "Image upload failed".to_string())
            }
            ApiError::RateLimited { retry_after_secs } => {
                let mut response = error_body(status, self.to_string());
                response.headers_mut().insert(
                    axum::http::header::RETRY_AFTER,
                    axum::http::HeaderValue::from(retry_after_secs),
                );
                response
            }
            other => error_body(status, other.to_string()),
        }
    }
}

fn error_body(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Conflict => ApiError::Conflict("Record already exists".to_string()),
            StorageError::InvalidKey(field) => {
                ApiError::BadRequest(format!("{field} must not be empty"))
            }
            StorageError::Other(e) => ApiError::Internal(e),
        }
    }
}

impl From<ViewError> for ApiError {
    fn from(err: ViewError) -> Self {
        match err {
            ViewError::InvalidHandle => ApiError::BadRequest(err.to_string()),
            ViewError::NotFound => ApiError::NotFound("User does not exist".to_string()),
            ViewError::Unavailable(e) => ApiError::Internal(e),
        }
    }
}

impl From<MediaError> for ApiError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::NotConfigured => ApiError::UploadsDisabled,
            MediaError::Upload(e) => ApiError::Upload(e),
        }
    }
}
