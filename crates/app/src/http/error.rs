use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{debug, warn};
use serde_json::json;
use services::{DeckServiceError, FlashcardServiceError, ReviewServiceError};
use storage::repository::StorageError;
use thiserror::Error;

/// Error returned by every handler; rendered as `{"error": {"kind", "message"}}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::Validation(_) => "validation",
            ApiError::Unavailable(_) => "unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("request failed: {self}");
        } else {
            debug!("request rejected: {self}");
        }
        let body = json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

fn from_storage(err: StorageError) -> ApiError {
    match err {
        StorageError::NotFound => ApiError::NotFound(err.to_string()),
        other => ApiError::Unavailable(other.to_string()),
    }
}

impl From<ReviewServiceError> for ApiError {
    fn from(err: ReviewServiceError) -> Self {
        match err {
            ReviewServiceError::FlashcardNotFound(_) | ReviewServiceError::DeckNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            ReviewServiceError::Validation(_) => ApiError::Validation(err.to_string()),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl From<DeckServiceError> for ApiError {
    fn from(err: DeckServiceError) -> Self {
        match err {
            DeckServiceError::Deck(e) => ApiError::Validation(e.to_string()),
            DeckServiceError::NotFound(_) => ApiError::NotFound(err.to_string()),
            DeckServiceError::Storage(e) => from_storage(e),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl From<FlashcardServiceError> for ApiError {
    fn from(err: FlashcardServiceError) -> Self {
        match err {
            FlashcardServiceError::Content(e) => ApiError::Validation(e.to_string()),
            FlashcardServiceError::EmptyPatch => ApiError::Validation(err.to_string()),
            FlashcardServiceError::DeckNotFound(_) | FlashcardServiceError::NotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            FlashcardServiceError::Storage(e) => from_storage(e),
            other => ApiError::Unavailable(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}
