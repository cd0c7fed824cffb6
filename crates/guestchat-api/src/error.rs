use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use guestchat_db::StoreError;
use guestchat_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Caller input broke a field constraint. Always recoverable by the caller.
    #[error("{field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("conflicting write: {0}")]
    Conflict(String),

    #[error("no free guest name after {attempts} attempts")]
    ResourceExhausted { attempts: u32 },

    #[error(transparent)]
    Store(StoreError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ChatError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::validation(field, "This field is required.")
    }

    pub fn malformed(rejection: JsonRejection) -> Self {
        Self::validation("body", rejection.body_text())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "validation_error"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            Self::ResourceExhausted { .. } => (StatusCode::SERVICE_UNAVAILABLE, "resource_exhausted"),
            Self::Store(_) | Self::Task(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl From<StoreError> for ChatError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { constraint } => Self::Conflict(constraint),
            other => Self::Store(other),
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Store(_) | Self::Task(_) => {
                error!("Request failed: {}", self);
                "internal server error".to_string()
            }
            other => other.to_string(),
        };
        let field = match &self {
            Self::Validation { field, .. } => Some(field.to_string()),
            _ => None,
        };

        let body = ErrorBody {
            error: code.to_string(),
            message,
            field,
        };
        (status, Json(body)).into_response()
    }
}

/// Checks a required text field: not blank and at most `max_chars` characters.
pub(crate) fn require_text(field: &'static str, value: &str, max_chars: usize) -> Result<(), ChatError> {
    if value.trim().is_empty() {
        return Err(ChatError::validation(field, "This field may not be blank."));
    }
    if value.chars().count() > max_chars {
        return Err(ChatError::validation(
            field,
            format!("Ensure this field has no more than {max_chars} characters."),
        ));
    }
    Ok(())
}
