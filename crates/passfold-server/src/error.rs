//! HTTP error types for the Passfold server.
//!
//! Maps domain errors from `passfold-core` into appropriate HTTP responses.
//! Every error variant produces a JSON body with a machine-readable `error`
//! field and a human-readable `message`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use passfold_core::error::{AccountError, CredentialError, FolderError, OrganizerError};

/// Application-level error returned from HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Authentication failed.
    Unauthorized(String),
    /// Requested resource not found.
    NotFound(String),
    /// Client sent invalid input.
    BadRequest(String),
    /// The request conflicts with current state (e.g. a cycle-creating move).
    Conflict(String),
    /// Internal server error.
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl AppError {
    /// The status code this error maps to.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error_type, message) = match self {
            Self::Unauthorized(msg) => ("unauthorized", msg),
            Self::NotFound(msg) => ("not_found", msg),
            Self::BadRequest(msg) => ("bad_request", msg),
            Self::Conflict(msg) => ("conflict", msg),
            Self::Internal(msg) => ("internal_error", msg),
        };

        let body = ErrorBody {
            error: error_type,
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<FolderError> for AppError {
    fn from(err: FolderError) -> Self {
        match err {
            FolderError::NotFound { .. } => Self::NotFound(err.to_string()),
            FolderError::InvalidParent { .. } | FolderError::Validation { .. } => {
                Self::BadRequest(err.to_string())
            }
            FolderError::CycleDetected { .. } => Self::Conflict(err.to_string()),
            FolderError::Serialization { .. } | FolderError::Storage(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::NotFound { .. } => Self::NotFound(err.to_string()),
            CredentialError::Validation { .. } => Self::BadRequest(err.to_string()),
            CredentialError::Serialization { .. } | CredentialError::Storage(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<OrganizerError> for AppError {
    fn from(err: OrganizerError) -> Self {
        match err {
            OrganizerError::Folder(inner) => inner.into(),
            OrganizerError::Credential(inner) => inner.into(),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InvalidCredentials => Self::Unauthorized(err.to_string()),
            AccountError::NotFound { .. } => Self::NotFound(err.to_string()),
            // The historical surface reports a taken username as a plain
            // client error, not a 409.
            AccountError::DuplicateUsername { .. }
            | AccountError::ProtectedAccount { .. }
            | AccountError::Validation { .. } => Self::BadRequest(err.to_string()),
            AccountError::Serialization { .. } | AccountError::Storage(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}
