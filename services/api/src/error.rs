//! Custom error types for the API service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{response::ApiResponse, validation::FieldError};

/// Custom error type for the API service
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or invalid credentials
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated but not allowed to act on the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request with message
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// One or more input fields were rejected
    #[error("Validation failed: {}", join_messages(.0))]
    Validation(Vec<FieldError>),

    /// Internal server error
    #[error("Internal server error")]
    InternalServerError,

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ApiError {
    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(DatabaseError::Conflict(_)) => StatusCode::BAD_REQUEST,
            ApiError::InternalServerError | ApiError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<Vec<FieldError>> for ApiError {
    fn from(errors: Vec<FieldError>) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<FieldError> for ApiError {
    fn from(error: FieldError) -> Self {
        ApiError::Validation(vec![error])
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Unauthorized => {
                warn!("Rejected unauthenticated request");
                ApiResponse::failure(
                    "Authentication credentials were not provided or are invalid.",
                    None,
                )
            }
            ApiError::Forbidden(msg) => {
                info!("Forbidden: {}", msg);
                ApiResponse::failure(msg, None)
            }
            ApiError::NotFound(msg) => ApiResponse::failure(msg, None),
            ApiError::BadRequest(msg) => {
                warn!("Bad request: {}", msg);
                ApiResponse::failure(msg, None)
            }
            ApiError::Validation(errors) => {
                let message = join_messages(&errors);
                warn!("Validation failed: {}", message);
                ApiResponse::failure(message, Some(errors))
            }
            ApiError::Database(DatabaseError::Conflict(constraint)) => {
                warn!("Unique constraint violated: {}", constraint);
                ApiResponse::failure(conflict_message(&constraint), None)
            }
            ApiError::Database(err) => {
                error!("Database error: {}", err);
                ApiResponse::failure("Internal server error", None)
            }
            ApiError::InternalServerError => ApiResponse::failure("Internal server error", None),
        };

        (status, body).into_response()
    }
}

/// Client-facing message for a violated unique constraint
fn conflict_message(constraint: &str) -> &'static str {
    match constraint {
        "daret_memberships_group_participant_key" => {
            "Your request is pending confirmation from the owner."
        }
        "transfer_confirmations_triple_key" => "You already sent money.",
        "users_cnie_key" => "A user with this cnie already exists.",
        "users_bank_account_key" => "A user with this bank account already exists.",
        _ => "A record with the same information already exists.",
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
