use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{repository::RepositoryError, validation::FieldErrors};

/// ErrorBody
///
/// The JSON shape of every non-validation error: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// ApiError
///
/// The single failure type for handlers, guards and middleware stages. Every variant is
/// terminal for the request and is rendered synchronously as a JSON body.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not `application/json`, or not parseable.
    #[error("request body must be application/json")]
    MalformedBody,
    /// Schema mismatch; carries every failing field.
    #[error("validation failed on {} field(s)", .0.len())]
    Validation(FieldErrors),
    /// Missing, malformed, expired or forged bearer token, or the user no longer exists.
    #[error("invalid token")]
    Unauthorized,
    /// Authenticated, but without the role the route requires.
    #[error("{0} role required")]
    Forbidden(String),
    #[error("username and/or password is incorrect")]
    InvalidCredentials,
    #[error("{0}")]
    NotFound(String),
    /// Uniqueness collision (duplicate username or email).
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("store failure: {0}")]
    Store(RepositoryError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedBody
            | ApiError::Validation(_)
            | ApiError::Conflict(_)
            | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::MalformedBody => "Request body must be application/json".to_string(),
            ApiError::Unauthorized => "Invalid token. Please Try again".to_string(),
            ApiError::Forbidden(role) => {
                format!("The {role} role is required to perform this action")
            }
            ApiError::InvalidCredentials => "Username and/or password is incorrect".to_string(),
            ApiError::NotFound(message)
            | ApiError::Conflict(message)
            | ApiError::BadRequest(message) => message.clone(),
            ApiError::RateLimited => "Rate limit exceeded".to_string(),
            // Internal details stay in the logs.
            ApiError::Validation(_) | ApiError::Store(_) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueViolation(detail) => {
                tracing::debug!(%detail, "unique constraint rejected write");
                ApiError::Conflict("Record conflicts with an existing one".to_string())
            }
            other => ApiError::Store(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::Validation(errors) => (status, Json(errors)).into_response(),
            ApiError::Store(ref err) => {
                tracing::error!(error = %err, "store operation failed");
                (status, Json(ErrorBody::new(self.message()))).into_response()
            }
            ApiError::Internal(ref detail) => {
                tracing::error!(%detail, "request failed");
                (status, Json(ErrorBody::new(self.message()))).into_response()
            }
            other => (status, Json(ErrorBody::new(other.message()))).into_response(),
        }
    }
}
