use axum::{http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub enum HandlerErrorKind {
    NotFound,
    Validation,
    Internal,
    Unauthorized,
    Forbidden,
    Conflict,
    BadRequest,
}

impl std::fmt::Display for HandlerErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HandlerErrorKind::NotFound => "NotFound",
            HandlerErrorKind::Validation => "Validation",
            HandlerErrorKind::Internal => "Internal",
            HandlerErrorKind::Unauthorized => "Unauthorized",
            HandlerErrorKind::Forbidden => "Forbidden",
            HandlerErrorKind::Conflict => "Conflict",
            HandlerErrorKind::BadRequest => "BadRequest",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Serialize)]
pub struct HandlerError {
    pub error: HandlerErrorKind,
    pub message: String,
    pub details: Option<String>,
}

impl HandlerError {
    pub fn bad_request<T: Into<String>>(message: T) -> Self {
        HandlerError {
            error: HandlerErrorKind::BadRequest,
            message: message.into(),
            details: None,
        }
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for HandlerError {}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let status = match self.error {
            HandlerErrorKind::NotFound => StatusCode::NOT_FOUND,
            HandlerErrorKind::Validation | HandlerErrorKind::BadRequest => StatusCode::BAD_REQUEST,
            HandlerErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            HandlerErrorKind::Forbidden => StatusCode::FORBIDDEN,
            HandlerErrorKind::Conflict => StatusCode::CONFLICT,
            HandlerErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = axum::Json(self);
        (status, body).into_response()
    }
}

/// Failure taxonomy of the lifecycle coordinator and views. Every variant
/// carries a human-readable message surfaced to the initiating actor;
/// nothing is retried automatically.
#[derive(Debug, Clone)]
pub enum ServiceError {
    /// Malformed input: empty reason, non-positive bill amount, bad card
    /// or UPI fields.
    Validation(String),
    /// Transition attempted from a disallowed current status.
    InvalidState(String),
    /// Lost a concurrent claim race; the request already has a technician.
    ClaimConflict(String),
    /// Entity absent or not owned by the caller.
    NotFound(String),
    /// The actor's role does not permit the requested action.
    Forbidden(String),
    /// The store failed; provider message passed through verbatim.
    Upstream(String),
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Validation(msg) => write!(f, "Validation Error: {}", msg),
            ServiceError::InvalidState(msg) => write!(f, "Invalid State: {}", msg),
            ServiceError::ClaimConflict(msg) => write!(f, "Claim Conflict: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServiceError::Upstream(msg) => write!(f, "Upstream Failure: {}", msg),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<crate::repository::repository_error::RepositoryError> for ServiceError {
    fn from(err: crate::repository::repository_error::RepositoryError) -> Self {
        use crate::repository::repository_error::RepositoryError;
        match err {
            RepositoryError::NotFound(msg) => ServiceError::NotFound(msg),
            RepositoryError::ValidationError(msg) => ServiceError::Validation(msg),
            RepositoryError::InvalidState(msg) => ServiceError::InvalidState(msg),
            RepositoryError::AlreadyExists(msg) => ServiceError::InvalidState(msg),
            RepositoryError::DatabaseError(msg) => ServiceError::Upstream(msg),
            RepositoryError::ConnectionError(msg) => ServiceError::Upstream(msg),
            RepositoryError::SerializationError(msg) => ServiceError::Upstream(msg),
            RepositoryError::Generic(e) => ServiceError::Upstream(e.to_string()),
        }
    }
}

impl From<ServiceError> for HandlerError {
    fn from(err: ServiceError) -> Self {
        let (kind, message) = match &err {
            ServiceError::Validation(msg) => (HandlerErrorKind::Validation, msg.clone()),
            ServiceError::InvalidState(msg) => (HandlerErrorKind::Conflict, msg.clone()),
            ServiceError::ClaimConflict(msg) => (HandlerErrorKind::Conflict, msg.clone()),
            ServiceError::NotFound(msg) => (HandlerErrorKind::NotFound, msg.clone()),
            ServiceError::Forbidden(msg) => (HandlerErrorKind::Forbidden, msg.clone()),
            ServiceError::Upstream(msg) => (HandlerErrorKind::Internal, msg.clone()),
        };
        HandlerError {
            error: kind,
            message,
            details: None,
        }
    }
}
