use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use std::fmt;

use super::views;
use crate::services::AuthError;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed form input; `retry` is the form to go back to.
    ValidationError { message: String, retry: &'static str },

    InvalidCredentials { retry: &'static str },

    Conflict { message: String, retry: &'static str },

    NotFound(String),

    Forbidden,

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError { message, .. } => write!(f, "Validation error: {message}"),
            Self::InvalidCredentials { .. } => write!(f, "Invalid credentials"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Forbidden => write!(f, "Forbidden"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, title, message, link) = match self {
            Self::ValidationError { message, retry } => (
                StatusCode::BAD_REQUEST,
                "Invalid input",
                message,
                (retry, "Try again"),
            ),
            Self::InvalidCredentials { retry } => (
                StatusCode::UNAUTHORIZED,
                "Invalid credentials",
                "The email or password is incorrect.".to_string(),
                (retry, "Try again"),
            ),
            Self::Conflict { message, retry } => (
                StatusCode::CONFLICT,
                "Already registered",
                message,
                (retry, "Try again"),
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "Not found", msg, ("/", "Home")),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                "403 Forbidden",
                "Admins only.".to_string(),
                ("/", "Home"),
            ),
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error",
                    "Server error. Please try again later.".to_string(),
                    ("/", "Home"),
                )
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Server error",
                    "Server error. Please try again later.".to_string(),
                    ("/", "Home"),
                )
            }
        };

        (status, Html(views::message(title, &message, link))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(format!("{err:#}"))
    }
}

impl From<tower_sessions::session::Error> for ApiError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::InternalError(format!("Session error: {err}"))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::auth(err, "/")
    }
}

impl ApiError {
    /// Maps a service error, sending user-fixable failures back to `retry`.
    pub fn auth(err: AuthError, retry: &'static str) -> Self {
        match err {
            AuthError::Validation(message) => Self::ValidationError { message, retry },
            AuthError::InvalidCredentials => Self::InvalidCredentials { retry },
            AuthError::Conflict(message) => Self::Conflict { message, retry },
            AuthError::NotFound(msg) => Self::NotFound(msg),
            AuthError::Forbidden => Self::Forbidden,
            AuthError::Store(msg) => Self::DatabaseError(msg),
        }
    }
}
