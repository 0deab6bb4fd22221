use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the auth endpoints and the route guard.
///
/// Everything except `Internal` is an expected per-request outcome and maps to
/// a 4xx with a fixed message. `Internal` carries the full error chain for the
/// server log; the client only ever sees a generic 500.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("malformed token")]
    MalformedToken,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("token expired")]
    TokenExpired,
    #[error("user not found")]
    UserNotFound,
    #[error("missing authorization")]
    MissingAuthorization,
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Errors reported by a credential store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Database(e) => AuthError::Internal(anyhow::Error::new(e).context("credential store")),
        }
    }
}

// Undecodable request bodies answer like any other input error.
impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        AuthError::Validation(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::DuplicateEmail | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::MalformedToken
            | AuthError::InvalidSignature
            | AuthError::TokenExpired
            | AuthError::UserNotFound
            | AuthError::MissingAuthorization => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Stable per variant and free of internals.
    pub fn detail(&self) -> String {
        match self {
            AuthError::DuplicateEmail => "Email already registered".into(),
            AuthError::InvalidCredentials => "Invalid email or password".into(),
            AuthError::MalformedToken => "Malformed token".into(),
            AuthError::InvalidSignature => "Invalid token".into(),
            AuthError::TokenExpired => "Token expired".into(),
            AuthError::UserNotFound => "User not found".into(),
            AuthError::MissingAuthorization => "Missing Authorization header".into(),
            AuthError::Validation(msg) => msg.clone(),
            AuthError::Internal(_) => "Internal server error".into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if let AuthError::Internal(ref e) = self {
            error!(error = ?e, "internal error");
        }
        (status, Json(ErrorBody { detail: self.detail() })).into_response()
    }
}
