//! Authentication failures as seen on both sides of the wire.
//!
//! The server turns an [`AuthError`] into a status code plus a plain-text
//! reason; the client rebuilds the same variant from that pair.

use axum::http::StatusCode;
use thiserror::Error;

pub const USER_NOT_FOUND: &str = "User does not exist";
pub const INVALID_PASSWORD: &str = "Invalid password";
pub const UNAUTHENTICATED: &str = "Unauthenticated";

/// Maximum number of error body characters kept from a server response.
const MAX_ERROR_CHARS: usize = 200;

/// Endpoint a response came from; decides how a `400` is read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    Login,
    Register,
    Logout,
    UserInfo,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User does not exist")]
    UserNotFound,
    #[error("Invalid password")]
    InvalidPassword,
    #[error("{0}")]
    RegistrationValidationFailed(String),
    #[error("Unauthenticated")]
    Unauthenticated,
    #[error("Unable to reach the server: {0}")]
    NetworkFailure(#[from] reqwest::Error),
    #[error("Request failed ({status}): {message}")]
    Unexpected { status: u16, message: String },
}

impl AuthError {
    /// Status code and reason body the server answers with.
    #[must_use]
    pub fn to_response_parts(&self) -> (StatusCode, String) {
        match self {
            Self::UserNotFound | Self::InvalidPassword | Self::RegistrationValidationFailed(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            Self::NetworkFailure(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            Self::Unexpected { status, message } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message.clone(),
            ),
        }
    }

    /// Rebuild the error from a non-success response.
    #[must_use]
    pub fn from_response(endpoint: Endpoint, status: u16, body: &str) -> Self {
        let message = sanitize_body(body);
        if status == StatusCode::UNAUTHORIZED.as_u16() {
            return Self::Unauthenticated;
        }
        if status != StatusCode::BAD_REQUEST.as_u16() {
            return Self::Unexpected { status, message };
        }
        match (endpoint, message.as_str()) {
            (Endpoint::Login | Endpoint::Register, USER_NOT_FOUND) => Self::UserNotFound,
            (Endpoint::Login | Endpoint::Register, INVALID_PASSWORD) => Self::InvalidPassword,
            (Endpoint::Register, _) => Self::RegistrationValidationFailed(message),
            _ => Self::Unexpected { status, message },
        }
    }
}

/// Trim and truncate a response body before it reaches UI code.
fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "Request failed.".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
