//! Principal extraction for the authorize handlers.
//!
//! Flow Overview: read the session token (bearer header or cookie), hand it to
//! the identity manager, and return the principal it resolves to. Handlers
//! that need a signed-in caller use [`require_auth`].

use axum::http::{HeaderMap, StatusCode};
use tracing::error;

use super::{session::extract_session_token, state::AuthState, INTERNAL_ERROR};
use crate::{error::AuthError, identity::Principal};

/// Signed-in caller plus the token that proved it.
#[derive(Debug)]
pub(super) struct AuthenticatedSession {
    pub token: String,
    pub principal: Principal,
}

/// Resolve the request's principal; anonymous when there is no usable session.
pub(super) async fn resolve_principal(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<Principal, (StatusCode, String)> {
    let token = extract_session_token(headers);
    auth_state
        .identity()
        .resolve_principal(token.as_deref())
        .await
        .map_err(|err| {
            error!("Failed to resolve principal: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
        })
}

/// Resolve the session or answer 401.
pub(super) async fn require_auth(
    headers: &HeaderMap,
    auth_state: &AuthState,
) -> Result<AuthenticatedSession, (StatusCode, String)> {
    let Some(token) = extract_session_token(headers) else {
        return Err(AuthError::Unauthenticated.to_response_parts());
    };
    let principal = auth_state
        .identity()
        .resolve_principal(Some(&token))
        .await
        .map_err(|err| {
            error!("Failed to resolve principal: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
        })?;
    if principal.is_authenticated() {
        Ok(AuthenticatedSession { token, principal })
    } else {
        Err(AuthError::Unauthenticated.to_response_parts())
    }
}
