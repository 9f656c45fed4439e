//! Authorize endpoints: login, register, logout and the current user info.
//!
//! Each call either fully succeeds or fully fails. A refused registration never
//! signs anyone in and a refused login never issues a session.

mod principal;
mod session;
mod state;


pub use session::SESSION_COOKIE_NAME;
pub use state::{AuthConfig, AuthState, ClaimExposure};

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::{
    error::AuthError,
    identity::IdentityError,
    types::{LoginParameters, RegisterParameters, UserInfo},
};

pub const LOGIN_PATH: &str = "/api/authorize/login";
pub const REGISTER_PATH: &str = "/api/authorize/register";
pub const LOGOUT_PATH: &str = "/api/authorize/logout";
pub const USER_INFO_PATH: &str = "/api/authorize/userInfo";

const MISSING_PAYLOAD: &str = "Missing payload";
const INTERNAL_ERROR: &str = "Internal server error";

/// Routes served under `/api/authorize`.
pub fn routes() -> Router {
    Router::new()
        .route(LOGIN_PATH, post(login))
        .route(REGISTER_PATH, post(register))
        .route(LOGOUT_PATH, post(logout))
        .route(USER_INFO_PATH, get(user_info))
}

fn internal_error(context: &str, err: &IdentityError) -> Response {
    error!("{context}: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string()).into_response()
}

#[utoipa::path(
    post,
    path = "/api/authorize/login",
    request_body = LoginParameters,
    responses(
        (status = 200, description = "Signed in, session cookie set"),
        (status = 400, description = "Unknown user or wrong password", body = String),
    ),
    tag = "authorize"
)]
#[instrument(skip(auth_state, payload))]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginParameters>>,
) -> impl IntoResponse {
    let Some(Json(params)) = payload else {
        return (StatusCode::BAD_REQUEST, MISSING_PAYLOAD.to_string()).into_response();
    };

    sign_in_with_password(&auth_state, &params).await
}

#[utoipa::path(
    post,
    path = "/api/authorize/register",
    request_body = RegisterParameters,
    responses(
        (status = 200, description = "Account created and signed in, session cookie set"),
        (status = 400, description = "First validation failure", body = String),
    ),
    tag = "authorize"
)]
#[instrument(skip(auth_state, payload))]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterParameters>>,
) -> impl IntoResponse {
    let Some(Json(params)) = payload else {
        return (StatusCode::BAD_REQUEST, MISSING_PAYLOAD.to_string()).into_response();
    };

    match auth_state
        .identity()
        .create_account(&params.user_name, &params.password)
        .await
    {
        Ok(account) => debug!(account_id = %account.id, "account registered"),
        Err(err) => {
            return match err.first_validation_reason() {
                Some(reason) => AuthError::RegistrationValidationFailed(reason.to_string())
                    .to_response_parts()
                    .into_response(),
                None => internal_error("Failed to create account", &err),
            };
        }
    }

    let params = LoginParameters::from(params);
    sign_in_with_password(&auth_state, &params).await
}

#[utoipa::path(
    post,
    path = "/api/authorize/logout",
    responses(
        (status = 200, description = "Session revoked, cookie cleared"),
        (status = 401, description = "No authenticated session", body = String),
    ),
    tag = "authorize"
)]
#[instrument(skip(headers, auth_state))]
pub async fn logout(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    let session = match principal::require_auth(&headers, &auth_state).await {
        Ok(session) => session,
        Err(rejection) => return rejection.into_response(),
    };

    if let Err(err) = auth_state.identity().sign_out(&session.token).await {
        return internal_error("Failed to revoke session", &err);
    }

    if let Some(account_id) = session.principal.account_id() {
        info!(%account_id, "signed out");
    }

    let mut response_headers = HeaderMap::new();
    match session::clear_session_cookie(auth_state.config()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clear-session cookie: {err}"),
    }
    (StatusCode::OK, response_headers).into_response()
}

#[utoipa::path(
    get,
    path = "/api/authorize/userInfo",
    responses(
        (status = 200, description = "Current user, anonymous when there is no session", body = UserInfo),
    ),
    tag = "authorize"
)]
#[instrument(skip(headers, auth_state))]
pub async fn user_info(
    headers: HeaderMap,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match principal::resolve_principal(&headers, &auth_state).await {
        Ok(principal) => principal,
        Err(rejection) => return rejection.into_response(),
    };

    let account = match auth_state.identity().resolve_account(&principal).await {
        Ok(account) => account,
        Err(err) => return internal_error("Failed to resolve account", &err),
    };

    let info = match account {
        Some(account) => UserInfo {
            is_authenticated: principal.is_authenticated(),
            name: account.user_name.clone(),
            user_name: account.user_name,
            exposed_claims: auth_state
                .config()
                .claim_exposure()
                .apply(principal.claims()),
        },
        None => UserInfo::anonymous(),
    };

    (StatusCode::OK, Json(info)).into_response()
}

/// Shared by login and register: look the account up, check the password and
/// issue the session cookie.
async fn sign_in_with_password(auth_state: &AuthState, params: &LoginParameters) -> Response {
    let identity = auth_state.identity();

    let account = match identity.find_by_username(&params.user_name).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            debug!("login refused: unknown user");
            return AuthError::UserNotFound.to_response_parts().into_response();
        }
        Err(err) => return internal_error("Failed to look up account", &err),
    };

    match identity.check_password(&account, &params.password).await {
        Ok(true) => {}
        Ok(false) => {
            debug!(account_id = %account.id, "login refused: invalid password");
            return AuthError::InvalidPassword.to_response_parts().into_response();
        }
        Err(err) => return internal_error("Failed to verify password", &err),
    }

    let ticket = match identity.sign_in(&account, params.remember_me).await {
        Ok(ticket) => ticket,
        Err(err) => return internal_error("Failed to sign in", &err),
    };

    let cookie = match session::session_cookie(auth_state.config(), &ticket) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            // The caller never learns the token, so do not leave it valid.
            if let Err(err) = identity.sign_out(&ticket.token).await {
                error!("Failed to revoke orphaned session: {err}");
            }
            return (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
                .into_response();
        }
    };

    info!(account_id = %account.id, remember_me = params.remember_me, "signed in");

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);
    (StatusCode::OK, headers).into_response()
}
