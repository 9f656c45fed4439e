//! HTTP transport for the authorize endpoints.
//!
//! [`HttpAuthorizeApi`] keeps a cookie store so the session cookie issued by
//! login/register is replayed on later calls, the same way a browser would.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::{sync::Arc, time::Duration};

use crate::{
    api::handlers::authorize::{LOGIN_PATH, LOGOUT_PATH, REGISTER_PATH, USER_INFO_PATH},
    error::{AuthError, Endpoint},
    types::{LoginParameters, RegisterParameters, UserInfo},
    APP_USER_AGENT,
};

/// Default request timeout applied to every call.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Transport used by the auth state provider.
#[async_trait]
pub trait AuthorizeApi: Send + Sync {
    async fn login(&self, params: &LoginParameters) -> Result<(), AuthError>;

    async fn register(&self, params: &RegisterParameters) -> Result<(), AuthError>;

    async fn logout(&self) -> Result<(), AuthError>;

    async fn user_info(&self) -> Result<UserInfo, AuthError>;
}

#[async_trait]
impl<T: AuthorizeApi + ?Sized> AuthorizeApi for Arc<T> {
    async fn login(&self, params: &LoginParameters) -> Result<(), AuthError> {
        (**self).login(params).await
    }

    async fn register(&self, params: &RegisterParameters) -> Result<(), AuthError> {
        (**self).register(params).await
    }

    async fn logout(&self) -> Result<(), AuthError> {
        (**self).logout().await
    }

    async fn user_info(&self) -> Result<UserInfo, AuthError> {
        (**self).user_info().await
    }
}

#[derive(Clone, Debug)]
pub struct HttpAuthorizeApi {
    client: Client,
    base_url: String,
}

impl HttpAuthorizeApi {
    /// Client with a cookie store, the crate user agent and a 10s timeout.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, AuthError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .cookie_store(true)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Use a caller-provided client. It needs a cookie store for sessions to
    /// survive between calls.
    #[must_use]
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        build_url_with_base(&self.base_url, path)
    }
}

#[async_trait]
impl AuthorizeApi for HttpAuthorizeApi {
    async fn login(&self, params: &LoginParameters) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .json(params)
            .send()
            .await?;
        handle_empty_response(Endpoint::Login, response).await
    }

    async fn register(&self, params: &RegisterParameters) -> Result<(), AuthError> {
        let response = self
            .client
            .post(self.url(REGISTER_PATH))
            .json(params)
            .send()
            .await?;
        handle_empty_response(Endpoint::Register, response).await
    }

    async fn logout(&self) -> Result<(), AuthError> {
        let response = self.client.post(self.url(LOGOUT_PATH)).send().await?;
        handle_empty_response(Endpoint::Logout, response).await
    }

    async fn user_info(&self) -> Result<UserInfo, AuthError> {
        let response = self.client.get(self.url(USER_INFO_PATH)).send().await?;
        if response.status().is_success() {
            Ok(response.json::<UserInfo>().await?)
        } else {
            Err(error_from_response(Endpoint::UserInfo, response).await)
        }
    }
}

async fn handle_empty_response(endpoint: Endpoint, response: Response) -> Result<(), AuthError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(error_from_response(endpoint, response).await)
    }
}

async fn error_from_response(endpoint: Endpoint, response: Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    AuthError::from_response(endpoint, status, &body)
}

/// Builds a URL from an explicit base URL and the provided path.
fn build_url_with_base(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}
