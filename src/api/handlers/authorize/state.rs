//! Auth state and configuration shared by the authorize handlers.

use std::{collections::BTreeSet, fmt, sync::Arc};
use url::Url;

use crate::{claims::Claims, identity::IdentityManager};

/// Which principal claims end up in `UserInfo.exposedClaims`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ClaimExposure {
    /// Every claim on the principal.
    #[default]
    All,
    /// Only the listed claim types.
    Only(BTreeSet<String>),
}

impl ClaimExposure {
    /// Allow-list from the given claim types; an empty list exposes everything.
    #[must_use]
    pub fn from_claim_types<I, S>(claim_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: BTreeSet<String> = claim_types.into_iter().map(Into::into).collect();
        if allowed.is_empty() {
            Self::All
        } else {
            Self::Only(allowed)
        }
    }

    #[must_use]
    pub fn apply(&self, claims: &Claims) -> Claims {
        match self {
            Self::All => claims.clone(),
            Self::Only(allowed) => claims.only(allowed),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct AuthConfig {
    frontend_base_url: Option<String>,
    claim_exposure: ClaimExposure,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_frontend_base_url(mut self, frontend_base_url: Option<String>) -> Self {
        self.frontend_base_url = frontend_base_url;
        self
    }

    #[must_use]
    pub fn with_claim_exposure(mut self, claim_exposure: ClaimExposure) -> Self {
        self.claim_exposure = claim_exposure;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> Option<&str> {
        self.frontend_base_url.as_deref()
    }

    #[must_use]
    pub fn claim_exposure(&self) -> &ClaimExposure {
        &self.claim_exposure
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url
            .as_deref()
            .and_then(|url| Url::parse(url).ok())
            .is_some_and(|url| url.scheme() == "https")
    }
}

pub struct AuthState {
    config: AuthConfig,
    identity: Arc<dyn IdentityManager>,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, identity: Arc<dyn IdentityManager>) -> Self {
        Self { config, identity }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityManager {
        self.identity.as_ref()
    }
}

impl fmt::Debug for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
