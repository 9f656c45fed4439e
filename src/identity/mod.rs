//! Identity manager seam.
//!
//! Everything that touches credentials or sessions goes through
//! [`IdentityManager`]: looking accounts up, checking passwords, creating
//! accounts, and issuing or revoking sessions. The HTTP handlers only translate
//! its answers into responses.
//!
//! Flow Overview: login looks the account up, checks the password and signs in,
//! which yields a [`SessionTicket`] whose token becomes the session cookie.
//! Later requests present the token; [`IdentityManager::resolve_principal`]
//! turns it into a [`Principal`] carrying the claims issued at sign-in.

mod memory;
mod utils;
mod validation;

pub use memory::MemoryIdentityManager;
pub use validation::{PasswordPolicy, ValidationFailure};

use crate::claims::{ClaimError, Claims};
use async_trait::async_trait;
use secrecy::SecretString;
use std::{fmt, time::Duration};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AccountId(Uuid);

impl AccountId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Account as exposed by the identity manager. Credentials stay inside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: AccountId,
    pub user_name: String,
    pub claims: Claims,
}

/// Identity attached to one request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Principal {
    account_id: Option<AccountId>,
    claims: Claims,
}

impl Principal {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn authenticated(account_id: AccountId, claims: Claims) -> Self {
        Self {
            account_id: Some(account_id),
            claims,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.account_id.is_some()
    }

    #[must_use]
    pub const fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }
}

/// Result of a successful sign-in.
///
/// `token` is the raw value for the session cookie; only its hash is kept by
/// the manager. `persistent` tells the cookie layer whether to set `Max-Age`.
#[derive(Clone, Debug)]
pub struct SessionTicket {
    pub token: String,
    pub persistent: bool,
    pub ttl: Duration,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Account creation was refused; failures are in rule order.
    #[error("account validation failed: {}", describe(.0))]
    Validation(Vec<ValidationFailure>),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error("failed to generate session token: {0}")]
    Token(String),
    #[error("unknown account: {0}")]
    UnknownAccount(String),
    #[error(transparent)]
    Claim(#[from] ClaimError),
    #[error("identity store error: {0}")]
    Store(String),
}

impl IdentityError {
    /// Description of the first validation failure, if this is one.
    #[must_use]
    pub fn first_validation_reason(&self) -> Option<&str> {
        match self {
            Self::Validation(failures) => failures.first().map(|f| f.description.as_str()),
            _ => None,
        }
    }
}

fn describe(failures: &[ValidationFailure]) -> String {
    failures
        .iter()
        .map(|failure| failure.description.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
pub trait IdentityManager: Send + Sync {
    /// Look an account up by user name (case-insensitive).
    async fn find_by_username(&self, user_name: &str) -> Result<Option<Account>, IdentityError>;

    /// Check a password against the account's stored credential.
    async fn check_password(
        &self,
        account: &Account,
        password: &SecretString,
    ) -> Result<bool, IdentityError>;

    /// Create an account. Nothing is stored when validation fails.
    async fn create_account(
        &self,
        user_name: &str,
        password: &SecretString,
    ) -> Result<Account, IdentityError>;

    /// Issue a session for the account.
    async fn sign_in(
        &self,
        account: &Account,
        remember_me: bool,
    ) -> Result<SessionTicket, IdentityError>;

    /// Revoke the session behind `session_token`. Unknown tokens are ignored.
    async fn sign_out(&self, session_token: &str) -> Result<(), IdentityError>;

    /// Resolve a presented session token; missing, unknown or expired tokens
    /// yield an anonymous principal.
    async fn resolve_principal(
        &self,
        session_token: Option<&str>,
    ) -> Result<Principal, IdentityError>;

    /// Account behind an authenticated principal, if it still exists.
    async fn resolve_account(
        &self,
        principal: &Principal,
    ) -> Result<Option<Account>, IdentityError>;
}
