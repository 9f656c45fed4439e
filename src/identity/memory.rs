//! In-process identity manager.
//!
//! Accounts and sessions live in memory and disappear with the process. Passwords
//! are stored as argon2 PHC strings; sessions are keyed by the SHA-256 of the
//! token handed to the browser.

use super::{
    utils::{generate_salt, generate_session_token, hash_session_token},
    validation::{duplicate_user_name, normalize_user_name, user_name_failure, PasswordPolicy},
    Account, AccountId, IdentityError, IdentityManager, Principal, SessionTicket,
};
use crate::claims::{self, Claims};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};

const DEFAULT_SESSION_TTL_SECONDS: u64 = 12 * 60 * 60;
const DEFAULT_REMEMBER_ME_TTL_SECONDS: u64 = 14 * 24 * 60 * 60;

struct StoredAccount {
    account: Account,
    password_hash: String,
}

#[derive(Default)]
struct AccountStore {
    by_name: HashMap<String, AccountId>,
    accounts: HashMap<AccountId, StoredAccount>,
}

impl AccountStore {
    fn find(&self, user_name: &str) -> Option<&StoredAccount> {
        let id = self.by_name.get(&normalize_user_name(user_name))?;
        self.accounts.get(id)
    }
}

struct SessionRecord {
    account_id: AccountId,
    claims: Claims,
    expires_at: Instant,
}

pub struct MemoryIdentityManager {
    password_policy: PasswordPolicy,
    session_ttl: Duration,
    remember_me_ttl: Duration,
    accounts: RwLock<AccountStore>,
    sessions: RwLock<HashMap<Vec<u8>, SessionRecord>>,
}

impl Default for MemoryIdentityManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryIdentityManager {
    #[must_use]
    pub fn new() -> Self {
        Self {
            password_policy: PasswordPolicy::default(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            remember_me_ttl: Duration::from_secs(DEFAULT_REMEMBER_ME_TTL_SECONDS),
            accounts: RwLock::new(AccountStore::default()),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_remember_me_ttl(mut self, ttl: Duration) -> Self {
        self.remember_me_ttl = ttl;
        self
    }

    /// Attach a claim to an existing account. It shows up on the next sign-in.
    ///
    /// # Errors
    /// Returns an error if the account does not exist or the claim is invalid.
    pub async fn add_claim(
        &self,
        user_name: &str,
        claim_type: &str,
        value: &str,
    ) -> Result<(), IdentityError> {
        let mut store = self.accounts.write().await;
        let id = store
            .by_name
            .get(&normalize_user_name(user_name))
            .copied()
            .ok_or_else(|| IdentityError::UnknownAccount(user_name.to_string()))?;
        let stored = store
            .accounts
            .get_mut(&id)
            .ok_or_else(|| IdentityError::UnknownAccount(user_name.to_string()))?;
        stored.account.claims.insert(claim_type, value)?;
        Ok(())
    }

    /// Number of sessions that have not expired yet.
    pub async fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .read()
            .await
            .values()
            .filter(|record| record.expires_at > now)
            .count()
    }

    fn principal_claims(account: &Account) -> Result<Claims, IdentityError> {
        let mut claims = account.claims.clone();
        claims.insert(claims::SUBJECT, account.id.to_string())?;
        claims.insert(claims::NAME, account.user_name.clone())?;
        Ok(claims)
    }
}

#[async_trait]
impl IdentityManager for MemoryIdentityManager {
    async fn find_by_username(&self, user_name: &str) -> Result<Option<Account>, IdentityError> {
        let store = self.accounts.read().await;
        Ok(store.find(user_name).map(|stored| stored.account.clone()))
    }

    #[instrument(skip(self, account, password), fields(account_id = %account.id))]
    async fn check_password(
        &self,
        account: &Account,
        password: &SecretString,
    ) -> Result<bool, IdentityError> {
        let password_hash = {
            let store = self.accounts.read().await;
            match store.accounts.get(&account.id) {
                Some(stored) => stored.password_hash.clone(),
                None => return Ok(false),
            }
        };
        let password = SecretString::from(password.expose_secret().to_owned());

        tokio::task::spawn_blocking(move || -> Result<bool, IdentityError> {
            let parsed = PasswordHash::new(&password_hash)
                .map_err(|err| IdentityError::PasswordHash(err.to_string()))?;
            Ok(Argon2::default()
                .verify_password(password.expose_secret().as_bytes(), &parsed)
                .is_ok())
        })
        .await
        .map_err(|err| IdentityError::Store(err.to_string()))?
    }

    #[instrument(skip(self, password))]
    async fn create_account(
        &self,
        user_name: &str,
        password: &SecretString,
    ) -> Result<Account, IdentityError> {
        let mut failures = Vec::new();
        if let Some(failure) = user_name_failure(user_name) {
            failures.push(failure);
        } else if self.find_by_username(user_name).await?.is_some() {
            failures.push(duplicate_user_name(user_name));
        }
        failures.extend(self.password_policy.validate(password.expose_secret()));
        if !failures.is_empty() {
            debug!("account validation failed with {} issue(s)", failures.len());
            return Err(IdentityError::Validation(failures));
        }

        let salt = generate_salt()?;
        let password = SecretString::from(password.expose_secret().to_owned());
        let password_hash = tokio::task::spawn_blocking(move || -> Result<String, IdentityError> {
            let salt = SaltString::encode_b64(&salt)
                .map_err(|err| IdentityError::PasswordHash(err.to_string()))?;
            Argon2::default()
                .hash_password(password.expose_secret().as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| IdentityError::PasswordHash(err.to_string()))
        })
        .await
        .map_err(|err| IdentityError::Store(err.to_string()))??;

        let account = Account {
            id: AccountId::new(),
            user_name: user_name.to_string(),
            claims: Claims::new(),
        };

        let mut store = self.accounts.write().await;
        let key = normalize_user_name(user_name);
        // Another request may have taken the name while the hash was computed.
        if store.by_name.contains_key(&key) {
            return Err(IdentityError::Validation(vec![duplicate_user_name(
                user_name,
            )]));
        }
        store.by_name.insert(key, account.id);
        store.accounts.insert(
            account.id,
            StoredAccount {
                account: account.clone(),
                password_hash,
            },
        );

        info!(account_id = %account.id, "account created");

        Ok(account)
    }

    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn sign_in(
        &self,
        account: &Account,
        remember_me: bool,
    ) -> Result<SessionTicket, IdentityError> {
        let claims = Self::principal_claims(account)?;
        let token = generate_session_token()?;
        let ttl = if remember_me {
            self.remember_me_ttl
        } else {
            self.session_ttl
        };
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .ok_or_else(|| IdentityError::Store(format!("session lifetime {ttl:?} out of range")))?;

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, record| record.expires_at > now);
        sessions.insert(
            hash_session_token(&token),
            SessionRecord {
                account_id: account.id,
                claims,
                expires_at,
            },
        );

        debug!(remember_me, "session issued");

        Ok(SessionTicket {
            token,
            persistent: remember_me,
            ttl,
        })
    }

    async fn sign_out(&self, session_token: &str) -> Result<(), IdentityError> {
        let removed = self
            .sessions
            .write()
            .await
            .remove(&hash_session_token(session_token));
        if let Some(record) = removed {
            debug!(account_id = %record.account_id, "session revoked");
        }
        Ok(())
    }

    async fn resolve_principal(
        &self,
        session_token: Option<&str>,
    ) -> Result<Principal, IdentityError> {
        let Some(token) = session_token else {
            return Ok(Principal::anonymous());
        };
        let sessions = self.sessions.read().await;
        match sessions.get(&hash_session_token(token)) {
            Some(record) if record.expires_at > Instant::now() => Ok(Principal::authenticated(
                record.account_id,
                record.claims.clone(),
            )),
            _ => Ok(Principal::anonymous()),
        }
    }

    async fn resolve_account(
        &self,
        principal: &Principal,
    ) -> Result<Option<Account>, IdentityError> {
        let Some(id) = principal.account_id() else {
            return Ok(None);
        };
        let store = self.accounts.read().await;
        Ok(store.accounts.get(&id).map(|stored| stored.account.clone()))
    }
}
