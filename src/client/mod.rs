//! Client-side auth state adapter.
//!
//! Flow Overview: UI code asks [`AuthStateProvider::authentication_state`] who
//! is logged in. An authenticated answer is cached in the injected
//! [`StateStore`] and trusted until logout; an empty or anonymous cache goes
//! back to the server. Login, register and logout pass through to the server,
//! invalidate the cache and tell subscribers to re-query.

mod api;
mod state;

pub use api::{AuthorizeApi, HttpAuthorizeApi};
pub use state::{
    AuthenticationState, ClientIdentity, ClientPrincipal, StateStore, AUTHENTICATION_TYPE,
};

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, PoisonError,
};
use tracing::{debug, warn};

use crate::{
    error::AuthError,
    types::{LoginParameters, RegisterParameters, UserInfo},
};

/// Handle returned by [`AuthStateProvider::on_auth_state_changed`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn() + Send + Sync>;

pub struct AuthStateProvider<A> {
    api: A,
    store: Arc<StateStore>,
    subscribers: Mutex<Vec<(SubscriptionId, Callback)>>,
    next_subscription: AtomicU64,
}

impl<A: AuthorizeApi> AuthStateProvider<A> {
    #[must_use]
    pub fn new(api: A, store: Arc<StateStore>) -> Self {
        Self {
            api,
            store,
            subscribers: Mutex::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Sign in. On success the cache is dropped so the next query sees the new
    /// identity; a refused login leaves the cache alone.
    ///
    /// # Errors
    /// `UserNotFound` or `InvalidPassword` when the server refuses, or any
    /// transport failure.
    pub async fn login(&self, params: &LoginParameters) -> Result<(), AuthError> {
        self.api.login(params).await?;
        self.store.clear().await;
        self.notify();
        Ok(())
    }

    /// Create an account and sign in with it.
    ///
    /// # Errors
    /// `RegistrationValidationFailed` with the server's reason, or any
    /// transport failure.
    pub async fn register(&self, params: &RegisterParameters) -> Result<(), AuthError> {
        self.api.register(params).await?;
        self.store.clear().await;
        self.notify();
        Ok(())
    }

    /// Sign out. The local cache is cleared and subscribers notified even when
    /// the server call fails.
    ///
    /// # Errors
    /// Returns the server call's error, if any.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let result = self.api.logout().await;
        self.store.clear().await;
        self.notify();
        result
    }

    /// Current authentication state. Never fails: fetch errors are logged and
    /// reported as anonymous.
    pub async fn authentication_state(&self) -> AuthenticationState {
        if let Some(cached) = self.store.get().await.filter(|info| info.is_authenticated) {
            return AuthenticationState::from_user_info(&cached);
        }

        let generation = self.store.generation().await;
        let user_info = match self.api.user_info().await {
            Ok(user_info) => user_info,
            Err(err) => {
                warn!("Failed to fetch user info: {err}");
                UserInfo::anonymous()
            }
        };

        // a logout or login while the request was in flight wins
        if !self.store.set_if_current(generation, user_info.clone()).await {
            debug!("auth state changed during fetch; not caching user info");
        }
        AuthenticationState::from_user_info(&user_info)
    }

    /// Register a callback run whenever the authentication state may have
    /// changed. Callbacks should re-query rather than assume the new state.
    pub fn on_auth_state_changed<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(callback)));
        id
    }

    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|(subscription, _)| *subscription != id);
        subscribers.len() != before
    }

    pub fn notify(&self) {
        // Callbacks run outside the lock so they may (un)subscribe.
        let callbacks: Vec<Callback> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        debug!("notifying {} subscriber(s)", callbacks.len());
        for callback in callbacks {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use secrecy::ExposeSecret;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// In-memory server double that counts `user_info` calls.
    #[derive(Default)]
    struct FakeApi {
        signed_in: Mutex<Option<String>>,
        user_info_calls: AtomicUsize,
        fail_user_info: AtomicBool,
        fail_logout: AtomicBool,
    }

    impl FakeApi {
        fn calls(&self) -> usize {
            self.user_info_calls.load(Ordering::SeqCst)
        }

        fn signed_in(&self) -> Option<String> {
            self.signed_in
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        fn set_signed_in(&self, user_name: Option<&str>) {
            *self
                .signed_in
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = user_name.map(str::to_string);
        }
    }

    #[async_trait]
    impl AuthorizeApi for FakeApi {
        async fn login(&self, params: &LoginParameters) -> Result<(), AuthError> {
            if params.user_name != "alice" {
                return Err(AuthError::UserNotFound);
            }
            if params.password.expose_secret() != "Secret1!" {
                return Err(AuthError::InvalidPassword);
            }
            self.set_signed_in(Some("alice"));
            Ok(())
        }

        async fn register(&self, params: &RegisterParameters) -> Result<(), AuthError> {
            if params.user_name == "alice" {
                return Err(AuthError::RegistrationValidationFailed(
                    "Username 'alice' is already taken.".to_string(),
                ));
            }
            self.set_signed_in(Some(&params.user_name));
            Ok(())
        }

        async fn logout(&self) -> Result<(), AuthError> {
            if self.fail_logout.load(Ordering::SeqCst) {
                return Err(AuthError::Unexpected {
                    status: 500,
                    message: "Internal server error".to_string(),
                });
            }
            if self.signed_in().is_none() {
                return Err(AuthError::Unauthenticated);
            }
            self.set_signed_in(None);
            Ok(())
        }

        async fn user_info(&self) -> Result<UserInfo, AuthError> {
            self.user_info_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_user_info.load(Ordering::SeqCst) {
                return Err(AuthError::Unexpected {
                    status: 503,
                    message: "Service unavailable".to_string(),
                });
            }
            Ok(match self.signed_in() {
                Some(user_name) => UserInfo {
                    is_authenticated: true,
                    name: user_name.clone(),
                    user_name,
                    ..UserInfo::default()
                },
                None => UserInfo::anonymous(),
            })
        }
    }

    fn provider() -> (Arc<FakeApi>, AuthStateProvider<Arc<FakeApi>>) {
        let api = Arc::new(FakeApi::default());
        let provider = AuthStateProvider::new(Arc::clone(&api), Arc::new(StateStore::new()));
        (api, provider)
    }

    fn counter(provider: &AuthStateProvider<Arc<FakeApi>>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        provider.on_auth_state_changed(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        count
    }

    #[tokio::test]
    async fn login_then_state_is_authenticated() -> anyhow::Result<()> {
        let (_api, provider) = provider();
        let notified = counter(&provider);

        provider
            .login(&LoginParameters::new("alice", "Secret1!"))
            .await?;
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        let state = provider.authentication_state().await;
        assert!(state.is_authenticated());
        assert_eq!(state.user().name(), Some("alice"));
        Ok(())
    }

    #[tokio::test]
    async fn warm_cache_needs_one_fetch() -> anyhow::Result<()> {
        let (api, provider) = provider();
        provider
            .login(&LoginParameters::new("alice", "Secret1!"))
            .await?;

        provider.authentication_state().await;
        provider.authentication_state().await;
        assert_eq!(api.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn anonymous_cache_is_refetched() {
        let (api, provider) = provider();
        assert!(!provider.authentication_state().await.is_authenticated());
        assert!(!provider.authentication_state().await.is_authenticated());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn failed_login_keeps_cache_and_does_not_notify() -> anyhow::Result<()> {
        let (api, provider) = provider();
        provider
            .login(&LoginParameters::new("alice", "Secret1!"))
            .await?;
        assert!(provider.authentication_state().await.is_authenticated());
        let notified = counter(&provider);

        let result = provider
            .login(&LoginParameters::new("alice", "wrong"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidPassword)));
        let result = provider
            .login(&LoginParameters::new("ghost", "Secret1!"))
            .await;
        assert!(matches!(result, Err(AuthError::UserNotFound)));
        assert_eq!(notified.load(Ordering::SeqCst), 0);

        assert!(provider.authentication_state().await.is_authenticated());
        assert_eq!(api.calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn register_success_and_failure() -> anyhow::Result<()> {
        let (_api, provider) = provider();
        let result = provider
            .register(&RegisterParameters::new("alice", "Secret1!"))
            .await;
        match result {
            Err(AuthError::RegistrationValidationFailed(reason)) => {
                assert_eq!(reason, "Username 'alice' is already taken.");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!provider.authentication_state().await.is_authenticated());

        provider
            .register(&RegisterParameters::new("bob", "Secret1!"))
            .await?;
        let state = provider.authentication_state().await;
        assert_eq!(state.user().name(), Some("bob"));
        Ok(())
    }

    #[tokio::test]
    async fn logout_clears_cache_even_when_server_fails() -> anyhow::Result<()> {
        let (api, provider) = provider();
        provider
            .login(&LoginParameters::new("alice", "Secret1!"))
            .await?;
        provider.authentication_state().await;
        assert!(provider.store().get().await.is_some());

        api.fail_logout.store(true, Ordering::SeqCst);
        let notified = counter(&provider);
        let result = provider.logout().await;
        assert!(matches!(result, Err(AuthError::Unexpected { status: 500, .. })));
        assert!(provider.store().get().await.is_none());
        assert_eq!(notified.load(Ordering::SeqCst), 1);

        // The next query goes back to the server.
        provider.authentication_state().await;
        assert_eq!(api.calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn logout_then_state_is_anonymous() -> anyhow::Result<()> {
        let (_api, provider) = provider();
        provider
            .login(&LoginParameters::new("alice", "Secret1!"))
            .await?;
        assert!(provider.authentication_state().await.is_authenticated());

        provider.logout().await?;
        assert!(!provider.authentication_state().await.is_authenticated());
        Ok(())
    }

    #[tokio::test]
    async fn fetch_failure_degrades_to_anonymous() {
        let (api, provider) = provider();
        api.fail_user_info.store(true, Ordering::SeqCst);
        let state = provider.authentication_state().await;
        assert_eq!(state, AuthenticationState::anonymous());
    }

    #[test]
    fn unsubscribe_stops_notifications() {
        let (_api, provider) = provider();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = provider.on_auth_state_changed(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        provider.notify();
        assert!(provider.unsubscribe(id));
        assert!(!provider.unsubscribe(id));
        provider.notify();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    /// Server double whose `user_info` answer is held until released.
    #[derive(Default)]
    struct GatedApi {
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl AuthorizeApi for GatedApi {
        async fn login(&self, _params: &LoginParameters) -> Result<(), AuthError> {
            Ok(())
        }

        async fn register(&self, _params: &RegisterParameters) -> Result<(), AuthError> {
            Ok(())
        }

        async fn logout(&self) -> Result<(), AuthError> {
            Ok(())
        }

        async fn user_info(&self) -> Result<UserInfo, AuthError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(UserInfo {
                is_authenticated: true,
                user_name: "alice".to_string(),
                name: "alice".to_string(),
                ..UserInfo::default()
            })
        }
    }

    #[tokio::test]
    async fn logout_during_fetch_does_not_repopulate_cache() -> anyhow::Result<()> {
        let api = Arc::new(GatedApi::default());
        let provider = Arc::new(AuthStateProvider::new(
            Arc::clone(&api),
            Arc::new(StateStore::new()),
        ));

        let fetch = tokio::spawn({
            let provider = Arc::clone(&provider);
            async move { provider.authentication_state().await }
        });
        api.started.notified().await;

        provider.logout().await?;
        api.release.notify_one();

        // the caller still gets the answer it asked for
        assert!(fetch.await?.is_authenticated());
        assert!(provider.store().get().await.is_none());
        Ok(())
    }
}
