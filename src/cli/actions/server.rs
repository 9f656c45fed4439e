use crate::{
    api::{self, AuthConfig, AuthState, ClaimExposure},
    cli::telemetry,
    identity::{MemoryIdentityManager, PasswordPolicy},
};
use anyhow::Result;
use std::{sync::Arc, time::Duration};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub frontend_base_url: Option<String>,
    pub session_ttl_seconds: u64,
    pub remember_me_ttl_seconds: u64,
    pub expose_claims: Vec<String>,
    pub password_min_length: usize,
}

impl Args {
    fn auth_config(&self) -> AuthConfig {
        AuthConfig::new()
            .with_frontend_base_url(self.frontend_base_url.clone())
            .with_claim_exposure(ClaimExposure::from_claim_types(
                self.expose_claims.iter().cloned(),
            ))
    }

    fn identity_manager(&self) -> MemoryIdentityManager {
        MemoryIdentityManager::new()
            .with_password_policy(
                PasswordPolicy::default().with_min_length(self.password_min_length),
            )
            .with_session_ttl(Duration::from_secs(self.session_ttl_seconds))
            .with_remember_me_ttl(Duration::from_secs(self.remember_me_ttl_seconds))
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("Server args: {:?}", args);

    let auth_state = Arc::new(AuthState::new(
        args.auth_config(),
        Arc::new(args.identity_manager()),
    ));

    let result = api::new(args.port, auth_state).await;

    telemetry::shutdown_tracer();

    result
}
