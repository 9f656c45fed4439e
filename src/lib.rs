//! # Pordisto (authentication bridge)
//!
//! `pordisto` sits between a single-page client and an identity manager. The
//! server half forwards login, registration and logout to the identity manager
//! and reports who is signed in; the client half caches that answer so the UI
//! can make rendering decisions without a round trip per query.
//!
//! ## Server
//!
//! | Method | Path                      | Outcome                                  |
//! |--------|---------------------------|------------------------------------------|
//! | `POST` | `/api/authorize/login`    | `200` + session cookie, `400` + reason   |
//! | `POST` | `/api/authorize/register` | `200` + session cookie, `400` + reason   |
//! | `POST` | `/api/authorize/logout`   | `200`, `401` without a session           |
//! | `GET`  | `/api/authorize/userInfo` | `200` + [`types::UserInfo`]              |
//!
//! Credential storage, hashing and session issuance live behind the
//! [`identity::IdentityManager`] trait. The bundled
//! [`identity::MemoryIdentityManager`] keeps everything in process memory.
//!
//! ## Client
//!
//! [`client::AuthStateProvider`] answers "who is logged in" from a cached
//! [`types::UserInfo`] held in an injected [`client::StateStore`]. Subscribers
//! registered with `on_auth_state_changed` are told when the state may have
//! changed and re-query lazily.

pub mod api;
pub mod claims;
pub mod cli;
pub mod client;
pub mod error;
pub mod identity;
pub mod types;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(GIT_COMMIT_HASH.len() >= 7);
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
