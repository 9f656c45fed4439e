//! Map parsed CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if an argument fails validation.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        remember_me_ttl_seconds: auth_opts.remember_me_ttl_seconds,
        expose_claims: auth_opts.expose_claims,
        password_min_length: auth_opts.password_min_length,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_builds_server_action() {
        temp_env::with_vars(
            [
                ("PORDISTO_PORT", Some("8181")),
                ("PORDISTO_EXPOSE_CLAIMS", Some("role")),
                ("PORDISTO_FRONTEND_BASE_URL", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(vec!["pordisto"]);
                let result = handler(&matches);
                assert!(result.is_ok());
                if let Ok(Action::Server(args)) = result {
                    assert_eq!(args.port, 8181);
                    assert_eq!(args.expose_claims, vec!["role".to_string()]);
                    assert!(args.frontend_base_url.is_none());
                }
            },
        );
    }
}
