use crate::claims::ClaimType;
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_REMEMBER_ME_TTL_SECONDS: &str = "remember-me-ttl-seconds";
pub const ARG_EXPOSE_CLAIM: &str = "expose-claim";
pub const ARG_PASSWORD_MIN_LENGTH: &str = "password-min-length";

/// Upper bound for both session lifetimes (ten years).
pub const MAX_TTL_SECONDS: u64 = 10 * 365 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Options {
    pub frontend_base_url: Option<String>,
    pub session_ttl_seconds: u64,
    pub remember_me_ttl_seconds: u64,
    pub expose_claims: Vec<String>,
    pub password_min_length: usize,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if an exposed claim type is not a valid claim type.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        // clap passes empty env values through; treat them as unset
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        let expose_claims = matches
            .get_many::<String>(ARG_EXPOSE_CLAIM)
            .into_iter()
            .flatten()
            .map(|claim| claim.trim())
            .filter(|claim| !claim.is_empty())
            .map(|claim| {
                ClaimType::new(claim)
                    .map(|claim_type| claim_type.as_str().to_string())
                    .with_context(|| format!("invalid --{ARG_EXPOSE_CLAIM} value: {claim}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            frontend_base_url,
            session_ttl_seconds: matches
                .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(12 * 60 * 60),
            remember_me_ttl_seconds: matches
                .get_one::<u64>(ARG_REMEMBER_ME_TTL_SECONDS)
                .copied()
                .unwrap_or(14 * 24 * 60 * 60),
            expose_claims,
            password_min_length: matches
                .get_one::<usize>(ARG_PASSWORD_MIN_LENGTH)
                .copied()
                .unwrap_or(6),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL; enables credentialed CORS for its origin")
                .long_help(
                    "Frontend base URL. When set, its origin is allowed to call the API with credentials, and session cookies are marked Secure if it is served over https.",
                )
                .env("PORDISTO_FRONTEND_BASE_URL"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Lifetime of a browser-session login in seconds")
                .env("PORDISTO_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REMEMBER_ME_TTL_SECONDS)
                .long(ARG_REMEMBER_ME_TTL_SECONDS)
                .help("Lifetime of a remember-me login in seconds")
                .env("PORDISTO_REMEMBER_ME_TTL_SECONDS")
                .default_value("1209600")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_EXPOSE_CLAIM)
                .long(ARG_EXPOSE_CLAIM)
                .help("Claim type to expose in userInfo (repeatable, default: all claims)")
                .env("PORDISTO_EXPOSE_CLAIMS")
                .value_delimiter(',')
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_PASSWORD_MIN_LENGTH)
                .long(ARG_PASSWORD_MIN_LENGTH)
                .help("Minimum password length for new accounts")
                .env("PORDISTO_PASSWORD_MIN_LENGTH")
                .default_value("6")
                .value_parser(clap::value_parser!(usize)),
        )
}
