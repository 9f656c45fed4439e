pub mod auth;
pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("pordisto")
        .about("Cookie-session authentication bridge")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("PORDISTO_PORT")
                .value_parser(clap::value_parser!(u16)),
        );

    let command = auth::with_args(command);
    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const ENV_VARS: [&str; 8] = [
        "PORDISTO_PORT",
        "PORDISTO_FRONTEND_BASE_URL",
        "PORDISTO_SESSION_TTL_SECONDS",
        "PORDISTO_REMEMBER_ME_TTL_SECONDS",
        "PORDISTO_EXPOSE_CLAIMS",
        "PORDISTO_PASSWORD_MIN_LENGTH",
        "PORDISTO_LOG_LEVEL",
        "OTEL_EXPORTER_OTLP_ENDPOINT",
    ];

    fn unset_all() -> Vec<(&'static str, Option<&'static str>)> {
        ENV_VARS.iter().map(|name| (*name, None)).collect()
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "pordisto");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Cookie-session authentication bridge".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_defaults() {
        temp_env::with_vars(unset_all(), || -> Result<()> {
            let matches = new().try_get_matches_from(["pordisto"])?;
            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(8080));

            let options = auth::Options::parse(&matches)?;
            assert_eq!(options.frontend_base_url, None);
            assert_eq!(options.session_ttl_seconds, 43_200);
            assert_eq!(options.remember_me_ttl_seconds, 1_209_600);
            assert!(options.expose_claims.is_empty());
            assert_eq!(options.password_min_length, 6);
            Ok(())
        })
        .expect("defaults should parse");
    }

    #[test]
    fn test_check_args() -> Result<()> {
        let matches = new().try_get_matches_from([
            "pordisto",
            "--port",
            "9000",
            "--frontend-base-url",
            "https://app.pordisto.dev",
            "--expose-claim",
            "role",
            "--expose-claim",
            "name",
            "--password-min-length",
            "10",
        ])?;
        assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9000));

        let options = auth::Options::parse(&matches)?;
        assert_eq!(
            options.frontend_base_url.as_deref(),
            Some("https://app.pordisto.dev")
        );
        assert_eq!(options.expose_claims, vec!["role", "name"]);
        assert_eq!(options.password_min_length, 10);
        Ok(())
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("PORDISTO_PORT", Some("443")),
                ("PORDISTO_FRONTEND_BASE_URL", Some("http://localhost:5173")),
                ("PORDISTO_SESSION_TTL_SECONDS", Some("60")),
                ("PORDISTO_REMEMBER_ME_TTL_SECONDS", Some("120")),
                ("PORDISTO_EXPOSE_CLAIMS", Some("role,sub")),
                ("PORDISTO_PASSWORD_MIN_LENGTH", None),
                ("PORDISTO_LOG_LEVEL", Some("info")),
            ],
            || -> Result<()> {
                let matches = new().try_get_matches_from(["pordisto"])?;
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );

                let options = auth::Options::parse(&matches)?;
                assert_eq!(
                    options.frontend_base_url.as_deref(),
                    Some("http://localhost:5173")
                );
                assert_eq!(options.session_ttl_seconds, 60);
                assert_eq!(options.remember_me_ttl_seconds, 120);
                assert_eq!(options.expose_claims, vec!["role", "sub"]);
                Ok(())
            },
        )
        .expect("env should parse");
    }

    #[test]
    fn test_empty_frontend_env_is_unset() {
        temp_env::with_var("PORDISTO_FRONTEND_BASE_URL", Some(""), || -> Result<()> {
            let matches = new().try_get_matches_from(["pordisto"])?;
            let options = auth::Options::parse(&matches)?;
            assert_eq!(options.frontend_base_url, None);
            Ok(())
        })
        .expect("empty env should parse");
    }

    #[test]
    fn test_invalid_claim_type_is_rejected() -> Result<()> {
        let matches =
            new().try_get_matches_from(["pordisto", "--expose-claim", "bad\u{7}claim"])?;
        let result = auth::Options::parse(&matches);
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("invalid --expose-claim value"));
        }
        Ok(())
    }

    #[test]
    fn test_ttl_out_of_range_is_rejected() {
        temp_env::with_vars(unset_all(), || {
            for args in [
                ["pordisto", "--session-ttl-seconds", "0"],
                ["pordisto", "--remember-me-ttl-seconds", "18446744073709551615"],
            ] {
                assert!(new().try_get_matches_from(args).is_err(), "{args:?}");
            }

            let max = auth::MAX_TTL_SECONDS.to_string();
            let matches = new().try_get_matches_from([
                "pordisto",
                "--remember-me-ttl-seconds",
                max.as_str(),
            ]);
            assert!(matches.is_ok());
        });
    }
}
