use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let secret = |name: &str| -> Result<SecretString> {
        matches
            .get_one::<String>(name)
            .map(|s| SecretString::from(s.clone()))
            .with_context(|| format!("missing required argument: --{name}"))
    };

    // Secret equality is checked by AuthConfig when the server action runs.
    let access_secret = secret("access-secret")?;
    let refresh_secret = secret("refresh-secret")?;

    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        dsn: matches
            .get_one::<String>("dsn")
            .cloned()
            .context("missing required argument: --dsn")?,
        access_secret,
        access_ttl_seconds: matches
            .get_one::<i64>("access-ttl-seconds")
            .copied()
            .unwrap_or(900),
        refresh_secret,
        refresh_ttl_seconds: matches
            .get_one::<i64>("refresh-ttl-seconds")
            .copied()
            .unwrap_or(864_000),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    fn matches(args: &[&str]) -> clap::ArgMatches {
        commands::new().get_matches_from(args)
    }

    #[test]
    fn test_handler_builds_server_action() {
        let matches = matches(&[
            "vidgate",
            "--dsn",
            "postgres://localhost/vidgate",
            "--access-secret",
            "a-secret",
            "--refresh-secret",
            "r-secret",
        ]);

        let action = handler(&matches).unwrap();
        let Action::Server {
            port,
            dsn,
            access_ttl_seconds,
            refresh_ttl_seconds,
            ..
        } = action;
        assert_eq!(port, 8080);
        assert_eq!(dsn, "postgres://localhost/vidgate");
        assert_eq!(access_ttl_seconds, 900);
        assert_eq!(refresh_ttl_seconds, 864_000);
    }

    #[test]
    fn test_handler_wraps_secrets() {
        use secrecy::ExposeSecret;

        let matches = matches(&[
            "vidgate",
            "--dsn",
            "postgres://localhost/vidgate",
            "--access-secret",
            "a-secret",
            "--refresh-secret",
            "r-secret",
        ]);

        let Action::Server {
            access_secret,
            refresh_secret,
            ..
        } = handler(&matches).unwrap();
        assert_eq!(access_secret.expose_secret(), "a-secret");
        assert_eq!(refresh_secret.expose_secret(), "r-secret");
    }
}
