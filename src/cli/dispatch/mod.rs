//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action the binary should run.

use crate::cli::actions::{Action, hash_password, server::Args};
use crate::cli::commands::{
    ARG_PASSWORD, ARG_PORT, ARG_REQUEST_TIMEOUT_SECONDS, ARG_USERS_FILE, CMD_HASH_PASSWORD,
    CMD_SERVER, auth, cookie,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::path::PathBuf;

/// Map validated CLI matches to an action. Without a subcommand the server runs.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((CMD_HASH_PASSWORD, sub_m)) => {
            let password = sub_m
                .get_one::<String>(ARG_PASSWORD)
                .cloned()
                .context("missing required argument: --password")?;
            Ok(Action::HashPassword(hash_password::Args {
                password: SecretString::from(password),
            }))
        }
        Some((CMD_SERVER, sub_m)) => server(sub_m),
        _ => server(matches),
    }
}

fn server(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let users_file = matches
        .get_one::<String>(ARG_USERS_FILE)
        .map(PathBuf::from)
        .context("missing required argument: --users-file")?;
    let request_timeout_seconds = matches
        .get_one::<u64>(ARG_REQUEST_TIMEOUT_SECONDS)
        .copied()
        .unwrap_or(crate::api::DEFAULT_REQUEST_TIMEOUT_SECONDS);

    let auth_opts = auth::Options::parse(matches)?;
    let cookie_opts = cookie::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        users_file,
        request_timeout_seconds,
        jwt_secret: auth_opts.jwt_secret,
        jwt_issuer: auth_opts.jwt_issuer,
        access_token_ttl_seconds: auth_opts.access_token_ttl_seconds,
        login_rate_limit: auth_opts.login_rate_limit,
        failure_disclosure: auth_opts.failure_disclosure,
        cookie: cookie_opts.into_config(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::FailureDisclosure;
    use secrecy::ExposeSecret;

    const CLEAR_ENV: [(&str, Option<&str>); 5] = [
        ("TURNSTILE_USERS_FILE", None),
        ("TURNSTILE_PORT", None),
        ("TURNSTILE_JWT_SECRET", None),
        ("TURNSTILE_FAILURE_DISCLOSURE", None),
        ("TURNSTILE_PASSWORD", None),
    ];

    fn dispatch(args: Vec<&str>) -> Result<Action> {
        temp_env::with_vars(CLEAR_ENV, || {
            let matches = crate::cli::commands::new().get_matches_from(args);
            handler(&matches)
        })
    }

    #[test]
    fn users_file_required() {
        let result = dispatch(vec!["turnstile"]);
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(
                err.to_string()
                    .contains("missing required argument: --users-file")
            );
        }
    }

    #[test]
    fn server_is_the_default_action() -> Result<()> {
        let action = dispatch(vec![
            "turnstile",
            "--users-file",
            "users.json",
            "--port",
            "9000",
            "--failure-disclosure",
            "verbatim",
        ])?;
        let Action::Server(args) = action else {
            anyhow::bail!("expected server action");
        };
        assert_eq!(args.port, 9000);
        assert_eq!(args.users_file, PathBuf::from("users.json"));
        assert_eq!(args.failure_disclosure, FailureDisclosure::Verbatim);
        assert_eq!(args.login_rate_limit, 10);
        assert!(args.jwt_secret.is_none());
        Ok(())
    }

    #[test]
    fn server_subcommand_reads_its_own_args() -> Result<()> {
        let action = dispatch(vec![
            "turnstile",
            "server",
            "--users-file",
            "users.json",
            "--jwt-secret",
            "s3cr3t",
        ])?;
        let Action::Server(args) = action else {
            anyhow::bail!("expected server action");
        };
        assert_eq!(
            args.jwt_secret
                .as_ref()
                .map(|secret| secret.expose_secret().to_string()),
            Some("s3cr3t".to_string())
        );
        Ok(())
    }

    #[test]
    fn hash_password_action() -> Result<()> {
        let action = dispatch(vec!["turnstile", "hash-password", "--password", "hunter2"])?;
        let Action::HashPassword(args) = action else {
            anyhow::bail!("expected hash-password action");
        };
        assert_eq!(args.password.expose_secret(), "hunter2");
        Ok(())
    }
}
