use crate::api::handlers::auth::{
    FailureDisclosure,
    rate_limit::DEFAULT_LOGIN_RATE_LIMIT,
    token::{DEFAULT_ACCESS_TOKEN_TTL_SECONDS, DEFAULT_JWT_ISSUER},
};
use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_JWT_ISSUER: &str = "jwt-issuer";
pub const ARG_ACCESS_TOKEN_TTL_SECONDS: &str = "access-token-ttl-seconds";
pub const ARG_LOGIN_RATE_LIMIT: &str = "login-rate-limit";
pub const ARG_FAILURE_DISCLOSURE: &str = "failure-disclosure";

#[derive(Debug)]
pub struct Options {
    pub jwt_secret: Option<SecretString>,
    pub jwt_issuer: String,
    pub access_token_ttl_seconds: u64,
    pub login_rate_limit: i64,
    pub failure_disclosure: FailureDisclosure,
}

impl Options {
    /// # Errors
    /// Returns an error if a value is missing or cannot be parsed.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let failure_disclosure = matches
            .get_one::<String>(ARG_FAILURE_DISCLOSURE)
            .map_or(Ok(FailureDisclosure::default()), |value| {
                value.parse::<FailureDisclosure>()
            })
            .map_err(|err| anyhow!(err))?;

        Ok(Self {
            jwt_secret: matches
                .get_one::<String>(ARG_JWT_SECRET)
                .filter(|secret| !secret.is_empty())
                .map(|secret| SecretString::from(secret.clone())),
            jwt_issuer: matches
                .get_one::<String>(ARG_JWT_ISSUER)
                .cloned()
                .unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_string()),
            access_token_ttl_seconds: matches
                .get_one::<u64>(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .copied()
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
            login_rate_limit: matches
                .get_one::<i64>(ARG_LOGIN_RATE_LIMIT)
                .copied()
                .unwrap_or(DEFAULT_LOGIN_RATE_LIMIT),
            failure_disclosure,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("HS256 secret used to sign session tokens")
                .long_help(
                    "HS256 secret used to sign session tokens. Without it logins still succeed but no session cookie is issued.",
                )
                .env("TURNSTILE_JWT_SECRET")
                .hide_env_values(true)
                .global(true),
        )
        .arg(
            Arg::new(ARG_JWT_ISSUER)
                .long(ARG_JWT_ISSUER)
                .help("Issuer claim of session tokens")
                .env("TURNSTILE_JWT_ISSUER")
                .default_value(DEFAULT_JWT_ISSUER)
                .global(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .long(ARG_ACCESS_TOKEN_TTL_SECONDS)
                .help("Session token lifetime in seconds")
                .env("TURNSTILE_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
        .arg(
            Arg::new(ARG_LOGIN_RATE_LIMIT)
                .long(ARG_LOGIN_RATE_LIMIT)
                .help("Login attempts allowed before requests are rejected")
                .env("TURNSTILE_LOGIN_RATE_LIMIT")
                .default_value("10")
                .value_parser(clap::value_parser!(i64).range(0..))
                .global(true),
        )
        .arg(
            Arg::new(ARG_FAILURE_DISCLOSURE)
                .long(ARG_FAILURE_DISCLOSURE)
                .help("How failed logins are reported: generic or verbatim")
                .env("TURNSTILE_FAILURE_DISCLOSURE")
                .default_value("generic")
                .value_parser(["generic", "verbatim"])
                .global(true),
        )
}
