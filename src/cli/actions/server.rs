use crate::api::{
    self,
    handlers::{
        auth::{
            AuthConfig, AuthState, CookieConfig, FailureDisclosure, InMemoryUserRepository,
            JwtSigner, LoginEventPublisher, UserRepository, spawn_audit_logger,
        },
        subscriptions::NoopConnectionInitializer,
    },
};
use crate::cli::telemetry;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{fmt::Write as _, path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub users_file: PathBuf,
    pub request_timeout_seconds: u64,
    pub jwt_secret: Option<SecretString>,
    pub jwt_issuer: String,
    pub access_token_ttl_seconds: u64,
    pub login_rate_limit: i64,
    pub failure_disclosure: FailureDisclosure,
    pub cookie: CookieConfig,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the users file cannot be loaded or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let users = InMemoryUserRepository::load(&args.users_file).with_context(|| {
        format!(
            "Could not load users from {}",
            args.users_file.display()
        )
    })?;

    let signer = JwtSigner::new(
        args.jwt_secret.as_ref(),
        args.jwt_issuer.clone(),
        Duration::from_secs(args.access_token_ttl_seconds),
    );
    if !signer.is_enabled() {
        warn!("No JWT secret configured: logins will succeed without a session cookie");
    }

    log_startup_args(&args, users.len_hint());

    let events = LoginEventPublisher::new();
    let audit = spawn_audit_logger(&events);

    let config = AuthConfig::new()
        .with_login_rate_limit(args.login_rate_limit)
        .with_failure_disclosure(args.failure_disclosure)
        .with_cookie(args.cookie);
    let auth_state = Arc::new(AuthState::new(
        config,
        Arc::new(users),
        Arc::new(signer),
        events,
    ));

    let result = api::new(
        args.port,
        auth_state,
        Arc::new(NoopConnectionInitializer),
        Duration::from_secs(args.request_timeout_seconds),
    )
    .await;

    audit.abort();
    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args, users: Option<usize>) {
    info!("{}", startup_message(args, users));
}

fn startup_message(args: &Args, users: Option<usize>) -> String {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("users_file", args.users_file.display().to_string()),
        (
            "users",
            users.map_or_else(|| "unknown".to_string(), |count| count.to_string()),
        ),
        ("jwt_secret_set", args.jwt_secret.is_some().to_string()),
        ("jwt_issuer", args.jwt_issuer.clone()),
        (
            "access_token_ttl",
            format!("{}s", args.access_token_ttl_seconds),
        ),
        ("login_rate_limit", args.login_rate_limit.to_string()),
        ("failure_disclosure", args.failure_disclosure.to_string()),
        ("cookie_name", args.cookie.name().to_string()),
        (
            "request_timeout",
            format!("{}s", args.request_timeout_seconds),
        ),
    ];
    format_entries("Startup configuration", &entries)
}

fn format_entries(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\n{title}:", turnstile_banner());
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ = write!(message, "\n  {key}:{padding} {value}");
    }
    message
}

fn turnstile_banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    TURNSTILE_BANNER.replace(
        "{VERSION}",
        &format!(" - {} - {}", env!("CARGO_PKG_VERSION"), short_hash),
    )
}

fn short_commit(hash: &str) -> String {
    hash.trim().chars().take(7).collect()
}

const TURNSTILE_BANNER: &str = r"
  |=====|
  |  |  |
  |--+--|  T U R N S T I L E {VERSION}
  |  |  |
  |=====|";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit(" abc "), "abc");
    }

    #[test]
    fn banner_carries_version() {
        let banner = turnstile_banner();
        assert!(banner.contains("T U R N S T I L E"));
        assert!(banner.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn startup_entries_are_aligned() {
        let args = Args {
            port: 8080,
            users_file: PathBuf::from("users.json"),
            request_timeout_seconds: 10,
            jwt_secret: Some(SecretString::from("s3cr3t".to_string())),
            jwt_issuer: "turnstile".to_string(),
            access_token_ttl_seconds: 3600,
            login_rate_limit: 10,
            failure_disclosure: FailureDisclosure::Generic,
            cookie: CookieConfig::new(),
        };
        let message = startup_message(&args, Some(2));
        // Values line up after the longest key, "failure_disclosure".
        let column = "failure_disclosure".len() + 1;
        assert!(message.contains(&format!("\n  {:<column$} tcp:8080", "listen:")));
        assert!(message.contains(&format!("\n  {:<column$} true", "jwt_secret_set:")));
        assert!(message.contains(&format!("\n  {:<column$} 2", "users:")));
        assert!(message.contains("\n  failure_disclosure: generic"));
        assert!(!message.contains("s3cr3t"));
    }

    #[tokio::test]
    async fn missing_users_file_fails_before_listening() {
        let args = Args {
            port: 0,
            users_file: PathBuf::from("/nonexistent/turnstile-users.json"),
            request_timeout_seconds: 10,
            jwt_secret: None,
            jwt_issuer: "turnstile".to_string(),
            access_token_ttl_seconds: 3600,
            login_rate_limit: 10,
            failure_disclosure: FailureDisclosure::Generic,
            cookie: CookieConfig::new(),
        };
        let result = execute(args).await;
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("Could not load users from"));
        }
    }
}
