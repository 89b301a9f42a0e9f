//! Login orchestration.
//!
//! Flow Overview:
//! 1) Pass the rate-limit gate. The resulting snapshot is kept for the response
//!    headers no matter how the request ends.
//! 2) A closed gate answers "Rate Limit Exceeded" without touching the store.
//! 3) Verify the credentials. The attempt is already charged at this point.
//! 4) On success issue a session cookie (when signing is available) and publish
//!    `LoginSucceeded`.
//! 5) On failure publish `LoginFailed` with the precise reason and answer with a
//!    message shaped by the disclosure policy.
//!
//! Store outages are returned as `LoginError` so the transport can tell them
//! apart from authentication failures.

use std::{fmt, str::FromStr};
use tracing::{debug, error, instrument};

use super::{
    cookie::SessionCookie,
    credentials::{AuthenticationOutcome, CredentialVerifier, Credentials, FailureReason},
    events::{LoginEvent, LoginEventPublisher},
    issuer::TokenIssuer,
    rate_limit::{LoginRateLimiter, RateLimitSnapshot},
    store::StoreError,
    types::{LoginPayload, UserView},
};

pub const RATE_LIMIT_EXCEEDED_MESSAGE: &str = "Rate Limit Exceeded";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid Credentials";
pub const SERVICE_UNAVAILABLE_MESSAGE: &str = "Service Unavailable";

/// How much an authentication failure tells the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailureDisclosure {
    /// Every failure reads "Invalid Credentials".
    #[default]
    Generic,
    /// Failures name the precise reason.
    Verbatim,
}

impl FailureDisclosure {
    #[must_use]
    pub fn message(self, reason: FailureReason) -> &'static str {
        match self {
            Self::Generic => INVALID_CREDENTIALS_MESSAGE,
            Self::Verbatim => reason.message(),
        }
    }
}

impl fmt::Display for FailureDisclosure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generic => write!(f, "generic"),
            Self::Verbatim => write!(f, "verbatim"),
        }
    }
}

impl FromStr for FailureDisclosure {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "generic" => Ok(Self::Generic),
            "verbatim" => Ok(Self::Verbatim),
            _ => Err(format!("invalid failure disclosure policy: {value}")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoginOutcome {
    Authenticated {
        user: UserView,
        cookie: Option<SessionCookie>,
    },
    RateLimited,
    Rejected {
        reason: FailureReason,
        message: &'static str,
    },
}

impl LoginOutcome {
    #[must_use]
    pub fn payload(&self) -> LoginPayload {
        match self {
            Self::Authenticated { user, .. } => LoginPayload::User { user: user.clone() },
            Self::RateLimited => LoginPayload::error(RATE_LIMIT_EXCEEDED_MESSAGE),
            Self::Rejected { message, .. } => LoginPayload::error(message),
        }
    }
}

/// What a single login attempt produced, along with the budget it left behind.
#[derive(Debug)]
pub struct LoginResponse {
    pub rate_limit: RateLimitSnapshot,
    pub result: Result<LoginOutcome, LoginError>,
}

#[derive(Debug)]
pub struct LoginFlow {
    limiter: LoginRateLimiter,
    verifier: CredentialVerifier,
    issuer: TokenIssuer,
    events: LoginEventPublisher,
    disclosure: FailureDisclosure,
}

impl LoginFlow {
    #[must_use]
    pub fn new(
        limiter: LoginRateLimiter,
        verifier: CredentialVerifier,
        issuer: TokenIssuer,
        events: LoginEventPublisher,
    ) -> Self {
        Self {
            limiter,
            verifier,
            issuer,
            events,
            disclosure: FailureDisclosure::default(),
        }
    }

    #[must_use]
    pub fn with_disclosure(mut self, disclosure: FailureDisclosure) -> Self {
        self.disclosure = disclosure;
        self
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &LoginRateLimiter {
        &self.limiter
    }

    #[must_use]
    pub fn verifier(&self) -> &CredentialVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn events(&self) -> &LoginEventPublisher {
        &self.events
    }

    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn execute(&self, credentials: Credentials, request_secure: bool) -> LoginResponse {
        let rate_limit = self.limiter.try_consume();
        if !rate_limit.is_allowed() {
            debug!(
                remaining = rate_limit.remaining,
                "Login rejected by rate limit"
            );
            return LoginResponse {
                rate_limit,
                result: Ok(LoginOutcome::RateLimited),
            };
        }

        let outcome = match self
            .verifier
            .verify(&credentials.username, &credentials.password)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                error!("Failed to look up user: {err}");
                return LoginResponse {
                    rate_limit,
                    result: Err(err.into()),
                };
            }
        };

        let result = match outcome {
            AuthenticationOutcome::Authenticated { identity, roles } => {
                let cookie = self.issuer.issue(&identity, &roles, request_secure);
                let user = UserView {
                    username: identity.clone(),
                    roles: roles.iter().cloned().collect(),
                };
                self.events
                    .publish(LoginEvent::LoginSucceeded { identity, roles });
                LoginOutcome::Authenticated { user, cookie }
            }
            AuthenticationOutcome::Failed { reason } => {
                self.events.publish(LoginEvent::LoginFailed { reason });
                LoginOutcome::Rejected {
                    reason,
                    message: self.disclosure.message(reason),
                }
            }
        };

        LoginResponse {
            rate_limit,
            result: Ok(result),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        cookie::CookieConfig,
        password::hash_password,
        rate_limit::test_support::FixedDraw,
        store::{InMemoryUserRepository, User, UserRepository},
        token::{JwtSigner, TokenGenerator},
    };
    use super::*;
    use anyhow::{Context, Result};
    use async_trait::async_trait;
    use secrecy::SecretString;
    use std::collections::BTreeSet;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };
    use std::time::Duration;

    /// Wraps the in-memory store and counts lookups.
    struct CountingStore {
        inner: InMemoryUserRepository,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl UserRepository for CountingStore {
        async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.inner.find_by_username(username).await
        }
    }

    struct DownStore;

    #[async_trait]
    impl UserRepository for DownStore {
        async fn find_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("timeout".to_string()))
        }
    }

    fn alice_store() -> Result<Arc<CountingStore>> {
        let inner = InMemoryUserRepository::from_users(vec![User {
            username: "alice".to_string(),
            password: hash_password("wonderland")?,
            roles: BTreeSet::from(["USER".to_string()]),
        }])?;
        Ok(Arc::new(CountingStore {
            inner,
            lookups: AtomicUsize::new(0),
        }))
    }

    fn signer() -> Arc<dyn TokenGenerator> {
        Arc::new(JwtSigner::new(
            Some(&SecretString::from("flow-secret".to_string())),
            "turnstile".to_string(),
            Duration::from_secs(3600),
        ))
    }

    fn flow(
        store: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenGenerator>,
        limiter: LoginRateLimiter,
    ) -> LoginFlow {
        LoginFlow::new(
            limiter,
            CredentialVerifier::new(store),
            TokenIssuer::new(tokens, CookieConfig::new()),
            LoginEventPublisher::new(),
        )
    }

    #[tokio::test]
    async fn successful_login_issues_cookie_and_event() -> Result<()> {
        let store = alice_store()?;
        let flow = flow(store.clone(), signer(), LoginRateLimiter::new(10));
        let mut events = flow.events().subscribe();

        let response = flow
            .execute(Credentials::new("alice", "wonderland"), false)
            .await;

        assert_eq!(response.rate_limit.remaining, 9);
        assert_eq!(response.rate_limit.ceiling, 10);
        let outcome = response.result?;
        let LoginOutcome::Authenticated { user, cookie } = outcome else {
            anyhow::bail!("expected authenticated outcome");
        };
        assert_eq!(user.username, "alice");
        assert_eq!(user.roles, vec!["USER".to_string()]);
        let cookie = cookie.context("cookie missing")?;
        assert_eq!(cookie.name, "JWT");
        assert_eq!(cookie.max_age, Duration::from_secs(3600));

        assert_eq!(
            events.recv().await?,
            LoginEvent::LoginSucceeded {
                identity: "alice".to_string(),
                roles: BTreeSet::from(["USER".to_string()]),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn exhausted_budget_skips_verification() -> Result<()> {
        let store = alice_store()?;
        let limiter = LoginRateLimiter::with_draw(10, Box::new(FixedDraw(0))).with_remaining(0);
        let flow = flow(store.clone(), signer(), limiter);

        let response = flow
            .execute(Credentials::new("alice", "wonderland"), false)
            .await;

        assert!(!response.rate_limit.is_allowed());
        assert_eq!(response.rate_limit.remaining, 0);
        assert_eq!(response.result?, LoginOutcome::RateLimited);
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn rejection_reports_reset_budget() -> Result<()> {
        let store = alice_store()?;
        let limiter = LoginRateLimiter::with_draw(10, Box::new(FixedDraw(3))).with_remaining(0);
        let flow = flow(store.clone(), signer(), limiter);

        let response = flow
            .execute(Credentials::new("alice", "wonderland"), false)
            .await;

        assert_eq!(response.rate_limit.remaining, 10);
        assert_eq!(response.result?, LoginOutcome::RateLimited);
        assert_eq!(store.lookups.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn failed_attempts_are_charged() -> Result<()> {
        let store = alice_store()?;
        let flow = flow(store, signer(), LoginRateLimiter::new(10));
        let mut events = flow.events().subscribe();

        let response = flow
            .execute(Credentials::new("alice", "looking-glass"), false)
            .await;

        assert_eq!(response.rate_limit.remaining, 9);
        assert_eq!(
            response.result?,
            LoginOutcome::Rejected {
                reason: FailureReason::CredentialsMismatch,
                message: INVALID_CREDENTIALS_MESSAGE,
            }
        );
        assert_eq!(
            events.recv().await?,
            LoginEvent::LoginFailed {
                reason: FailureReason::CredentialsMismatch
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn verbatim_policy_names_the_reason() -> Result<()> {
        let store = alice_store()?;
        let flow = flow(store, signer(), LoginRateLimiter::new(10))
            .with_disclosure(FailureDisclosure::Verbatim);
        let mut events = flow.events().subscribe();

        let response = flow.execute(Credentials::new("bob", "whatever"), false).await;

        let outcome = response.result?;
        assert_eq!(outcome.payload(), LoginPayload::error("User Not Found"));
        assert_eq!(
            events.recv().await?,
            LoginEvent::LoginFailed {
                reason: FailureReason::UserNotFound
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn signing_unavailable_still_authenticates() -> Result<()> {
        let store = alice_store()?;
        let flow = flow(
            store,
            Arc::new(JwtSigner::disabled()),
            LoginRateLimiter::new(10),
        );
        let mut events = flow.events().subscribe();

        let response = flow
            .execute(Credentials::new("alice", "wonderland"), true)
            .await;

        let LoginOutcome::Authenticated { cookie, .. } = response.result? else {
            anyhow::bail!("expected authenticated outcome");
        };
        assert!(cookie.is_none());
        assert!(matches!(
            events.recv().await?,
            LoginEvent::LoginSucceeded { .. }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn store_outage_is_an_error_with_snapshot() {
        let flow = flow(Arc::new(DownStore), signer(), LoginRateLimiter::new(10));

        let response = flow
            .execute(Credentials::new("alice", "wonderland"), false)
            .await;

        assert_eq!(response.rate_limit.remaining, 9);
        assert!(matches!(
            response.result,
            Err(LoginError::StoreUnavailable(_))
        ));
    }

    #[test]
    fn disclosure_parses_policy_names() {
        assert_eq!("generic".parse::<FailureDisclosure>(), Ok(FailureDisclosure::Generic));
        assert_eq!("Verbatim".parse::<FailureDisclosure>(), Ok(FailureDisclosure::Verbatim));
        assert!("loud".parse::<FailureDisclosure>().is_err());
    }

    #[test]
    fn generic_policy_hides_both_reasons() {
        let policy = FailureDisclosure::Generic;
        assert_eq!(
            policy.message(FailureReason::UserNotFound),
            policy.message(FailureReason::CredentialsMismatch)
        );
    }
}
