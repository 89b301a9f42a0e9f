//! Auth state and configuration.

use std::sync::Arc;

use super::{
    cookie::CookieConfig,
    credentials::CredentialVerifier,
    events::LoginEventPublisher,
    flow::{FailureDisclosure, LoginFlow},
    issuer::TokenIssuer,
    rate_limit::{DEFAULT_LOGIN_RATE_LIMIT, LoginRateLimiter},
    store::UserRepository,
    token::TokenGenerator,
};

#[derive(Clone, Debug)]
pub struct AuthConfig {
    login_rate_limit: i64,
    failure_disclosure: FailureDisclosure,
    cookie: CookieConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            login_rate_limit: DEFAULT_LOGIN_RATE_LIMIT,
            failure_disclosure: FailureDisclosure::default(),
            cookie: CookieConfig::default(),
        }
    }

    #[must_use]
    pub fn with_login_rate_limit(mut self, ceiling: i64) -> Self {
        self.login_rate_limit = ceiling;
        self
    }

    #[must_use]
    pub fn with_failure_disclosure(mut self, disclosure: FailureDisclosure) -> Self {
        self.failure_disclosure = disclosure;
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, cookie: CookieConfig) -> Self {
        self.cookie = cookie;
        self
    }

    #[must_use]
    pub fn login_rate_limit(&self) -> i64 {
        self.login_rate_limit
    }

    #[must_use]
    pub fn failure_disclosure(&self) -> FailureDisclosure {
        self.failure_disclosure
    }

    #[must_use]
    pub fn cookie(&self) -> &CookieConfig {
        &self.cookie
    }
}

#[derive(Debug)]
pub struct AuthState {
    config: AuthConfig,
    flow: LoginFlow,
}

impl AuthState {
    pub fn new(
        config: AuthConfig,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenGenerator>,
        events: LoginEventPublisher,
    ) -> Self {
        let limiter = LoginRateLimiter::new(config.login_rate_limit());
        Self::with_rate_limiter(config, users, tokens, events, limiter)
    }

    /// Same as [`AuthState::new`] with a caller-supplied limiter.
    pub fn with_rate_limiter(
        config: AuthConfig,
        users: Arc<dyn UserRepository>,
        tokens: Arc<dyn TokenGenerator>,
        events: LoginEventPublisher,
        limiter: LoginRateLimiter,
    ) -> Self {
        let flow = LoginFlow::new(
            limiter,
            CredentialVerifier::new(users),
            TokenIssuer::new(tokens, config.cookie().clone()),
            events,
        )
        .with_disclosure(config.failure_disclosure());
        Self { config, flow }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn flow(&self) -> &LoginFlow {
        &self.flow
    }

    pub(super) fn rate_limiter(&self) -> &LoginRateLimiter {
        self.flow.rate_limiter()
    }

    pub(super) fn tokens(&self) -> &dyn TokenGenerator {
        self.flow.issuer().generator()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.flow.verifier().users()
    }
}
