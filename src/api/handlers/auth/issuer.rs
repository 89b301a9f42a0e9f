//! Turns an authenticated identity into a session cookie.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::error;

use super::{
    cookie::{CookieConfig, SessionCookie},
    token::TokenGenerator,
};

#[derive(Clone)]
pub struct TokenIssuer {
    generator: Arc<dyn TokenGenerator>,
    cookie: CookieConfig,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("cookie", &self.cookie)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    #[must_use]
    pub fn new(generator: Arc<dyn TokenGenerator>, cookie: CookieConfig) -> Self {
        Self { generator, cookie }
    }

    #[must_use]
    pub fn cookie_config(&self) -> &CookieConfig {
        &self.cookie
    }

    #[must_use]
    pub fn generator(&self) -> &dyn TokenGenerator {
        self.generator.as_ref()
    }

    /// Sign a token and wrap it in a cookie.
    ///
    /// Returns `None` when signing is unavailable; the login itself still stands.
    #[must_use]
    pub fn issue(
        &self,
        identity: &str,
        roles: &BTreeSet<String>,
        request_secure: bool,
    ) -> Option<SessionCookie> {
        let Some(token) = self.generator.generate(identity, roles) else {
            error!("Token signing unavailable, no session cookie issued for {identity}");
            return None;
        };
        Some(
            self.cookie
                .session_cookie(token.access_token, token.expires_in, request_secure),
        )
    }
}
