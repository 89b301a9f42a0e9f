//! Session cookie attributes and `Set-Cookie` rendering.

use axum::http::{HeaderValue, header::InvalidHeaderValue};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_COOKIE_NAME: &str = "JWT";
pub const DEFAULT_COOKIE_PATH: &str = "/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "none" => Ok(Self::None),
            _ => Err(format!("invalid SameSite value: {value}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CookieConfig {
    name: String,
    path: String,
    domain: Option<String>,
    http_only: bool,
    secure: Option<bool>,
    same_site: Option<SameSite>,
    max_age: Option<Duration>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_COOKIE_NAME.to_string(),
            path: DEFAULT_COOKIE_PATH.to_string(),
            domain: None,
            http_only: true,
            secure: None,
            same_site: None,
            max_age: None,
        }
    }
}

impl CookieConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: String) -> Self {
        self.path = path;
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: Option<String>) -> Self {
        self.domain = domain;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// Force the `Secure` attribute instead of mirroring the request.
    #[must_use]
    pub fn with_secure(mut self, secure: Option<bool>) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
        self.same_site = same_site;
        self
    }

    /// Explicit cookie lifetime. Takes precedence over the token expiry.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Configured value if any, otherwise whatever the request used.
    #[must_use]
    pub fn secure_for(&self, request_secure: bool) -> bool {
        self.secure.unwrap_or(request_secure)
    }

    /// Build the session cookie for a token with the given intrinsic expiry.
    #[must_use]
    pub fn session_cookie(
        &self,
        value: String,
        token_expires_in: Duration,
        request_secure: bool,
    ) -> SessionCookie {
        SessionCookie {
            name: self.name.clone(),
            value,
            path: self.path.clone(),
            domain: self.domain.clone(),
            http_only: self.http_only,
            secure: self.secure_for(request_secure),
            same_site: self.same_site,
            max_age: self.max_age.unwrap_or(token_expires_in),
        }
    }

    /// Cookie that removes the session on the client.
    #[must_use]
    pub fn clearing_cookie(&self, request_secure: bool) -> SessionCookie {
        SessionCookie {
            name: self.name.clone(),
            value: String::new(),
            path: self.path.clone(),
            domain: self.domain.clone(),
            http_only: self.http_only,
            secure: self.secure_for(request_secure),
            same_site: self.same_site,
            max_age: Duration::ZERO,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    pub max_age: Duration,
}

impl std::fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCookie")
            .field("name", &self.name)
            .field("value", &"***")
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("http_only", &self.http_only)
            .field("secure", &self.secure)
            .field("same_site", &self.same_site)
            .field("max_age", &self.max_age)
            .finish()
    }
}

impl SessionCookie {
    /// Render the `Set-Cookie` header value.
    #[must_use]
    pub fn render(&self) -> String {
        let mut parts = vec![
            format!("{}={}", self.name, self.value),
            format!("Path={}", self.path),
        ];
        if let Some(domain) = &self.domain {
            parts.push(format!("Domain={domain}"));
        }
        parts.push(format!("Max-Age={}", self.max_age.as_secs()));
        if self.http_only {
            parts.push("HttpOnly".to_string());
        }
        if self.secure {
            parts.push("Secure".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("SameSite={}", same_site.as_str()));
        }
        parts.join("; ")
    }

    /// # Errors
    /// Returns an error if the rendered cookie contains invalid header bytes.
    pub fn to_header_value(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.render())
    }
}
