//! Signed access tokens (HS256 JWT).

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, error};
use ulid::Ulid;

pub const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 60 * 60;
pub const DEFAULT_JWT_ISSUER: &str = "turnstile";

/// A freshly signed bearer token. Nothing is stored server-side.
#[derive(Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: Duration,
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"***")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iss: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Token signing capability.
pub trait TokenGenerator: Send + Sync {
    /// Sign a token for an authenticated identity. `None` means signing is unavailable.
    fn generate(&self, identity: &str, roles: &BTreeSet<String>) -> Option<IssuedToken>;

    /// Validate a previously issued token and return its claims.
    fn validate(&self, _token: &str) -> Option<TokenClaims> {
        None
    }
}

struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

pub struct JwtSigner {
    keys: Option<SigningKeys>,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("keys", &self.keys.as_ref().map(|_| "***"))
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl JwtSigner {
    /// Build a signer. A missing or empty secret leaves signing unavailable.
    #[must_use]
    pub fn new(secret: Option<&SecretString>, issuer: String, ttl: Duration) -> Self {
        let keys = secret
            .map(|secret| secret.expose_secret())
            .filter(|secret| !secret.is_empty())
            .map(|secret| SigningKeys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
            });
        Self { keys, issuer, ttl }
    }

    /// A signer that always declines.
    #[must_use]
    pub fn disabled() -> Self {
        Self::new(
            None,
            DEFAULT_JWT_ISSUER.to_string(),
            Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECONDS),
        )
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn now_unix_seconds() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_secs())
}

impl TokenGenerator for JwtSigner {
    fn generate(&self, identity: &str, roles: &BTreeSet<String>) -> Option<IssuedToken> {
        let keys = self.keys.as_ref()?;
        let iat = now_unix_seconds()?;
        let claims = TokenClaims {
            sub: identity.to_string(),
            roles: roles.iter().cloned().collect(),
            iss: self.issuer.clone(),
            iat,
            exp: iat.saturating_add(self.ttl.as_secs()),
            jti: Ulid::new().to_string(),
        };

        match encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding) {
            Ok(access_token) => {
                debug!("Signed access token for {identity}");
                Some(IssuedToken {
                    access_token,
                    expires_in: self.ttl,
                })
            }
            Err(err) => {
                error!("Failed to sign access token: {err}");
                None
            }
        }
    }

    fn validate(&self, token: &str) -> Option<TokenClaims> {
        let keys = self.keys.as_ref()?;
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.validate_aud = false;
        match decode::<TokenClaims>(token, &keys.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                debug!("Rejected session token: {err}");
                None
            }
        }
    }
}
