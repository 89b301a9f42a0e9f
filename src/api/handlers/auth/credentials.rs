//! Username/password verification against the user store.

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};
use tracing::error;

use super::{
    password::{hash_password, verify_password},
    store::{StoreError, UserRepository},
};

/// Stand-in hash checked for unknown users so both failure paths pay for Argon2.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn dummy_hash() -> Option<&'static str> {
    DUMMY_HASH
        .get_or_init(|| match hash_password("turnstile-unknown-user") {
            Ok(hash) => Some(hash),
            Err(err) => {
                error!("Failed to prepare dummy password hash: {err}");
                None
            }
        })
        .as_deref()
}

/// Run the Argon2 check on the blocking pool. Any failure counts as a mismatch.
async fn check_secret(identity: &str, secret: &SecretString, stored: String) -> bool {
    let secret = SecretString::from(secret.expose_secret().to_string());
    let result =
        tokio::task::spawn_blocking(move || verify_password(secret.expose_secret(), &stored))
            .await;
    match result {
        Ok(Ok(matches)) => matches,
        Ok(Err(err)) => {
            error!("Stored password for user {identity} is unusable: {err}");
            false
        }
        Err(err) => {
            error!("Password verification task failed: {err}");
            false
        }
    }
}

/// Submitted login credentials. The password never leaves this struct unredacted.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    UserNotFound,
    CredentialsMismatch,
}

impl FailureReason {
    /// Human readable message naming the precise reason.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::UserNotFound => "User Not Found",
            Self::CredentialsMismatch => "Credentials Do Not Match",
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthenticationOutcome {
    Authenticated {
        identity: String,
        roles: BTreeSet<String>,
    },
    Failed {
        reason: FailureReason,
    },
}

#[derive(Clone)]
pub struct CredentialVerifier {
    users: Arc<dyn UserRepository>,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier").finish_non_exhaustive()
    }
}

impl CredentialVerifier {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserRepository {
        self.users.as_ref()
    }

    /// # Errors
    /// Returns `StoreError` when the lookup itself fails. A missing user is an outcome,
    /// not an error.
    pub async fn verify(
        &self,
        identity: &str,
        secret: &SecretString,
    ) -> Result<AuthenticationOutcome, StoreError> {
        let Some(user) = self.users.find_by_username(identity).await? else {
            // Same Argon2 cost as a wrong password; the result is irrelevant.
            if let Some(hash) = dummy_hash() {
                check_secret(identity, secret, hash.to_string()).await;
            }
            return Ok(AuthenticationOutcome::Failed {
                reason: FailureReason::UserNotFound,
            });
        };

        let matches = check_secret(identity, secret, user.password).await;

        if matches {
            Ok(AuthenticationOutcome::Authenticated {
                identity: user.username,
                roles: user.roles,
            })
        } else {
            Ok(AuthenticationOutcome::Failed {
                reason: FailureReason::CredentialsMismatch,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::store::{InMemoryUserRepository, User};
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    fn verifier() -> Result<CredentialVerifier> {
        let store = InMemoryUserRepository::from_users(vec![
            User {
                username: "alice".to_string(),
                password: hash_password("wonderland")?,
                roles: BTreeSet::from(["USER".to_string()]),
            },
            User {
                username: "mallory".to_string(),
                password: "not-a-phc-string".to_string(),
                roles: BTreeSet::new(),
            },
        ])?;
        Ok(CredentialVerifier::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn correct_password_authenticates_with_roles() -> Result<()> {
        let outcome = verifier()?
            .verify("alice", &SecretString::from("wonderland".to_string()))
            .await?;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Authenticated {
                identity: "alice".to_string(),
                roles: BTreeSet::from(["USER".to_string()]),
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn wrong_password_is_mismatch() -> Result<()> {
        let outcome = verifier()?
            .verify("alice", &SecretString::from("looking-glass".to_string()))
            .await?;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Failed {
                reason: FailureReason::CredentialsMismatch
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() -> Result<()> {
        let outcome = verifier()?
            .verify("bob", &SecretString::from("wonderland".to_string()))
            .await?;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Failed {
                reason: FailureReason::UserNotFound
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_mismatch() -> Result<()> {
        let outcome = verifier()?
            .verify("mallory", &SecretString::from("not-a-phc-string".to_string()))
            .await?;
        assert_eq!(
            outcome,
            AuthenticationOutcome::Failed {
                reason: FailureReason::CredentialsMismatch
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_pays_for_argon2() -> Result<()> {
        let verifier = verifier()?;
        // Warm up so the one-off dummy hash is not part of the timing.
        verifier
            .verify("bob", &SecretString::from("warm-up".to_string()))
            .await?;
        assert!(DUMMY_HASH.get().is_some_and(Option::is_some));

        let mut known = Duration::ZERO;
        let mut unknown = Duration::ZERO;
        for _ in 0..3 {
            let started = Instant::now();
            verifier
                .verify("alice", &SecretString::from("looking-glass".to_string()))
                .await?;
            known += started.elapsed();

            let started = Instant::now();
            verifier
                .verify("bob", &SecretString::from("looking-glass".to_string()))
                .await?;
            unknown += started.elapsed();
        }

        // Both paths run one Argon2 verification; allow generous scheduling noise.
        assert!(
            unknown * 4 >= known,
            "unknown user took {unknown:?}, known user {known:?}"
        );
        Ok(())
    }

    #[tokio::test]
    async fn verification_does_not_block_the_runtime() -> Result<()> {
        let verifier = verifier()?;
        let secret = SecretString::from("looking-glass".to_string());

        // Single-threaded runtime: the timer can only fire while the verifier yields.
        let (outcome, timer_done) = tokio::join!(
            async {
                let outcome = verifier.verify("alice", &secret).await;
                (outcome, Instant::now())
            },
            async {
                tokio::time::sleep(Duration::from_millis(1)).await;
                Instant::now()
            }
        );
        let (outcome, verify_done) = outcome;

        assert_eq!(
            outcome?,
            AuthenticationOutcome::Failed {
                reason: FailureReason::CredentialsMismatch
            }
        );
        assert!(timer_done < verify_done);
        Ok(())
    }

    struct DownStore;

    #[async_trait]
    impl UserRepository for DownStore {
        async fn find_by_username(&self, _username: &str) -> Result<Option<User>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn store_failure_is_an_error_not_an_outcome() {
        let verifier = CredentialVerifier::new(Arc::new(DownStore));
        let result = verifier
            .verify("alice", &SecretString::from("wonderland".to_string()))
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn failure_messages_name_the_reason() {
        assert_eq!(FailureReason::UserNotFound.message(), "User Not Found");
        assert_eq!(
            FailureReason::CredentialsMismatch.to_string(),
            "Credentials Do Not Match"
        );
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let credentials = Credentials::new("alice", "wonderland");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("wonderland"));
    }
}
