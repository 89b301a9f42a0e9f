//! User lookup capability and the file-backed store used by the server.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tracing::debug;

/// A stored user. `password` holds an Argon2 PHC string, never the raw secret.
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("username", &self.username)
            .field("password", &"***")
            .field("roles", &self.roles)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact, case-sensitive lookup.
    ///
    /// # Errors
    /// Returns `StoreError` when the backing store cannot be reached.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Number of known users, when cheap to compute.
    fn len_hint(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UsersFileError {
    #[error("failed to read users file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid users file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate username: {0}")]
    Duplicate(String),
    #[error("empty username in users file")]
    EmptyUsername,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    users: HashMap<String, User>,
}

impl InMemoryUserRepository {
    /// Build a store from a list of users, rejecting duplicates and blank names.
    ///
    /// # Errors
    /// Returns `UsersFileError::Duplicate` or `UsersFileError::EmptyUsername`.
    pub fn from_users(users: Vec<User>) -> Result<Self, UsersFileError> {
        let mut map = HashMap::with_capacity(users.len());
        for user in users {
            if user.username.trim().is_empty() {
                return Err(UsersFileError::EmptyUsername);
            }
            if map.contains_key(&user.username) {
                return Err(UsersFileError::Duplicate(user.username));
            }
            map.insert(user.username.clone(), user);
        }
        Ok(Self { users: map })
    }

    /// Parse a JSON array of `{username, password, roles}` objects.
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the user list is invalid.
    pub fn from_json(json: &str) -> Result<Self, UsersFileError> {
        let users: Vec<User> = serde_json::from_str(json)?;
        Self::from_users(users)
    }

    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, UsersFileError> {
        let json = std::fs::read_to_string(path)?;
        let store = Self::from_json(&json)?;
        debug!(users = store.users.len(), path = %path.display(), "Loaded users file");
        Ok(store)
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(username).cloned())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.users.len())
    }
}
