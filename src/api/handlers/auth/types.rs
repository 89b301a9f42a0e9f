//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserView {
    pub username: String,
    pub roles: Vec<String>,
}

/// Body of every login response: either the user or an error message.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum LoginPayload {
    User {
        user: UserView,
    },
    Error {
        #[serde(rename = "errorMessage")]
        error_message: String,
    },
}

impl LoginPayload {
    #[must_use]
    pub fn error(message: &str) -> Self {
        Self::Error {
            error_message: message.to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionResponse {
    pub username: String,
    pub roles: Vec<String>,
    pub expires_at: u64,
}
