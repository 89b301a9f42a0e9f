//! Auth handlers and supporting modules.
//!
//! This module coordinates credential login, session cookies, and the login
//! attempt budget.
//!
//! ## Login Rate Limiting
//!
//! `/v1/auth/login` shares a single process-wide budget (default 10 attempts).
//!
//! - **Charging:** every admitted attempt costs one unit, successful or not.
//! - **Exhaustion:** further attempts are rejected with 429 without reaching the
//!   user store.
//! - **Refill:** each rejection has a 1-in-5 chance of refilling the budget.
//!
//! Every login response carries `X-Login-RateLimit` and
//! `X-Login-RateLimit-Remaining`.
//!
//! ## Session Tokens
//!
//! Successful logins receive an HS256 JWT in an `HttpOnly` cookie. When no
//! signing secret is configured the login still succeeds, just without a cookie.

pub(crate) mod cookie;
pub(crate) mod credentials;
pub(crate) mod events;
pub(crate) mod flow;
mod issuer;
pub(crate) mod login;
pub(crate) mod password;
pub(crate) mod rate_limit;
pub(crate) mod session;
mod state;
pub(crate) mod store;
pub(crate) mod token;
pub(crate) mod types;
mod utils;

pub use cookie::{CookieConfig, SameSite};
pub use credentials::FailureReason;
pub use events::{LoginEvent, LoginEventPublisher, spawn_audit_logger};
pub use flow::{FailureDisclosure, LoginFlow};
pub use password::hash_password;
pub use rate_limit::{LoginRateLimiter, ResetDraw};
pub use state::{AuthConfig, AuthState};
pub use store::{InMemoryUserRepository, StoreError, User, UserRepository};
pub use token::{JwtSigner, TokenGenerator};
