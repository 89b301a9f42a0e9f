//! API handlers for turnstile.

pub mod auth;
pub mod health;
pub mod subscriptions;
