//! # Turnstile
//!
//! `turnstile` is a small HTTP service that checks username/password
//! credentials and hands out a signed session cookie.
//!
//! ## Login Budget
//!
//! All login attempts draw from one shared, process-wide budget. Once it is
//! spent, attempts are refused with `429` until a rejected attempt happens to
//! refill it (a 1-in-5 draw). Every login response reports the budget through
//! the `X-Login-RateLimit` and `X-Login-RateLimit-Remaining` headers.
//!
//! ## Users
//!
//! Users are loaded at startup from a JSON file holding Argon2id PHC hashes.
//! Use `turnstile hash-password --password <secret>` to produce them.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
