use crate::api::handlers::auth::{
    CookieConfig, SameSite,
    cookie::{DEFAULT_COOKIE_NAME, DEFAULT_COOKIE_PATH},
};
use anyhow::{Result, anyhow};
use clap::{Arg, ArgMatches, Command};
use std::time::Duration;

pub const ARG_COOKIE_NAME: &str = "cookie-name";
pub const ARG_COOKIE_MAX_AGE_SECONDS: &str = "cookie-max-age-seconds";
pub const ARG_COOKIE_PATH: &str = "cookie-path";
pub const ARG_COOKIE_DOMAIN: &str = "cookie-domain";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";
pub const ARG_COOKIE_SAME_SITE: &str = "cookie-same-site";

#[derive(Debug)]
pub struct Options {
    pub name: String,
    pub max_age_seconds: Option<u64>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: Option<bool>,
    pub same_site: Option<SameSite>,
}

impl Options {
    /// # Errors
    /// Returns an error if `SameSite` is not one of strict, lax or none.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let same_site = matches
            .get_one::<String>(ARG_COOKIE_SAME_SITE)
            .map(|value| value.parse::<SameSite>())
            .transpose()
            .map_err(|err| anyhow!(err))?;

        Ok(Self {
            name: matches
                .get_one::<String>(ARG_COOKIE_NAME)
                .cloned()
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            max_age_seconds: matches.get_one::<u64>(ARG_COOKIE_MAX_AGE_SECONDS).copied(),
            path: matches
                .get_one::<String>(ARG_COOKIE_PATH)
                .cloned()
                .unwrap_or_else(|| DEFAULT_COOKIE_PATH.to_string()),
            domain: matches.get_one::<String>(ARG_COOKIE_DOMAIN).cloned(),
            secure: matches.get_one::<bool>(ARG_COOKIE_SECURE).copied(),
            same_site,
        })
    }

    #[must_use]
    pub fn into_config(self) -> CookieConfig {
        CookieConfig::new()
            .with_name(self.name)
            .with_path(self.path)
            .with_domain(self.domain)
            .with_secure(self.secure)
            .with_same_site(self.same_site)
            .with_max_age(self.max_age_seconds.map(Duration::from_secs))
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_COOKIE_NAME)
                .long(ARG_COOKIE_NAME)
                .help("Name of the session cookie")
                .env("TURNSTILE_COOKIE_NAME")
                .default_value(DEFAULT_COOKIE_NAME)
                .global(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_MAX_AGE_SECONDS)
                .long(ARG_COOKIE_MAX_AGE_SECONDS)
                .help("Session cookie Max-Age in seconds (default: token lifetime)")
                .env("TURNSTILE_COOKIE_MAX_AGE_SECONDS")
                .value_parser(clap::value_parser!(u64))
                .global(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_PATH)
                .long(ARG_COOKIE_PATH)
                .help("Path attribute of the session cookie")
                .env("TURNSTILE_COOKIE_PATH")
                .default_value(DEFAULT_COOKIE_PATH)
                .global(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_DOMAIN)
                .long(ARG_COOKIE_DOMAIN)
                .help("Domain attribute of the session cookie")
                .env("TURNSTILE_COOKIE_DOMAIN")
                .global(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Force the Secure attribute on or off (default: mirror the request)")
                .env("TURNSTILE_COOKIE_SECURE")
                .value_parser(clap::value_parser!(bool))
                .global(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_SAME_SITE)
                .long(ARG_COOKIE_SAME_SITE)
                .help("SameSite attribute of the session cookie: strict, lax or none")
                .env("TURNSTILE_COOKIE_SAME_SITE")
                .value_parser(["strict", "lax", "none"])
                .ignore_case(true)
                .global(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOKIE_ENV: [(&str, Option<&str>); 6] = [
        ("TURNSTILE_COOKIE_NAME", None),
        ("TURNSTILE_COOKIE_MAX_AGE_SECONDS", None),
        ("TURNSTILE_COOKIE_PATH", None),
        ("TURNSTILE_COOKIE_DOMAIN", None),
        ("TURNSTILE_COOKIE_SECURE", None),
        ("TURNSTILE_COOKIE_SAME_SITE", None),
    ];

    #[test]
    fn defaults_mirror_request_security() -> Result<()> {
        let matches = temp_env::with_vars(COOKIE_ENV, || {
            with_args(Command::new("test")).get_matches_from(vec!["test"])
        });
        let options = Options::parse(&matches)?;
        assert_eq!(options.name, "JWT");
        assert_eq!(options.path, "/");
        assert!(options.secure.is_none());
        assert!(options.max_age_seconds.is_none());

        let config = options.into_config();
        assert!(config.secure_for(true));
        assert!(!config.secure_for(false));
        Ok(())
    }

    #[test]
    fn flags_build_cookie_config() -> Result<()> {
        let matches = temp_env::with_vars(COOKIE_ENV, || {
            with_args(Command::new("test")).get_matches_from(vec![
                "test",
                "--cookie-name",
                "sid",
                "--cookie-max-age-seconds",
                "120",
                "--cookie-secure",
                "true",
                "--cookie-same-site",
                "Lax",
                "--cookie-domain",
                "example.com",
            ])
        });
        let config = Options::parse(&matches)?.into_config();
        assert_eq!(config.name(), "sid");
        assert_eq!(config.max_age(), Some(Duration::from_secs(120)));
        assert!(config.secure_for(false));
        assert_eq!(
            config
                .session_cookie("t".to_string(), Duration::from_secs(5), false)
                .render(),
            "sid=t; Path=/; Domain=example.com; Max-Age=120; HttpOnly; Secure; SameSite=Lax"
        );
        Ok(())
    }
}
