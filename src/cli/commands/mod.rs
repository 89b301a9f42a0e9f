pub mod auth;
pub mod cookie;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_USERS_FILE: &str = "users-file";
pub const ARG_REQUEST_TIMEOUT_SECONDS: &str = "request-timeout-seconds";
pub const ARG_PASSWORD: &str = "password";

pub const CMD_SERVER: &str = "server";
pub const CMD_HASH_PASSWORD: &str = "hash-password";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("turnstile")
        .about("Rate-limited login and session cookie issuance")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand(Command::new(CMD_SERVER).about("Run the login API server (default)"))
        .subcommand(
            Command::new(CMD_HASH_PASSWORD)
                .about("Print an Argon2 PHC hash for the users file")
                .arg(
                    Arg::new(ARG_PASSWORD)
                        .long(ARG_PASSWORD)
                        .help("Password to hash")
                        .env("TURNSTILE_PASSWORD")
                        .hide_env_values(true)
                        .required(true),
                ),
        )
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("TURNSTILE_PORT")
                .value_parser(clap::value_parser!(u16))
                .global(true),
        )
        .arg(
            Arg::new(ARG_USERS_FILE)
                .short('u')
                .long(ARG_USERS_FILE)
                .help("JSON file with the users allowed to log in")
                .long_help(
                    "JSON file with the users allowed to log in: an array of {username, password, roles} where password is an Argon2 PHC hash (see `turnstile hash-password`).",
                )
                .env("TURNSTILE_USERS_FILE")
                .global(true),
        )
        .arg(
            Arg::new(ARG_REQUEST_TIMEOUT_SECONDS)
                .long(ARG_REQUEST_TIMEOUT_SECONDS)
                .help("Per-request timeout in seconds")
                .default_value("10")
                .env("TURNSTILE_REQUEST_TIMEOUT_SECONDS")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        );

    let command = auth::with_args(command);
    let command = cookie::with_args(command);
    logging::with_args(command)
}
