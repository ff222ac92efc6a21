//! Cinemate - movie discovery backed by TMDB
//!
//! # Usage
//!
//! ```bash
//! cinemate login alice --password-stdin
//! cinemate popular
//! cinemate movie 27205 --json
//! cinemate logout
//! ```

use std::io;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cinemate::api::tmdb::{AccountList, MovieList};
use cinemate::cli::{Cli, Command, ExitCode, Output};
use cinemate::commands;
use cinemate::config::Config;

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // RUST_LOG controls the level (e.g. RUST_LOG=cinemate=debug); stdout stays JSON-clean
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let cli = Cli::parse();
    run_cli(cli).await.into()
}

/// Apply global flags on top of the file and environment config
fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::resolve(cli.config.as_deref());
    if let Some(storage) = &cli.storage {
        config.storage_path = Some(storage.clone());
    }
    if let Some(mode) = cli.mode {
        config.auth_mode = Some(mode);
    }
    config
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);
    let config = resolve_config(&cli);
    debug!(mode = %config.auth_mode(), "Configuration resolved");

    let result = match cli.command {
        Command::Login(cmd) => commands::login_cmd(cmd, &config, &output).await,
        Command::Signup(cmd) => commands::signup_cmd(cmd, &config, &output).await,
        Command::Logout(cmd) => commands::logout_cmd(cmd, &config, &output).await,
        Command::Whoami => commands::whoami_cmd(&config, &output).await,
        Command::Status => commands::status_cmd(&config, &output).await,
        Command::RefreshProfile => commands::refresh_profile_cmd(&config, &output).await,

        Command::Popular(args) => {
            commands::list_cmd(MovieList::Popular, args, &config, &output).await
        }
        Command::NowPlaying(args) => {
            commands::list_cmd(MovieList::NowPlaying, args, &config, &output).await
        }
        Command::TopRated(args) => {
            commands::list_cmd(MovieList::TopRated, args, &config, &output).await
        }
        Command::Upcoming(args) => {
            commands::list_cmd(MovieList::Upcoming, args, &config, &output).await
        }
        Command::Genre(cmd) => commands::genre_cmd(cmd, &config, &output).await,
        Command::Search(cmd) => commands::search_cmd(cmd, &config, &output).await,
        Command::Movie(cmd) => commands::movie_cmd(cmd, &config, &output).await,
        Command::Person(cmd) => commands::person_cmd(cmd, &config, &output).await,
        Command::Providers(cmd) => commands::providers_cmd(cmd, &config, &output).await,

        Command::Watchlist(cmd) => {
            commands::account_list_cmd(AccountList::Watchlist, cmd, &config, &output).await
        }
        Command::Favorites(cmd) => {
            commands::account_list_cmd(AccountList::Favorite, cmd, &config, &output).await
        }

        Command::Prefs(cmd) => commands::prefs_cmd(cmd, &config, &output).await,
    };

    match result {
        Ok(()) => ExitCode::Success,
        Err(code) => code,
    }
}
