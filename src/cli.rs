//! CLI - Command Line Interface for Cinemate
//!
//! Every screen of the app has a scriptable counterpart. All output is
//! JSON-parseable with `--json` (the default when stdout is not a terminal).
//!
//! # Examples
//!
//! ```bash
//! # Log in against the configured backend
//! cinemate login alice --password-stdin < secret.txt
//!
//! # Browse
//! cinemate popular --page 2
//! cinemate genre sci-fi
//! cinemate movie 27205 --json
//!
//! # Session
//! cinemate whoami
//! cinemate logout
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::io::IsTerminal;
use std::path::PathBuf;

use crate::api::ApiError;
use crate::models::{AuthMode, Genre, ThemeMode};

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Network error
    NetworkError = 3,
    /// Credentials rejected or not logged in
    AuthFailed = 4,
    /// Token refresh failed; the session was cleared
    SessionExpired = 5,
    /// Missing or invalid configuration
    ConfigError = 6,
}

impl ExitCode {
    /// Map a library error onto the exit code scripts should see
    pub fn for_api_error(error: &ApiError) -> Self {
        match error {
            ApiError::Network(_) => ExitCode::NetworkError,
            ApiError::SessionExpired => ExitCode::SessionExpired,
            ApiError::LoginRejected(_) | ApiError::NotLoggedIn => ExitCode::AuthFailed,
            ApiError::UnsupportedMode(_) => ExitCode::ConfigError,
            e if e.is_unauthorized() => ExitCode::AuthFailed,
            _ => ExitCode::Error,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// Cinemate - discover movies from your terminal
#[derive(Parser, Debug)]
#[command(
    name = "cinemate",
    version,
    about = "Movie discovery backed by TMDB",
    long_about = "Browse popular, upcoming and top rated movies, search TMDB,\n\
                  and manage your watchlist and favorites.\n\n\
                  Sessions are persisted between runs; expired tokens are\n\
                  refreshed automatically.",
    after_help = "EXAMPLES:\n\
                  cinemate login alice               Log in (prompts for password on stdin)\n\
                  cinemate popular                   First page of popular movies\n\
                  cinemate search \"blade runner\"     Search movies\n\
                  cinemate watchlist add 78          Add a movie to the watchlist"
)]
pub struct Cli {
    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Path to the session storage file
    #[arg(long, global = true)]
    pub storage: Option<PathBuf>,

    /// Login protocol: bearer (REST backend) or handshake (TMDB)
    #[arg(long, short = 'm', global = true)]
    pub mode: Option<AuthMode>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log in and persist the session
    Login(LoginCmd),

    /// Create a backend account and log into it
    #[command(visible_alias = "register")]
    Signup(SignupCmd),

    /// End the session (remote logout is best-effort)
    Logout(LogoutCmd),

    /// Show the cached profile of the logged-in user
    Whoami,

    /// Show session state
    Status,

    /// Fetch the current user from the backend and cache it
    RefreshProfile,

    /// Popular movies
    Popular(PageArgs),

    /// Movies in theaters
    NowPlaying(PageArgs),

    /// Top rated movies
    TopRated(PageArgs),

    /// Upcoming movies
    Upcoming(PageArgs),

    /// Movies of one genre
    Genre(GenreCmd),

    /// Search movies by title
    #[command(visible_alias = "s")]
    Search(SearchCmd),

    /// Movie details with cast, trailer and similar titles
    #[command(visible_alias = "i")]
    Movie(MovieCmd),

    /// Person details and filmography
    Person(PersonCmd),

    /// Where to watch a movie
    Providers(ProvidersCmd),

    /// Show or edit the watchlist (TMDB session)
    Watchlist(AccountListCmd),

    /// Show or edit favorites (TMDB session)
    #[command(visible_alias = "favs")]
    Favorites(AccountListCmd),

    /// Show or change UI preferences
    Prefs(PrefsCmd),
}

// =============================================================================
// Session Commands
// =============================================================================

/// Username and password; the password is never a positional argument
#[derive(Args, Debug)]
pub struct LoginCmd {
    /// Username (defaults to the configured default username)
    pub username: Option<String>,

    /// Password (prefer --password-stdin)
    #[arg(long, short = 'p', conflicts_with = "password_stdin")]
    pub password: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,
}

#[derive(Args, Debug)]
pub struct SignupCmd {
    #[arg(long)]
    pub first_name: String,

    #[arg(long)]
    pub last_name: String,

    #[arg(long, short = 'u')]
    pub username: String,

    #[arg(long, short = 'e')]
    pub email: String,

    /// Password (prefer --password-stdin)
    #[arg(long, short = 'p', conflicts_with = "password_stdin")]
    pub password: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub password_stdin: bool,

    /// Birth date (YYYY-MM-DD)
    #[arg(long)]
    pub birth_date: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    /// Skip the username/email availability check
    #[arg(long)]
    pub no_check: bool,
}

#[derive(Args, Debug)]
pub struct LogoutCmd {
    /// Also forget UI preferences
    #[arg(long)]
    pub purge: bool,
}

// =============================================================================
// Browse Commands
// =============================================================================

#[derive(Args, Debug, Clone, Copy)]
pub struct PageArgs {
    /// Page number (1-based)
    #[arg(long, short = 'P', default_value = "1", value_parser = clap::value_parser!(u32).range(1..=500))]
    pub page: u32,

    /// Maximum number of results to show
    #[arg(long, short = 'l')]
    pub limit: Option<usize>,
}

/// Movies of one genre (action, comedy, horror, documentary, animation, sci-fi)
#[derive(Args, Debug)]
pub struct GenreCmd {
    pub genre: Genre,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct SearchCmd {
    /// Search query (title, keywords)
    #[arg(required = true)]
    pub query: String,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct MovieCmd {
    /// TMDB movie id
    pub id: u64,
}

#[derive(Args, Debug)]
pub struct PersonCmd {
    /// TMDB person id
    pub id: u64,
}

#[derive(Args, Debug)]
pub struct ProvidersCmd {
    /// TMDB movie id
    pub id: u64,

    /// ISO 3166-1 country code
    #[arg(long, default_value = "FR")]
    pub country: String,
}

// =============================================================================
// Account Lists
// =============================================================================

#[derive(Args, Debug)]
pub struct AccountListCmd {
    #[command(subcommand)]
    pub action: Option<ListAction>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListAction {
    /// Add a movie by TMDB id
    Add { id: u64 },
    /// Remove a movie by TMDB id
    #[command(visible_alias = "rm")]
    Remove { id: u64 },
}

// =============================================================================
// Preferences
// =============================================================================

#[derive(Args, Debug)]
pub struct PrefsCmd {
    #[arg(long, value_enum)]
    pub theme: Option<ThemeArg>,

    #[arg(long, value_enum)]
    pub notifications: Option<Toggle>,
}

impl PrefsCmd {
    pub fn is_update(&self) -> bool {
        self.theme.is_some() || self.notifications.is_some()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeArg {
    Light,
    Dark,
}

impl From<ThemeArg> for ThemeMode {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Light => ThemeMode::Light,
            ThemeArg::Dark => ThemeMode::Dark,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl From<Toggle> for bool {
    fn from(toggle: Toggle) -> bool {
        toggle == Toggle::On
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

/// Session state as reported by `status`
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatus {
    pub logged_in: bool,
    pub mode: AuthMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_kind: Option<AuthMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Refresh token missing; the access token doubles as refresh token
    pub degraded: bool,
    pub storage_keys: Vec<String>,
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
        }
    }

    /// Print success data as JSON, or as the human rendering on a terminal
    pub fn print<T, F>(&self, data: T, human: F) -> anyhow::Result<()>
    where
        T: Serialize,
        F: FnOnce(&T) -> String,
    {
        if self.json {
            let output = JsonOutput::success(data);
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!("{}", human(&data));
        }
        Ok(())
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Report a library error with its user-facing message and exit code
    pub fn api_error(&self, context: &str, error: &ApiError) -> ExitCode {
        self.error(
            format!("{}: {}", context, error.user_message()),
            ExitCode::for_api_error(error),
        )
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
