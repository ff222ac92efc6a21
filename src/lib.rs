//! Cinemate - movie discovery backed by TMDB
//!
//! The core is a session and token manager: credential exchange, persisted
//! tokens, and an authenticated request wrapper that refreshes once on 401.
//!
//! # Modules
//!
//! - `models` - Credentials, sessions, profiles and TMDB payloads
//! - `storage` - Key-value persistence and the token store
//! - `api` - TMDB and backend clients, authenticated request wrapper
//! - `auth` - Login strategies and the session manager
//! - `config` - Config file and environment
//! - `cli` / `commands` - Command line surface

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod storage;

// Re-export commonly used types
pub use models::{
    AuthMode, Credential, MovieDetail, MovieSummary, Page, Preferences, Session, TokenPair,
    UserProfile,
};

pub use api::{ApiError, AuthenticatedClient, BackendApi, TmdbClient};
pub use auth::{AuthStrategy, BearerRefreshAuth, HandshakeAuth, SessionManager, SessionState};
pub use config::Config;
pub use storage::{FileStore, KeyValueStore, MemoryStore, TokenStore};
