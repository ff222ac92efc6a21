//! Authentication module for logging in and managing sessions.
//!
//! This module provides:
//! - `AuthStrategy`: one login protocol per deployment
//!   (`HandshakeAuth` for TMDB, `BearerRefreshAuth` for the REST backend)
//! - `SessionManager`: explicit session state with init/teardown

pub mod session;
pub mod strategy;

pub use session::{AutoLogin, SessionManager, SessionState};
pub use strategy::{AuthStrategy, BearerRefreshAuth, HandshakeAuth};
