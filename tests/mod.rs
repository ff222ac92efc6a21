//! Integration tests for Cinemate
//!
//! Tests are organized by component:
//! - auth_client_test: Authenticated request wrapper (bearer header, refresh on 401, forced logout)
//! - login_test: Credential exchange (bearer login, TMDB handshake) and session manager
//! - tmdb_test: TMDB API client tests
//! - cli_test: Argument parsing, JSON output and command handlers

// Note: Each test file is a separate integration test crate
// Tests are run individually by cargo, not via mod.rs
