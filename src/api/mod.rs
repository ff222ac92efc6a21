//! API clients for external services
//!
//! - TMDB: movie metadata, account lists and the request-token handshake
//! - Backend: Cinemate REST auth endpoints
//! - Client: bearer-authenticated backend calls with one-shot token refresh

pub mod backend;
pub mod client;
pub mod error;
pub mod login_response;
pub mod tmdb;

pub use backend::BackendApi;
pub use client::{ApiRequest, AuthenticatedClient};
pub use error::ApiError;
pub use login_response::NormalizedLogin;
pub use tmdb::TmdbClient;
