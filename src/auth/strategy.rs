//! Login protocols behind one interface
//!
//! A deployment picks exactly one: the TMDB request-token handshake or the
//! backend's access/refresh token exchange.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::api::backend::is_credential_rejection;
use crate::api::{login_response, ApiError, AuthenticatedClient, BackendApi, TmdbClient};
use crate::models::{AuthMode, Credential, RegisterRequest, Session, UserProfile};
use crate::storage::TokenStore;

/// Converts a credential into a persisted session and tears it down again
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn mode(&self) -> AuthMode;

    /// Log in and persist the session. On failure storage is left untouched.
    async fn login(&self, credential: &Credential) -> Result<Session, ApiError>;

    /// Best-effort remote logout, then clear the token store
    async fn logout(&self) -> Result<(), ApiError>;
}

// =============================================================================
// Handshake (TMDB)
// =============================================================================

/// request token -> validate with login -> session id
#[derive(Debug, Clone)]
pub struct HandshakeAuth {
    tmdb: TmdbClient,
    store: TokenStore,
}

impl HandshakeAuth {
    pub fn new(tmdb: TmdbClient, store: TokenStore) -> Self {
        Self { tmdb, store }
    }

    pub fn tmdb(&self) -> &TmdbClient {
        &self.tmdb
    }

    /// Account id and profile are a bonus; the login already succeeded
    async fn cache_account_details(&self, session_id: &str) -> Option<u64> {
        match self.tmdb.account_details(session_id).await {
            Ok(account) => {
                if let Err(e) = self.store.store_account_id(account.id) {
                    warn!(error = %e, "Failed to persist account id");
                }
                let mut profile = UserProfile::from(&account);
                if profile.username.is_none() {
                    profile.username = self.store.username();
                }
                if let Err(e) = self.store.store_profile(&profile) {
                    warn!(error = %e, "Failed to persist account profile");
                }
                Some(account.id)
            }
            Err(e) => {
                warn!(error = %e, "Could not fetch account details after login");
                None
            }
        }
    }
}

#[async_trait]
impl AuthStrategy for HandshakeAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::Handshake
    }

    async fn login(&self, credential: &Credential) -> Result<Session, ApiError> {
        let request_token = self.tmdb.create_request_token().await?;
        debug!("Request token created");

        if !self.tmdb.validate_with_login(&request_token, credential).await? {
            return Err(ApiError::LoginRejected(
                "TMDB did not validate the request token".to_string(),
            ));
        }
        debug!("Request token validated");

        let session_id = self.tmdb.create_session(&request_token).await?;
        self.store
            .begin_handshake_session(&session_id, &credential.username)?;
        info!(username = %credential.username, "TMDB session created");

        let account_id = self.cache_account_details(&session_id).await;
        Ok(Session::Handshake {
            session_id,
            account_id,
        })
    }

    async fn logout(&self) -> Result<(), ApiError> {
        if let Some(session_id) = self.store.session_id() {
            match self.tmdb.delete_session(&session_id).await {
                Ok(_) => debug!("TMDB session deleted"),
                Err(e) => warn!(error = %e, "Failed to delete TMDB session, logging out locally"),
            }
        }
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }
}

// =============================================================================
// Bearer refresh (REST backend)
// =============================================================================

/// Username/password -> access/refresh token pair
#[derive(Debug, Clone)]
pub struct BearerRefreshAuth {
    backend: BackendApi,
    store: TokenStore,
}

impl BearerRefreshAuth {
    pub fn new(backend: BackendApi, store: TokenStore) -> Self {
        Self { backend, store }
    }

    pub fn backend(&self) -> &BackendApi {
        &self.backend
    }

    /// Wrapper for authenticated calls sharing this strategy's store
    pub fn client(&self) -> AuthenticatedClient {
        AuthenticatedClient::new(self.backend.clone(), self.store.clone())
    }

    /// Normalize an auth payload and persist tokens and profile
    fn persist(&self, payload: &serde_json::Value) -> Result<Session, ApiError> {
        let login = login_response::normalize_login(payload)?;
        if login.user.is_none() {
            debug!("No user data in auth response");
        }
        self.store
            .begin_bearer_session(&login.tokens, login.user.as_ref())?;
        Ok(Session::Bearer(login.tokens))
    }

    /// Create an account and log straight into it
    pub async fn register(&self, request: &RegisterRequest) -> Result<Session, ApiError> {
        let payload = self.backend.register(request).await?;
        let session = self.persist(&payload)?;
        info!(username = %request.username, "Account registered");
        Ok(session)
    }
}

#[async_trait]
impl AuthStrategy for BearerRefreshAuth {
    fn mode(&self) -> AuthMode {
        AuthMode::Bearer
    }

    async fn login(&self, credential: &Credential) -> Result<Session, ApiError> {
        let payload = match self.backend.login(credential).await {
            Ok(payload) => payload,
            Err(e) => {
                if e.status().is_some_and(is_credential_rejection) {
                    info!(username = %credential.username, "Backend rejected credentials");
                }
                return Err(e);
            }
        };
        let session = self.persist(&payload)?;
        info!(username = %credential.username, "Logged in");
        Ok(session)
    }

    async fn logout(&self) -> Result<(), ApiError> {
        if let Some(refresh_token) = self.store.refresh_token() {
            if let Err(e) = self.backend.logout(&refresh_token).await {
                warn!(error = %e, "Backend logout failed, logging out locally");
            }
        }
        self.store.clear()?;
        info!("Logged out");
        Ok(())
    }
}
