//! Explicit session state for the application
//!
//! Created once at startup with one [`AuthStrategy`]; every screen or command
//! that needs to know "who is logged in" asks the manager instead of reading
//! shared globals. The token store stays the single source of truth.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::strategy::AuthStrategy;
use crate::api::ApiError;
use crate::models::{AuthMode, Credential, Session, UserProfile};
use crate::storage::TokenStore;

/// Startup behaviour when no session is persisted
#[derive(Clone, Default)]
pub struct AutoLogin {
    pub enabled: bool,
    pub credential: Option<Credential>,
}

impl fmt::Debug for AutoLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoLogin")
            .field("enabled", &self.enabled)
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}

impl AutoLogin {
    pub fn disabled() -> Self {
        Self::default()
    }

    fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref().filter(|_| self.enabled)
    }
}

/// How `init` ended up with (or without) a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// A persisted session was found
    Restored(Session),
    /// No session was persisted; auto-login created one
    AutoLoggedIn(Session),
    LoggedOut,
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Restored(s) | SessionState::AutoLoggedIn(s) => Some(s),
            SessionState::LoggedOut => None,
        }
    }
}

pub struct SessionManager {
    strategy: Arc<dyn AuthStrategy>,
    store: TokenStore,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("mode", &self.strategy.mode())
            .field("store", &self.store)
            .finish()
    }
}

impl SessionManager {
    pub fn new(strategy: Arc<dyn AuthStrategy>, store: TokenStore) -> Self {
        Self { strategy, store }
    }

    pub fn mode(&self) -> AuthMode {
        self.strategy.mode()
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Restore the persisted session, or auto-login when configured.
    ///
    /// An auto-login failure is logged and leaves the manager logged out.
    pub async fn init(&self, auto_login: &AutoLogin) -> SessionState {
        if let Some(session) = self.session() {
            if session.mode() != self.mode() {
                warn!(
                    stored = %session.mode(),
                    active = %self.mode(),
                    "Persisted session belongs to another auth mode"
                );
            }
            debug!(mode = %session.mode(), "Restored persisted session");
            return SessionState::Restored(session);
        }

        let Some(credential) = auto_login.credential() else {
            return SessionState::LoggedOut;
        };

        info!(username = %credential.username, "Auto-login with configured credentials");
        match self.strategy.login(credential).await {
            Ok(session) => SessionState::AutoLoggedIn(session),
            Err(e) => {
                warn!(error = %e, "Auto-login failed");
                SessionState::LoggedOut
            }
        }
    }

    pub async fn login(&self, credential: &Credential) -> Result<Session, ApiError> {
        self.strategy.login(credential).await
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        self.strategy.logout().await
    }

    /// Logout that never fails: remote errors were already tolerated, local
    /// clear errors are logged
    pub async fn teardown(&self) {
        if let Err(e) = self.strategy.logout().await {
            warn!(error = %e, "Logout failed during teardown");
            if let Err(e) = self.store.clear() {
                warn!(error = %e, "Failed to clear token store during teardown");
            }
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.store.is_logged_in()
    }

    pub fn session(&self) -> Option<Session> {
        self.store.session()
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.store.profile()
    }
}
