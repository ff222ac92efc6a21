//! Typed access to the persisted session, profile and preferences
//!
//! Reads never fail: an empty store (first run) or an unreadable value reads
//! as `None` and is logged. Writes surface `StorageError` so a login can
//! report that its session was not persisted.

use std::fmt;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use super::kv::{KeyValueStore, StorageError};
use crate::models::{Preferences, Session, TokenPair, UserProfile};

/// Namespaced storage keys
pub mod keys {
    pub const ACCESS_TOKEN: &str = "cinemate.access_token";
    pub const REFRESH_TOKEN: &str = "cinemate.refresh_token";
    pub const USER_DATA: &str = "cinemate.user_data";
    pub const USER_PREFERENCES: &str = "cinemate.user_preferences";
    pub const TMDB_SESSION_ID: &str = "cinemate.tmdb_session_id";
    pub const TMDB_ACCOUNT_ID: &str = "cinemate.tmdb_account_id";

    /// Everything owned by the session; cleared on logout
    pub const SESSION_KEYS: &[&str] = &[
        ACCESS_TOKEN,
        REFRESH_TOKEN,
        USER_DATA,
        TMDB_SESSION_ID,
        TMDB_ACCOUNT_ID,
    ];
}

/// Token Store. Clone is cheap; clones share the same backend.
#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by memory only (tests, one-shot commands)
    pub fn in_memory() -> Self {
        Self::new(Arc::new(super::kv::MemoryStore::new()))
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.backend.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read from storage");
                None
            }
        }
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.read(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Ignoring unreadable stored value");
                None
            }
        }
    }

    fn write_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key, &json)
    }

    // ===== Bearer tokens =====

    /// Persist both tokens in one write
    pub fn store_tokens(&self, tokens: &TokenPair) -> Result<(), StorageError> {
        self.backend.set_many(&[
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
        ])?;
        debug!(degraded = tokens.is_degraded(), "Tokens stored");
        Ok(())
    }

    /// Replace whatever session was stored with a fresh bearer session.
    ///
    /// Drops the previous profile and handshake keys in the same write, so a
    /// second login never inherits the first user's data.
    pub fn begin_bearer_session(
        &self,
        tokens: &TokenPair,
        profile: Option<&UserProfile>,
    ) -> Result<(), StorageError> {
        let profile_json = profile.map(serde_json::to_string).transpose()?;
        let mut entries = vec![
            (keys::ACCESS_TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
        ];
        if let Some(ref json) = profile_json {
            entries.push((keys::USER_DATA, json.as_str()));
        }
        self.backend.replace(keys::SESSION_KEYS, &entries)?;
        debug!(
            degraded = tokens.is_degraded(),
            has_profile = profile.is_some(),
            "Bearer session started"
        );
        Ok(())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read(keys::REFRESH_TOKEN)
    }

    /// Stored pair; a missing refresh token falls back to the access token
    pub fn tokens(&self) -> Option<TokenPair> {
        let access = self.access_token()?;
        let refresh = self.refresh_token().unwrap_or_else(|| access.clone());
        Some(TokenPair::new(access, refresh))
    }

    // ===== Handshake session =====

    pub fn store_handshake_session(&self, session_id: &str) -> Result<(), StorageError> {
        self.backend.set(keys::TMDB_SESSION_ID, session_id)
    }

    /// Replace whatever session was stored with a handshake session whose
    /// profile holds only the username
    pub fn begin_handshake_session(
        &self,
        session_id: &str,
        username: &str,
    ) -> Result<(), StorageError> {
        let profile = UserProfile {
            username: Some(username.to_string()),
            ..Default::default()
        };
        let profile_json = serde_json::to_string(&profile)?;
        self.backend.replace(
            keys::SESSION_KEYS,
            &[
                (keys::TMDB_SESSION_ID, session_id),
                (keys::USER_DATA, profile_json.as_str()),
            ],
        )?;
        debug!("Handshake session started");
        Ok(())
    }

    pub fn session_id(&self) -> Option<String> {
        self.read(keys::TMDB_SESSION_ID)
    }

    pub fn store_account_id(&self, account_id: u64) -> Result<(), StorageError> {
        self.backend
            .set(keys::TMDB_ACCOUNT_ID, &account_id.to_string())
    }

    pub fn account_id(&self) -> Option<u64> {
        let raw = self.read(keys::TMDB_ACCOUNT_ID)?;
        match raw.trim().parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(value = %raw, "Ignoring non-numeric stored account id");
                None
            }
        }
    }

    /// Whichever session representation is persisted, bearer first
    pub fn session(&self) -> Option<Session> {
        if let Some(tokens) = self.tokens() {
            return Some(Session::Bearer(tokens));
        }
        self.session_id().map(|session_id| Session::Handshake {
            session_id,
            account_id: self.account_id(),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.access_token().is_some() || self.session_id().is_some()
    }

    // ===== Profile =====

    pub fn store_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.write_json(keys::USER_DATA, profile)
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.read_json(keys::USER_DATA)
    }

    pub fn username(&self) -> Option<String> {
        self.profile().and_then(|p| p.username)
    }

    // ===== Preferences =====

    pub fn store_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        self.write_json(keys::USER_PREFERENCES, preferences)
    }

    pub fn preferences(&self) -> Option<Preferences> {
        self.read_json(keys::USER_PREFERENCES)
    }

    pub fn preferences_or_default(&self) -> Preferences {
        self.preferences().unwrap_or_default()
    }

    // ===== Clearing =====

    /// Remove every session-owned key. Preferences are kept.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.backend.remove_many(keys::SESSION_KEYS)?;
        debug!("Session data cleared");
        Ok(())
    }

    /// `clear` plus preferences
    pub fn clear_all(&self) -> Result<(), StorageError> {
        let mut all = keys::SESSION_KEYS.to_vec();
        all.push(keys::USER_PREFERENCES);
        self.backend.remove_many(&all)?;
        debug!("All user data cleared");
        Ok(())
    }

    /// Keys currently present (debug aid)
    pub fn debug_keys(&self) -> Vec<String> {
        self.backend.keys().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to list storage keys");
            Vec::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ThemeMode, UserId};
    use crate::storage::kv::MemoryStore;

    #[test]
    fn test_empty_store_reads_none() {
        let store = TokenStore::in_memory();
        assert!(store.access_token().is_none());
        assert!(store.tokens().is_none());
        assert!(store.session().is_none());
        assert!(store.profile().is_none());
        assert!(store.preferences().is_none());
        assert!(store.account_id().is_none());
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_handshake_session_read_back() {
        let store = TokenStore::in_memory();
        store.store_handshake_session("sess-1").unwrap();
        store.store_account_id(42).unwrap();

        assert!(store.is_logged_in());
        assert_eq!(
            store.session(),
            Some(Session::Handshake {
                session_id: "sess-1".into(),
                account_id: Some(42),
            })
        );
    }

    #[test]
    fn test_corrupted_values_read_as_none() {
        let backend = Arc::new(MemoryStore::new());
        backend.set(keys::USER_DATA, "{broken").unwrap();
        backend.set(keys::TMDB_ACCOUNT_ID, "not-a-number").unwrap();
        let store = TokenStore::new(backend);

        assert!(store.profile().is_none());
        assert!(store.account_id().is_none());
    }

    #[test]
    fn test_new_bearer_session_drops_previous_profile() {
        let store = TokenStore::in_memory();
        let alice = UserProfile {
            id: Some(UserId::Number(1)),
            username: Some("alice".into()),
            ..Default::default()
        };
        store
            .begin_bearer_session(&TokenPair::new("A", "RA"), Some(&alice))
            .unwrap();
        assert_eq!(store.profile(), Some(alice));

        store
            .begin_bearer_session(&TokenPair::new("B", "RB"), None)
            .unwrap();
        assert_eq!(store.tokens(), Some(TokenPair::new("B", "RB")));
        assert!(store.profile().is_none());
    }

    #[test]
    fn test_new_handshake_session_starts_fresh_profile() {
        let store = TokenStore::in_memory();
        store
            .store_profile(&UserProfile {
                id: Some(UserId::Number(5)),
                username: Some("alice".into()),
                display_name: Some("Alice".into()),
                ..Default::default()
            })
            .unwrap();
        store.store_account_id(5).unwrap();
        store.store_tokens(&TokenPair::new("A", "R")).unwrap();

        store.begin_handshake_session("sess-2", "bob").unwrap();

        let profile = store.profile().unwrap();
        assert_eq!(profile.username.as_deref(), Some("bob"));
        assert!(profile.id.is_none());
        assert!(profile.display_name.is_none());
        assert!(store.account_id().is_none());
        assert!(store.access_token().is_none());
        assert_eq!(store.session_id().as_deref(), Some("sess-2"));
    }

    #[test]
    fn test_clear_keeps_preferences_and_clear_all_removes_them() {
        let store = TokenStore::in_memory();
        store.store_tokens(&TokenPair::new("A", "R")).unwrap();
        store.store_handshake_session("sess").unwrap();
        store.store_account_id(1).unwrap();
        store
            .store_profile(&UserProfile {
                username: Some("u".into()),
                ..Default::default()
            })
            .unwrap();
        store
            .store_preferences(&Preferences {
                theme: ThemeMode::Dark,
                notifications_enabled: false,
            })
            .unwrap();

        store.clear().unwrap();
        assert_eq!(store.debug_keys(), vec![keys::USER_PREFERENCES.to_string()]);
        assert_eq!(store.preferences_or_default().theme, ThemeMode::Dark);

        store.clear_all().unwrap();
        assert!(store.debug_keys().is_empty());
    }
}
