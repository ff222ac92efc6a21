//! Configuration management for Cinemate
//!
//! Handles config file loading/saving and environment overrides.
//! Config is stored at ~/.config/cinemate/config.toml; environment variables
//! (the binary loads a `.env` file first) take precedence over the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::{backend::DEFAULT_API_PREFIX, tmdb, BackendApi, TmdbClient};
use crate::auth::{AuthStrategy, AutoLogin, BearerRefreshAuth, HandshakeAuth, SessionManager};
use crate::models::{AuthMode, Credential};
use crate::storage::{FileStore, TokenStore};

/// Environment variable names
pub mod env {
    pub const API_BASE_URL: &str = "CINEMATE_API_BASE_URL";
    pub const TMDB_API_KEY: &str = "TMDB_API_KEY";
    pub const TMDB_BASE_URL: &str = "TMDB_BASE_URL";
    pub const AUTH_MODE: &str = "CINEMATE_AUTH_MODE";
    pub const DEFAULT_USERNAME: &str = "CINEMATE_DEFAULT_USERNAME";
    pub const DEFAULT_PASSWORD: &str = "CINEMATE_DEFAULT_PASSWORD";
    pub const AUTO_LOGIN: &str = "CINEMATE_AUTO_LOGIN";
    pub const LANGUAGE: &str = "CINEMATE_LANGUAGE";
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// REST backend base URL (e.g. http://localhost:3000)
    pub api_base_url: Option<String>,
    /// Route prefix on the backend (default /api/v1)
    pub api_prefix: Option<String>,
    /// TMDB API key
    pub tmdb_api_key: Option<String>,
    /// TMDB base URL override
    pub tmdb_base_url: Option<String>,
    /// TMDB language parameter (default fr-FR)
    pub language: Option<String>,
    /// Login protocol for this deployment
    pub auth_mode: Option<AuthMode>,
    /// Override for the key-value storage file
    pub storage_path: Option<PathBuf>,
    /// Log in with the default credentials at startup
    #[serde(default)]
    pub auto_login: bool,
    /// Username for auto-login
    pub default_username: Option<String>,
    /// Password for auto-login; only ever read from the environment
    #[serde(skip)]
    pub default_password: Option<String>,
}

impl Config {
    /// Get config file path (~/.config/cinemate/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cinemate").join("config.toml"))
    }

    /// Load config from file, or return default if not found
    pub fn load() -> Self {
        Self::path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    /// Load config from a specific file, or return default if missing/invalid
    pub fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// File config with the process environment applied on top
    pub fn resolve(path: Option<&Path>) -> Self {
        let config = match path {
            Some(path) => Self::load_from(path),
            None => Self::load(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an environment lookup; empty values are ignored
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get(env::API_BASE_URL) {
            self.api_base_url = Some(url);
        }
        if let Some(key) = get(env::TMDB_API_KEY) {
            self.tmdb_api_key = Some(key);
        }
        if let Some(url) = get(env::TMDB_BASE_URL) {
            self.tmdb_base_url = Some(url);
        }
        if let Some(language) = get(env::LANGUAGE) {
            self.language = Some(language);
        }
        if let Some(mode) = get(env::AUTH_MODE).and_then(|m| m.parse().ok()) {
            self.auth_mode = Some(mode);
        }
        if let Some(username) = get(env::DEFAULT_USERNAME) {
            self.default_username = Some(username);
        }
        if let Some(password) = get(env::DEFAULT_PASSWORD) {
            self.default_password = Some(password);
        }
        if let Some(flag) = get(env::AUTO_LOGIN) {
            self.auto_login = parse_flag(&flag);
        }
        self
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;

        // Create parent directory if needed
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self)?;
        std::fs::write(path, toml)?;
        Ok(())
    }

    pub fn auth_mode(&self) -> AuthMode {
        self.auth_mode.unwrap_or_default()
    }

    /// Auto-login settings; enabled only with both username and password
    pub fn auto_login(&self) -> AutoLogin {
        let credential = match (&self.default_username, &self.default_password) {
            (Some(user), Some(pass)) => Some(Credential::new(user, pass)),
            _ => None,
        };
        AutoLogin {
            enabled: self.auto_login,
            credential,
        }
    }

    pub fn storage_path(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => FileStore::default_path().context("Could not determine data directory"),
        }
    }

    pub fn token_store(&self) -> Result<TokenStore> {
        let path = self.storage_path()?;
        Ok(TokenStore::new(Arc::new(FileStore::new(path))))
    }

    pub fn tmdb_client(&self) -> Result<TmdbClient> {
        let key = self
            .tmdb_api_key
            .as_deref()
            .with_context(|| format!("TMDB API key not configured (set {})", env::TMDB_API_KEY))?;
        let base_url = self.tmdb_base_url.as_deref().unwrap_or(tmdb::DEFAULT_BASE_URL);
        let language = self.language.as_deref().unwrap_or(tmdb::DEFAULT_LANGUAGE);
        Ok(TmdbClient::with_base_url(key, base_url).with_language(language))
    }

    pub fn backend_api(&self) -> Result<BackendApi> {
        let base_url = self
            .api_base_url
            .as_deref()
            .with_context(|| format!("Backend URL not configured (set {})", env::API_BASE_URL))?;
        let prefix = self.api_prefix.as_deref().unwrap_or(DEFAULT_API_PREFIX);
        Ok(BackendApi::with_prefix(base_url, prefix))
    }

    /// The single strategy this deployment uses
    pub fn strategy(&self, store: TokenStore) -> Result<Arc<dyn AuthStrategy>> {
        Ok(match self.auth_mode() {
            AuthMode::Bearer => Arc::new(BearerRefreshAuth::new(self.backend_api()?, store)),
            AuthMode::Handshake => Arc::new(HandshakeAuth::new(self.tmdb_client()?, store)),
        })
    }

    pub fn session_manager(&self, store: TokenStore) -> Result<SessionManager> {
        let strategy = self.strategy(store.clone())?;
        Ok(SessionManager::new(strategy, store))
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.tmdb_api_key.is_none());
        assert_eq!(config.auth_mode(), AuthMode::Bearer);
        assert!(!config.auto_login().enabled);
    }

    #[test]
    fn test_env_overrides_file() {
        let config = Config {
            api_base_url: Some("http://file".into()),
            tmdb_api_key: Some("file-key".into()),
            ..Default::default()
        }
        .with_env(env_from(&[
            (env::API_BASE_URL, "http://env"),
            (env::TMDB_API_KEY, "  "),
            (env::AUTH_MODE, "handshake"),
            (env::AUTO_LOGIN, "yes"),
            (env::DEFAULT_USERNAME, "u"),
            (env::DEFAULT_PASSWORD, "p"),
        ]));

        assert_eq!(config.api_base_url.as_deref(), Some("http://env"));
        // Blank env values do not clobber the file
        assert_eq!(config.tmdb_api_key.as_deref(), Some("file-key"));
        assert_eq!(config.auth_mode(), AuthMode::Handshake);

        let auto = config.auto_login();
        assert!(auto.enabled);
        assert_eq!(auto.credential, Some(Credential::new("u", "p")));
    }

    #[test]
    fn test_missing_settings_are_errors() {
        let config = Config::default();
        assert!(config.tmdb_client().is_err());
        assert!(config.backend_api().is_err());
        assert!(config.strategy(TokenStore::in_memory()).is_err());
    }

    #[test]
    fn test_strategy_follows_mode() {
        let config = Config {
            api_base_url: Some("http://localhost".into()),
            tmdb_api_key: Some("k".into()),
            auth_mode: Some(AuthMode::Handshake),
            ..Default::default()
        };
        let strategy = config.strategy(TokenStore::in_memory()).unwrap();
        assert_eq!(strategy.mode(), AuthMode::Handshake);
    }

    #[test]
    fn test_password_never_serialized() {
        let config = Config {
            default_username: Some("u".into()),
            default_password: Some("secret".into()),
            ..Default::default()
        };
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("default_username"));
        assert!(!toml.contains("secret"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "api_base_url = \"http://localhost:3000\"\nauth_mode = \"handshake\"\nauto_login = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.api_base_url.as_deref(), Some("http://localhost:3000"));
        assert_eq!(config.auth_mode(), AuthMode::Handshake);
        assert!(config.auto_login);

        assert!(Config::load_from(&dir.path().join("missing.toml")).api_base_url.is_none());
    }
}
