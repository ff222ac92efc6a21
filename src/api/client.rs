//! Authenticated request wrapper for the Cinemate backend
//!
//! Attaches the stored access token to every request. A 401 triggers one
//! refresh with the stored refresh token and one resend; if the refresh
//! fails the token store is cleared and the caller gets
//! [`ApiError::SessionExpired`].

use reqwest::{Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::backend::{check_response, read_json, BackendApi};
use super::login_response;
use super::ApiError;
use crate::models::{TokenPair, UserProfile};
use crate::storage::TokenStore;

/// A backend request that can be rebuilt for a resend
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Flag the request as already resent once; a 401 on it will not refresh
    pub fn mark_retried(mut self) -> Self {
        self.retried = true;
        self
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }
}

/// Backend client that owns the session's bearer credentials
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    backend: BackendApi,
    store: TokenStore,
}

impl AuthenticatedClient {
    pub fn new(backend: BackendApi, store: TokenStore) -> Self {
        Self { backend, store }
    }

    pub fn backend(&self) -> &BackendApi {
        &self.backend
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<Response, ApiError> {
        let url = self.backend.url(&request.path);
        let mut builder = self.backend.http().request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        builder.send().await.map_err(ApiError::Network)
    }

    /// Send a request, refreshing and resending once on 401
    pub async fn execute(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let access_token = self.store.access_token();
        let response = self.send(&request, access_token.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return check_response(response).await;
        }

        if request.is_retried() {
            debug!(path = %request.path, "401 on an already retried request, giving up");
            return check_response(response).await;
        }

        info!(path = %request.path, "Access token rejected, attempting refresh");
        let tokens = match self.refresh_session().await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!(error = %e, "Token refresh failed, forcing logout");
                if let Err(e) = self.store.clear() {
                    warn!(error = %e, "Failed to clear token store after refresh failure");
                }
                return Err(ApiError::SessionExpired);
            }
        };

        info!(path = %request.path, "Token refreshed, resending request");
        let retry = request.mark_retried();
        let response = self.send(&retry, Some(&tokens.access_token)).await?;
        check_response(response).await
    }

    /// Exchange the stored refresh token for a new pair and persist it.
    ///
    /// Does not clear the store on failure; [`Self::execute`] decides that.
    pub async fn refresh_session(&self) -> Result<TokenPair, ApiError> {
        let refresh_token = self.store.refresh_token().ok_or(ApiError::NotLoggedIn)?;
        let payload = self.backend.refresh(&refresh_token).await?;
        let login = login_response::normalize_login(&payload)?;
        let tokens = if login.refresh_issued {
            login.tokens
        } else {
            debug!("Refresh response carried no refresh token, keeping the stored one");
            TokenPair::new(login.tokens.access_token, refresh_token)
        };
        self.store.store_tokens(&tokens)?;
        Ok(tokens)
    }

    // ===== Typed helpers =====

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.execute(ApiRequest::get(path)).await?;
        read_json(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode body: {}", e)))?;
        let response = self.execute(ApiRequest::post(path, body)).await?;
        read_json(response).await
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode body: {}", e)))?;
        let response = self.execute(ApiRequest::patch(path, body)).await?;
        read_json(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.execute(ApiRequest::delete(path)).await?;
        Ok(())
    }

    // ===== User endpoints =====

    /// `GET /users/me`; caches the profile on success
    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        let profile: UserProfile = self.get_json("/users/me").await?;
        self.store.store_profile(&profile)?;
        Ok(profile)
    }

    /// `PATCH /users/me`; caches the updated profile
    pub async fn update_me(&self, changes: &Value) -> Result<UserProfile, ApiError> {
        let profile: UserProfile = self.patch_json("/users/me", changes).await?;
        self.store.store_profile(&profile)?;
        Ok(profile)
    }

    /// `DELETE /users/me`, then wipe everything stored locally
    pub async fn delete_me(&self) -> Result<(), ApiError> {
        self.delete("/users/me").await?;
        self.store.clear_all()?;
        Ok(())
    }

    /// `GET /users` (admin only)
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ApiError> {
        self.get_json("/users").await
    }
}
