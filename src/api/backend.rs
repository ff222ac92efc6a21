//! Cinemate REST backend: unauthenticated auth endpoints
//!
//! Login, register, refresh and logout talk to the backend directly; anything
//! that needs the access token goes through [`super::AuthenticatedClient`].

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::ApiError;
use crate::models::{Availability, Credential, RegisterRequest};

/// Path prefix the backend mounts its routes under
pub const DEFAULT_API_PREFIX: &str = "/api/v1";

/// HTTP request timeout in seconds
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Check if response is successful, returning an error with body if not
pub(crate) async fn check_response(response: Response) -> Result<Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }
}

/// Read a successful response as JSON; an empty body reads as `null`
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_response(response).await?;
    let text = response.text().await.map_err(ApiError::Network)?;
    let text = if text.trim().is_empty() { "null" } else { text.as_str() };
    serde_json::from_str(text)
        .map_err(|e| ApiError::InvalidResponse(format!("JSON parse error: {}", e)))
}

/// REST backend client. Clone is cheap; the connection pool is shared.
#[derive(Debug, Clone)]
pub struct BackendApi {
    client: Client,
    base_url: String,
    api_prefix: String,
}

impl BackendApi {
    /// Create a backend client mounted at `/api/v1` under `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_prefix(base_url, DEFAULT_API_PREFIX)
    }

    /// Create a backend client with a custom route prefix (may be empty)
    pub fn with_prefix(base_url: impl Into<String>, api_prefix: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_prefix: api_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Full URL for a route such as `/auth/login`
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        format!("{}{}/{}", self.base_url, self.api_prefix, path)
    }

    /// `POST /auth/login` with `{username, password}`; returns the raw payload
    pub async fn login(&self, credential: &Credential) -> Result<Value, ApiError> {
        debug!(username = %credential.username, "Backend login");
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({
                "username": credential.username,
                "password": credential.password,
            }))
            .send()
            .await
            .map_err(ApiError::Network)?;
        read_json(response).await
    }

    /// `POST /auth/register`; returns the raw payload
    pub async fn register(&self, request: &RegisterRequest) -> Result<Value, ApiError> {
        debug!(username = %request.username, "Backend register");
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await
            .map_err(ApiError::Network)?;
        read_json(response).await
    }

    /// `POST /auth/refresh` with the refresh token as bearer and an empty body
    pub async fn refresh(&self, refresh_token: &str) -> Result<Value, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/refresh"))
            .bearer_auth(refresh_token)
            .json(&json!({}))
            .send()
            .await
            .map_err(ApiError::Network)?;
        read_json(response).await
    }

    /// `POST /auth/logout` with the refresh token as bearer
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(refresh_token)
            .json(&json!({}))
            .send()
            .await
            .map_err(ApiError::Network)?;
        check_response(response).await?;
        Ok(())
    }

    /// `GET /auth/check-availability?email=..&username=..`
    pub async fn check_availability(
        &self,
        email: Option<&str>,
        username: Option<&str>,
    ) -> Result<Availability, ApiError> {
        let mut query = Vec::new();
        if let Some(email) = email {
            query.push(("email", email));
        }
        if let Some(username) = username {
            query.push(("username", username));
        }

        let response = self
            .client
            .get(self.url("/auth/check-availability"))
            .query(&query)
            .send()
            .await
            .map_err(ApiError::Network)?;
        read_json(response).await
    }
}

/// True for statuses that mean the credential itself was refused
pub fn is_credential_rejection(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_prefix() {
        let api = BackendApi::new("http://localhost:3000/");
        assert_eq!(api.url("/auth/login"), "http://localhost:3000/api/v1/auth/login");
        assert_eq!(api.url("users/me"), "http://localhost:3000/api/v1/users/me");

        let bare = BackendApi::with_prefix("http://h", "");
        assert_eq!(bare.url("/auth/refresh"), "http://h/auth/refresh");
    }

    #[test]
    fn test_credential_rejection() {
        assert!(is_credential_rejection(StatusCode::UNAUTHORIZED));
        assert!(is_credential_rejection(StatusCode::FORBIDDEN));
        assert!(!is_credential_rejection(StatusCode::NOT_FOUND));
    }
}
