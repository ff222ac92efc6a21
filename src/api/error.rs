use reqwest::StatusCode;
use thiserror::Error;

use crate::storage::StorageError;

/// API error types shared by the TMDB and backend clients
#[derive(Error, Debug)]
pub enum ApiError {
    /// No response at all: DNS, refused connection, timeout
    #[error("Network error, check your connection: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Request failed with status {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// Refresh after a 401 failed; the store was cleared (forced logout)
    #[error("TOKEN_REFRESH_FAILED")]
    SessionExpired,

    #[error("Login response has no access token; inspect the response shape of the API: {0}")]
    MalformedResponse(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Login rejected: {0}")]
    LoginRejected(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Operation not available in {0} mode")]
    UnsupportedMode(crate::models::AuthMode),

    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Network(e)
        }
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        ApiError::Http {
            status,
            body: Self::truncate_body(body),
        }
    }

    /// HTTP status, when the server answered
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self.status(),
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
        )
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::SessionExpired)
    }

    /// Server-provided `message` field, if the body is JSON and has one
    pub fn server_message(&self) -> Option<String> {
        let ApiError::Http { body, .. } = self else {
            return None;
        };
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value
            .get("message")
            .or_else(|| value.get("status_message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    }

    /// Message suitable for showing to an end user
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => {
                "Unable to reach the server. Check your internet connection.".to_string()
            }
            ApiError::Http { status, .. } if *status == StatusCode::UNAUTHORIZED => {
                "Invalid credentials".to_string()
            }
            ApiError::Http { status, .. } if *status == StatusCode::TOO_MANY_REQUESTS => {
                "Too many attempts. Please try again later.".to_string()
            }
            ApiError::Http { status, .. } if *status == StatusCode::CONFLICT => {
                "This email or username is already in use".to_string()
            }
            ApiError::SessionExpired => "Your session has expired. Please log in again.".to_string(),
            other => other.server_message().unwrap_or_else(|| other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expired_display() {
        assert_eq!(ApiError::SessionExpired.to_string(), "TOKEN_REFRESH_FAILED");
    }

    #[test]
    fn test_truncate_body() {
        let long = "é".repeat(400);
        let err = ApiError::from_status(StatusCode::BAD_REQUEST, &long);
        let ApiError::Http { body, .. } = err else {
            panic!("expected Http");
        };
        assert!(body.contains("truncated, 800 total bytes"));
    }

    #[test]
    fn test_user_messages() {
        let unauthorized = ApiError::from_status(StatusCode::UNAUTHORIZED, "");
        assert!(unauthorized.is_unauthorized());
        assert_eq!(unauthorized.user_message(), "Invalid credentials");

        let bad = ApiError::from_status(StatusCode::BAD_REQUEST, r#"{"message": "Username too short"}"#);
        assert_eq!(bad.user_message(), "Username too short");
        assert_eq!(bad.status(), Some(StatusCode::BAD_REQUEST));
    }
}
