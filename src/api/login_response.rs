//! Normalization of login/register/refresh payloads
//!
//! The backend has shipped several response shapes over time. Each shape gets
//! a typed parser; they are tried in order and the first one producing a
//! non-empty access token wins.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::ApiError;
use crate::models::{TokenPair, UserProfile};

/// `{accessToken, refreshToken, user}` after shape sniffing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLogin {
    pub tokens: TokenPair,
    pub user: Option<UserProfile>,
    /// False when the refresh token was filled in from the access token
    pub refresh_issued: bool,
}

/// Which parser accepted the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    FlatCamel,
    FlatSnake,
    DataCamel,
    DataSnake,
    SingleToken,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CamelTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SnakeTokens {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    user: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct SingleToken {
    token: String,
    #[serde(default)]
    user: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Raw fields pulled out by one parser, before defaults are applied
struct Extracted {
    access_token: String,
    refresh_token: Option<String>,
    user: Option<Value>,
}

impl From<CamelTokens> for Extracted {
    fn from(t: CamelTokens) -> Self {
        Extracted {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            user: t.user,
        }
    }
}

impl From<SnakeTokens> for Extracted {
    fn from(t: SnakeTokens) -> Self {
        Extracted {
            access_token: t.access_token,
            refresh_token: t.refresh_token,
            user: t.user,
        }
    }
}

impl From<SingleToken> for Extracted {
    fn from(t: SingleToken) -> Self {
        Extracted {
            refresh_token: Some(t.token.clone()),
            access_token: t.token,
            user: t.user,
        }
    }
}

type Parser = fn(&Value) -> Option<Extracted>;

fn parse_as<T>(value: &Value) -> Option<Extracted>
where
    T: for<'de> Deserialize<'de> + Into<Extracted>,
{
    T::deserialize(value).ok().map(Into::into)
}

fn parse_enveloped<T>(value: &Value) -> Option<Extracted>
where
    T: for<'de> Deserialize<'de> + Into<Extracted>,
{
    Envelope::<T>::deserialize(value).ok().map(|e| e.data.into())
}

/// Parsers in priority order
const PARSERS: &[(ResponseShape, Parser)] = &[
    (ResponseShape::FlatCamel, parse_as::<CamelTokens>),
    (ResponseShape::FlatSnake, parse_as::<SnakeTokens>),
    (ResponseShape::DataCamel, parse_enveloped::<CamelTokens>),
    (ResponseShape::DataSnake, parse_enveloped::<SnakeTokens>),
    (ResponseShape::SingleToken, parse_as::<SingleToken>),
];

/// Detect the response shape and normalize it.
///
/// A missing or empty refresh token reuses the access token.
pub fn normalize(response: &Value) -> Result<(ResponseShape, NormalizedLogin), ApiError> {
    for (shape, parser) in PARSERS {
        let Some(extracted) = parser(response) else {
            continue;
        };
        if extracted.access_token.is_empty() {
            continue;
        }

        let issued = extracted.refresh_token.filter(|t| !t.is_empty());
        let refresh_issued = issued.is_some();
        let refresh_token = match issued {
            Some(token) => token,
            None => {
                warn!("No refresh token in response, reusing the access token");
                extracted.access_token.clone()
            }
        };

        let user = extracted.user.and_then(|u| match serde_json::from_value(u) {
            Ok(profile) => Some(profile),
            Err(e) => {
                debug!(error = %e, "Ignoring user field that is not a profile object");
                None
            }
        });

        debug!(shape = ?shape, "Login response normalized");
        return Ok((
            *shape,
            NormalizedLogin {
                tokens: TokenPair::new(extracted.access_token, refresh_token),
                user,
                refresh_issued,
            },
        ));
    }

    Err(ApiError::MalformedResponse(describe_keys(response)))
}

/// Normalize, discarding which shape matched
pub fn normalize_login(response: &Value) -> Result<NormalizedLogin, ApiError> {
    normalize(response).map(|(_, login)| login)
}

/// Top-level (and `data`) keys, for the malformed-response message
fn describe_keys(response: &Value) -> String {
    let keys = |v: &Value| -> Vec<String> {
        v.as_object()
            .map(|o| o.keys().cloned().collect())
            .unwrap_or_default()
    };
    let mut description = format!("top-level keys {:?}", keys(response));
    if let Some(data) = response.get("data") {
        description.push_str(&format!(", data keys {:?}", keys(data)));
    }
    description
}
