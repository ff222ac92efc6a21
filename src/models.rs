//! Data structures and types for Cinemate
//!
//! Contains all shared models used across the application organized by domain:
//! - **Auth**: credentials, token pairs, sessions and cached user profiles
//! - **Preferences**: UI settings that outlive a session
//! - **Movies**: TMDB listings, details, credits, videos and watch providers
//! - **Backend**: Cinemate REST backend request/response payloads

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Auth Models
// =============================================================================

/// Username (or email) and password typed by the user.
///
/// Transient: never serialized, and `Debug` redacts the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Access/refresh token pair issued by the Cinemate backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// True when the backend gave us a single token for both roles
    pub fn is_degraded(&self) -> bool {
        self.access_token == self.refresh_token
    }
}

/// Proof of authentication attached to every authenticated call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Session {
    /// TMDB session obtained through the request-token handshake
    Handshake {
        session_id: String,
        account_id: Option<u64>,
    },
    /// JWT pair obtained from the REST backend
    Bearer(TokenPair),
}

impl Session {
    /// The value sent with authenticated requests
    pub fn credential(&self) -> &str {
        match self {
            Session::Handshake { session_id, .. } => session_id,
            Session::Bearer(pair) => &pair.access_token,
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Session::Handshake { .. } => AuthMode::Handshake,
            Session::Bearer(_) => AuthMode::Bearer,
        }
    }
}

/// Which login protocol a deployment targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Username/password exchange against the REST backend
    #[default]
    Bearer,
    /// TMDB request-token -> validate -> session handshake
    Handshake,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::Bearer => write!(f, "bearer"),
            AuthMode::Handshake => write!(f, "handshake"),
        }
    }
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bearer" | "jwt" | "backend" => Ok(AuthMode::Bearer),
            "handshake" | "tmdb" => Ok(AuthMode::Handshake),
            other => Err(format!("unknown auth mode: {}", other)),
        }
    }
}

/// Account identifier; TMDB uses numbers, the backend may use UUID strings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(u64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{}", n),
            UserId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Cached subset of the account fields, owned by the session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(
        default,
        alias = "displayName",
        alias = "firstName",
        alias = "first_name",
        alias = "name"
    )]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Best name to greet the user with
    pub fn greeting_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or(self.username.as_deref())
    }
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.greeting_name().unwrap_or("unknown");
        match &self.id {
            Some(id) => write!(f, "{} (#{})", name, id),
            None => write!(f, "{}", name),
        }
    }
}

// =============================================================================
// Preferences
// =============================================================================

/// Light or dark UI palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

/// UI settings keyed independently of the session; they survive logout
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub theme: ThemeMode,
    #[serde(default = "default_true")]
    pub notifications_enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: ThemeMode::Light,
            notifications_enabled: true,
        }
    }
}

// =============================================================================
// Movie Models (TMDB)
// =============================================================================

/// TMDB genre ids used by the home screen categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Genre {
    Action,
    Comedy,
    Horror,
    Documentary,
    Animation,
    ScienceFiction,
}

impl Genre {
    pub fn id(self) -> u32 {
        match self {
            Genre::Action => 28,
            Genre::Comedy => 35,
            Genre::Horror => 27,
            Genre::Documentary => 99,
            Genre::Animation => 16,
            Genre::ScienceFiction => 878,
        }
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s
            .trim()
            .to_ascii_lowercase()
            .replace(|c: char| c == '-' || c == ' ', "_")
            .as_str()
        {
            "action" => Ok(Genre::Action),
            "comedy" => Ok(Genre::Comedy),
            "horror" => Ok(Genre::Horror),
            "documentary" => Ok(Genre::Documentary),
            "animation" => Ok(Genre::Animation),
            "science_fiction" | "scifi" | "sci_fi" => Ok(Genre::ScienceFiction),
            other => Err(format!("unknown genre: {}", other)),
        }
    }
}

/// One page of a paginated TMDB listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

fn first_page() -> u32 {
    1
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            page: 1,
            results: Vec::new(),
            total_pages: 1,
            total_results: 0,
        }
    }
}

/// Movie as it appears in listings and search results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieSummary {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: f32,
}

impl MovieSummary {
    pub fn year(&self) -> Option<u16> {
        self.release_date.as_deref().and_then(extract_year)
    }
}

impl fmt::Display for MovieSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let year_str = self.year().map(|y| format!(" ({})", y)).unwrap_or_default();
        write!(f, "{}{} [#{}] ⭐ {:.1}", self.title, year_str, self.id, self.vote_average)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenreTag {
    pub id: u32,
    pub name: String,
}

/// Detailed movie information, optionally with appended sub-resources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: u64,
    pub imdb_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    pub release_date: Option<String>,
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<GenreTag>,
    #[serde(default)]
    pub vote_average: f32,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub credits: Option<Credits>,
    pub videos: Option<VideoList>,
    pub similar: Option<Page<MovieSummary>>,
}

impl MovieDetail {
    pub fn year(&self) -> Option<u16> {
        self.release_date.as_deref().and_then(extract_year)
    }
}

impl fmt::Display for MovieDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let runtime = self.runtime.unwrap_or(0);
        write!(
            f,
            "{} ({}) - {}h {}m - ⭐ {:.1}",
            self.title,
            self.year().map(|y| y.to_string()).unwrap_or_else(|| "?".into()),
            runtime / 60,
            runtime % 60,
            self.vote_average
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    pub character: Option<String>,
    pub profile_path: Option<String>,
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    pub job: Option<String>,
    pub department: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub official: bool,
}

impl Video {
    /// First official YouTube trailer, falling back to any YouTube trailer
    pub fn pick_trailer(videos: &[Video]) -> Option<&Video> {
        let trailers = || {
            videos
                .iter()
                .filter(|v| v.site == "YouTube" && v.kind == "Trailer")
        };
        trailers().find(|v| v.official).or_else(|| trailers().next())
    }

    pub fn url(&self) -> Option<String> {
        match self.site.as_str() {
            "YouTube" => Some(format!("https://www.youtube.com/watch?v={}", self.key)),
            "Vimeo" => Some(format!("https://vimeo.com/{}", self.key)),
            _ => None,
        }
    }
}

/// Streaming availability per country code
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchProviders {
    #[serde(default)]
    pub results: BTreeMap<String, CountryProviders>,
}

impl WatchProviders {
    pub fn for_country(&self, country: &str) -> Option<&CountryProviders> {
        self.results.get(&country.to_ascii_uppercase())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountryProviders {
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<Provider>,
    #[serde(default)]
    pub rent: Vec<Provider>,
    #[serde(default)]
    pub buy: Vec<Provider>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub provider_id: u64,
    pub provider_name: String,
    pub logo_path: Option<String>,
}

/// Actor or crew member profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub biography: String,
    pub birthday: Option<String>,
    pub place_of_birth: Option<String>,
    pub profile_path: Option<String>,
    pub known_for_department: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonMovieCredits {
    #[serde(default)]
    pub cast: Vec<PersonCastCredit>,
}

impl PersonMovieCredits {
    /// Most recent releases first; undated entries go last
    pub fn sorted_by_release(mut self) -> Self {
        self.cast.sort_by(|a, b| {
            let a = a.release_date.as_deref().unwrap_or("");
            let b = b.release_date.as_deref().unwrap_or("");
            b.cmp(a)
        });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonCastCredit {
    pub id: u64,
    pub title: String,
    pub character: Option<String>,
    pub release_date: Option<String>,
    pub poster_path: Option<String>,
}

/// TMDB account details returned after the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetails {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<&AccountDetails> for UserProfile {
    fn from(account: &AccountDetails) -> Self {
        UserProfile {
            id: Some(UserId::Number(account.id)),
            username: account.username.clone(),
            display_name: account.name.clone().filter(|n| !n.is_empty()),
            email: None,
        }
    }
}

/// Generic TMDB status payload (`{"success": true, "status_code": 1, ...}`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbStatus {
    #[serde(default)]
    pub success: bool,
    pub status_code: Option<i32>,
    pub status_message: Option<String>,
}

// =============================================================================
// Backend Models
// =============================================================================

/// Signup payload for `POST /auth/register`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl RegisterRequest {
    /// Trim fields and lowercase the email the way the signup form does
    pub fn normalized(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.username = self.username.trim().to_string();
        self.email = self.email.trim().to_lowercase();
        self.phone_number = self.phone_number.map(|p| p.trim().to_string());
        self
    }
}

/// Response of `GET /auth/check-availability`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
}

/// Extract year from a date string like "2022-03-04"
pub fn extract_year(date: &str) -> Option<u16> {
    if date.len() >= 4 {
        date[..4].parse().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_year() {
        assert_eq!(extract_year("2022-03-04"), Some(2022));
        assert_eq!(extract_year(""), None);
        assert_eq!(extract_year("abc"), None);
    }

    #[test]
    fn test_credential_debug_redacts_password() {
        let cred = Credential::new("u", "hunter22");
        let dbg = format!("{:?}", cred);
        assert!(dbg.contains("\"u\""));
        assert!(!dbg.contains("hunter22"));
    }

    #[test]
    fn test_session_credential() {
        let handshake = Session::Handshake {
            session_id: "sess".into(),
            account_id: Some(7),
        };
        assert_eq!(handshake.credential(), "sess");
        assert_eq!(handshake.mode(), AuthMode::Handshake);

        let bearer = Session::Bearer(TokenPair::new("A", "R"));
        assert_eq!(bearer.credential(), "A");
        assert_eq!(bearer.mode(), AuthMode::Bearer);
    }

    #[test]
    fn test_auth_mode_parse() {
        assert_eq!("bearer".parse::<AuthMode>(), Ok(AuthMode::Bearer));
        assert_eq!("TMDB".parse::<AuthMode>(), Ok(AuthMode::Handshake));
        assert!("oauth".parse::<AuthMode>().is_err());
    }

    #[test]
    fn test_user_profile_aliases() {
        let camel: UserProfile =
            serde_json::from_str(r#"{"id": "abc-1", "username": "u", "firstName": "Ana"}"#).unwrap();
        assert_eq!(camel.id, Some(UserId::Text("abc-1".into())));
        assert_eq!(camel.greeting_name(), Some("Ana"));

        let numeric: UserProfile = serde_json::from_str(r#"{"id": 1, "username": "u"}"#).unwrap();
        assert_eq!(numeric.id, Some(UserId::Number(1)));
        assert_eq!(numeric.greeting_name(), Some("u"));
    }

    #[test]
    fn test_preferences_defaults_fill_missing_fields() {
        let prefs: Preferences = serde_json::from_str(r#"{"theme": "dark"}"#).unwrap();
        assert_eq!(prefs.theme, ThemeMode::Dark);
        assert!(prefs.notifications_enabled);
    }

    #[test]
    fn test_genre_ids() {
        assert_eq!("sci-fi".parse::<Genre>().unwrap().id(), 878);
        assert_eq!("Action".parse::<Genre>().unwrap().id(), 28);
        assert!("western".parse::<Genre>().is_err());
    }

    #[test]
    fn test_pick_trailer_prefers_official() {
        let videos = vec![
            Video {
                key: "teaser".into(),
                name: "Teaser".into(),
                site: "YouTube".into(),
                kind: "Teaser".into(),
                official: true,
            },
            Video {
                key: "fan".into(),
                name: "Fan trailer".into(),
                site: "YouTube".into(),
                kind: "Trailer".into(),
                official: false,
            },
            Video {
                key: "real".into(),
                name: "Official Trailer".into(),
                site: "YouTube".into(),
                kind: "Trailer".into(),
                official: true,
            },
        ];
        let trailer = Video::pick_trailer(&videos).unwrap();
        assert_eq!(trailer.key, "real");
        assert_eq!(
            trailer.url().as_deref(),
            Some("https://www.youtube.com/watch?v=real")
        );
    }

    #[test]
    fn test_register_request_serializes_camel_case() {
        let req = RegisterRequest {
            first_name: " Ana ".into(),
            last_name: "Lee".into(),
            username: "ana".into(),
            email: " Ana@Example.COM ".into(),
            password: "password1".into(),
            birth_date: None,
            phone_number: None,
        }
        .normalized();
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["firstName"], "Ana");
        assert_eq!(json["email"], "ana@example.com");
        assert!(json.get("birthDate").is_none());
    }
}
