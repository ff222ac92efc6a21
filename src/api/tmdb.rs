//! TMDB (The Movie Database) API client
//!
//! Movie listings, details and account lists, plus the request-token login
//! handshake. Authenticates with the `api_key` query parameter.
//! API docs: https://developer.themoviedb.org/docs

use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::ApiError;
use crate::models::{
    AccountDetails, Credential, Credits, Genre, MovieDetail, MovieSummary, Page, Person,
    PersonMovieCredits, TmdbStatus, VideoList, WatchProviders,
};

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_LANGUAGE: &str = "fr-FR";

/// Curated listings shown on the home screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovieList {
    Popular,
    NowPlaying,
    TopRated,
    Upcoming,
}

impl MovieList {
    fn endpoint(self) -> &'static str {
        match self {
            MovieList::Popular => "/movie/popular",
            MovieList::NowPlaying => "/movie/now_playing",
            MovieList::TopRated => "/movie/top_rated",
            MovieList::Upcoming => "/movie/upcoming",
        }
    }
}

/// Which account list to read or modify
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountList {
    Watchlist,
    Favorite,
}

impl AccountList {
    fn segment(self) -> &'static str {
        match self {
            AccountList::Watchlist => "watchlist",
            AccountList::Favorite => "favorite",
        }
    }
}

/// TMDB API client
#[derive(Clone)]
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    language: String,
    client: reqwest::Client,
}

impl std::fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .finish_non_exhaustive()
    }
}

impl TmdbClient {
    /// Create a new TMDB client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Override the `language` parameter sent with content requests
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Send a request with the API key attached; no retries
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut builder = self
            .client
            .request(method, &url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .header("Accept", "application/json");
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(ApiError::Network)?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await.map_err(ApiError::Network)?;
                serde_json::from_str(&body).map_err(|e| {
                    ApiError::InvalidResponse(format!("JSON parse error: {}", e))
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                debug!(endpoint, "TMDB rate limit hit, not retrying");
                Err(ApiError::from_status(StatusCode::TOO_MANY_REQUESTS, ""))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ApiError::from_status(status, &body))
            }
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.request(Method::GET, endpoint, query, None).await
    }

    fn localized(&self, page: Option<u32>) -> Vec<(&'static str, String)> {
        let mut query = vec![("language", self.language.clone())];
        if let Some(page) = page {
            query.push(("page", page.to_string()));
        }
        query
    }

    // ===== Login handshake =====

    /// Step 1: anonymous request token
    pub async fn create_request_token(&self) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct TokenResponse {
            request_token: String,
        }
        let response: TokenResponse = self.get("/authentication/token/new", &[]).await?;
        Ok(response.request_token)
    }

    /// Step 2: validate the request token with the user's credentials
    pub async fn validate_with_login(
        &self,
        request_token: &str,
        credential: &Credential,
    ) -> Result<bool, ApiError> {
        let body = json!({
            "username": credential.username,
            "password": credential.password,
            "request_token": request_token,
        });
        let status: TmdbStatus = self
            .request(
                Method::POST,
                "/authentication/token/validate_with_login",
                &[],
                Some(body),
            )
            .await?;
        Ok(status.success)
    }

    /// Step 3: exchange the validated token for a session id
    pub async fn create_session(&self, request_token: &str) -> Result<String, ApiError> {
        #[derive(Deserialize)]
        struct SessionResponse {
            session_id: String,
        }
        let response: SessionResponse = self
            .request(
                Method::POST,
                "/authentication/session/new",
                &[],
                Some(json!({ "request_token": request_token })),
            )
            .await?;
        Ok(response.session_id)
    }

    pub async fn account_details(&self, session_id: &str) -> Result<AccountDetails, ApiError> {
        self.get("/account", &[("session_id", session_id.to_string())])
            .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool, ApiError> {
        let status: TmdbStatus = self
            .request(
                Method::DELETE,
                "/authentication/session",
                &[],
                Some(json!({ "session_id": session_id })),
            )
            .await?;
        Ok(status.success)
    }

    // ===== Listings =====

    pub async fn movie_list(&self, list: MovieList, page: u32) -> Result<Page<MovieSummary>, ApiError> {
        self.get(list.endpoint(), &self.localized(Some(page))).await
    }

    pub async fn popular(&self, page: u32) -> Result<Page<MovieSummary>, ApiError> {
        self.movie_list(MovieList::Popular, page).await
    }

    pub async fn now_playing(&self, page: u32) -> Result<Page<MovieSummary>, ApiError> {
        self.movie_list(MovieList::NowPlaying, page).await
    }

    pub async fn top_rated(&self, page: u32) -> Result<Page<MovieSummary>, ApiError> {
        self.movie_list(MovieList::TopRated, page).await
    }

    pub async fn upcoming(&self, page: u32) -> Result<Page<MovieSummary>, ApiError> {
        self.movie_list(MovieList::Upcoming, page).await
    }

    /// Movies of one genre, most popular first
    pub async fn discover_by_genre(
        &self,
        genre: Genre,
        page: u32,
    ) -> Result<Page<MovieSummary>, ApiError> {
        let mut query = self.localized(Some(page));
        query.push(("with_genres", genre.id().to_string()));
        query.push(("sort_by", "popularity.desc".to_string()));
        self.get("/discover/movie", &query).await
    }

    pub async fn search_movies(
        &self,
        query: &str,
        page: u32,
    ) -> Result<Page<MovieSummary>, ApiError> {
        let mut params = self.localized(Some(page));
        params.push(("query", query.to_string()));
        params.push(("include_adult", "false".to_string()));
        self.get("/search/movie", &params).await
    }

    // ===== Details =====

    /// Movie details with credits, videos and similar titles appended
    pub async fn movie_detail(&self, id: u64) -> Result<MovieDetail, ApiError> {
        let mut query = self.localized(None);
        query.push(("append_to_response", "credits,videos,similar".to_string()));
        self.get(&format!("/movie/{}", id), &query).await
    }

    pub async fn movie_credits(&self, id: u64) -> Result<Credits, ApiError> {
        self.get(&format!("/movie/{}/credits", id), &self.localized(None))
            .await
    }

    pub async fn movie_videos(&self, id: u64) -> Result<VideoList, ApiError> {
        self.get(&format!("/movie/{}/videos", id), &self.localized(None))
            .await
    }

    pub async fn watch_providers(&self, id: u64) -> Result<WatchProviders, ApiError> {
        self.get(&format!("/movie/{}/watch/providers", id), &[])
            .await
    }

    pub async fn person(&self, id: u64) -> Result<Person, ApiError> {
        self.get(&format!("/person/{}", id), &self.localized(None))
            .await
    }

    /// Movies an actor appeared in, most recent first
    pub async fn person_movie_credits(&self, id: u64) -> Result<PersonMovieCredits, ApiError> {
        let credits: PersonMovieCredits = self
            .get(&format!("/person/{}/movie_credits", id), &self.localized(None))
            .await?;
        Ok(credits.sorted_by_release())
    }

    // ===== Account lists =====

    fn account_path(account_id: Option<u64>, suffix: &str) -> String {
        match account_id {
            Some(id) => format!("/account/{}/{}", id, suffix),
            None => format!("/account/{}", suffix),
        }
    }

    /// Movies on the watchlist or favorites of the session's account.
    ///
    /// Without an account id TMDB resolves the account from the session.
    pub async fn account_movies(
        &self,
        list: AccountList,
        account_id: Option<u64>,
        session_id: &str,
        page: u32,
    ) -> Result<Page<MovieSummary>, ApiError> {
        let path = Self::account_path(account_id, &format!("{}/movies", list.segment()));
        let mut query = self.localized(Some(page));
        query.push(("session_id", session_id.to_string()));
        query.push(("sort_by", "created_at.desc".to_string()));
        self.get(&path, &query).await
    }

    /// Add (`true`) or remove (`false`) a movie from an account list
    pub async fn set_account_movie(
        &self,
        list: AccountList,
        account_id: Option<u64>,
        session_id: &str,
        movie_id: u64,
        present: bool,
    ) -> Result<TmdbStatus, ApiError> {
        let path = Self::account_path(account_id, list.segment());
        let mut body = serde_json::Map::new();
        body.insert("media_type".into(), json!("movie"));
        body.insert("media_id".into(), json!(movie_id));
        body.insert(list.segment().into(), json!(present));
        self.request(
            Method::POST,
            &path,
            &[("session_id", session_id.to_string())],
            Some(Value::Object(body)),
        )
        .await
    }

    pub async fn watchlist(
        &self,
        account_id: Option<u64>,
        session_id: &str,
        page: u32,
    ) -> Result<Page<MovieSummary>, ApiError> {
        self.account_movies(AccountList::Watchlist, account_id, session_id, page)
            .await
    }

    pub async fn set_watchlist(
        &self,
        account_id: Option<u64>,
        session_id: &str,
        movie_id: u64,
        on_watchlist: bool,
    ) -> Result<TmdbStatus, ApiError> {
        self.set_account_movie(AccountList::Watchlist, account_id, session_id, movie_id, on_watchlist)
            .await
    }

    pub async fn favorites(
        &self,
        account_id: Option<u64>,
        session_id: &str,
        page: u32,
    ) -> Result<Page<MovieSummary>, ApiError> {
        self.account_movies(AccountList::Favorite, account_id, session_id, page)
            .await
    }

    pub async fn set_favorite(
        &self,
        account_id: Option<u64>,
        session_id: &str,
        movie_id: u64,
        favorite: bool,
    ) -> Result<TmdbStatus, ApiError> {
        self.set_account_movie(AccountList::Favorite, account_id, session_id, movie_id, favorite)
            .await
    }
}
