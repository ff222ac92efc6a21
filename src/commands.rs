//! CLI Command Handlers
//!
//! Implements all CLI commands on top of the session manager and API clients.
//! Each handler takes CLI args, the resolved config and Output; failures are
//! reported through Output and returned as the exit code.

use std::io::BufRead;

use serde::Serialize;
use tracing::debug;

use crate::api::tmdb::{AccountList, MovieList};
use crate::api::{AuthenticatedClient, TmdbClient};
use crate::auth::{BearerRefreshAuth, SessionManager, SessionState};
use crate::cli::{
    AccountListCmd, ExitCode, GenreCmd, ListAction, LoginCmd, LogoutCmd, MovieCmd, Output,
    PageArgs, PersonCmd, PrefsCmd, ProvidersCmd, SearchCmd, SessionStatus, SignupCmd,
};
use crate::config::Config;
use crate::models::{
    AuthMode, Credential, MovieDetail, MovieSummary, Page, Person, PersonMovieCredits,
    RegisterRequest, Session, UserProfile, Video,
};
use crate::storage::TokenStore;

/// Handler result; the error carries the exit code already reported
pub type CmdResult = Result<(), ExitCode>;

// =============================================================================
// Wiring
// =============================================================================

fn token_store(config: &Config, output: &Output) -> Result<TokenStore, ExitCode> {
    config
        .token_store()
        .map_err(|e| output.error(format!("{:#}", e), ExitCode::ConfigError))
}

fn tmdb_client(config: &Config, output: &Output) -> Result<TmdbClient, ExitCode> {
    config
        .tmdb_client()
        .map_err(|e| output.error(format!("{:#}", e), ExitCode::ConfigError))
}

fn session_manager(
    config: &Config,
    store: &TokenStore,
    output: &Output,
) -> Result<SessionManager, ExitCode> {
    config
        .session_manager(store.clone())
        .map_err(|e| output.error(format!("{:#}", e), ExitCode::ConfigError))
}

fn bearer_auth(config: &Config, store: &TokenStore, output: &Output) -> Result<BearerRefreshAuth, ExitCode> {
    if config.auth_mode() != AuthMode::Bearer {
        return Err(output.error(
            format!("Not available in {} mode", config.auth_mode()),
            ExitCode::ConfigError,
        ));
    }
    config
        .backend_api()
        .map(|backend| BearerRefreshAuth::new(backend, store.clone()))
        .map_err(|e| output.error(format!("{:#}", e), ExitCode::ConfigError))
}

/// Restore the persisted session or auto-login, as the app does at startup
async fn start_session(
    config: &Config,
    store: &TokenStore,
    output: &Output,
) -> Result<SessionState, ExitCode> {
    let manager = session_manager(config, store, output)?;
    let state = manager.init(&config.auto_login()).await;
    if let SessionState::AutoLoggedIn(_) = state {
        output.info("Logged in with the configured default account");
    }
    Ok(state)
}

fn emit<T, F>(output: &Output, data: T, human: F) -> CmdResult
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    output
        .print(data, human)
        .map_err(|e| output.error(format!("Failed to serialize: {}", e), ExitCode::Error))
}

/// Password from the flag, or the first line of stdin
fn read_password(
    password: Option<String>,
    from_stdin: bool,
    output: &Output,
) -> Result<String, ExitCode> {
    if let Some(password) = password {
        return Ok(password);
    }
    if !from_stdin {
        return Err(output.error(
            "Password required (use --password-stdin)",
            ExitCode::InvalidArgs,
        ));
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| output.error(format!("Failed to read password: {}", e), ExitCode::Error))?;
    let password = line.trim_end_matches(|c: char| c == '\r' || c == '\n').to_string();
    if password.is_empty() {
        return Err(output.error("Empty password", ExitCode::InvalidArgs));
    }
    Ok(password)
}

// =============================================================================
// Session Commands
// =============================================================================

pub async fn login_cmd(cmd: LoginCmd, config: &Config, output: &Output) -> CmdResult {
    let username = cmd
        .username
        .or_else(|| config.default_username.clone())
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| output.error("Username required", ExitCode::InvalidArgs))?;

    // The configured default password only applies to the default username
    let password = if cmd.password.is_some() || cmd.password_stdin {
        read_password(cmd.password, cmd.password_stdin, output)?
    } else {
        config
            .default_password
            .clone()
            .filter(|_| config.default_username.as_deref() == Some(username.as_str()))
            .ok_or_else(|| {
                output.error("Password required (use --password-stdin)", ExitCode::InvalidArgs)
            })?
    };

    let store = token_store(config, output)?;
    let manager = session_manager(config, &store, output)?;
    output.info(format!("Logging in as {} ({} mode)...", username, manager.mode()));

    let session = manager
        .login(&Credential::new(username, password))
        .await
        .map_err(|e| output.api_error("Login failed", &e))?;

    let profile = store.profile();
    let result = LoginResult {
        mode: session.mode(),
        degraded: matches!(&session, Session::Bearer(pair) if pair.is_degraded()),
        user: profile,
    };
    emit(output, result, |r| match r.user.as_ref().and_then(|u| u.greeting_name()) {
        Some(name) => format!("Welcome, {}!", name),
        None => "Logged in.".to_string(),
    })
}

#[derive(Debug, Serialize)]
struct LoginResult {
    mode: AuthMode,
    degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<UserProfile>,
}

pub async fn signup_cmd(cmd: SignupCmd, config: &Config, output: &Output) -> CmdResult {
    let password = read_password(cmd.password, cmd.password_stdin, output)?;
    let request = RegisterRequest {
        first_name: cmd.first_name,
        last_name: cmd.last_name,
        username: cmd.username,
        email: cmd.email,
        password,
        birth_date: cmd.birth_date,
        phone_number: cmd.phone,
    }
    .normalized();

    let store = token_store(config, output)?;
    let auth = bearer_auth(config, &store, output)?;

    if !cmd.no_check {
        let availability = auth
            .backend()
            .check_availability(Some(&request.email), Some(&request.username))
            .await
            .map_err(|e| output.api_error("Availability check failed", &e))?;
        if !availability.available {
            return Err(output.error(
                "This email or username is already in use",
                ExitCode::InvalidArgs,
            ));
        }
    }

    output.info(format!("Creating account {}...", request.username));
    auth.register(&request)
        .await
        .map_err(|e| output.api_error("Signup failed", &e))?;

    emit(output, store.profile(), |profile| match profile {
        Some(p) => format!("Account created. Welcome, {}!", p),
        None => "Account created.".to_string(),
    })
}

pub async fn logout_cmd(cmd: LogoutCmd, config: &Config, output: &Output) -> CmdResult {
    let store = token_store(config, output)?;
    let manager = session_manager(config, &store, output)?;

    if !manager.is_logged_in() {
        output.info("Not logged in");
    }
    manager.teardown().await;

    if cmd.purge {
        store
            .clear_all()
            .map_err(|e| output.error(format!("Failed to clear storage: {}", e), ExitCode::Error))?;
    }

    emit(output, LogoutResult { logged_out: true, purged: cmd.purge }, |_| {
        "Logged out.".to_string()
    })
}

#[derive(Debug, Serialize)]
struct LogoutResult {
    logged_out: bool,
    purged: bool,
}

pub async fn whoami_cmd(config: &Config, output: &Output) -> CmdResult {
    let store = token_store(config, output)?;
    let state = start_session(config, &store, output).await?;
    if state.session().is_none() {
        return Err(output.error("Not logged in", ExitCode::AuthFailed));
    }

    match store.profile() {
        Some(profile) => emit(output, profile, |p| p.to_string()),
        None => Err(output.error(
            "No profile cached (try refresh-profile)",
            ExitCode::Error,
        )),
    }
}

pub async fn status_cmd(config: &Config, output: &Output) -> CmdResult {
    let store = token_store(config, output)?;
    let state = start_session(config, &store, output).await?;
    let session = state.session();

    let status = SessionStatus {
        logged_in: session.is_some(),
        mode: config.auth_mode(),
        session_kind: session.map(Session::mode),
        username: store.username(),
        degraded: matches!(session, Some(Session::Bearer(pair)) if pair.is_degraded()),
        storage_keys: store.debug_keys(),
    };

    emit(output, status, |s| {
        let mut lines = vec![format!("Mode:      {}", s.mode)];
        match (&s.session_kind, &s.username) {
            (Some(kind), Some(user)) => lines.push(format!("Session:   {} ({})", user, kind)),
            (Some(kind), None) => lines.push(format!("Session:   active ({})", kind)),
            (None, _) => lines.push("Session:   logged out".to_string()),
        }
        if s.degraded {
            lines.push("Warning:   no refresh token, the access token is reused".to_string());
        }
        lines.join("\n")
    })
}

pub async fn refresh_profile_cmd(config: &Config, output: &Output) -> CmdResult {
    let store = token_store(config, output)?;
    let state = start_session(config, &store, output).await?;

    let profile = match state.session() {
        None => return Err(output.error("Not logged in", ExitCode::AuthFailed)),
        Some(Session::Bearer(_)) => {
            let client: AuthenticatedClient = bearer_auth(config, &store, output)?.client();
            client
                .me()
                .await
                .map_err(|e| output.api_error("Failed to fetch profile", &e))?
        }
        Some(Session::Handshake { session_id, .. }) => {
            let tmdb = tmdb_client(config, output)?;
            let account = tmdb
                .account_details(session_id)
                .await
                .map_err(|e| output.api_error("Failed to fetch account", &e))?;
            let profile = UserProfile::from(&account);
            let _ = store.store_account_id(account.id);
            store
                .store_profile(&profile)
                .map_err(|e| output.error(format!("Failed to cache profile: {}", e), ExitCode::Error))?;
            profile
        }
    };

    emit(output, profile, |p| p.to_string())
}

// =============================================================================
// Browse Commands
// =============================================================================

fn render_page(page: &Page<MovieSummary>) -> String {
    if page.results.is_empty() {
        return "No movies found.".to_string();
    }
    let mut lines: Vec<String> = page.results.iter().map(|m| format!("  {}", m)).collect();
    lines.push(format!(
        "Page {}/{} ({} results)",
        page.page, page.total_pages, page.total_results
    ));
    lines.join("\n")
}

fn limited(mut page: Page<MovieSummary>, args: PageArgs) -> Page<MovieSummary> {
    if let Some(limit) = args.limit {
        page.results.truncate(limit);
    }
    page
}

pub async fn list_cmd(list: MovieList, args: PageArgs, config: &Config, output: &Output) -> CmdResult {
    let tmdb = tmdb_client(config, output)?;
    let page = tmdb
        .movie_list(list, args.page)
        .await
        .map_err(|e| output.api_error("Failed to load movies", &e))?;
    emit(output, limited(page, args), render_page)
}

pub async fn genre_cmd(cmd: GenreCmd, config: &Config, output: &Output) -> CmdResult {
    let tmdb = tmdb_client(config, output)?;
    let page = tmdb
        .discover_by_genre(cmd.genre, cmd.page.page)
        .await
        .map_err(|e| output.api_error("Failed to load genre", &e))?;
    emit(output, limited(page, cmd.page), render_page)
}

pub async fn search_cmd(cmd: SearchCmd, config: &Config, output: &Output) -> CmdResult {
    let query = cmd.query.trim();
    if query.is_empty() {
        return Err(output.error("Empty search query", ExitCode::InvalidArgs));
    }

    let tmdb = tmdb_client(config, output)?;
    output.info(format!("Searching for: {}", query));
    let page = tmdb
        .search_movies(query, cmd.page.page)
        .await
        .map_err(|e| output.api_error("Search failed", &e))?;
    emit(output, limited(page, cmd.page), render_page)
}

fn render_movie(detail: &MovieDetail) -> String {
    let mut lines = vec![detail.to_string()];
    if !detail.genres.is_empty() {
        let genres: Vec<&str> = detail.genres.iter().map(|g| g.name.as_str()).collect();
        lines.push(genres.join(", "));
    }
    if !detail.overview.is_empty() {
        lines.push(String::new());
        lines.push(detail.overview.clone());
    }
    if let Some(credits) = &detail.credits {
        let directors: Vec<&str> = credits
            .crew
            .iter()
            .filter(|c| c.job.as_deref() == Some("Director"))
            .map(|c| c.name.as_str())
            .collect();
        if !directors.is_empty() {
            lines.push(format!("\nDirected by {}", directors.join(", ")));
        }
        let cast: Vec<String> = credits
            .cast
            .iter()
            .take(8)
            .map(|c| match &c.character {
                Some(role) if !role.is_empty() => format!("  {} as {} [#{}]", c.name, role, c.id),
                _ => format!("  {} [#{}]", c.name, c.id),
            })
            .collect();
        if !cast.is_empty() {
            lines.push("Cast:".to_string());
            lines.extend(cast);
        }
    }
    if let Some(trailer) = detail
        .videos
        .as_ref()
        .and_then(|v| Video::pick_trailer(&v.results))
        .and_then(Video::url)
    {
        lines.push(format!("Trailer: {}", trailer));
    }
    if let Some(similar) = detail.similar.as_ref().filter(|p| !p.results.is_empty()) {
        lines.push("Similar:".to_string());
        lines.extend(similar.results.iter().take(5).map(|m| format!("  {}", m)));
    }
    lines.join("\n")
}

pub async fn movie_cmd(cmd: MovieCmd, config: &Config, output: &Output) -> CmdResult {
    let tmdb = tmdb_client(config, output)?;
    let detail = tmdb
        .movie_detail(cmd.id)
        .await
        .map_err(|e| output.api_error("Failed to load movie", &e))?;
    emit(output, detail, render_movie)
}

#[derive(Debug, Serialize)]
struct PersonView {
    #[serde(flatten)]
    person: Person,
    movies: PersonMovieCredits,
}

pub async fn person_cmd(cmd: PersonCmd, config: &Config, output: &Output) -> CmdResult {
    let tmdb = tmdb_client(config, output)?;
    let (person, movies) = tokio::try_join!(tmdb.person(cmd.id), tmdb.person_movie_credits(cmd.id))
        .map_err(|e| output.api_error("Failed to load person", &e))?;

    emit(output, PersonView { person, movies }, |v| {
        let mut lines = vec![v.person.name.clone()];
        if let Some(birthday) = &v.person.birthday {
            let place = v.person.place_of_birth.as_deref().unwrap_or("?");
            lines.push(format!("Born {} in {}", birthday, place));
        }
        if !v.person.biography.is_empty() {
            lines.push(String::new());
            lines.push(v.person.biography.clone());
        }
        if !v.movies.cast.is_empty() {
            lines.push("Movies:".to_string());
            lines.extend(v.movies.cast.iter().take(15).map(|c| {
                let year = c.release_date.as_deref().and_then(crate::models::extract_year);
                match year {
                    Some(y) => format!("  {} ({}) [#{}]", c.title, y, c.id),
                    None => format!("  {} [#{}]", c.title, c.id),
                }
            }));
        }
        lines.join("\n")
    })
}

pub async fn providers_cmd(cmd: ProvidersCmd, config: &Config, output: &Output) -> CmdResult {
    let tmdb = tmdb_client(config, output)?;
    let providers = tmdb
        .watch_providers(cmd.id)
        .await
        .map_err(|e| output.api_error("Failed to load providers", &e))?;

    let country = cmd.country.to_ascii_uppercase();
    let Some(found) = providers.for_country(&country).cloned() else {
        return Err(output.error(
            format!("No providers listed for {}", country),
            ExitCode::Error,
        ));
    };

    emit(output, found, |p| {
        let names = |list: &[crate::models::Provider]| {
            list.iter()
                .map(|p| p.provider_name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut lines = Vec::new();
        if !p.flatrate.is_empty() {
            lines.push(format!("Stream: {}", names(&p.flatrate)));
        }
        if !p.rent.is_empty() {
            lines.push(format!("Rent:   {}", names(&p.rent)));
        }
        if !p.buy.is_empty() {
            lines.push(format!("Buy:    {}", names(&p.buy)));
        }
        if let Some(link) = &p.link {
            lines.push(link.clone());
        }
        lines.join("\n")
    })
}

// =============================================================================
// Account Lists
// =============================================================================

pub async fn account_list_cmd(
    list: AccountList,
    cmd: AccountListCmd,
    config: &Config,
    output: &Output,
) -> CmdResult {
    let store = token_store(config, output)?;
    let state = start_session(config, &store, output).await?;
    let (session_id, account_id) = match state.session() {
        Some(Session::Handshake {
            session_id,
            account_id,
        }) => (session_id.clone(), (*account_id).or_else(|| store.account_id())),
        Some(Session::Bearer(_)) => {
            return Err(output.error(
                "Account lists need a TMDB session (use --mode handshake)",
                ExitCode::ConfigError,
            ))
        }
        None => return Err(output.error("Not logged in", ExitCode::AuthFailed)),
    };

    let tmdb = tmdb_client(config, output)?;
    match cmd.action {
        None => {
            let page = tmdb
                .account_movies(list, account_id, &session_id, cmd.page.page)
                .await
                .map_err(|e| output.api_error("Failed to load list", &e))?;
            emit(output, limited(page, cmd.page), render_page)
        }
        Some(action) => {
            let (movie_id, present) = match action {
                ListAction::Add { id } => (id, true),
                ListAction::Remove { id } => (id, false),
            };
            let status = tmdb
                .set_account_movie(list, account_id, &session_id, movie_id, present)
                .await
                .map_err(|e| output.api_error("Failed to update list", &e))?;
            debug!(movie_id, present, ?status, "Account list updated");
            emit(output, status, |s| {
                s.status_message
                    .clone()
                    .unwrap_or_else(|| "Updated.".to_string())
            })
        }
    }
}

// =============================================================================
// Preferences
// =============================================================================

pub async fn prefs_cmd(cmd: PrefsCmd, config: &Config, output: &Output) -> CmdResult {
    let store = token_store(config, output)?;
    let mut prefs = store.preferences_or_default();

    if cmd.is_update() {
        if let Some(theme) = cmd.theme {
            prefs.theme = theme.into();
        }
        if let Some(toggle) = cmd.notifications {
            prefs.notifications_enabled = toggle.into();
        }
        store
            .store_preferences(&prefs)
            .map_err(|e| output.error(format!("Failed to save preferences: {}", e), ExitCode::Error))?;
    }

    emit(output, prefs, |p| {
        format!(
            "Theme:         {:?}\nNotifications: {}",
            p.theme,
            if p.notifications_enabled { "on" } else { "off" }
        )
    })
}
