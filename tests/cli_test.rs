//! CLI Command Tests
//!
//! Argument parsing, JSON output format, and command handlers run against
//! mocked backends with file-backed storage. Covers exit codes end to end.

// =============================================================================
// CLI Argument Parsing Tests
// =============================================================================

mod cli_parsing {
    use clap::Parser;
    use cinemate::cli::{Cli, Command, ExitCode as CliExitCode, ListAction, ThemeArg, Toggle};
    use cinemate::models::{AuthMode, Genre};

    #[test]
    fn test_login_command() {
        let cli = Cli::parse_from(["cinemate", "login", "alice", "--password-stdin"]);
        match cli.command {
            Command::Login(cmd) => {
                assert_eq!(cmd.username.as_deref(), Some("alice"));
                assert!(cmd.password_stdin);
                assert!(cmd.password.is_none());
            }
            _ => panic!("Expected Login command"),
        }
    }

    #[test]
    fn test_login_username_optional() {
        let cli = Cli::parse_from(["cinemate", "login"]);
        match cli.command {
            Command::Login(cmd) => assert!(cmd.username.is_none()),
            _ => panic!("Expected Login command"),
        }
    }

    #[test]
    fn test_signup_command() {
        let cli = Cli::parse_from([
            "cinemate",
            "signup",
            "--first-name",
            "Ana",
            "--last-name",
            "Lopez",
            "-u",
            "ana",
            "-e",
            "ana@example.com",
            "-p",
            "secret",
            "--phone",
            "+33600000000",
        ]);
        match cli.command {
            Command::Signup(cmd) => {
                assert_eq!(cmd.first_name, "Ana");
                assert_eq!(cmd.username, "ana");
                assert_eq!(cmd.password.as_deref(), Some("secret"));
                assert_eq!(cmd.phone.as_deref(), Some("+33600000000"));
                assert!(cmd.birth_date.is_none());
                assert!(!cmd.no_check);
            }
            _ => panic!("Expected Signup command"),
        }
    }

    #[test]
    fn test_signup_requires_identity_fields() {
        assert!(Cli::try_parse_from(["cinemate", "signup", "-u", "ana"]).is_err());
    }

    #[test]
    fn test_logout_purge() {
        let cli = Cli::parse_from(["cinemate", "logout", "--purge"]);
        match cli.command {
            Command::Logout(cmd) => assert!(cmd.purge),
            _ => panic!("Expected Logout command"),
        }
    }

    #[test]
    fn test_listing_commands() {
        let cli = Cli::parse_from(["cinemate", "now-playing", "-P", "3", "-l", "5"]);
        match cli.command {
            Command::NowPlaying(args) => {
                assert_eq!(args.page, 3);
                assert_eq!(args.limit, Some(5));
            }
            _ => panic!("Expected NowPlaying command"),
        }

        assert!(matches!(
            Cli::parse_from(["cinemate", "top-rated"]).command,
            Command::TopRated(_)
        ));
        assert!(matches!(
            Cli::parse_from(["cinemate", "upcoming"]).command,
            Command::Upcoming(_)
        ));
    }

    #[test]
    fn test_genre_command() {
        let cli = Cli::parse_from(["cinemate", "genre", "Documentary"]);
        match cli.command {
            Command::Genre(cmd) => {
                assert_eq!(cmd.genre, Genre::Documentary);
                assert_eq!(cmd.page.page, 1);
            }
            _ => panic!("Expected Genre command"),
        }
    }

    #[test]
    fn test_movie_requires_numeric_id() {
        assert!(Cli::try_parse_from(["cinemate", "movie", "tt1375666"]).is_err());
        let cli = Cli::parse_from(["cinemate", "movie", "27205"]);
        assert!(matches!(cli.command, Command::Movie(cmd) if cmd.id == 27205));
    }

    #[test]
    fn test_providers_default_country() {
        let cli = Cli::parse_from(["cinemate", "providers", "27205"]);
        match cli.command {
            Command::Providers(cmd) => assert_eq!(cmd.country, "FR"),
            _ => panic!("Expected Providers command"),
        }
    }

    #[test]
    fn test_favorites_remove() {
        let cli = Cli::parse_from(["cinemate", "favorites", "rm", "550"]);
        match cli.command {
            Command::Favorites(cmd) => {
                assert_eq!(cmd.action, Some(ListAction::Remove { id: 550 }))
            }
            _ => panic!("Expected Favorites command"),
        }
    }

    #[test]
    fn test_prefs_command() {
        let cli = Cli::parse_from(["cinemate", "prefs", "--theme", "light", "--notifications", "on"]);
        match cli.command {
            Command::Prefs(cmd) => {
                assert_eq!(cmd.theme, Some(ThemeArg::Light));
                assert_eq!(cmd.notifications, Some(Toggle::On));
            }
            _ => panic!("Expected Prefs command"),
        }
        assert!(Cli::try_parse_from(["cinemate", "prefs", "--theme", "sepia"]).is_err());
    }

    #[test]
    fn test_mode_flag_accepts_aliases() {
        let cli = Cli::parse_from(["cinemate", "status", "--mode", "tmdb"]);
        assert_eq!(cli.mode, Some(AuthMode::Handshake));
        let cli = Cli::parse_from(["cinemate", "-m", "jwt", "status"]);
        assert_eq!(cli.mode, Some(AuthMode::Bearer));
        assert!(Cli::try_parse_from(["cinemate", "--mode", "oauth", "status"]).is_err());
    }

    #[test]
    fn test_command_aliases() {
        assert!(matches!(
            Cli::parse_from(["cinemate", "s", "alien"]).command,
            Command::Search(_)
        ));
        assert!(matches!(
            Cli::parse_from(["cinemate", "i", "348"]).command,
            Command::Movie(_)
        ));
        assert!(matches!(
            Cli::parse_from(["cinemate", "favs"]).command,
            Command::Favorites(_)
        ));
        assert!(matches!(
            Cli::parse_from([
                "cinemate", "register", "--first-name", "A", "--last-name", "B", "-u", "ab",
                "-e", "a@b.c"
            ])
            .command,
            Command::Signup(_)
        ));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(i32::from(CliExitCode::Success), 0);
        assert_eq!(i32::from(CliExitCode::AuthFailed), 4);
        assert_eq!(i32::from(CliExitCode::SessionExpired), 5);
        assert_eq!(i32::from(CliExitCode::ConfigError), 6);
    }
}

// =============================================================================
// JSON Output Tests
// =============================================================================

mod json_output {
    use cinemate::cli::{ExitCode, JsonOutput, SessionStatus};
    use cinemate::models::AuthMode;

    #[test]
    fn test_json_output_success() {
        let output = JsonOutput::success(vec!["a", "b"]);
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"data":["a","b"]}"#);
    }

    #[test]
    fn test_json_output_error() {
        let output = JsonOutput::<()>::error_msg("TOKEN_REFRESH_FAILED", ExitCode::SessionExpired);
        let json = serde_json::to_string(&output).unwrap();
        assert_eq!(json, r#"{"error":"TOKEN_REFRESH_FAILED","exit_code":5}"#);
    }

    #[test]
    fn test_session_status_format() {
        let status = SessionStatus {
            logged_in: false,
            mode: AuthMode::Bearer,
            session_kind: None,
            username: None,
            degraded: false,
            storage_keys: vec![],
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["mode"], "bearer");
        assert!(value.get("session_kind").is_none());
        assert_eq!(value["logged_in"], false);
    }
}

// =============================================================================
// Output Helper Tests
// =============================================================================

mod output_helpers {
    use cinemate::api::ApiError;
    use cinemate::cli::{ExitCode, Output};

    #[test]
    fn test_error_returns_code() {
        let output = Output {
            json: false,
            quiet: true,
        };
        assert_eq!(output.error("boom", ExitCode::NetworkError), ExitCode::NetworkError);
    }

    #[test]
    fn test_api_error_maps_code() {
        let output = Output {
            json: true,
            quiet: true,
        };
        assert_eq!(
            output.api_error("Refresh", &ApiError::SessionExpired),
            ExitCode::SessionExpired
        );
    }
}

// =============================================================================
// Command Handler Tests
// =============================================================================

mod command_handlers {
    use std::path::PathBuf;

    use cinemate::cli::{
        AccountListCmd, ExitCode, LoginCmd, LogoutCmd, Output, PageArgs, PrefsCmd, ThemeArg,
    };
    use cinemate::commands;
    use cinemate::api::tmdb::{AccountList, MovieList};
    use cinemate::config::Config;
    use cinemate::models::{AuthMode, ThemeMode, TokenPair};
    use mockito::{Matcher, Server};
    use tempfile::TempDir;

    fn output() -> Output {
        Output {
            json: true,
            quiet: true,
        }
    }

    fn config(dir: &TempDir, backend: Option<String>, tmdb: Option<String>) -> Config {
        Config {
            api_base_url: backend,
            tmdb_base_url: tmdb.clone(),
            tmdb_api_key: tmdb.map(|_| "test_key".to_string()),
            storage_path: Some(storage_path(dir)),
            ..Default::default()
        }
    }

    fn storage_path(dir: &TempDir) -> PathBuf {
        dir.path().join("storage.json")
    }

    fn login(username: &str, password: &str) -> LoginCmd {
        LoginCmd {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            password_stdin: false,
        }
    }

    fn page() -> PageArgs {
        PageArgs { page: 1, limit: None }
    }

    #[tokio::test]
    async fn test_login_persists_session_to_file() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(200)
            .with_body(r#"{"accessToken": "A", "refreshToken": "R", "user": {"username": "ana"}}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some(server.url()), None);

        let result = commands::login_cmd(login("ana", "pw"), &config, &output()).await;
        assert_eq!(result, Ok(()));

        // A fresh process sees the same session
        let store = config.token_store().unwrap();
        assert_eq!(store.tokens(), Some(TokenPair::new("A", "R")));
        assert_eq!(store.username().as_deref(), Some("ana"));
        assert!(std::fs::read_to_string(storage_path(&dir))
            .unwrap()
            .contains("cinemate.access_token"));
    }

    #[tokio::test]
    async fn test_login_rejected_exit_code() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/api/v1/auth/login")
            .with_status(401)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some(server.url()), None);

        let result = commands::login_cmd(login("ana", "bad"), &config, &output()).await;
        assert_eq!(result, Err(ExitCode::AuthFailed));
        assert!(!config.token_store().unwrap().is_logged_in());
    }

    #[tokio::test]
    async fn test_login_without_password_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some("http://127.0.0.1:9".into()), None);
        let cmd = LoginCmd {
            username: Some("ana".into()),
            password: None,
            password_stdin: false,
        };

        let result = commands::login_cmd(cmd, &config, &output()).await;
        assert_eq!(result, Err(ExitCode::InvalidArgs));
    }

    #[tokio::test]
    async fn test_login_without_backend_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, None, None);

        let result = commands::login_cmd(login("ana", "pw"), &config, &output()).await;
        assert_eq!(result, Err(ExitCode::ConfigError));
    }

    #[tokio::test]
    async fn test_browse_without_api_key_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, None, None);

        let result = commands::list_cmd(MovieList::Popular, page(), &config, &output()).await;
        assert_eq!(result, Err(ExitCode::ConfigError));
    }

    #[tokio::test]
    async fn test_popular_lists_movies() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/movie/popular")
            .match_query(Matcher::UrlEncoded("api_key".into(), "test_key".into()))
            .with_status(200)
            .with_body(r#"{"page": 1, "results": [{"id": 1, "title": "A"}, {"id": 2, "title": "B"}], "total_pages": 1, "total_results": 2}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, None, Some(server.url()));
        let args = PageArgs {
            page: 1,
            limit: Some(1),
        };

        let result = commands::list_cmd(MovieList::Popular, args, &config, &output()).await;
        mock.assert_async().await;
        assert_eq!(result, Ok(()));
    }

    #[tokio::test]
    async fn test_whoami_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some("http://127.0.0.1:9".into()), None);

        let result = commands::whoami_cmd(&config, &output()).await;
        assert_eq!(result, Err(ExitCode::AuthFailed));
    }

    #[tokio::test]
    async fn test_refresh_profile_with_dead_refresh_token_expires_session() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/v1/users/me")
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/api/v1/auth/refresh")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some(server.url()), None);
        config
            .token_store()
            .unwrap()
            .store_tokens(&TokenPair::new("OLD", "DEAD"))
            .unwrap();

        let result = commands::refresh_profile_cmd(&config, &output()).await;

        refresh.assert_async().await;
        assert_eq!(result, Err(ExitCode::SessionExpired));
        assert!(!config.token_store().unwrap().is_logged_in());
    }

    #[tokio::test]
    async fn test_prefs_survive_logout() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some("http://127.0.0.1:9".into()), None);
        let store = config.token_store().unwrap();
        store.store_tokens(&TokenPair::new("A", "R")).unwrap();

        let cmd = PrefsCmd {
            theme: Some(ThemeArg::Dark),
            notifications: None,
        };
        assert_eq!(commands::prefs_cmd(cmd, &config, &output()).await, Ok(()));

        // Backend unreachable: remote logout fails, local logout still happens
        let result = commands::logout_cmd(LogoutCmd { purge: false }, &config, &output()).await;
        assert_eq!(result, Ok(()));

        assert!(!store.is_logged_in());
        let prefs = store.preferences().unwrap();
        assert_eq!(prefs.theme, ThemeMode::Dark);
        assert!(prefs.notifications_enabled);
    }

    #[tokio::test]
    async fn test_logout_purge_forgets_prefs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(&dir, Some("http://127.0.0.1:9".into()), None);
        let store = config.token_store().unwrap();
        store
            .store_preferences(&cinemate::models::Preferences::default())
            .unwrap();

        let result = commands::logout_cmd(LogoutCmd { purge: true }, &config, &output()).await;
        assert_eq!(result, Ok(()));
        assert!(store.preferences().is_none());
    }

    #[tokio::test]
    async fn test_watchlist_needs_tmdb_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(
            &dir,
            Some("http://127.0.0.1:9".into()),
            Some("http://127.0.0.1:9".into()),
        );
        config
            .token_store()
            .unwrap()
            .store_tokens(&TokenPair::new("A", "R"))
            .unwrap();

        let cmd = AccountListCmd {
            action: None,
            page: page(),
        };
        let result =
            commands::account_list_cmd(AccountList::Watchlist, cmd, &config, &output()).await;
        assert_eq!(result, Err(ExitCode::ConfigError));
    }

    #[tokio::test]
    async fn test_watchlist_with_handshake_session() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/account/42/watchlist/movies")
            .match_query(Matcher::UrlEncoded("session_id".into(), "SID".into()))
            .with_status(200)
            .with_body(r#"{"page": 1, "results": [], "total_pages": 0, "total_results": 0}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = config(&dir, None, Some(server.url()));
        config.auth_mode = Some(AuthMode::Handshake);
        let store = config.token_store().unwrap();
        store.store_handshake_session("SID").unwrap();
        store.store_account_id(42).unwrap();

        let cmd = AccountListCmd {
            action: None,
            page: page(),
        };
        let result =
            commands::account_list_cmd(AccountList::Watchlist, cmd, &config, &output()).await;

        mock.assert_async().await;
        assert_eq!(result, Ok(()));
    }
}
