//! HTTP server for the pool API

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use axum_server::tls_rustls::RustlsConfig;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::admin::admin_router;
use super::auth::{login, logout, require_user, signup, SharedSessionStore};
use crate::config::SharedPoolConfig;
use crate::error::{PoolError, Result};
use crate::feed::{SharedEventCache, TournamentInfo, TournamentState, TtlCache};
use crate::logging::SharedLogBuffer;
use crate::managers::{PickStatus, SharedPickManager, SharedRuleManager, SharedSettlementManager};
use crate::scoring::{
    build_draft_pool, build_league_table, build_player_table, build_profile, build_weekly_table,
    DraftPoolReport, LeagueRow, PlayerRow, Profile, Rule, WeeklyRow,
};
use crate::state::{Pick, SharedPoolDatabase};

/// Web server configuration
pub struct ServerConfig {
    pub http_port: u16,
    /// Path to certificate PEM file (cert + CA bundle)
    pub cert_path: PathBuf,
    /// Path to private key PEM file
    pub key_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: 3000,
            cert_path: PathBuf::from("certs/cert.pem"),
            key_path: PathBuf::from("certs/key.pem"),
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_port),
            cert_path: std::env::var("TLS_CERT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.cert_path),
            key_path: std::env::var("TLS_KEY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.key_path),
        }
    }

    /// TLS is served only when both PEM files are present
    pub fn tls_enabled(&self) -> bool {
        self.cert_path.exists() && self.key_path.exists()
    }
}

/// Shared state for web handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SharedPoolDatabase,
    pub config: SharedPoolConfig,
    pub cache: SharedEventCache,
    pub picks: SharedPickManager,
    pub rules: SharedRuleManager,
    pub settlement: SharedSettlementManager,
    pub sessions: SharedSessionStore,
    pub log_buffer: SharedLogBuffer,
    /// Weekly table per event, dropped whenever picks change
    pub weekly_cache: Arc<TtlCache<Vec<WeeklyRow>>>,
    pub state_path: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/api/event", get(event))
        .route("/api/pick", get(pick_status).post(submit_pick))
        .route("/api/rules/:rule", post(use_rule))
        .route("/api/profile", get(profile))
        .route("/api/league", get(league))
        .route("/api/draft-pool", get(draft_pool))
        .with_state(state.clone())
        .nest("/admin", admin_router(state))
        .layer(CorsLayer::permissive())
}

/// Start the web server, over TLS when certificates are configured
pub async fn start_web_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));

    if config.tls_enabled() {
        info!("Loading TLS certificates:");
        info!("  Certificate: {}", config.cert_path.display());
        info!("  Private key: {}", config.key_path.display());

        let tls_config = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
            .await
            .map_err(|e| anyhow::anyhow!(
                "Failed to load TLS certificates: {}\n  Certificate: {}\n  Private key: {}\n\nHint: The private key must be in PKCS#8 PEM format.",
                e, config.cert_path.display(), config.key_path.display()
            ))?;

        info!("Pool server listening on https://0.0.0.0:{}", config.http_port);
        axum_server::bind_rustls(addr, tls_config)
            .serve(app.into_make_service())
            .await?;
    } else {
        warn!(
            "No TLS certificates at {} / {}, serving plain HTTP",
            config.cert_path.display(),
            config.key_path.display()
        );
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Pool server listening on http://0.0.0.0:{}", config.http_port);
        axum::serve(listener, app.into_make_service()).await?;
    }

    Ok(())
}

/// Health check endpoint
async fn health() -> &'static str {
    "One and Done Pool Running"
}

#[derive(Debug, Serialize)]
struct EventView {
    event: String,
    state: TournamentState,
    round: u32,
    major: bool,
    info: TournamentInfo,
    available: Vec<String>,
    withdrawals: Vec<String>,
}

/// GET /api/event
async fn event(State(state): State<AppState>) -> Result<Json<EventView>> {
    let board = state.cache.refresh_if_stale().await.ok_or(PoolError::NoEventData)?;
    let name = board.event_name().ok_or(PoolError::NoEventData)?;
    let tournament_state = board.tournament_state().ok_or(PoolError::NoEventData)?;

    Ok(Json(EventView {
        event: name.to_string(),
        state: tournament_state,
        round: board.tournament_round(),
        major: state.config.season.is_major(name),
        info: board.tournament_info(),
        available: board.available_picks(),
        withdrawals: board.withdrawals(),
    }))
}

/// GET /api/pick
async fn pick_status(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<PickStatus>> {
    let session = require_user(&headers, &state).await?;
    Ok(Json(state.picks.pick_status(&session.user).await?))
}

#[derive(Debug, Deserialize)]
struct PickRequest {
    golfer: String,
    #[serde(default)]
    alternate: Option<String>,
}

/// POST /api/pick
async fn submit_pick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PickRequest>,
) -> Result<Json<Pick>> {
    let session = require_user(&headers, &state).await?;
    let pick = state
        .picks
        .submit_pick(&session.user, &req.golfer, req.alternate.as_deref())
        .await?;
    state.weekly_cache.clear();
    Ok(Json(pick))
}

#[derive(Debug, Default, Deserialize)]
struct RuleRequest {
    #[serde(default)]
    golfer: Option<String>,
}

/// POST /api/rules/:rule
async fn use_rule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(rule): Path<String>,
    body: Option<Json<RuleRequest>>,
) -> Result<Json<Pick>> {
    let session = require_user(&headers, &state).await?;
    let rule: Rule = rule.parse()?;
    let req = body.map(|Json(r)| r).unwrap_or_default();

    let pick = state
        .rules
        .apply_rule(&session.user, rule, req.golfer.as_deref())
        .await?;
    state.weekly_cache.clear();
    Ok(Json(pick))
}

/// GET /api/profile
async fn profile(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Profile>> {
    let session = require_user(&headers, &state).await?;
    let db = state.db.read().await;
    Ok(Json(build_profile(&db, &session.user, &state.config.season.season_id)?))
}

#[derive(Debug, Serialize)]
struct LeagueView {
    event: Option<String>,
    state: Option<TournamentState>,
    league: Vec<LeagueRow>,
    /// Only once the event is under way
    weekly: Option<Vec<WeeklyRow>>,
    players: Vec<PlayerRow>,
}

/// GET /api/league
async fn league(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<LeagueView>> {
    require_user(&headers, &state).await?;
    let board = state.cache.refresh_if_stale().await;
    let event = board.as_ref().and_then(|b| b.event_name().map(str::to_string));
    let tournament_state = board.as_ref().and_then(|b| b.tournament_state());

    let db = state.db.read().await;
    let league = build_league_table(&db, &state.config.season.season_id, event.as_deref());
    let players = build_player_table(&db);

    let weekly = match (&board, &event, tournament_state) {
        (Some(board), Some(event), Some(s)) if s != TournamentState::Pre => {
            let rows = match state.weekly_cache.get_fresh(event) {
                Some(rows) => rows,
                None => {
                    let rows = build_weekly_table(&db, &state.config, board);
                    state.weekly_cache.insert(event, rows.clone());
                    rows
                }
            };
            Some(rows)
        }
        _ => None,
    };

    Ok(Json(LeagueView {
        event,
        state: tournament_state,
        league,
        weekly,
        players,
    }))
}

/// GET /api/draft-pool
async fn draft_pool(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<DraftPoolReport>> {
    require_user(&headers, &state).await?;
    let board = state.cache.refresh_if_stale().await.ok_or(PoolError::NoEventData)?;
    Ok(Json(build_draft_pool(&state.config.draft_pool, &board)))
}


#[cfg(test)]
mod tests {
    use super::testing::{app_state, cookie_for};
    use super::*;
    use crate::feed::leaderboard::fixtures::*;
    use axum::body::Body;
    use axum::http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        Request, StatusCode,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn field(state: &str) -> Value {
        scoreboard(
            "RBC Heritage",
            state,
            if state == "pre" { 0 } else { 2 },
            vec![
                competitor("Jon Rahm", state, 2, &[(68.0, "-3", 1), (70.0, "-1", 1)], 0.0),
                competitor("Rory McIlroy", state, 2, &[(70.0, "-1", 2), (71.0, "E", 2)], 0.0),
            ],
        )
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, cookie: &str) -> Request<Body> {
        Request::builder().uri(uri).header(COOKIE, cookie).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_and_event() {
        let app = build_router(app_state(field("pre")).await);

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::builder().uri("/api/event").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["event"], "RBC Heritage");
        assert_eq!(body["state"], "pre");
        assert_eq!(body["available"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pick_requires_session() {
        let app = build_router(app_state(field("pre")).await);
        let response = app
            .oneshot(Request::builder().uri("/api/pick").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_json(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn test_submit_pick_then_profile() {
        let state = app_state(field("pre")).await;
        let cookie = cookie_for(&state, "bob", false).await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/api/pick", Some(&cookie), json!({"golfer": "Jon Rahm"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["golfer"], "Jon Rahm");

        let response = app
            .clone()
            .oneshot(post_json("/api/pick", Some(&cookie), json!({"golfer": "Tiger Woods"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(get_with("/api/profile", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["name"], "bob");
        assert_eq!(body["picks"][0]["pick"], "Jon Rahm");
    }

    #[tokio::test]
    async fn test_double_up_without_body() {
        let state = app_state(field("pre")).await;
        let cookie = cookie_for(&state, "bob", false).await;
        let app = build_router(state);

        app.clone()
            .oneshot(post_json("/api/pick", Some(&cookie), json!({"golfer": "Jon Rahm"})))
            .await
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/rules/double-up")
            .header(COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["multiplier"], 2);

        let response = app
            .oneshot(post_json("/api/rules/mulligan", Some(&cookie), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_league_shows_weekly_once_started() {
        let state = app_state(field("pre")).await;
        let cookie = cookie_for(&state, "alice", false).await;
        let app = build_router(state);
        let response = app.oneshot(get_with("/api/league", &cookie)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["league"].as_array().unwrap().len(), 2);
        assert!(body["weekly"].is_null());

        let state = app_state(field("in")).await;
        let cookie = cookie_for(&state, "alice", false).await;
        let app = build_router(state);
        let response = app.oneshot(get_with("/api/league", &cookie)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["state"], "in");
        // No picks yet: one placeholder row per user
        assert_eq!(body["weekly"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_signup_login_logout() {
        let app = build_router(app_state(field("pre")).await);

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                None,
                json!({"email": "Carol@Example.com", "name": "carol", "password": "birdie-putt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_some());

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/signup",
                None,
                json!({"email": "carol@example.com", "name": "carol2", "password": "birdie-putt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                None,
                json!({"email": "carol@example.com", "password": "bogey"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(post_json(
                "/auth/login",
                None,
                json!({"email": "carol@example.com", "password": "birdie-putt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(post_json("/auth/logout", Some(&cookie), json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(get_with("/api/pick", &cookie)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
