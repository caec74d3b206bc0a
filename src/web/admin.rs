//! Admin routes
//!
//! Provides:
//! - Manual settlement of the current event
//! - Forced leaderboard refresh
//! - Recent and live captured logs

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{info, Level};

use super::auth::require_admin;
use super::server::AppState;
use crate::error::Result;
use crate::feed::TournamentState;
use crate::logging::LogEntry;
use crate::managers::SettlementReport;

const MAX_LOG_LINES: usize = 1000;

/// Create admin router
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/settle", post(settle))
        .route("/refresh", post(refresh))
        .route("/logs", get(logs))
        .route("/logs/stream", get(logs_stream))
        .with_state(state)
}

/// POST /admin/settle
async fn settle(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<SettlementReport>> {
    let session = require_admin(&headers, &state).await?;
    info!("{} triggered settlement", session.user);

    let report = state.settlement.settle_week().await?;
    state.weekly_cache.clear();
    Ok(Json(report))
}

#[derive(Debug, Serialize)]
struct RefreshView {
    event: Option<String>,
    state: Option<TournamentState>,
    round: u32,
    competitors: usize,
}

/// POST /admin/refresh
async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<RefreshView>> {
    let session = require_admin(&headers, &state).await?;
    let board = state.cache.force_refresh().await?;
    state.weekly_cache.clear();

    let view = RefreshView {
        event: board.event_name().map(str::to_string),
        state: board.tournament_state(),
        round: board.tournament_round(),
        competitors: board.field().len(),
    };
    info!(
        "{} forced a leaderboard refresh: {:?} with {} competitors",
        session.user, view.event, view.competitors
    );
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct LogsQuery {
    count: Option<usize>,
    level: Option<String>,
    format: Option<String>,
}

/// GET /admin/logs?count=200&level=warn&format=text
async fn logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> Result<Response> {
    require_admin(&headers, &state).await?;

    let count = query.count.unwrap_or(200).min(MAX_LOG_LINES);
    let level = query
        .level
        .as_deref()
        .and_then(|l| l.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let entries = state.log_buffer.recent(count, level);
    if query.format.as_deref() == Some("text") {
        let lines: Vec<String> = entries.iter().map(LogEntry::format).collect();
        return Ok(lines.join("\n").into_response());
    }
    Ok(Json(entries).into_response())
}

/// GET /admin/logs/stream - SSE endpoint for live logs
async fn logs_stream(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = require_admin(&headers, &state).await {
        return e.into_response();
    }

    let rx = state.log_buffer.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| {
        match result {
            Ok(entry) => serde_json::to_string(&entry)
                .ok()
                .map(|json| Ok::<_, Infallible>(Event::default().data(json))),
            Err(_) => None, // Skip lagged messages
        }
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)).text("ping"))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::super::server::build_router;
    use super::super::server::testing::{app_state, cookie_for};
    use crate::feed::leaderboard::fixtures::*;
    use crate::logging::LogEntry;
    use axum::body::Body;
    use axum::http::{header::COOKIE, Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    fn finished() -> Value {
        scoreboard(
            "RBC Heritage",
            "post",
            4,
            vec![competitor(
                "Jon Rahm",
                "post",
                4,
                &[(66.0, "-5", 1), (68.0, "-3", 1), (70.0, "-1", 1), (70.0, "-1", 1)],
                3_600_000.0,
            )],
        )
    }

    fn request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_settle_requires_admin() {
        let state = app_state(finished()).await;
        let player = cookie_for(&state, "bob", false).await;
        let admin = cookie_for(&state, "alice", true).await;
        let app = build_router(state);

        let response = app.clone().oneshot(request("POST", "/admin/settle", &player)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.oneshot(request("POST", "/admin/settle", &admin)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["event"], "RBC Heritage");
        assert_eq!(body["published"], true);
    }

    #[tokio::test]
    async fn test_refresh_reports_board() {
        let state = app_state(finished()).await;
        let admin = cookie_for(&state, "alice", true).await;
        let app = build_router(state);

        let response = app.oneshot(request("POST", "/admin/refresh", &admin)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["state"], "post");
        assert_eq!(body["competitors"], 1);
    }

    #[tokio::test]
    async fn test_logs_filter_by_level() {
        let state = app_state(finished()).await;
        let admin = cookie_for(&state, "alice", true).await;
        for (level, message) in [("INFO", "settled"), ("WARN", "feed slow"), ("ERROR", "feed down")] {
            state.log_buffer.push(LogEntry {
                timestamp: chrono::Utc::now(),
                level: level.to_string(),
                target: "oad_pool".to_string(),
                message: message.to_string(),
            });
        }
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(request("GET", "/admin/logs?level=warn", &admin))
            .await
            .unwrap();
        let body = body_json(response).await;
        let messages: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["message"].as_str().unwrap())
            .collect();
        assert_eq!(messages, vec!["feed slow", "feed down"]);

        let response = app.oneshot(request("GET", "/admin/logs?count=1", &admin)).await.unwrap();
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logs_as_plain_text() {
        let state = app_state(finished()).await;
        let admin = cookie_for(&state, "alice", true).await;
        state.log_buffer.push(LogEntry {
            timestamp: chrono::Utc::now(),
            level: "WARN".to_string(),
            target: "oad_pool::feed".to_string(),
            message: "feed slow".to_string(),
        });
        let app = build_router(state);

        let response = app
            .oneshot(request("GET", "/admin/logs?level=warn&format=text", &admin))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.ends_with(" WARN [oad_pool::feed] feed slow"));
        assert_eq!(text.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_log_stream_rejects_anonymous() {
        let app = build_router(app_state(finished()).await);
        let response = app
            .oneshot(Request::builder().uri("/admin/logs/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
