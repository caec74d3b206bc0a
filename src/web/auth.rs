//! Pool accounts and cookie sessions
//!
//! Players sign up with an email, a team handle and a password. Passwords
//! are stored as bcrypt hashes; a successful login hands out an opaque
//! session token in the `pool_session` cookie.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::server::AppState;
use crate::error::{PoolError, Result};
use crate::state::User;

const SESSION_COOKIE: &str = "pool_session";
const SESSION_TTL_SECS: u64 = 7 * 86400;

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

/// Session data for a logged-in player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub user: String,
    pub is_admin: bool,
    pub created_at: u64,
    pub expires_at: u64,
}

impl UserSession {
    pub fn new(user: String, is_admin: bool) -> Self {
        let now = now_secs();
        Self {
            user,
            is_admin,
            created_at: now,
            expires_at: now + SESSION_TTL_SECS,
        }
    }

    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Session store - maps session tokens to session data
pub struct SessionStore {
    sessions: RwLock<HashMap<String, UserSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a new session and return the token
    pub async fn create_session(&self, session: UserSession) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().await.insert(token.clone(), session);
        token
    }

    /// Get session by token (None if expired or unknown)
    pub async fn get_session(&self, token: &str) -> Option<UserSession> {
        let sessions = self.sessions.read().await;
        sessions.get(token).filter(|s| !s.is_expired()).cloned()
    }

    pub async fn remove_session(&self, token: &str) {
        self.sessions.write().await.remove(token);
    }

    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        before - sessions.len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedSessionStore = Arc<SessionStore>;

pub fn create_session_store() -> SharedSessionStore {
    Arc::new(SessionStore::new())
}

/// Extract session token from cookies
pub fn get_session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get(axum::http::header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .filter(|token| !token.is_empty())
}

pub fn create_session_cookie(token: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    )
}

/// Create a logout cookie (clears the session)
pub fn create_logout_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// bcrypt is CPU bound, so hashing runs off the async workers
pub async fn hash_password(password: &str) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, BCRYPT_COST))
        .await
        .map_err(|e| PoolError::Internal {
            message: e.to_string(),
        })?
        .map_err(PoolError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| PoolError::Internal {
            message: e.to_string(),
        })?
        .map_err(PoolError::from)
}

/// Resolve the session behind the request cookie
pub async fn require_user(headers: &HeaderMap, state: &AppState) -> Result<UserSession> {
    let token = get_session_token(headers).ok_or(PoolError::Unauthorized)?;
    state
        .sessions
        .get_session(&token)
        .await
        .ok_or(PoolError::Unauthorized)
}

pub async fn require_admin(headers: &HeaderMap, state: &AppState) -> Result<UserSession> {
    let session = require_user(headers, state).await?;
    if !session.is_admin {
        return Err(PoolError::PermissionDenied {
            message: "admin access required".to_string(),
        });
    }
    Ok(session)
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub user: String,
    pub team: String,
    pub is_admin: bool,
}

fn validate_signup(req: &SignupRequest) -> Result<()> {
    let email = req.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(PoolError::InvalidInput {
            message: "a valid email address is required".to_string(),
        });
    }
    if req.name.trim().is_empty() {
        return Err(PoolError::InvalidInput {
            message: "a team handle is required".to_string(),
        });
    }
    if req.password.len() < 8 {
        return Err(PoolError::InvalidInput {
            message: "password must be at least 8 characters".to_string(),
        });
    }
    Ok(())
}

/// Log the user in and attach the cookie to the response
async fn start_session(state: &AppState, user: &User) -> Response {
    let session = UserSession::new(user.name.clone(), user.is_admin);
    let token = state.sessions.create_session(session).await;
    let body = SessionInfo {
        user: user.name.clone(),
        team: user.team_name().to_string(),
        is_admin: user.is_admin,
    };
    (
        StatusCode::OK,
        [(SET_COOKIE, create_session_cookie(&token))],
        Json(body),
    )
        .into_response()
}

/// POST /auth/signup
pub async fn signup(State(state): State<AppState>, Json(req): Json<SignupRequest>) -> Result<Response> {
    validate_signup(&req)?;

    let password_hash = hash_password(&req.password).await?;
    let email = req.email.trim().to_lowercase();
    let name = req.name.trim().to_string();

    let mut user = User::new(
        email.clone(),
        name.clone(),
        password_hash,
        &state.config.season.season_id,
        state.config.season.allowances,
    );
    user.display_name = req
        .display_name
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty());
    user.is_admin = state.config.season.is_admin_email(&email);

    {
        let mut db = state.db.write().await;
        let mut next = db.clone();
        next.insert_user(user.clone())?;
        db.commit(next, &state.state_path).await?;
    }

    info!("New pool member {} ({}), admin={}", name, email, user.is_admin);
    Ok(start_session(&state, &user).await)
}

/// POST /auth/login
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Response> {
    let user = {
        let db = state.db.read().await;
        db.find_user_by_email(req.email.trim()).cloned()
    };
    let Some(mut user) = user else {
        warn!("Login attempt for unknown email {}", req.email.trim());
        return Err(PoolError::InvalidCredentials);
    };

    if !verify_password(&req.password, &user.password_hash).await? {
        warn!("Failed login for {}", user.name);
        return Err(PoolError::InvalidCredentials);
    }

    // Admin list may have changed since signup
    user.is_admin = user.is_admin || state.config.season.is_admin_email(&user.email);

    info!("{} logged in", user.name);
    Ok(start_session(&state, &user).await)
}

/// POST /auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let session = require_user(&headers, &state).await?;
    if let Some(token) = get_session_token(&headers) {
        state.sessions.remove_session(&token).await;
    }
    info!("{} logged out", session.user);
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, create_logout_cookie())]).into_response())
}
