use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum PoolError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // State errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Pool state '{path}' is corrupt: {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // Account errors
    #[error("User not found: {name}")]
    UserNotFound { name: String },

    #[error("Email address already registered: {email}")]
    EmailTaken { email: String },

    #[error("Team name already taken: {name}")]
    NameTaken { name: String },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Not logged in")]
    Unauthorized,

    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Pool errors
    #[error("No tournament data available")]
    NoEventData,

    #[error("Invalid pick: {message}")]
    InvalidPick { message: String },

    #[error("Pick locked: {message}")]
    PickLocked { message: String },

    #[error("Rule '{rule}' unavailable: {message}")]
    RuleUnavailable { rule: String, message: String },

    // Upstream errors
    #[error("Leaderboard feed error: {message}")]
    Feed { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<std::io::Error> for PoolError {
    fn from(err: std::io::Error) -> Self {
        PoolError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for PoolError {
    fn from(err: serde_json::Error) -> Self {
        PoolError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for PoolError {
    fn from(err: reqwest::Error) -> Self {
        PoolError::Feed {
            message: err.to_string(),
        }
    }
}

impl From<bcrypt::BcryptError> for PoolError {
    fn from(err: bcrypt::BcryptError) -> Self {
        PoolError::Internal {
            message: format!("password hashing failed: {}", err),
        }
    }
}

impl PoolError {
    pub fn status(&self) -> StatusCode {
        match self {
            PoolError::InvalidCredentials | PoolError::Unauthorized => StatusCode::UNAUTHORIZED,
            PoolError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            PoolError::UserNotFound { .. } => StatusCode::NOT_FOUND,
            PoolError::EmailTaken { .. } | PoolError::NameTaken { .. } | PoolError::PickLocked { .. } => {
                StatusCode::CONFLICT
            }
            PoolError::InvalidInput { .. } | PoolError::InvalidPick { .. } | PoolError::RuleUnavailable { .. } => {
                StatusCode::BAD_REQUEST
            }
            PoolError::NoEventData | PoolError::Feed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PoolError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
