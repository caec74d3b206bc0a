//! Web server for the pool
//!
//! JSON endpoints for accounts, picks, rules and standings, plus an admin
//! surface for settlement and log inspection.

mod admin;
mod auth;
mod server;

pub use auth::create_session_store;
pub use server::{start_web_server, AppState, ServerConfig};
