use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use super::models::{current_timestamp, Pick, Player, User};
use crate::config::RuleAllowances;
use crate::error::{PoolError, Result};

const SCHEMA_VERSION: u32 = 2;

/// Persistent pool state: members, golfers and picks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDatabase {
    /// Schema version for migrations
    pub version: u32,

    /// Last update timestamp
    pub last_updated: u64,

    /// Users keyed by handle
    pub users: HashMap<String, User>,

    /// Golfers keyed by name
    #[serde(default)]
    pub players: HashMap<String, Player>,

    #[serde(default)]
    pub picks: Vec<Pick>,
}

impl Default for PoolDatabase {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            last_updated: current_timestamp(),
            users: HashMap::new(),
            players: HashMap::new(),
            picks: Vec::new(),
        }
    }
}

impl PoolDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file. Only a missing file yields an empty database;
    /// unreadable or corrupt files are errors so they never get overwritten.
    pub async fn load(path: &str) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let mut value: serde_json::Value =
                    serde_json::from_str(&content).map_err(|e| PoolError::StateParse {
                        path: path.to_string(),
                        source: e,
                    })?;

                migrate(&mut value);

                serde_json::from_value(value).map_err(|e| PoolError::StateParse {
                    path: path.to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(PoolError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically
    pub async fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| PoolError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| PoolError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Persist `next` and only then make it the live state. A failed save
    /// leaves `self` as it was.
    pub async fn commit(&mut self, next: PoolDatabase, path: &str) -> Result<()> {
        next.save(path).await?;
        *self = next;
        Ok(())
    }

    fn touch(&mut self) {
        self.last_updated = current_timestamp();
    }

    // ========== Users ==========

    pub fn find_user(&self, name: &str) -> Option<&User> {
        self.users.get(name)
    }

    pub fn find_user_mut(&mut self, name: &str) -> Option<&mut User> {
        self.users.get_mut(name)
    }

    pub fn find_user_by_email(&self, email: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email.trim()))
    }

    /// Insert a new user, rejecting duplicate emails and handles
    pub fn insert_user(&mut self, user: User) -> Result<()> {
        if self.find_user_by_email(&user.email).is_some() {
            return Err(PoolError::EmailTaken { email: user.email });
        }
        if self.users.contains_key(&user.name) {
            return Err(PoolError::NameTaken { name: user.name });
        }
        self.users.insert(user.name.clone(), user);
        self.touch();
        Ok(())
    }

    /// Users sorted by handle so tables are stable
    pub fn all_users(&self) -> Vec<&User> {
        let mut users: Vec<&User> = self.users.values().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users
    }

    /// Reset rule markers for users still on an older season
    pub fn roll_season(&mut self, season_id: &str, allowances: RuleAllowances) -> usize {
        let mut rolled = 0;
        for user in self.users.values_mut() {
            if user.rules_season != season_id {
                user.reset_rules(season_id, allowances);
                rolled += 1;
            }
        }
        if rolled > 0 {
            info!("Reset rule allowances for {} users for season {}", rolled, season_id);
            self.touch();
        }
        rolled
    }

    // ========== Players ==========

    /// Create the golfer if unseen; returns true when a row was added
    pub fn ensure_player(&mut self, name: &str, seed_earnings: f64) -> bool {
        if self.players.contains_key(name) {
            return false;
        }
        self.players
            .insert(name.to_string(), Player::new(name.to_string(), seed_earnings));
        self.touch();
        true
    }

    pub fn find_player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.get_mut(name)
    }

    /// Golfers by cumulative earnings, highest first
    pub fn players_by_earnings(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by(|a, b| {
            b.cumulative_earnings
                .total_cmp(&a.cumulative_earnings)
                .then_with(|| a.name.cmp(&b.name))
        });
        players
    }

    // ========== Picks ==========

    pub fn add_pick(&mut self, pick: Pick) {
        self.picks.push(pick);
        self.touch();
    }

    pub fn user_picks(&self, user: &str, season: &str) -> Vec<&Pick> {
        self.picks
            .iter()
            .filter(|p| p.user == user && p.season == season)
            .collect()
    }

    pub fn event_picks(&self, event: &str, season: &str) -> Vec<&Pick> {
        self.picks
            .iter()
            .filter(|p| p.event == event && p.season == season)
            .collect()
    }

    /// The single non-void pick a user has for an event
    pub fn active_pick(&self, user: &str, event: &str, season: &str) -> Option<&Pick> {
        self.picks
            .iter()
            .find(|p| p.user == user && p.event == event && p.season == season && p.is_active())
    }

    pub fn active_pick_mut(&mut self, user: &str, event: &str, season: &str) -> Option<&mut Pick> {
        self.touch();
        self.picks
            .iter_mut()
            .find(|p| p.user == user && p.event == event && p.season == season && p.is_active())
    }

    /// Indices of picks for an event still carrying the unsettled sentinel
    pub fn unsettled_pick_indices(&self, event: &str, season: &str) -> Vec<usize> {
        self.picks
            .iter()
            .enumerate()
            .filter(|(_, p)| p.event == event && p.season == season && !p.is_settled())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn pick_mut(&mut self, index: usize) -> Option<&mut Pick> {
        self.touch();
        self.picks.get_mut(index)
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

/// Bring an older state document up to `SCHEMA_VERSION` in place
fn migrate(value: &mut serde_json::Value) {
    let version = value.get("version").and_then(|v| v.as_u64()).unwrap_or(0);
    if version >= SCHEMA_VERSION as u64 {
        return;
    }

    info!("Migrating pool database from version {} to {}", version, SCHEMA_VERSION);

    // 1 -> 2: picks stored earnings as "points" and the weight as "point_multiplier"
    if let Some(picks) = value.get_mut("picks").and_then(|p| p.as_array_mut()) {
        for pick in picks.iter_mut() {
            if let Some(obj) = pick.as_object_mut() {
                if !obj.contains_key("earnings") {
                    let earnings = obj
                        .remove("points")
                        .unwrap_or_else(|| serde_json::json!(super::models::UNSETTLED));
                    obj.insert("earnings".to_string(), earnings);
                }
                if !obj.contains_key("multiplier") {
                    let multiplier = obj
                        .remove("point_multiplier")
                        .unwrap_or_else(|| serde_json::json!(1));
                    obj.insert("multiplier".to_string(), multiplier);
                }
            }
        }
    }

    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), serde_json::json!(SCHEMA_VERSION));
        obj.entry("last_updated")
            .or_insert_with(|| serde_json::json!(current_timestamp()));
    }
}

pub type SharedPoolDatabase = Arc<tokio::sync::RwLock<PoolDatabase>>;

pub fn create_shared_pool_database(db: PoolDatabase) -> SharedPoolDatabase {
    Arc::new(tokio::sync::RwLock::new(db))
}
