use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::rule_manager::breakfast_ball;
use crate::config::SharedPoolConfig;
use crate::error::{PoolError, Result};
use crate::feed::{SharedEventCache, TournamentState};
use crate::scoring::{Rule, RuleAvailability};
use crate::state::{Pick, PointMultiplier, SharedPoolDatabase};

/// What the pick page shows a user
#[derive(Debug, Clone, Serialize)]
pub struct PickStatus {
    pub event: String,
    pub state: TournamentState,
    pub round: u32,
    pub message: String,
    pub button_label: String,
    pub can_submit: bool,
    pub current_pick: Option<String>,
    pub alternate: Option<String>,
    pub available: Vec<String>,
    pub rules: RuleAvailability,
}

/// Handles weekly pick submission
pub struct PickManager {
    db: SharedPoolDatabase,
    config: SharedPoolConfig,
    cache: SharedEventCache,
    state_path: String,
}

impl PickManager {
    pub fn new(
        db: SharedPoolDatabase,
        config: SharedPoolConfig,
        cache: SharedEventCache,
        state_path: &str,
    ) -> Self {
        Self {
            db,
            config,
            cache,
            state_path: state_path.to_string(),
        }
    }

    pub async fn pick_status(&self, user: &str) -> Result<PickStatus> {
        let board = self
            .cache
            .refresh_if_stale()
            .await
            .ok_or(PoolError::NoEventData)?;
        let event = board.event_name().ok_or(PoolError::NoEventData)?;
        let state = board.tournament_state().ok_or(PoolError::NoEventData)?;
        let season = self.config.season.season_id.as_str();

        let db = self.db.read().await;
        let found = db.find_user(user).ok_or_else(|| PoolError::UserNotFound {
            name: user.to_string(),
        })?;
        let active = db.active_pick(user, event, season);
        let rules = RuleAvailability::for_user(found, Some(event));

        let (message, button_label, can_submit) = match (state, active) {
            (TournamentState::Pre, None) => (
                format!("You have yet to pick for {}. Pick any golfer in the field.", event),
                "Submit Pick",
                true,
            ),
            (TournamentState::Pre, Some(_)) => (
                format!(
                    "You have already picked for {}, but can change your pick free of charge until the first tee time.",
                    event
                ),
                "Change Pick",
                true,
            ),
            (TournamentState::In, None) if rules.allows(Rule::BreakfastBall) => (
                format!(
                    "{} has started and you have not picked. Picking now uses your breakfast ball; choose a golfer yet to tee off.",
                    event
                ),
                "Pick and Use Breakfast Ball",
                true,
            ),
            (TournamentState::Post, _) => (
                format!("{} is over and results are in.", event),
                "Submit Pick",
                false,
            ),
            _ => (
                format!(
                    "{} has started and you have either picked or have no breakfast ball left. Better luck next week.",
                    event
                ),
                "Submit Pick",
                false,
            ),
        };

        Ok(PickStatus {
            event: event.to_string(),
            state,
            round: board.tournament_round(),
            message,
            button_label: button_label.to_string(),
            can_submit,
            current_pick: active.map(|p| p.golfer.clone()),
            alternate: active.and_then(|p| p.alternate.clone()),
            available: board.available_picks(),
            rules,
        })
    }

    /// Make or change the user's pick for the current event.
    ///
    /// Before the first tee time picks can be changed freely. Once the
    /// event is under way a user without a pick can still pick late by
    /// spending the breakfast ball.
    pub async fn submit_pick(&self, user: &str, golfer: &str, alternate: Option<&str>) -> Result<Pick> {
        let board = self
            .cache
            .refresh_if_stale()
            .await
            .ok_or(PoolError::NoEventData)?;
        let event = board.event_name().ok_or(PoolError::NoEventData)?;
        let state = board.tournament_state().ok_or(PoolError::NoEventData)?;
        let season = self.config.season.season_id.as_str();

        let golfer = golfer.trim();
        let alternate = alternate.map(str::trim).filter(|a| !a.is_empty());

        if !board.in_field(golfer) {
            return Err(PoolError::InvalidPick {
                message: format!("{} is not in the field for {}", golfer, event),
            });
        }

        let mut live = self.db.write().await;
        let mut db = live.clone();
        if db.find_user(user).is_none() {
            return Err(PoolError::UserNotFound {
                name: user.to_string(),
            });
        }

        let pick = match state {
            TournamentState::Pre => {
                if !board.available_picks().iter().any(|g| g == golfer) {
                    return Err(PoolError::InvalidPick {
                        message: format!("{} is not available to pick", golfer),
                    });
                }
                if let Some(alt) = alternate {
                    if alt == golfer {
                        return Err(PoolError::InvalidPick {
                            message: "alternate must differ from the pick".to_string(),
                        });
                    }
                    if !board.in_field(alt) {
                        return Err(PoolError::InvalidPick {
                            message: format!("{} is not in the field for {}", alt, event),
                        });
                    }
                }

                let alternate = alternate.map(str::to_string);
                let pick = match db.active_pick_mut(user, event, season) {
                    Some(existing) => {
                        info!("{} changed pick for {}: {} -> {}", user, event, existing.golfer, golfer);
                        existing.golfer = golfer.to_string();
                        existing.alternate = alternate;
                        existing.clone()
                    }
                    None => {
                        let pick = Pick::new(user, event, season, golfer, alternate, PointMultiplier::Normal);
                        info!("{} picked {} for {}", user, golfer, event);
                        db.add_pick(pick.clone());
                        pick
                    }
                };
                db.ensure_player(golfer, board.earnings_for(golfer).unwrap_or(0.0));
                pick
            }
            TournamentState::In => {
                if db.active_pick(user, event, season).is_some() {
                    return Err(PoolError::PickLocked {
                        message: format!("{} is under way; use a rule to change your pick", event),
                    });
                }
                breakfast_ball(&mut db, &board, user, event, season, golfer).map_err(|e| match e {
                    PoolError::RuleUnavailable { .. } => PoolError::PickLocked {
                        message: format!("{} is under way and you have no breakfast ball left", event),
                    },
                    other => other,
                })?
            }
            TournamentState::Post => {
                return Err(PoolError::PickLocked {
                    message: format!("{} is over", event),
                });
            }
        };

        live.commit(db, &self.state_path).await?;
        Ok(pick)
    }
}

pub type SharedPickManager = Arc<PickManager>;

pub fn create_shared_pick_manager(
    db: SharedPoolDatabase,
    config: SharedPoolConfig,
    cache: SharedEventCache,
    state_path: &str,
) -> SharedPickManager {
    Arc::new(PickManager::new(db, config, cache, state_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;
    use crate::feed::cache::testing::primed_cache;
    use crate::feed::leaderboard::fixtures::*;
    use crate::managers::testing::{pool_with_users, temp_state_path, unwritable_state_path};
    use crate::state::{create_shared_pool_database, PoolDatabase};

    fn field(state: &str) -> serde_json::Value {
        let teed_off = if state == "pre" { "pre" } else { "in" };
        scoreboard(
            "RBC Heritage",
            state,
            if state == "pre" { 0 } else { 1 },
            vec![
                competitor("Jon Rahm", teed_off, 1, &[], 0.0),
                competitor("Rory McIlroy", "pre", 1, &[], 0.0),
                competitor("Late Tee", "pre", 2, &[], 0.0),
            ],
        )
    }

    async fn setup(state: &str) -> (PickManager, SharedPoolDatabase, String) {
        setup_at(state, temp_state_path()).await
    }

    async fn setup_at(state: &str, path: String) -> (PickManager, SharedPoolDatabase, String) {
        let (_, cache) = primed_cache(field(state)).await;
        let mut config = PoolConfig::default();
        config.season.season_id = "2024".to_string();
        let db = create_shared_pool_database(pool_with_users(&["alice", "bob"]));
        (PickManager::new(db.clone(), Arc::new(config), cache, &path), db, path)
    }

    #[tokio::test]
    async fn test_pre_pick_then_free_change() {
        let (manager, db, path) = setup("pre").await;

        let status = manager.pick_status("alice").await.unwrap();
        assert!(status.can_submit);
        assert_eq!(status.button_label, "Submit Pick");
        assert_eq!(status.available.len(), 3);

        manager.submit_pick("alice", "Jon Rahm", Some("Rory McIlroy")).await.unwrap();
        let changed = manager.submit_pick("alice", "Rory McIlroy", None).await.unwrap();
        assert_eq!(changed.golfer, "Rory McIlroy");
        assert!(changed.alternate.is_none());

        {
            let db = db.read().await;
            assert_eq!(db.user_picks("alice", "2024").len(), 1);
            assert!(db.players.contains_key("Jon Rahm"));
            assert!(db.players.contains_key("Rory McIlroy"));
        }

        let status = manager.pick_status("alice").await.unwrap();
        assert_eq!(status.button_label, "Change Pick");
        assert_eq!(status.current_pick.as_deref(), Some("Rory McIlroy"));

        let saved = PoolDatabase::load(&path).await.unwrap();
        assert_eq!(saved.picks.len(), 1);
    }

    #[tokio::test]
    async fn test_pick_validation() {
        let (manager, _, _) = setup("pre").await;
        let err = manager.submit_pick("alice", "Nobody", None).await.unwrap_err();
        assert!(matches!(err, PoolError::InvalidPick { .. }));
        let err = manager.submit_pick("alice", "Jon Rahm", Some("Jon Rahm")).await.unwrap_err();
        assert!(matches!(err, PoolError::InvalidPick { .. }));
        let err = manager.submit_pick("ghost", "Jon Rahm", None).await.unwrap_err();
        assert!(matches!(err, PoolError::UserNotFound { .. }));
    }

    #[tokio::test]
    async fn test_late_pick_spends_breakfast_ball() {
        let (manager, db, _) = setup("in").await;

        let status = manager.pick_status("bob").await.unwrap();
        assert!(status.can_submit);
        assert_eq!(status.button_label, "Pick and Use Breakfast Ball");

        let err = manager.submit_pick("bob", "Jon Rahm", None).await.unwrap_err();
        assert!(matches!(err, PoolError::InvalidPick { .. }));

        manager.submit_pick("bob", "Late Tee", None).await.unwrap();
        {
            let db = db.read().await;
            let bob = db.find_user("bob").unwrap();
            assert_eq!(bob.strikes_remaining, 0);
            assert_eq!(bob.strike_event.as_deref(), Some("RBC Heritage"));
        }

        let err = manager.submit_pick("bob", "Rory McIlroy", None).await.unwrap_err();
        assert!(matches!(err, PoolError::PickLocked { .. }));
        let status = manager.pick_status("bob").await.unwrap();
        assert!(!status.can_submit);
    }

    #[tokio::test]
    async fn test_failed_save_drops_pick() {
        let (manager, db, _) = setup_at("pre", unwritable_state_path()).await;

        let err = manager.submit_pick("alice", "Jon Rahm", None).await.unwrap_err();
        assert!(matches!(err, PoolError::StateSave { .. }));

        let db = db.read().await;
        assert!(db.user_picks("alice", "2024").is_empty());
        assert!(!db.players.contains_key("Jon Rahm"));
    }
}
