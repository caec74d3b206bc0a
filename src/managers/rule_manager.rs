use std::sync::Arc;
use tracing::info;

use crate::config::SharedPoolConfig;
use crate::error::{PoolError, Result};
use crate::feed::{Scoreboard, SharedEventCache, TournamentState};
use crate::scoring::{in_play, Rule, RuleAvailability};
use crate::state::{Pick, PointMultiplier, PoolDatabase, SharedPoolDatabase};

/// Applies the one-time breakfast ball, tap-in and double-up rules
pub struct RuleManager {
    db: SharedPoolDatabase,
    config: SharedPoolConfig,
    cache: SharedEventCache,
    state_path: String,
}

impl RuleManager {
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

    /// Spend `rule` for `user` in the current event; `golfer` is the new
    /// selection for the breakfast ball and tap-in.
    pub async fn apply_rule(&self, user: &str, rule: Rule, golfer: Option<&str>) -> Result<Pick> {
        let board = self
            .cache
            .refresh_if_stale()
            .await
            .ok_or(PoolError::NoEventData)?;
        let event = board.event_name().ok_or(PoolError::NoEventData)?;
        let state = board.tournament_state().ok_or(PoolError::NoEventData)?;
        let season = self.config.season.season_id.as_str();

        let mut live = self.db.write().await;
        let mut db = live.clone();

        let pick = match rule {
            Rule::BreakfastBall => {
                let golfer = required_golfer(rule, golfer)?;
                breakfast_ball(&mut db, &board, user, event, season, golfer)?
            }
            Rule::TapIn => {
                let golfer = required_golfer(rule, golfer)?;
                tap_in(&mut db, &board, user, event, season, golfer)?
            }
            Rule::DoubleUp => double_up(&mut db, state, user, event, season)?,
        };

        live.commit(db, &self.state_path).await?;
        Ok(pick)
    }
}

fn required_golfer(rule: Rule, golfer: Option<&str>) -> Result<&str> {
    golfer
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .ok_or_else(|| PoolError::InvalidPick {
            message: format!("{} needs a golfer", rule),
        })
}

fn ensure_available(db: &PoolDatabase, rule: Rule, user: &str, event: &str) -> Result<()> {
    let found = db.find_user(user).ok_or_else(|| PoolError::UserNotFound {
        name: user.to_string(),
    })?;

    if RuleAvailability::for_user(found, Some(event)).allows(rule) {
        Ok(())
    } else {
        Err(PoolError::RuleUnavailable {
            rule: rule.to_string(),
            message: "already used this season or another rule was used this week".to_string(),
        })
    }
}

fn require_state(rule: Rule, state: Option<TournamentState>, wanted: TournamentState) -> Result<()> {
    if state == Some(wanted) {
        Ok(())
    } else {
        Err(PoolError::RuleUnavailable {
            rule: rule.to_string(),
            message: format!("only while the tournament is {}", wanted),
        })
    }
}

fn consume(db: &mut PoolDatabase, rule: Rule, user: &str, event: &str) -> Result<()> {
    let found = db.find_user_mut(user).ok_or_else(|| PoolError::UserNotFound {
        name: user.to_string(),
    })?;
    rule.consume(found, event);
    Ok(())
}

/// Void the user's active pick for the event, returning its multiplier
fn void_active(db: &mut PoolDatabase, user: &str, event: &str, season: &str) -> Option<PointMultiplier> {
    db.active_pick_mut(user, event, season).map(|pick| {
        let multiplier = pick.multiplier;
        pick.void();
        multiplier
    })
}

/// Re-pick a golfer who has yet to tee off, replacing any active pick.
///
/// Also covers a late first pick after the deadline.
pub(crate) fn breakfast_ball(
    db: &mut PoolDatabase,
    board: &Scoreboard,
    user: &str,
    event: &str,
    season: &str,
    golfer: &str,
) -> Result<Pick> {
    let rule = Rule::BreakfastBall;
    require_state(rule, board.tournament_state(), TournamentState::In)?;
    ensure_available(db, rule, user, event)?;

    if !board.available_picks().iter().any(|g| g == golfer) {
        return Err(PoolError::InvalidPick {
            message: format!("{} has already teed off or is not in the field", golfer),
        });
    }

    let replaced = db.active_pick(user, event, season).map(|p| p.golfer.clone());
    void_active(db, user, event, season);

    let pick = Pick::new(user, event, season, golfer, None, PointMultiplier::Normal);
    db.add_pick(pick.clone());
    db.ensure_player(golfer, board.earnings_for(golfer).unwrap_or(0.0));
    consume(db, rule, user, event)?;

    info!(
        "{} used breakfast ball in {}: {} -> {}",
        user,
        event,
        replaced.as_deref().unwrap_or("no pick"),
        golfer
    );
    Ok(pick)
}

/// Swap the active pick for anyone still in play on the live board
fn tap_in(
    db: &mut PoolDatabase,
    board: &Scoreboard,
    user: &str,
    event: &str,
    season: &str,
    golfer: &str,
) -> Result<Pick> {
    let rule = Rule::TapIn;
    require_state(rule, board.tournament_state(), TournamentState::In)?;
    ensure_available(db, rule, user, event)?;

    let current = db
        .active_pick(user, event, season)
        .map(|p| p.golfer.clone())
        .ok_or_else(|| PoolError::RuleUnavailable {
            rule: rule.to_string(),
            message: "no pick to substitute".to_string(),
        })?;

    if current == golfer {
        return Err(PoolError::InvalidPick {
            message: format!("{} is already your pick", golfer),
        });
    }

    let live = board.live_scores(&[golfer]);
    let playing = live
        .get(golfer)
        .map(|line| in_play(line.round, board.tournament_round()))
        .unwrap_or(false);
    if !playing {
        return Err(PoolError::InvalidPick {
            message: format!("{} is not in play on the leaderboard", golfer),
        });
    }

    let multiplier = void_active(db, user, event, season).unwrap_or(PointMultiplier::Normal);
    let pick = Pick::new(user, event, season, golfer, None, multiplier);
    db.add_pick(pick.clone());
    db.ensure_player(golfer, board.earnings_for(golfer).unwrap_or(0.0));
    consume(db, rule, user, event)?;

    info!("{} used tap-in in {}: {} -> {}", user, event, current, golfer);
    Ok(pick)
}

/// Double the points of the active pick before the event starts
fn double_up(
    db: &mut PoolDatabase,
    state: TournamentState,
    user: &str,
    event: &str,
    season: &str,
) -> Result<Pick> {
    let rule = Rule::DoubleUp;
    require_state(rule, Some(state), TournamentState::Pre)?;
    ensure_available(db, rule, user, event)?;

    let pick = {
        let pick = db
            .active_pick_mut(user, event, season)
            .ok_or_else(|| PoolError::RuleUnavailable {
                rule: rule.to_string(),
                message: "make a pick before doubling up".to_string(),
            })?;
        pick.multiplier = PointMultiplier::Double;
        pick.clone()
    };
    consume(db, rule, user, event)?;

    info!("{} used double-up in {} on {}", user, event, pick.golfer);
    Ok(pick)
}

pub type SharedRuleManager = Arc<RuleManager>;

pub fn create_shared_rule_manager(
    db: SharedPoolDatabase,
    config: SharedPoolConfig,
    cache: SharedEventCache,
    state_path: &str,
) -> SharedRuleManager {
    Arc::new(RuleManager::new(db, config, cache, state_path))
}
