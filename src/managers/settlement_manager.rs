use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::SharedPoolConfig;
use crate::error::{PoolError, Result};
use crate::feed::{SharedEventCache, TournamentState, TtlCache};
use crate::scoring::{projected_points, resolve, WeeklyRow};
use crate::state::{Pick, SharedPoolDatabase};

/// Outcome of one settlement run
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SettlementReport {
    pub event: Option<String>,
    /// Results were published and settlement ran
    pub published: bool,
    pub settled: usize,
    pub substituted: usize,
    pub voided: usize,
    /// Picks whose golfer and alternate both had no result
    pub skipped: usize,
    pub players_updated: usize,
}

impl SettlementReport {
    /// True when the run wrote anything to the ledger
    pub fn changed_anything(&self) -> bool {
        self.settled + self.voided + self.skipped + self.players_updated > 0
    }
}

/// Turns this week's picks into final earnings and points
pub struct SettlementManager {
    db: SharedPoolDatabase,
    config: SharedPoolConfig,
    cache: SharedEventCache,
    state_path: String,
}

impl SettlementManager {
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

    /// Settle every unsettled pick of the current event once results are
    /// published. Running it again settles nothing new.
    pub async fn settle_week(&self) -> Result<SettlementReport> {
        let board = self
            .cache
            .refresh_if_stale()
            .await
            .ok_or(PoolError::NoEventData)?;
        let event = board.event_name().ok_or(PoolError::NoEventData)?;

        let mut report = SettlementReport {
            event: Some(event.to_string()),
            ..Default::default()
        };

        if board.tournament_state() != Some(TournamentState::Post) {
            info!("Results for {} are not published yet, nothing to settle", event);
            return Ok(report);
        }
        report.published = true;

        let season = self.config.season.season_id.as_str();
        let event_type = self.config.event_type(event);
        let round = board.tournament_round();
        let live = board.all_live_scores();

        let mut live_db = self.db.write().await;
        let mut db = live_db.clone();

        for index in db.unsettled_pick_indices(event, season) {
            let Some(pick) = db.pick_mut(index) else {
                continue;
            };

            if !pick.is_active() {
                pick.settle(0.0, 0.0);
                report.voided += 1;
                continue;
            }

            let resolution = resolve(pick, &live);
            let Some(line) = resolution.line.as_ref() else {
                warn!("No result for {} ({}) in {}, settling at zero", pick.golfer, pick.user, event);
                pick.settle(0.0, 0.0);
                report.skipped += 1;
                continue;
            };

            let earnings = line.earnings;
            let fedex = projected_points(&self.config.points, event_type, line, round);

            if resolution.substituted {
                let mut replacement = Pick::new(
                    &pick.user,
                    event,
                    season,
                    &resolution.golfer,
                    None,
                    pick.multiplier,
                );
                replacement.settle(earnings, fedex);

                info!(
                    "{}: {} had no result, alternate {} stands in",
                    pick.user, pick.golfer, resolution.golfer
                );
                pick.void();
                pick.settle(0.0, 0.0);

                db.add_pick(replacement);
                db.ensure_player(&resolution.golfer, 0.0);
                report.substituted += 1;
            } else {
                pick.settle(earnings, fedex);
            }
            report.settled += 1;
        }

        // Roll this event's prize money into each known golfer's total, once
        let names: Vec<String> = db.players.keys().cloned().collect();
        for name in names {
            let Some(earnings) = board.earnings_for(&name) else {
                continue;
            };
            if let Some(player) = db.find_player_mut(&name) {
                if player.record_event(event, earnings) {
                    report.players_updated += 1;
                }
            }
        }

        live_db.commit(db, &self.state_path).await?;

        info!(
            "Settled {}: settled={}, substituted={}, voided={}, skipped={}, players_updated={}",
            event,
            report.settled,
            report.substituted,
            report.voided,
            report.skipped,
            report.players_updated
        );

        Ok(report)
    }
}

pub type SharedSettlementManager = Arc<SettlementManager>;

pub fn create_shared_settlement_manager(
    db: SharedPoolDatabase,
    config: SharedPoolConfig,
    cache: SharedEventCache,
    state_path: &str,
) -> SharedSettlementManager {
    Arc::new(SettlementManager::new(db, config, cache, state_path))
}

/// Run settlement on a fixed interval in the background. Cached weekly
/// tables are dropped whenever a run changes the ledger.
pub fn spawn_settlement_task(
    manager: SharedSettlementManager,
    weekly_cache: Arc<TtlCache<Vec<WeeklyRow>>>,
    every: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match manager.settle_week().await {
                Ok(report) if report.published => {
                    if report.changed_anything() {
                        weekly_cache.clear();
                    }
                    info!("Scheduled settlement settled {} picks", report.settled)
                }
                Ok(_) => {}
                Err(e) => error!("Scheduled settlement failed: {}", e),
            }
        }
    })
}
