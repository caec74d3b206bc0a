//! This week's picks against the live board

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::format::{average_ranks, format_earnings, format_rank_delta, format_score};
use super::points::projected_points;
use super::resolver::{picked_golfers, resolve};
use super::rules::helper_label;
use super::standings::build_league_table;
use crate::config::PoolConfig;
use crate::feed::{Scoreboard, TournamentState};
use crate::state::{Pick, PoolDatabase};

const NO_PICK: &str = "--";
const CUT_OR_NO_PICK: &str = "CUT/NO PICK";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeeklyRow {
    pub name: String,
    pub team: String,
    pub initials: String,
    pub pick: String,
    pub score: String,
    pub pos: String,
    #[serde(skip)]
    pub position: Option<u32>,
    pub points: i64,
    pub earnings: String,
    pub helper: String,
    pub multiplier: u8,
    pub rank: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank_delta: Option<String>,
}

/// One row per active pick in the current event plus a placeholder for
/// every user without one. Projected standings are filled in until the
/// results are published.
pub fn build_weekly_table(db: &PoolDatabase, config: &PoolConfig, board: &Scoreboard) -> Vec<WeeklyRow> {
    let Some(event) = board.event_name() else {
        return Vec::new();
    };
    let season = config.season.season_id.as_str();
    let published = board.tournament_state() == Some(TournamentState::Post);
    let event_type = config.event_type(event);
    let current_round = board.tournament_round();

    let standings: HashMap<String, (f64, u32)> = build_league_table(db, season, None)
        .into_iter()
        .map(|row| (row.name, (row.total_points, row.rank)))
        .collect();

    let picks: Vec<&Pick> = db
        .event_picks(event, season)
        .into_iter()
        .filter(|p| p.is_active())
        .collect();
    let live = board.live_scores(&picked_golfers(picks.iter().copied()));

    let mut rows: Vec<WeeklyRow> = Vec::new();
    let mut with_pick: HashSet<&str> = HashSet::new();

    for pick in &picks {
        let Some(user) = db.find_user(&pick.user) else {
            continue;
        };
        with_pick.insert(user.name.as_str());

        let resolution = resolve(pick, &live);
        let points = resolution
            .line
            .as_ref()
            .map(|line| projected_points(&config.points, event_type, line, current_round))
            .unwrap_or(0.0)
            * pick.multiplier.factor();

        rows.push(WeeklyRow {
            name: user.name.clone(),
            team: user.team_name().to_string(),
            initials: user.initials(),
            pick: resolution.golfer.clone(),
            score: format_score(resolution.score()),
            pos: String::new(),
            position: resolution.position(),
            points: points as i64,
            earnings: format_earnings(resolution.earnings()),
            helper: helper_label(user, Some(event)).to_string(),
            multiplier: pick.multiplier.into(),
            rank: standings.get(&user.name).map(|s| s.1).unwrap_or(0),
            projected_total: None,
            projected_rank: None,
            rank_delta: None,
        });
    }

    for user in db.all_users() {
        if with_pick.contains(user.name.as_str()) {
            continue;
        }
        rows.push(WeeklyRow {
            name: user.name.clone(),
            team: user.team_name().to_string(),
            initials: NO_PICK.to_string(),
            pick: NO_PICK.to_string(),
            score: format_score(None),
            pos: String::new(),
            position: None,
            points: 0,
            earnings: format_earnings(0.0),
            helper: helper_label(user, Some(event)).to_string(),
            multiplier: 0,
            rank: standings.get(&user.name).map(|s| s.1).unwrap_or(0),
            projected_total: None,
            projected_rank: None,
            rank_delta: None,
        });
    }

    let unknown = if published { CUT_OR_NO_PICK } else { NO_PICK };
    for row in rows.iter_mut() {
        row.pos = row
            .position
            .map(|p| p.to_string())
            .unwrap_or_else(|| unknown.to_string());
    }

    if !published {
        let projected: Vec<f64> = rows
            .iter()
            .map(|r| standings.get(&r.name).map(|s| s.0).unwrap_or(0.0).trunc() + r.points as f64)
            .collect();
        let projected_ranks = average_ranks(&projected);

        for ((row, total), rank) in rows.iter_mut().zip(projected).zip(projected_ranks) {
            row.projected_total = Some(total as i64);
            row.projected_rank = Some(rank);
            row.rank_delta = Some(format_rank_delta(row.rank as i64 - rank as i64));
        }
    }

    rows.sort_by(|a, b| {
        let pos_a = a.position.unwrap_or(u32::MAX);
        let pos_b = b.position.unwrap_or(u32::MAX);
        pos_a
            .cmp(&pos_b)
            .then_with(|| a.pick.cmp(&b.pick))
            .then_with(|| a.team.cmp(&b.team))
    });

    rows
}
