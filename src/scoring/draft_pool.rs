//! Majors draft side game
//!
//! Teams draft golfers in a fixed order. A team's score is the
//! sum of its best counting scores to par; a golfer counts only while on
//! the current round with a position on the board.

use serde::Serialize;
use std::collections::HashMap;

use super::format::format_score;
use crate::config::DraftPoolConfig;
use crate::feed::{LiveScore, Scoreboard};

const CUT: &str = "CUT";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DraftStanding {
    pub team: String,
    /// Sum of counting scores, `None` when the team is cut
    pub total: Option<i32>,
    pub display_total: String,
    pub counting: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DraftEntry {
    pub round: usize,
    pub golfer: String,
    pub display: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DraftTeam {
    pub team: String,
    pub entries: Vec<DraftEntry>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DraftPoolReport {
    pub current_round: u32,
    pub standings: Vec<DraftStanding>,
    pub grid: Vec<DraftTeam>,
}

fn counts(line: Option<&LiveScore>, current_round: u32) -> bool {
    line.map(|l| l.round == current_round && l.position.is_some())
        .unwrap_or(false)
}

pub fn build_draft_pool(config: &DraftPoolConfig, board: &Scoreboard) -> DraftPoolReport {
    let live = board.live_scores(&config.golfers());
    let current_round = live.values().map(|l| l.round).max().unwrap_or(0);
    let teams = config.teams();
    let team_count = teams.len().max(1);

    let mut standings: Vec<DraftStanding> = Vec::new();
    for team in &teams {
        let mut counting: Vec<(&str, i32)> = config
            .selections
            .iter()
            .filter(|s| &s.team == team)
            .filter_map(|s| {
                let line = live.get(&s.golfer);
                counts(line, current_round).then(|| (s.golfer.as_str(), line.map(|l| l.score).unwrap_or(0)))
            })
            .collect();
        counting.sort_by_key(|(_, score)| *score);
        counting.truncate(config.counting_scores);

        let standing = if counting.len() < config.counting_scores {
            DraftStanding {
                team: team.clone(),
                total: None,
                display_total: CUT.to_string(),
                counting: String::new(),
            }
        } else {
            let total: i32 = counting.iter().map(|(_, s)| s).sum();
            DraftStanding {
                team: team.clone(),
                total: Some(total),
                display_total: format_score(Some(total)),
                counting: counting
                    .iter()
                    .map(|(g, s)| format!("{} ({})", g, format_score(Some(*s))))
                    .collect::<Vec<_>>()
                    .join(", "),
            }
        };
        standings.push(standing);
    }

    standings.sort_by(|a, b| match (a.total, b.total) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.team.cmp(&b.team)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.team.cmp(&b.team),
    });

    let mut grid: HashMap<&str, Vec<DraftEntry>> = HashMap::new();
    for (idx, selection) in config.selections.iter().enumerate() {
        let line = live.get(&selection.golfer);
        let shown = if current_round == 0 {
            format_score(None)
        } else if line.map(|l| l.round == current_round).unwrap_or(false) {
            format_score(line.map(|l| l.score))
        } else {
            CUT.to_string()
        };

        grid.entry(selection.team.as_str()).or_default().push(DraftEntry {
            round: idx / team_count + 1,
            golfer: selection.golfer.clone(),
            display: format!("{} ({})", selection.golfer, shown),
        });
    }

    let grid = teams
        .iter()
        .map(|team| DraftTeam {
            team: team.clone(),
            entries: grid.remove(team.as_str()).unwrap_or_default(),
        })
        .collect();

    DraftPoolReport {
        current_round,
        standings,
        grid,
    }
}
