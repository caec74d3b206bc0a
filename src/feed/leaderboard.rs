//! Typed view of the ESPN golf leaderboard payload.
//!
//! Only the fields the pool reads are modelled; everything else in the
//! payload is ignored. Every field is optional or defaulted because the
//! upstream document changes shape between tournament phases.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Highest tee-time period a golfer can be in and still be pickable
const MAX_PICK_PERIOD: u32 = 2;

const UNAVAILABLE: &str = "Unavailable";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scoreboard {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub competitions: Vec<Competition>,
    #[serde(default)]
    pub display_purse: Option<String>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub defending_champion: Option<DefendingChampion>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    #[serde(default)]
    pub period: Option<u32>,
    #[serde(rename = "type", default)]
    pub kind: StatusType,
    #[serde(default)]
    pub display_value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusType {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Competition {
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Competitor {
    pub athlete: Athlete,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub linescores: Vec<LineScore>,
    #[serde(default)]
    pub earnings: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Athlete {
    pub display_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineScore {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub display_value: Option<String>,
    #[serde(default)]
    pub current_position: Option<u32>,
}

impl LineScore {
    /// A round counts once a non-zero stroke total is posted
    fn is_posted(&self) -> bool {
        self.value.map(|v| v != 0.0).unwrap_or(false)
    }

    /// Score to par for the round; "E" and anything unparsable count as 0
    fn to_par(&self) -> i32 {
        self.display_value
            .as_deref()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Course {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefendingChampion {
    pub athlete: Athlete,
}

/// Phase of the current tournament as the pool sees it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentState {
    /// Nobody has teed off
    Pre,
    /// In progress, or finished without published earnings
    In,
    /// Finished and earnings are published
    Post,
}

impl fmt::Display for TournamentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TournamentState::Pre => "pre",
            TournamentState::In => "in",
            TournamentState::Post => "post",
        };
        f.write_str(s)
    }
}

/// Headline facts about the current event
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TournamentInfo {
    pub purse: String,
    pub courses: String,
    pub defending_champion: String,
}

/// Live line for one golfer
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiveScore {
    /// Total to par
    pub score: i32,
    /// Current position, `None` before the first posted round
    pub position: Option<u32>,
    pub earnings: f64,
    /// Number of rounds the golfer has on the card
    pub round: u32,
    /// Golfers sharing `position` across the whole field
    pub tied: u32,
}

impl Scoreboard {
    pub fn current(&self) -> Option<&Event> {
        self.events.first()
    }

    pub fn event_name(&self) -> Option<&str> {
        self.current().map(|e| e.name.as_str()).filter(|n| !n.is_empty())
    }

    /// All competitors in the current event
    pub fn field(&self) -> &[Competitor] {
        self.current()
            .and_then(|e| e.competitions.first())
            .map(|c| c.competitors.as_slice())
            .unwrap_or(&[])
    }

    pub fn in_field(&self, golfer: &str) -> bool {
        self.field().iter().any(|c| c.athlete.display_name == golfer)
    }

    /// Golfers who have yet to tee off
    pub fn available_picks(&self) -> Vec<String> {
        self.field()
            .iter()
            .filter(|c| {
                c.status.period.unwrap_or(0) <= MAX_PICK_PERIOD && c.status.kind.state == "pre"
            })
            .map(|c| c.athlete.display_name.clone())
            .collect()
    }

    /// Sum of earnings across the field is positive once results are published
    pub fn earnings_posted(&self) -> bool {
        self.field().iter().map(|c| c.earnings).sum::<f64>() > 0.0
    }

    pub fn tournament_state(&self) -> Option<TournamentState> {
        let raw = self.current()?.status.kind.state.as_str();
        match raw {
            "pre" => Some(TournamentState::Pre),
            "in" | "post" => {
                if self.earnings_posted() {
                    Some(TournamentState::Post)
                } else {
                    Some(TournamentState::In)
                }
            }
            _ => None,
        }
    }

    pub fn tournament_round(&self) -> u32 {
        self.current()
            .and_then(|e| e.competitions.first())
            .and_then(|c| c.status.period)
            .unwrap_or(0)
    }

    pub fn tournament_info(&self) -> TournamentInfo {
        let event = self.current();

        let purse = event
            .and_then(|e| e.display_purse.clone())
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        let courses = event
            .filter(|e| !e.courses.is_empty())
            .map(|e| {
                e.courses
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        let defending_champion = event
            .and_then(|e| e.defending_champion.as_ref())
            .map(|d| d.athlete.display_name.clone())
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        TournamentInfo {
            purse,
            courses,
            defending_champion,
        }
    }

    pub fn withdrawals(&self) -> Vec<String> {
        self.field()
            .iter()
            .filter(|c| c.status.kind.description == "Withdrawn")
            .map(|c| c.athlete.display_name.clone())
            .collect()
    }

    pub fn earnings_for(&self, golfer: &str) -> Option<f64> {
        self.field()
            .iter()
            .find(|c| c.athlete.display_name == golfer)
            .map(|c| c.earnings)
    }

    /// Drop cancelled tournaments so `events[0]` is the one being played
    pub fn remove_canceled(&mut self) {
        self.events
            .retain(|e| e.status.kind.description != "Canceled");
    }

    /// Live lines for the requested golfers.
    ///
    /// Golfers marked "WD" and golfers with no rounds on the card are left
    /// out, which is how callers detect withdrawals and non-starters.
    pub fn live_scores<S: AsRef<str>>(&self, wanted: &[S]) -> HashMap<String, LiveScore> {
        let wanted: HashSet<&str> = wanted.iter().map(|s| s.as_ref()).collect();
        self.collect_live_scores(|name| wanted.contains(name))
    }

    /// Live lines for every golfer still in the event
    pub fn all_live_scores(&self) -> HashMap<String, LiveScore> {
        self.collect_live_scores(|_| true)
    }

    fn collect_live_scores<F>(&self, wanted: F) -> HashMap<String, LiveScore>
    where
        F: Fn(&str) -> bool,
    {
        let mut scores: HashMap<String, LiveScore> = HashMap::new();
        let mut position_counts: HashMap<Option<u32>, u32> = HashMap::new();

        for competitor in self.field() {
            if competitor.status.display_value.as_deref() == Some("WD") {
                continue;
            }

            let position = competitor
                .linescores
                .iter()
                .filter(|l| l.is_posted())
                .last()
                .and_then(|l| l.current_position);

            *position_counts.entry(position).or_insert(0) += 1;

            let name = competitor.athlete.display_name.as_str();
            if competitor.linescores.is_empty() || !wanted(name) {
                continue;
            }

            let score = competitor
                .linescores
                .iter()
                .filter(|l| l.is_posted())
                .map(|l| l.to_par())
                .sum();

            scores.insert(
                name.to_string(),
                LiveScore {
                    score,
                    position,
                    earnings: competitor.earnings,
                    round: competitor.linescores.len() as u32,
                    tied: 1,
                },
            );
        }

        for line in scores.values_mut() {
            line.tied = position_counts.get(&line.position).copied().unwrap_or(1);
        }

        scores
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    /// A competitor line; `rounds` are (strokes, to-par display, position)
    pub fn competitor(name: &str, state: &str, period: u32, rounds: &[(f64, &str, u32)], earnings: f64) -> Value {
        let linescores: Vec<Value> = rounds
            .iter()
            .map(|(v, d, p)| json!({"value": v, "displayValue": d, "currentPosition": p}))
            .collect();
        json!({
            "athlete": {"displayName": name},
            "status": {"period": period, "type": {"state": state, "description": "Active"}},
            "linescores": linescores,
            "earnings": earnings
        })
    }

    pub fn withdrawn(name: &str) -> Value {
        json!({
            "athlete": {"displayName": name},
            "status": {"period": 2, "displayValue": "WD", "type": {"state": "post", "description": "Withdrawn"}},
            "linescores": [{"value": 75.0, "displayValue": "+3", "currentPosition": 70}],
            "earnings": 0
        })
    }

    pub fn scoreboard(event: &str, state: &str, round: u32, competitors: Vec<Value>) -> Value {
        json!({
            "events": [{
                "name": event,
                "status": {"type": {"state": state, "description": "In Progress"}},
                "displayPurse": "$20,000,000",
                "courses": [{"name": "Augusta National"}],
                "defendingChampion": {"athlete": {"displayName": "Jon Rahm"}},
                "competitions": [{
                    "status": {"period": round},
                    "competitors": competitors
                }]
            }]
        })
    }
}
