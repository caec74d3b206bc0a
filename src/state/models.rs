use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use uuid::Uuid;

use crate::config::RuleAllowances;

/// Earnings value carried by a pick until it has been settled
pub const UNSETTLED: f64 = -1e-9;

/// Scoring weight of a pick
///
/// Stored as 0/1/2 so the state file stays readable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PointMultiplier {
    /// Replaced by a rule or a substitution; scores nothing
    Void,
    Normal,
    /// Double-up used on this pick
    Double,
}

impl PointMultiplier {
    pub fn factor(self) -> f64 {
        u8::from(self) as f64
    }

    pub fn is_active(self) -> bool {
        self != PointMultiplier::Void
    }
}

impl From<PointMultiplier> for u8 {
    fn from(m: PointMultiplier) -> u8 {
        match m {
            PointMultiplier::Void => 0,
            PointMultiplier::Normal => 1,
            PointMultiplier::Double => 2,
        }
    }
}

impl TryFrom<u8> for PointMultiplier {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(PointMultiplier::Void),
            1 => Ok(PointMultiplier::Normal),
            2 => Ok(PointMultiplier::Double),
            other => Err(format!("invalid point multiplier {}", other)),
        }
    }
}

/// A pool member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,

    pub email: String,

    /// bcrypt hash, never sent to clients
    pub password_hash: String,

    /// Unique handle, used as the key for picks
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub is_admin: bool,

    /// Event the breakfast ball was used in
    #[serde(default)]
    pub strike_event: Option<String>,

    /// Event the tap-in was used in
    #[serde(default)]
    pub substitute_event: Option<String>,

    /// Event the double-up was used in
    #[serde(default)]
    pub double_up_event: Option<String>,

    #[serde(default)]
    pub strikes_remaining: u32,

    #[serde(default)]
    pub substitutes_remaining: u32,

    #[serde(default)]
    pub double_ups_remaining: u32,

    /// Season the rule markers and counters belong to
    #[serde(default)]
    pub rules_season: String,

    pub created_at: u64,
}

impl User {
    pub fn new(
        email: String,
        name: String,
        password_hash: String,
        season_id: &str,
        allowances: RuleAllowances,
    ) -> Self {
        let mut user = Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            name,
            display_name: None,
            is_admin: false,
            strike_event: None,
            substitute_event: None,
            double_up_event: None,
            strikes_remaining: 0,
            substitutes_remaining: 0,
            double_ups_remaining: 0,
            rules_season: String::new(),
            created_at: current_timestamp(),
        };
        user.reset_rules(season_id, allowances);
        user
    }

    /// Clear rule markers and refill counters for a new season
    pub fn reset_rules(&mut self, season_id: &str, allowances: RuleAllowances) {
        self.strike_event = None;
        self.substitute_event = None;
        self.double_up_event = None;
        self.strikes_remaining = allowances.breakfast_balls;
        self.substitutes_remaining = allowances.tap_ins;
        self.double_ups_remaining = allowances.double_ups;
        self.rules_season = season_id.to_string();
    }

    /// Name shown in tables
    pub fn team_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(d) if !d.trim().is_empty() => d,
            _ => &self.name,
        }
    }

    /// First letter of each word of the handle
    pub fn initials(&self) -> String {
        self.name
            .split(' ')
            .filter_map(|w| w.chars().next())
            .collect()
    }
}

/// A golfer that has been picked at least once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,

    pub cumulative_earnings: f64,

    /// Last event whose earnings were added to the total
    #[serde(default)]
    pub last_event: Option<String>,
}

impl Player {
    pub fn new(name: String, seed_earnings: f64) -> Self {
        Self {
            name,
            cumulative_earnings: seed_earnings.max(0.0),
            last_event: None,
        }
    }

    /// Add one event's earnings; returns false if this event was already counted
    pub fn record_event(&mut self, event: &str, earnings: f64) -> bool {
        if self.last_event.as_deref() == Some(event) {
            return false;
        }
        self.cumulative_earnings += earnings.max(0.0);
        self.last_event = Some(event.to_string());
        true
    }
}

/// One user's selection for one event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub id: Uuid,

    /// User handle
    pub user: String,

    pub event: String,

    pub season: String,

    pub golfer: String,

    #[serde(default)]
    pub alternate: Option<String>,

    pub multiplier: PointMultiplier,

    /// Prize money, `UNSETTLED` until settlement
    pub earnings: f64,

    /// Ranking points for the finishing position
    #[serde(default)]
    pub fedex: f64,

    /// `fedex` weighted by the multiplier
    #[serde(default)]
    pub awarded_points: f64,

    pub timestamp: DateTime<Utc>,
}

impl Pick {
    pub fn new(
        user: &str,
        event: &str,
        season: &str,
        golfer: &str,
        alternate: Option<String>,
        multiplier: PointMultiplier,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user: user.to_string(),
            event: event.to_string(),
            season: season.to_string(),
            golfer: golfer.to_string(),
            alternate,
            multiplier,
            earnings: UNSETTLED,
            fedex: 0.0,
            awarded_points: 0.0,
            timestamp: Utc::now(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.earnings >= 0.0
    }

    pub fn is_active(&self) -> bool {
        self.multiplier.is_active()
    }

    /// Points this pick contributes to the standings
    pub fn weighted_points(&self) -> f64 {
        self.fedex * self.multiplier.factor()
    }

    /// Earnings counted in the standings (unsettled counts as zero)
    pub fn counted_earnings(&self) -> f64 {
        if self.is_settled() {
            self.earnings
        } else {
            0.0
        }
    }

    pub fn settle(&mut self, earnings: f64, fedex: f64) {
        self.earnings = earnings.max(0.0);
        self.fedex = fedex.max(0.0);
        self.awarded_points = self.weighted_points();
    }

    pub fn void(&mut self) {
        self.multiplier = PointMultiplier::Void;
    }
}

pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
