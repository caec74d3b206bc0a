use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// Configuration for one pool season (data/season.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Identifier stored on every pick (e.g., "2024")
    pub season_id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Event names scored from the major column of the points table
    #[serde(default)]
    pub majors: Vec<String>,

    /// How many times each rule may be used this season
    #[serde(default)]
    pub allowances: RuleAllowances,

    /// Emails that are granted admin on signup
    #[serde(default)]
    pub admins: Vec<String>,
}

/// Per-season rule allowances handed to new users
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleAllowances {
    #[serde(default = "default_allowance")]
    pub breakfast_balls: u32,
    #[serde(default = "default_allowance")]
    pub tap_ins: u32,
    #[serde(default = "default_allowance")]
    pub double_ups: u32,
}

fn default_allowance() -> u32 {
    1
}

impl Default for RuleAllowances {
    fn default() -> Self {
        Self {
            breakfast_balls: 1,
            tap_ins: 1,
            double_ups: 1,
        }
    }
}

impl Default for SeasonConfig {
    fn default() -> Self {
        let year = chrono::Utc::now().format("%Y").to_string();
        Self {
            name: format!("{} One and Done", year),
            season_id: year,
            majors: Vec::new(),
            allowances: RuleAllowances::default(),
            admins: Vec::new(),
        }
    }
}

impl SeasonConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PoolError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: SeasonConfig =
            serde_json::from_str(&content).map_err(|e| PoolError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        if config.season_id.trim().is_empty() {
            return Err(PoolError::ConfigValidation {
                message: format!("{}: season_id must not be empty", path),
            });
        }

        Ok(config)
    }

    pub fn is_major(&self, event_name: &str) -> bool {
        self.majors.iter().any(|m| m.eq_ignore_ascii_case(event_name.trim()))
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admins.iter().any(|a| a.eq_ignore_ascii_case(email.trim()))
    }
}
