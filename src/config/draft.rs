use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// One selection in the majors draft, in draft order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DraftSelection {
    pub team: String,
    pub golfer: String,
}

/// Majors draft side game (data/draft_pool.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftPoolConfig {
    /// Best N counting scores make up a team's total
    #[serde(default = "default_counting")]
    pub counting_scores: usize,

    pub selections: Vec<DraftSelection>,
}

fn default_counting() -> usize {
    3
}

impl Default for DraftPoolConfig {
    fn default() -> Self {
        Self {
            counting_scores: default_counting(),
            selections: Vec::new(),
        }
    }
}

impl DraftPoolConfig {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PoolError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        // Either the full object or a bare list of selections
        if let Ok(config) = serde_json::from_str::<DraftPoolConfig>(&content) {
            return Ok(config);
        }

        let selections: Vec<DraftSelection> =
            serde_json::from_str(&content).map_err(|e| PoolError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        Ok(DraftPoolConfig {
            counting_scores: default_counting(),
            selections,
        })
    }

    /// Distinct teams, in first-pick order
    pub fn teams(&self) -> Vec<String> {
        let mut teams: Vec<String> = Vec::new();
        for s in &self.selections {
            if !teams.contains(&s.team) {
                teams.push(s.team.clone());
            }
        }
        teams
    }

    pub fn golfers(&self) -> Vec<String> {
        self.selections.iter().map(|s| s.golfer.clone()).collect()
    }
}
