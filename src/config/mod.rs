pub mod draft;
pub mod points;
pub mod season;

pub use draft::{DraftPoolConfig, DraftSelection};
pub use points::{EventType, PointsTable};
pub use season::{RuleAllowances, SeasonConfig};

use std::sync::Arc;
use tracing::{info, warn};

/// Everything loaded from the data directory at startup
#[derive(Debug, Clone, Default)]
pub struct PoolConfig {
    pub season: SeasonConfig,
    pub points: PointsTable,
    pub draft_pool: DraftPoolConfig,
}

pub type SharedPoolConfig = Arc<PoolConfig>;

impl PoolConfig {
    /// Load configs from the data directory
    ///
    /// Structure:
    /// data/
    /// ├── season.json      # Season id, majors, rule allowances, admins
    /// ├── points.json      # Points by finishing position
    /// └── draft_pool.json  # Majors draft selections (optional)
    ///
    /// Missing or broken files fall back to defaults.
    pub fn load(data_path: &str) -> Self {
        let season_path = format!("{}/season.json", data_path);
        let season = if std::path::Path::new(&season_path).exists() {
            SeasonConfig::load_from_file(&season_path).unwrap_or_else(|e| {
                warn!("Failed to load season.json: {}, using defaults", e);
                SeasonConfig::default()
            })
        } else {
            warn!("No season.json in {}, using defaults", data_path);
            SeasonConfig::default()
        };

        let points_path = format!("{}/points.json", data_path);
        let points = if std::path::Path::new(&points_path).exists() {
            PointsTable::load_from_file(&points_path).unwrap_or_else(|e| {
                warn!("Failed to load points.json: {}, using built-in table", e);
                PointsTable::default()
            })
        } else {
            PointsTable::default()
        };

        let draft_path = format!("{}/draft_pool.json", data_path);
        let draft_pool = if std::path::Path::new(&draft_path).exists() {
            DraftPoolConfig::load_from_file(&draft_path).unwrap_or_else(|e| {
                warn!("Failed to load draft_pool.json: {}", e);
                DraftPoolConfig::default()
            })
        } else {
            DraftPoolConfig::default()
        };

        info!(
            "Config loaded: season={}, majors={}, points_depth={}, draft_selections={}",
            season.season_id,
            season.majors.len(),
            points.regular.len(),
            draft_pool.selections.len(),
        );

        Self {
            season,
            points,
            draft_pool,
        }
    }

    pub fn event_type(&self, event_name: &str) -> EventType {
        if self.season.is_major(event_name) {
            EventType::Major
        } else {
            EventType::Regular
        }
    }
}
