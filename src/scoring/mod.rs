pub mod draft_pool;
pub mod format;
pub mod points;
pub mod resolver;
pub mod rules;
pub mod standings;
pub mod weekly;

pub use draft_pool::{build_draft_pool, DraftPoolReport};
pub use points::{in_play, projected_points};
pub use resolver::resolve;
pub use rules::{Rule, RuleAvailability};
pub use standings::{build_league_table, build_player_table, build_profile, LeagueRow, PlayerRow, Profile};
pub use weekly::{build_weekly_table, WeeklyRow};
