//! Season standings and per-user history

use serde::Serialize;

use super::format::{average_ranks, format_earnings};
use crate::error::{PoolError, Result};
use crate::state::{Pick, PoolDatabase, User};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeagueRow {
    pub rank: u32,
    pub name: String,
    pub team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_pick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_earnings: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekly_points: Option<f64>,
    pub total_earnings: f64,
    pub total_points: f64,
    pub dollars_back: f64,
    pub points_back: f64,
    pub strikes_remaining: u32,
    pub substitutes_remaining: u32,
    pub double_ups_remaining: u32,
}

struct Totals {
    earnings: f64,
    points: f64,
}

fn season_totals(picks: &[&Pick]) -> Totals {
    Totals {
        earnings: picks.iter().map(|p| p.counted_earnings()).sum(),
        points: picks.iter().map(|p| p.weighted_points()).sum(),
    }
}

fn weekly_columns(db: &PoolDatabase, user: &User, event: &str, season: &str) -> (String, f64, f64) {
    let picks: Vec<&Pick> = db
        .event_picks(event, season)
        .into_iter()
        .filter(|p| p.user == user.name && p.is_active())
        .collect();

    let names = picks
        .iter()
        .map(|p| p.golfer.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let earnings = picks.iter().map(|p| p.counted_earnings()).sum();
    let points = picks.iter().map(|p| p.weighted_points()).sum();
    (names, earnings, points)
}

/// One row per user, ranked by season points
pub fn build_league_table(db: &PoolDatabase, season: &str, current_event: Option<&str>) -> Vec<LeagueRow> {
    let mut rows: Vec<LeagueRow> = db
        .all_users()
        .into_iter()
        .map(|user| {
            let totals = season_totals(&db.user_picks(&user.name, season));
            let weekly = current_event.map(|event| weekly_columns(db, user, event, season));

            LeagueRow {
                rank: 0,
                name: user.name.clone(),
                team: user.team_name().to_string(),
                weekly_pick: weekly.as_ref().map(|w| w.0.clone()),
                weekly_earnings: weekly.as_ref().map(|w| w.1),
                weekly_points: weekly.as_ref().map(|w| w.2),
                total_earnings: totals.earnings,
                total_points: totals.points,
                dollars_back: 0.0,
                points_back: 0.0,
                strikes_remaining: user.strikes_remaining,
                substitutes_remaining: user.substitutes_remaining,
                double_ups_remaining: user.double_ups_remaining,
            }
        })
        .collect();

    let points: Vec<f64> = rows.iter().map(|r| r.total_points).collect();
    let ranks = average_ranks(&points);
    let max_earnings = rows.iter().map(|r| r.total_earnings).fold(f64::MIN, f64::max);
    let max_points = points.iter().copied().fold(f64::MIN, f64::max);

    for (row, rank) in rows.iter_mut().zip(ranks) {
        row.rank = rank;
        row.dollars_back = row.total_earnings - max_earnings;
        row.points_back = row.total_points - max_points;
    }

    rows.sort_by(|a, b| {
        b.total_points
            .total_cmp(&a.total_points)
            .then_with(|| a.team.cmp(&b.team))
    });
    rows
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerRow {
    pub name: String,
    pub cumulative_earnings: f64,
    pub earnings: String,
}

/// Every golfer picked this season, by cumulative earnings
pub fn build_player_table(db: &PoolDatabase) -> Vec<PlayerRow> {
    db.players_by_earnings()
        .into_iter()
        .map(|p| PlayerRow {
            name: p.name.clone(),
            cumulative_earnings: p.cumulative_earnings,
            earnings: format_earnings(p.cumulative_earnings),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileRow {
    pub event: String,
    pub pick: String,
    pub points: i64,
    pub earnings: String,
    pub multiplier: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Profile {
    pub name: String,
    pub team: String,
    pub total_points: i64,
    pub picks: Vec<ProfileRow>,
}

/// A user's picks for the season, oldest first
pub fn build_profile(db: &PoolDatabase, user: &str, season: &str) -> Result<Profile> {
    let found = db.find_user(user).ok_or_else(|| PoolError::UserNotFound {
        name: user.to_string(),
    })?;

    let mut picks = db.user_picks(user, season);
    picks.sort_by_key(|p| p.timestamp);

    let total_points = season_totals(&picks).points.round() as i64;
    let rows = picks
        .into_iter()
        .map(|p| ProfileRow {
            event: p.event.clone(),
            pick: p.golfer.clone(),
            points: p.weighted_points().round() as i64,
            earnings: format_earnings(p.counted_earnings()),
            multiplier: p.multiplier.into(),
        })
        .collect();

    Ok(Profile {
        name: found.name.clone(),
        team: found.team_name().to_string(),
        total_points,
        picks: rows,
    })
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::state::PointMultiplier;

    fn league() -> PoolDatabase {
        let mut db = PoolDatabase::new();
        add_user(&mut db, "alice");
        add_user(&mut db, "bob");
        add_user(&mut db, "carol");

        db.add_pick(settled_pick("alice", "The Masters", "Jon Rahm", 3_240_000.0, 750.0, PointMultiplier::Normal));
        db.add_pick(settled_pick("bob", "The Masters", "Rory McIlroy", 1_000_000.0, 300.0, PointMultiplier::Double));
        db.add_pick(settled_pick("carol", "The Masters", "Scottie Scheffler", 500_000.0, 100.0, PointMultiplier::Normal));
        db.add_pick(Pick::new("alice", "RBC Heritage", "2024", "Xander Schauffele", None, PointMultiplier::Normal));
        db
    }

    #[test]
    fn test_league_table_ranks_by_points() {
        let db = league();
        let rows = build_league_table(&db, "2024", Some("RBC Heritage"));

        assert_eq!(rows[0].name, "alice");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].total_points, 750.0);
        assert_eq!(rows[0].weekly_pick.as_deref(), Some("Xander Schauffele"));
        assert_eq!(rows[0].weekly_earnings, Some(0.0));

        assert_eq!(rows[1].name, "bob");
        assert_eq!(rows[1].total_points, 600.0);
        assert_eq!(rows[1].points_back, -150.0);
        assert_eq!(rows[1].dollars_back, -2_240_000.0);
        assert_eq!(rows[1].weekly_pick.as_deref(), Some(""));

        assert_eq!(rows[2].rank, 3);
    }

    #[test]
    fn test_league_table_without_event_omits_weekly() {
        let db = league();
        let rows = build_league_table(&db, "2024", None);
        assert!(rows.iter().all(|r| r.weekly_pick.is_none() && r.weekly_points.is_none()));
    }

    #[test]
    fn test_tied_leaders_share_truncated_rank() {
        let mut db = PoolDatabase::new();
        add_user(&mut db, "alice");
        add_user(&mut db, "bob");
        let rows = build_league_table(&db, "2024", None);
        assert!(rows.iter().all(|r| r.rank == 1));
    }

    #[test]
    fn test_profile_lists_picks() {
        let db = league();
        let profile = build_profile(&db, "bob", "2024").unwrap();
        assert_eq!(profile.total_points, 600);
        assert_eq!(profile.picks.len(), 1);
        assert_eq!(profile.picks[0].earnings, "$1,000,000");
        assert_eq!(profile.picks[0].multiplier, 2);
        assert!(build_profile(&db, "nobody", "2024").is_err());
    }
}
