use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, Result};

/// Which column of the points table an event is scored from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Regular,
    Major,
}

/// Ranking points by finishing position (data/points.json).
///
/// Index 0 is the winner. Positions past the end of a column score nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsTable {
    pub regular: Vec<f64>,
    pub major: Vec<f64>,
}

const REGULAR_HEAD: [f64; 34] = [
    500.0, 300.0, 190.0, 135.0, 110.0, 100.0, 90.0, 85.0, 80.0, 75.0, 70.0, 65.0, 60.0, 57.0,
    56.0, 55.0, 54.0, 53.0, 52.0, 51.0, 50.0, 49.0, 48.0, 47.0, 46.0, 45.0, 44.0, 43.0, 42.0,
    41.0, 40.0, 39.0, 38.0, 37.0,
];

const TABLE_DEPTH: usize = 85;

static DEFAULT_TABLE: Lazy<PointsTable> = Lazy::new(|| {
    let mut regular: Vec<f64> = REGULAR_HEAD.to_vec();
    // Half-point steps below 35th, floored at 3
    for i in 0..(TABLE_DEPTH - REGULAR_HEAD.len()) {
        regular.push((36.0 - 0.5 * i as f64).max(3.0));
    }
    let major = regular.iter().map(|p| p * 1.5).collect();
    PointsTable { regular, major }
});

impl Default for PointsTable {
    fn default() -> Self {
        DEFAULT_TABLE.clone()
    }
}

impl PointsTable {
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PoolError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let table: PointsTable =
            serde_json::from_str(&content).map_err(|e| PoolError::ConfigParse {
                path: path.to_string(),
                source: e,
            })?;

        if table.regular.is_empty() || table.major.is_empty() {
            return Err(PoolError::ConfigValidation {
                message: format!("{}: both points columns need at least one entry", path),
            });
        }

        Ok(table)
    }

    fn column(&self, event_type: EventType) -> &[f64] {
        match event_type {
            EventType::Regular => &self.regular,
            EventType::Major => &self.major,
        }
    }

    /// Points for finishing at `position` with `tied` golfers sharing it.
    ///
    /// Tied golfers split the points of the places they occupy, so a
    /// two-way tie for 2nd pays the mean of 2nd and 3rd.
    pub fn points_for(&self, event_type: EventType, position: u32, tied: u32) -> f64 {
        if position == 0 {
            return 0.0;
        }
        let tied = tied.max(1) as usize;
        let start = position as usize - 1;
        let column = self.column(event_type);

        let total: f64 = (start..start + tied)
            .map(|idx| column.get(idx).copied().unwrap_or(0.0))
            .sum();

        (total / tied as f64).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_shape() {
        let table = PointsTable::default();
        assert_eq!(table.regular.len(), TABLE_DEPTH);
        assert_eq!(table.regular[0], 500.0);
        assert_eq!(table.major[0], 750.0);
        assert_eq!(*table.regular.last().unwrap(), 11.0);
    }

    #[test]
    fn test_outright_positions() {
        let table = PointsTable::default();
        assert_eq!(table.points_for(EventType::Regular, 1, 1), 500.0);
        assert_eq!(table.points_for(EventType::Regular, 3, 1), 190.0);
        assert_eq!(table.points_for(EventType::Major, 2, 1), 450.0);
    }

    #[test]
    fn test_ties_split_places() {
        let table = PointsTable::default();
        // T2 with two golfers: (300 + 190) / 2
        assert_eq!(table.points_for(EventType::Regular, 2, 2), 245.0);
        // T4 with three golfers: (135 + 110 + 100) / 3 = 115
        assert_eq!(table.points_for(EventType::Regular, 4, 3), 115.0);
    }

    #[test]
    fn test_positions_past_table_end() {
        let table = PointsTable {
            regular: vec![10.0, 6.0],
            major: vec![20.0],
        };
        assert_eq!(table.points_for(EventType::Regular, 2, 2), 3.0);
        assert_eq!(table.points_for(EventType::Regular, 5, 1), 0.0);
        assert_eq!(table.points_for(EventType::Major, 0, 1), 0.0);
    }
}
