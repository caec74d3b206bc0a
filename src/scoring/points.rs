use crate::config::{EventType, PointsTable};
use crate::feed::LiveScore;

/// Whether a golfer is still playing for points.
///
/// Everyone is in play through round 2. After the cut, rounds 3 and 4 need
/// the golfer on the current round; in a playoff or Monday finish one round
/// of lag is allowed.
pub fn in_play(golfer_round: u32, current_round: u32) -> bool {
    match current_round {
        0..=2 => true,
        3 | 4 => golfer_round == current_round,
        _ => golfer_round + 1 >= current_round,
    }
}

/// Points a live line would earn if the event ended now
pub fn projected_points(
    table: &PointsTable,
    event_type: EventType,
    line: &LiveScore,
    current_round: u32,
) -> f64 {
    if !in_play(line.round, current_round) {
        return 0.0;
    }
    match line.position {
        Some(position) => table.points_for(event_type, position, line.tied),
        None => 0.0,
    }
}
