//! Score-relevant change detection.

use crate::store::SportsEvent;

/// True when any field a grid reader displays or scores from differs.
/// Name, venue and start time are not score-relevant. `None` vs `Some(0)`
/// counts as a change.
pub fn sports_event_data_changed(existing: &SportsEvent, updated: &SportsEvent) -> bool {
    existing.status != updated.status
        || existing.home_score != updated.home_score
        || existing.away_score != updated.away_score
        || existing.period != updated.period
        || existing.clock != updated.clock
        || existing.status_detail != updated.status_detail
        || line_scores(existing) != line_scores(updated)
}

fn line_scores(e: &SportsEvent) -> [Option<i32>; 10] {
    [
        e.home_q1, e.away_q1, e.home_q2, e.away_q2, e.home_q3, e.away_q3, e.home_q4, e.away_q4,
        e.home_ot, e.away_ot,
    ]
}
