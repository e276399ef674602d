//! Period-complete detection and per-period cumulative scores.
//!
//! A period is "locked" once its score can no longer change, at which point
//! its winning square is payable. NCAAB plays halves, and its first line
//! score is already the half total.

use crate::scoring::NumberSetType;
use crate::store::SportsEvent;

const END_OF_PERIOD: &str = "end of";
const HALFTIME: &str = "halftime";

/// Whether `set_type`'s period is complete for this event.
pub fn is_period_complete(event: &SportsEvent, set_type: NumberSetType) -> bool {
    let is_final = event.status.is_final();
    let period = event.period.unwrap_or(0);
    let detail = event
        .status_detail
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let at_end_of_period = detail.contains(END_OF_PERIOD);
    let at_halftime = detail.contains(HALFTIME);

    match set_type {
        NumberSetType::Q1 => is_final || period >= 2 || (period == 1 && at_end_of_period),
        NumberSetType::Q2 | NumberSetType::Half => {
            if event.league.uses_halves() {
                is_final || period >= 2 || at_halftime || (period == 1 && at_end_of_period)
            } else {
                is_final || period >= 3 || at_halftime || (period == 2 && at_end_of_period)
            }
        }
        NumberSetType::Q3 => is_final || period >= 4 || (period == 3 && at_end_of_period),
        NumberSetType::Q4 | NumberSetType::Final | NumberSetType::All => is_final,
    }
}

/// Cumulative `(home, away)` score at the end of `set_type`'s period.
pub fn score_for_period(event: &SportsEvent, set_type: NumberSetType) -> (Option<i32>, Option<i32>) {
    match set_type {
        NumberSetType::Q1 => (event.home_q1, event.away_q1),
        NumberSetType::Half if event.league.uses_halves() => (event.home_q1, event.away_q1),
        NumberSetType::Half | NumberSetType::Q2 => {
            (event.home_half_score(), event.away_half_score())
        }
        NumberSetType::Q3 => (event.home_q3_cumulative(), event.away_q3_cumulative()),
        NumberSetType::Q4 | NumberSetType::Final | NumberSetType::All => {
            (event.home_score, event.away_score)
        }
    }
}
