//! Winning-square calculation.
//!
//! Squares are numbered from 1, row-major, with away numbers down the side
//! (rows) and home numbers across the top (columns).

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::period::{is_period_complete, score_for_period};
use super::{GridType, NumberSet, NumberSetConfig, NumberSetType};
use crate::store::{GridScoring, SportsEvent};

/// Winning square id per locked period.
pub type WinningSquares = BTreeMap<NumberSetType, u32>;

/// One period a square won, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WinningPeriodInfo {
    pub period: NumberSetType,
    pub label: String,
    pub home_score: i32,
    pub away_score: i32,
    pub home_team_name: String,
    pub away_team_name: String,
}

/// Map a score to its square id. `None` when either permutation is not
/// exactly ten long or a score digit is missing from its permutation.
pub fn calculate_winning_square(
    home_score: i32,
    away_score: i32,
    home_numbers: &[i32],
    away_numbers: &[i32],
    grid_type: GridType,
) -> Option<u32> {
    if home_numbers.len() != 10 || away_numbers.len() != 10 {
        return None;
    }

    let home_digit = home_score % 10;
    let away_digit = away_score % 10;
    let home_pos = home_numbers.iter().position(|&n| n == home_digit)? as u32;
    let away_pos = away_numbers.iter().position(|&n| n == away_digit)? as u32;

    let id = match grid_type {
        GridType::Std100 | GridType::Roll100 => away_pos * 10 + home_pos,
        // 5x5: each cell spans two home and two away positions
        GridType::Std25 => (away_pos / 2) * 5 + home_pos / 2,
        // 5 rows x 10 columns: each row spans two away positions
        GridType::Std50 => (away_pos / 2) * 10 + home_pos,
    };
    Some(id + 1)
}

/// Winning squares for every locked period of `config`.
///
/// `standard` always uses the grid-level numbers. Multi-set configs use the
/// period's own number set when drawn, falling back to the grid-level pair
/// for grids drawn before a payout config was chosen.
pub fn get_winning_squares(
    event: &SportsEvent,
    config: NumberSetConfig,
    grid_type: GridType,
    home_numbers: &[i32],
    away_numbers: &[i32],
    number_sets: &HashMap<NumberSetType, NumberSet>,
) -> WinningSquares {
    let mut squares = WinningSquares::new();

    for &set_type in config.set_types() {
        if !is_period_complete(event, set_type) {
            continue;
        }
        let (Some(home), Some(away)) = score_for_period(event, set_type) else {
            continue;
        };

        let (home_nums, away_nums) = match number_sets.get(&set_type) {
            Some(ns) if config != NumberSetConfig::Standard && ns.has_numbers() => (
                ns.home_numbers.as_deref().unwrap_or_default(),
                ns.away_numbers.as_deref().unwrap_or_default(),
            ),
            _ => (home_numbers, away_numbers),
        };

        if let Some(id) = calculate_winning_square(home, away, home_nums, away_nums, grid_type) {
            squares.insert(set_type, id);
        }
    }

    squares
}

/// The periods `square_id` won, ordered q1, half, q2, q3, final, all, q4.
pub fn get_winning_periods_for_square(
    square_id: u32,
    winning: &WinningSquares,
    event: &SportsEvent,
    home_team_name: &str,
    away_team_name: &str,
) -> Vec<WinningPeriodInfo> {
    let mut periods: Vec<WinningPeriodInfo> = winning
        .iter()
        .filter(|(_, id)| **id == square_id)
        .filter_map(|(&period, _)| {
            let (home, away) = score_for_period(event, period);
            Some(WinningPeriodInfo {
                period,
                label: period.long_label().to_string(),
                home_score: home?,
                away_score: away?,
                home_team_name: home_team_name.to_string(),
                away_team_name: away_team_name.to_string(),
            })
        })
        .collect();

    periods.sort_by_key(|p| p.period.display_priority());
    periods
}

/// Winning squares for a loaded grid. Empty when no event is linked.
pub fn winning_squares_for_grid(grid: &GridScoring) -> WinningSquares {
    let Some(event) = grid.event.as_ref() else {
        return WinningSquares::new();
    };
    get_winning_squares(
        event,
        grid.config,
        grid.grid_type,
        grid.home_numbers.as_deref().unwrap_or_default(),
        grid.away_numbers.as_deref().unwrap_or_default(),
        &grid.number_sets,
    )
}
