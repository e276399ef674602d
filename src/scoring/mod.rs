//! Pure scoring logic: grid geometries, number-set configurations, the
//! period-complete state machine and the winning-square calculator.
//!
//! Nothing here performs I/O. Grid readers load a [`crate::store::GridScoring`]
//! from the store and hand it to [`winning_squares_for_grid`].

pub mod grid_type;
pub mod number_set;
pub mod period;
pub mod winning;

pub use grid_type::GridType;
pub use number_set::{
    configs_for_league, validate_numbers, ConfigInfo, NumberSet, NumberSetConfig, NumberSetType,
};
pub use period::{is_period_complete, score_for_period};
pub use winning::{
    calculate_winning_square, get_winning_periods_for_square, get_winning_squares,
    winning_squares_for_grid, WinningPeriodInfo, WinningSquares,
};
