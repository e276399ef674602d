//! Sports data provider: the `SportsProvider` seam and its ESPN implementation.
//!
//! Sync code depends only on the trait, so tests drive it with the
//! generated `MockSportsProvider` and never touch the network.

pub mod client;
pub mod error;
pub mod parse;
pub mod wire;

use async_trait::async_trait;
use chrono::NaiveDate;

pub use client::{EspnClient, EspnConfig, DEFAULT_BASE_URL};
pub use error::ProviderError;

use crate::types::{Event, League, ScoreboardOptions, SeasonInfo, SeasonType, Team};

/// Read-only access to a league's teams, schedule and live scores.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SportsProvider: Send + Sync {
    /// Every team in the league.
    async fn get_teams(&self, league: League) -> Result<Vec<Team>, ProviderError>;

    /// One scoreboard page. Events that fail to parse are skipped.
    async fn get_scoreboard(
        &self,
        league: League,
        opts: &ScoreboardOptions,
    ) -> Result<Vec<Event>, ProviderError>;

    /// Scoreboards for each day in `start..=end`, deduplicated by event id.
    /// Fails as a whole if any day fails.
    async fn get_scoreboard_for_date_range(
        &self,
        league: League,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError>;

    /// A team's full season schedule. Carries final scores but no line scores.
    async fn get_team_schedule(
        &self,
        league: League,
        team_id: &str,
    ) -> Result<Vec<Event>, ProviderError>;

    /// Detailed single-event fetch with display-value line scores.
    async fn get_event_summary(&self, league: League, event_id: &str)
        -> Result<Event, ProviderError>;

    /// Current or upcoming season window.
    async fn get_season_info(&self, league: League) -> Result<SeasonInfo, ProviderError>;

    /// NFL regular or postseason week.
    async fn nfl_week(
        &self,
        season: i32,
        week: i32,
        season_type: SeasonType,
    ) -> Result<Vec<Event>, ProviderError> {
        self.get_scoreboard(League::Nfl, &ScoreboardOptions::for_week(season, week, season_type))
            .await
    }
}
