//! Persisted records: teams, events, sync logs and the grid rows the
//! engine reads for scoring.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::scoring::{GridType, NumberSet, NumberSetConfig, NumberSetType};
use crate::types::{Event, EventStatus, League, Team, ValidationError};

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

/// A team row keyed by `(id, league)`. Colours are hex without `#`.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SportsTeam {
    pub id: String,
    #[sqlx(try_from = "String")]
    pub league: League,
    pub name: String,
    pub full_name: String,
    pub abbreviation: String,
    pub location: Option<String>,
    pub color: Option<String>,
    pub alternate_color: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl SportsTeam {
    /// Map a provider team onto a row. Empty strings become `None` so the
    /// upsert keeps whatever is already stored.
    pub fn from_provider(league: League, team: &Team) -> Self {
        let now = Utc::now();
        Self {
            id: team.id.clone(),
            league,
            name: team.name.clone(),
            full_name: team.display_name.clone(),
            abbreviation: team.abbreviation.clone(),
            location: non_empty(team.location.as_deref()),
            color: non_empty(team.color.as_deref()),
            alternate_color: non_empty(team.alternate_color.as_deref()),
            conference: None,
            division: None,
            created: now,
            modified: now,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A stored event. `id` is 0 until the row has been written.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SportsEvent {
    pub id: i64,
    pub espn_id: String,
    #[sqlx(try_from = "String")]
    pub league: League,
    pub name: Option<String>,
    pub home_team_id: String,
    pub away_team_id: String,
    pub event_date: DateTime<Utc>,
    pub season: i32,
    pub week: Option<i32>,
    pub postseason: bool,
    pub venue: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: EventStatus,
    pub status_detail: Option<String>,
    pub period: Option<i32>,
    pub clock: Option<String>,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub home_q1: Option<i32>,
    pub home_q2: Option<i32>,
    pub home_q3: Option<i32>,
    pub home_q4: Option<i32>,
    pub home_ot: Option<i32>,
    pub away_q1: Option<i32>,
    pub away_q2: Option<i32>,
    pub away_q3: Option<i32>,
    pub away_q4: Option<i32>,
    pub away_ot: Option<i32>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub last_synced: DateTime<Utc>,
}

impl SportsEvent {
    /// Build the record to upsert from a parsed provider event.
    pub fn from_provider(league: League, event: &Event) -> Self {
        let now = Utc::now();
        let (home, away) = (&event.home, &event.away);
        Self {
            id: 0,
            espn_id: event.id.clone(),
            league,
            name: non_empty(event.name.as_deref()),
            home_team_id: home.team.id.clone(),
            away_team_id: away.team.id.clone(),
            event_date: event.date,
            season: event.season,
            week: event.week,
            postseason: event.is_postseason(),
            venue: non_empty(event.venue.as_deref()),
            status: event.status,
            status_detail: non_empty(Some(event.status_detail.as_str())),
            period: Some(event.period),
            clock: non_empty(Some(event.clock.as_str())),
            home_score: home.score,
            away_score: away.score,
            home_q1: home.line_scores.q1,
            home_q2: home.line_scores.q2,
            home_q3: home.line_scores.q3,
            home_q4: home.line_scores.q4,
            home_ot: home.line_scores.ot,
            away_q1: away.line_scores.q1,
            away_q2: away.line_scores.q2,
            away_q3: away.line_scores.q3,
            away_q4: away.line_scores.q4,
            away_ot: away.line_scores.ot,
            created: now,
            modified: now,
            last_synced: now,
        }
    }

    /// Cumulative home score through the second period.
    pub fn home_half_score(&self) -> Option<i32> {
        Some(self.home_q1? + self.home_q2?)
    }

    pub fn away_half_score(&self) -> Option<i32> {
        Some(self.away_q1? + self.away_q2?)
    }

    pub fn home_q3_cumulative(&self) -> Option<i32> {
        Some(self.home_half_score()? + self.home_q3?)
    }

    pub fn away_q3_cumulative(&self) -> Option<i32> {
        Some(self.away_half_score()? + self.away_q3?)
    }
}

/// One page of a paginated query plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

// ---------------------------------------------------------------------------
// Sync log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncType {
    Teams,
    Schedule,
    Scores,
}

impl SyncType {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncType::Teams => "teams",
            SyncType::Schedule => "schedule",
            SyncType::Scores => "scores",
        }
    }
}

impl fmt::Display for SyncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "teams" => Ok(SyncType::Teams),
            "schedule" => Ok(SyncType::Schedule),
            "scores" => Ok(SyncType::Scores),
            other => Err(ValidationError::InvalidSyncType(other.to_string())),
        }
    }
}

/// A sync run. Opened at start, closed exactly once at the end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub id: i64,
    pub sync_type: SyncType,
    pub league: Option<League>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub records_processed: i32,
    pub success: Option<bool>,
    pub error_message: Option<String>,
}

impl SyncLog {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

impl<'r> FromRow<'r, PgRow> for SyncLog {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let decode = |e: ValidationError| sqlx::Error::Decode(Box::new(e));
        let sync_type: String = row.try_get("sync_type")?;
        let league: Option<String> = row.try_get("league")?;
        Ok(Self {
            id: row.try_get("id")?,
            sync_type: sync_type.parse().map_err(decode)?,
            league: league.map(|l| l.parse()).transpose().map_err(decode)?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            records_processed: row.try_get("records_processed")?,
            success: row.try_get("success")?,
            error_message: row.try_get("error_message")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Grids (read side)
// ---------------------------------------------------------------------------

/// Everything needed to compute a grid's winning squares.
#[derive(Debug, Clone, PartialEq)]
pub struct GridScoring {
    pub grid_id: i64,
    pub grid_type: GridType,
    /// Grid payout config if set, else the pool's config.
    pub config: NumberSetConfig,
    pub home_team_name: Option<String>,
    pub away_team_name: Option<String>,
    pub home_numbers: Option<Vec<i32>>,
    pub away_numbers: Option<Vec<i32>>,
    pub event: Option<SportsEvent>,
    pub number_sets: HashMap<NumberSetType, NumberSet>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub(crate) fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}
