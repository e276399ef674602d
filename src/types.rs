//! Shared types for the sports engine.
//!
//! These form the vocabulary used across the provider client, the store,
//! the scoring calculator and the sync orchestrator. Provider payloads are
//! normalized into [`Event`] and [`Team`] before anything else sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// League
// ---------------------------------------------------------------------------

/// A supported sports league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum League {
    Nfl,
    Nba,
    Wnba,
    Ncaab,
    Ncaaf,
}

impl League {
    /// Every supported league, in sync order.
    pub const ALL: [League; 5] = [
        League::Nfl,
        League::Nba,
        League::Wnba,
        League::Ncaab,
        League::Ncaaf,
    ];

    /// Lowercase key used in storage and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            League::Nfl => "nfl",
            League::Nba => "nba",
            League::Wnba => "wnba",
            League::Ncaab => "ncaab",
            League::Ncaaf => "ncaaf",
        }
    }

    /// Display label, e.g. "NCAAB".
    pub fn label(self) -> &'static str {
        match self {
            League::Nfl => "NFL",
            League::Nba => "NBA",
            League::Wnba => "WNBA",
            League::Ncaab => "NCAAB",
            League::Ncaaf => "NCAAF",
        }
    }

    /// `{sport}/{league}` path segment on the ESPN site API.
    pub fn espn_path(self) -> &'static str {
        match self {
            League::Nfl => "football/nfl",
            League::Nba => "basketball/nba",
            League::Wnba => "basketball/wnba",
            League::Ncaab => "basketball/mens-college-basketball",
            League::Ncaaf => "football/college-football",
        }
    }

    /// Whether the league plays two halves instead of four quarters.
    pub fn uses_halves(self) -> bool {
        matches!(self, League::Ncaab)
    }

    /// Number of regulation periods; anything beyond is overtime.
    pub fn regulation_periods(self) -> i32 {
        if self.uses_halves() {
            2
        } else {
            4
        }
    }

    pub fn is_football(self) -> bool {
        matches!(self, League::Nfl | League::Ncaaf)
    }

    /// `(regular, postseason)` week counts for week-keyed schedule fetches.
    /// `None` for leagues that are not scheduled by week.
    pub fn schedule_weeks(self) -> Option<(i32, i32)> {
        match self {
            League::Nfl => Some((18, 5)),
            League::Ncaaf => Some((15, 3)),
            _ => None,
        }
    }
}

impl fmt::Display for League {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for League {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nfl" => Ok(League::Nfl),
            "nba" => Ok(League::Nba),
            "wnba" => Ok(League::Wnba),
            "ncaab" => Ok(League::Ncaab),
            "ncaaf" => Ok(League::Ncaaf),
            _ => Err(ValidationError::InvalidLeague(s.to_string())),
        }
    }
}

impl TryFrom<String> for League {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Season
// ---------------------------------------------------------------------------

/// ESPN season type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonType {
    Preseason,
    Regular,
    Postseason,
}

impl SeasonType {
    pub fn code(self) -> i32 {
        match self {
            SeasonType::Preseason => 1,
            SeasonType::Regular => 2,
            SeasonType::Postseason => 3,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(SeasonType::Preseason),
            2 => Some(SeasonType::Regular),
            3 => Some(SeasonType::Postseason),
            _ => None,
        }
    }
}

/// The league's current season window, read from the scoreboard envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonInfo {
    pub year: i32,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// e.g. "Regular Season"
    pub type_name: String,
    pub in_season: bool,
}

/// Query options for a scoreboard fetch. Zero / `None` fields are omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreboardOptions {
    /// `YYYYMMDD`
    pub date: Option<String>,
    /// Honoured for football leagues only.
    pub week: Option<i32>,
    pub season: Option<i32>,
    pub season_type: Option<SeasonType>,
}

impl ScoreboardOptions {
    pub fn for_date(date: chrono::NaiveDate) -> Self {
        Self {
            date: Some(date.format("%Y%m%d").to_string()),
            ..Self::default()
        }
    }

    pub fn for_week(season: i32, week: i32, season_type: SeasonType) -> Self {
        Self {
            week: Some(week),
            season: Some(season),
            season_type: Some(season_type),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Event status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Scheduled,
    InProgress,
    Final,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Scheduled => "scheduled",
            EventStatus::InProgress => "in_progress",
            EventStatus::Final => "final",
        }
    }

    pub fn is_final(self) -> bool {
        self == EventStatus::Final
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(EventStatus::Scheduled),
            "in_progress" => Ok(EventStatus::InProgress),
            "final" => Ok(EventStatus::Final),
            other => Err(ValidationError::InvalidStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for EventStatus {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Provider-normalized team and event
// ---------------------------------------------------------------------------

/// A team as reported by the provider. Colours are hex without `#`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Team {
    pub id: String,
    /// Short name, e.g. "Chiefs".
    pub name: String,
    /// Full name, e.g. "Kansas City Chiefs".
    pub display_name: String,
    pub abbreviation: String,
    pub location: Option<String>,
    pub color: Option<String>,
    pub alternate_color: Option<String>,
}

/// Per-period scores for one side. Entries beyond the fourth period are
/// summed into `ot`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineScores {
    pub q1: Option<i32>,
    pub q2: Option<i32>,
    pub q3: Option<i32>,
    pub q4: Option<i32>,
    pub ot: Option<i32>,
}

impl LineScores {
    /// Build from an ordered list of period values.
    pub fn from_periods(values: &[i32]) -> Self {
        Self::from_optional(values.iter().copied().map(Some))
    }

    /// Like [`LineScores::from_periods`], but unreadable periods keep their
    /// slot and stay `None`.
    pub fn from_optional<I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<i32>>,
    {
        let mut ls = Self::default();
        for (i, value) in values.into_iter().enumerate() {
            match i {
                0 => ls.q1 = value,
                1 => ls.q2 = value,
                2 => ls.q3 = value,
                3 => ls.q4 = value,
                _ => {
                    if let Some(v) = value {
                        ls.ot = Some(ls.ot.unwrap_or(0) + v);
                    }
                }
            }
        }
        ls
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Competitor {
    pub team: Team,
    pub score: Option<i32>,
    pub line_scores: LineScores,
}

/// One game, normalized from any of the provider's event payloads.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    /// Provider event id.
    pub id: String,
    /// Only set for titled games (notes headline), e.g. "Super Bowl LVIII".
    pub name: Option<String>,
    pub date: DateTime<Utc>,
    pub status: EventStatus,
    /// e.g. "Halftime", "End of 1st Quarter". Empty when absent.
    pub status_detail: String,
    /// 0 = not started, 1..4 = regulation, 5+ = overtime.
    pub period: i32,
    /// Display clock, e.g. "12:34". Empty when absent.
    pub clock: String,
    pub season: i32,
    /// Raw season type code, see [`SeasonType`].
    pub season_type: i32,
    pub week: Option<i32>,
    pub venue: Option<String>,
    pub home: Competitor,
    pub away: Competitor,
}

impl Event {
    pub fn is_postseason(&self) -> bool {
        self.season_type == SeasonType::Postseason.code()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Input validation failures. Reported synchronously, nothing is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid league: {0}")]
    InvalidLeague(String),

    #[error("invalid event status: {0}")]
    InvalidStatus(String),

    #[error("invalid sync type: {0}")]
    InvalidSyncType(String),

    #[error("invalid grid type: {0}")]
    InvalidGridType(String),

    #[error("invalid number set config: {0}")]
    InvalidNumberSetConfig(String),

    #[error("invalid number set type: {0}")]
    InvalidSetType(String),

    #[error("invalid numbers: {0}")]
    InvalidNumbers(String),

    #[error("number set config '{config}' is not valid for {league} games")]
    ConfigNotAllowed { config: String, league: String },
}
