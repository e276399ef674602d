//! ESPN site API response shapes, one family per endpoint.
//!
//! Only the fields the parser reads are declared. Everything defaults so a
//! sparse payload (college games often omit venue, colours, or notes)
//! still decodes.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireTeam {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub abbreviation: String,
    pub location: Option<String>,
    pub color: Option<String>,
    pub alternate_color: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EventSeason {
    pub year: i32,
    #[serde(rename = "type")]
    pub season_type: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WeekRef {
    pub number: i32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Venue {
    pub full_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Note {
    #[serde(rename = "type")]
    pub kind: String,
    pub headline: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireStatus {
    pub clock: f64,
    pub display_clock: String,
    pub period: i32,
    #[serde(rename = "type")]
    pub status_type: WireStatusType,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct WireStatusType {
    pub id: String,
    /// e.g. `STATUS_SCHEDULED`, `STATUS_HALFTIME`, `STATUS_FINAL_OT`
    pub name: String,
    /// `pre`, `in` or `post`
    pub state: String,
    pub completed: bool,
    pub description: String,
}

// ---------------------------------------------------------------------------
// /teams
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamsResponse {
    pub sports: Vec<TeamsSport>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamsSport {
    pub leagues: Vec<TeamsLeague>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamsLeague {
    pub teams: Vec<TeamEntry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamEntry {
    pub team: WireTeam,
}

// ---------------------------------------------------------------------------
// /scoreboard
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreboardResponse {
    pub leagues: Vec<LeagueInfo>,
    pub events: Vec<ScoreboardEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LeagueInfo {
    pub season: Option<LeagueSeason>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeagueSeason {
    pub year: i32,
    pub start_date: String,
    pub end_date: String,
    #[serde(rename = "type")]
    pub season_type: SeasonTypeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeasonTypeInfo {
    pub id: String,
    #[serde(rename = "type")]
    pub code: i32,
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreboardEvent {
    pub id: String,
    pub date: String,
    pub name: String,
    pub short_name: String,
    pub season: EventSeason,
    pub week: Option<WeekRef>,
    pub competitions: Vec<ScoreboardCompetition>,
    pub status: WireStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScoreboardCompetition {
    pub id: String,
    pub date: String,
    pub venue: Option<Venue>,
    pub competitors: Vec<ScoreboardCompetitor>,
    pub notes: Vec<Note>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreboardCompetitor {
    pub id: String,
    pub home_away: String,
    pub team: WireTeam,
    pub score: Option<String>,
    pub linescores: Vec<NumericLineScore>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NumericLineScore {
    pub value: f64,
}

// ---------------------------------------------------------------------------
// /teams/{id}/schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TeamScheduleResponse {
    pub events: Vec<ScheduleEvent>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleEvent {
    pub id: String,
    pub date: String,
    pub name: String,
    pub season: EventSeason,
    pub season_type: SeasonTypeInfo,
    pub week: Option<WeekRef>,
    pub competitions: Vec<ScheduleCompetition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ScheduleCompetition {
    pub id: String,
    pub date: String,
    pub venue: Option<Venue>,
    pub competitors: Vec<ScheduleCompetitor>,
    pub status: WireStatus,
    pub notes: Vec<Note>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleCompetitor {
    pub id: String,
    pub home_away: String,
    pub team: WireTeam,
    pub score: Option<ScheduleScore>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleScore {
    pub value: Option<f64>,
    pub display_value: String,
}

// ---------------------------------------------------------------------------
// /summary
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryResponse {
    pub header: SummaryHeader,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryHeader {
    pub id: String,
    pub season: EventSeason,
    pub week: Option<i32>,
    pub competitions: Vec<SummaryCompetition>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SummaryCompetition {
    pub id: String,
    pub date: String,
    pub venue: Option<Venue>,
    pub competitors: Vec<SummaryCompetitor>,
    pub status: WireStatus,
    pub notes: Vec<Note>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryCompetitor {
    pub id: String,
    pub home_away: String,
    pub winner: bool,
    pub team: WireTeam,
    pub score: Option<String>,
    pub linescores: Vec<DisplayLineScore>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayLineScore {
    pub display_value: String,
}
