//! Normalize endpoint payloads into [`Event`], [`Team`] and [`SeasonInfo`].
//!
//! Each endpoint gets its own parser. They share the date, status, name and
//! score helpers but never each other's payload types.

use chrono::{DateTime, NaiveDateTime, Utc};

use super::error::ProviderError;
use super::wire::{
    Note, ScheduleEvent, ScoreboardEvent, ScoreboardResponse, SummaryResponse, TeamsResponse,
    Venue, WireStatus, WireStatusType, WireTeam,
};
use crate::types::{Competitor, Event, EventStatus, LineScores, SeasonInfo, Team};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Parse an ESPN timestamp. The truncated `2024-02-11T23:30Z` form is by far
/// the most common, so it is tried first.
pub fn parse_espn_date(value: &str) -> Result<DateTime<Utc>, ProviderError> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%MZ") {
        return Ok(dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.3fZ", "%Y-%m-%dT%H:%M:%SZ"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(dt.and_utc());
        }
    }
    Err(ProviderError::DateParse(value.to_string()))
}

pub fn map_status(status: &WireStatusType) -> EventStatus {
    match status.name.as_str() {
        "STATUS_SCHEDULED" => EventStatus::Scheduled,
        "STATUS_FINAL" | "STATUS_FINAL_OT" => EventStatus::Final,
        _ if status.completed => EventStatus::Final,
        _ if status.state == "pre" => EventStatus::Scheduled,
        _ => EventStatus::InProgress,
    }
}

/// Titled games carry a notes headline; regular games get no name.
fn event_name(notes: &[Note]) -> Option<String> {
    notes
        .iter()
        .find(|n| !n.headline.is_empty())
        .map(|n| n.headline.clone())
}

fn venue_name(venue: Option<&Venue>) -> Option<String> {
    venue
        .map(|v| v.full_name.clone())
        .filter(|name| !name.is_empty())
}

/// Empty or unparseable scores are `None`, never zero.
fn parse_score(value: Option<&str>) -> Option<i32> {
    value.map(str::trim).filter(|s| !s.is_empty())?.parse().ok()
}

fn to_team(team: WireTeam) -> Team {
    let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());
    Team {
        id: team.id,
        name: team.name,
        display_name: team.display_name,
        abbreviation: team.abbreviation,
        location: non_empty(team.location),
        color: non_empty(team.color),
        alternate_color: non_empty(team.alternate_color),
    }
}

/// Split competitors into `(home, away)`.
fn sides<I>(competitors: I) -> Result<(Competitor, Competitor), ProviderError>
where
    I: IntoIterator<Item = (String, Competitor)>,
{
    let mut home = None;
    let mut away = None;
    for (home_away, competitor) in competitors {
        if home_away == "home" {
            home = Some(competitor);
        } else {
            away = Some(competitor);
        }
    }
    match (home, away) {
        (Some(h), Some(a)) => Ok((h, a)),
        _ => Err(ProviderError::MissingData("home and away competitors")),
    }
}

struct GameState {
    status: EventStatus,
    status_detail: String,
    period: i32,
    clock: String,
}

fn game_state(status: &WireStatus) -> GameState {
    GameState {
        status: map_status(&status.status_type),
        status_detail: status.status_type.description.clone(),
        period: status.period,
        clock: status.display_clock.clone(),
    }
}

// ---------------------------------------------------------------------------
// Endpoint parsers
// ---------------------------------------------------------------------------

pub fn parse_teams(resp: TeamsResponse) -> Vec<Team> {
    resp.sports
        .into_iter()
        .flat_map(|s| s.leagues)
        .flat_map(|l| l.teams)
        .map(|entry| to_team(entry.team))
        .collect()
}

/// A scoreboard event. Status lives on the event, line scores are numeric.
pub fn parse_scoreboard_event(event: ScoreboardEvent) -> Result<Event, ProviderError> {
    let date = parse_espn_date(&event.date)?;
    let state = game_state(&event.status);
    let comp = event
        .competitions
        .into_iter()
        .next()
        .ok_or(ProviderError::MissingData("competitions"))?;

    let name = event_name(&comp.notes);
    let venue = venue_name(comp.venue.as_ref());
    let (home, away) = sides(comp.competitors.into_iter().map(|c| {
        let periods: Vec<i32> = c.linescores.iter().map(|l| l.value as i32).collect();
        let line_scores = LineScores::from_periods(&periods);
        let competitor = Competitor {
            score: parse_score(c.score.as_deref()),
            team: to_team(c.team),
            line_scores,
        };
        (c.home_away, competitor)
    }))?;

    Ok(Event {
        id: event.id,
        name,
        date,
        status: state.status,
        status_detail: state.status_detail,
        period: state.period,
        clock: state.clock,
        season: event.season.year,
        season_type: event.season.season_type,
        week: event.week.map(|w| w.number),
        venue,
        home,
        away,
    })
}

/// A team-schedule event. Aggregate scores only, no line scores.
pub fn parse_schedule_event(event: ScheduleEvent) -> Result<Event, ProviderError> {
    let date = parse_espn_date(&event.date)?;
    let comp = event
        .competitions
        .into_iter()
        .next()
        .ok_or(ProviderError::MissingData("competitions"))?;

    let state = game_state(&comp.status);
    let name = event_name(&comp.notes);
    let venue = venue_name(comp.venue.as_ref());
    let (home, away) = sides(comp.competitors.into_iter().map(|c| {
        let score = c.score.as_ref().and_then(|s| {
            s.value
                .map(|v| v as i32)
                .or_else(|| parse_score(Some(s.display_value.as_str())))
        });
        let competitor = Competitor {
            team: to_team(c.team),
            score,
            line_scores: LineScores::default(),
        };
        (c.home_away, competitor)
    }))?;

    Ok(Event {
        id: event.id,
        name,
        date,
        status: state.status,
        status_detail: state.status_detail,
        period: state.period,
        clock: state.clock,
        season: event.season.year,
        season_type: event.season_type.code,
        week: event.week.map(|w| w.number),
        venue,
        home,
        away,
    })
}

/// An event summary. Line scores arrive as display strings.
pub fn parse_summary(resp: SummaryResponse) -> Result<Event, ProviderError> {
    let header = resp.header;
    let comp = header
        .competitions
        .into_iter()
        .next()
        .ok_or(ProviderError::MissingData("competitions in summary"))?;

    let date = parse_espn_date(&comp.date)?;
    let state = game_state(&comp.status);
    let name = event_name(&comp.notes);
    let venue = venue_name(comp.venue.as_ref());
    let (home, away) = sides(comp.competitors.into_iter().map(|c| {
        let line_scores = LineScores::from_optional(
            c.linescores
                .iter()
                .map(|l| parse_score(Some(l.display_value.as_str()))),
        );
        let competitor = Competitor {
            score: parse_score(c.score.as_deref()),
            team: to_team(c.team),
            line_scores,
        };
        (c.home_away, competitor)
    }))?;

    Ok(Event {
        id: header.id,
        name,
        date,
        status: state.status,
        status_detail: state.status_detail,
        period: state.period,
        clock: state.clock,
        season: header.season.year,
        season_type: header.season.season_type,
        week: header.week,
        venue,
        home,
        away,
    })
}

/// The first league's season window from a scoreboard envelope.
pub fn parse_season_info(
    resp: &ScoreboardResponse,
    now: DateTime<Utc>,
) -> Result<SeasonInfo, ProviderError> {
    let season = resp
        .leagues
        .first()
        .and_then(|l| l.season.as_ref())
        .ok_or(ProviderError::MissingData("league info"))?;

    let start_date = parse_espn_date(&season.start_date)?;
    let end_date = parse_espn_date(&season.end_date)?;
    Ok(SeasonInfo {
        year: season.year,
        start_date,
        end_date,
        type_name: season.season_type.name.clone(),
        in_season: now > start_date && now < end_date,
    })
}
