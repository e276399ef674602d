//! Schedule mode: load the season's events per league.
//!
//! Football is fetched week by week, NCAAB team by team (its scoreboard
//! only lists featured games) and everything else by date range.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{recoverable, LeagueReport, SyncError, SyncOrchestrator, SyncReport};
use crate::store::SyncType;
use crate::types::{Event, League, ScoreboardOptions, SeasonInfo, SeasonType};

/// Per-team schedule fetches between progress log lines.
const PROGRESS_EVERY: usize = 50;

impl SyncOrchestrator<'_> {
    pub async fn sync_schedule(&self) -> Result<SyncReport, SyncError> {
        info!("Syncing schedule");
        let mut report = SyncReport::new(SyncType::Schedule);

        for &league in &self.options.leagues {
            self.ensure_running()?;
            let log = self.open_log(SyncType::Schedule, Some(league)).await?;

            let season = match self.provider.get_season_info(league).await {
                Ok(season) => season,
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(%league, error = %e, "Failed to get season info");
                    self.close_log(log, 0, Some(&e)).await;
                    report.leagues.push(LeagueReport::failed(league, &e));
                    continue;
                }
            };
            info!(
                %league,
                season_year = season.year,
                season_start = %season.start_date.format("%Y-%m-%d"),
                season_end = %season.end_date.format("%Y-%m-%d"),
                season_type = %season.type_name,
                in_season = season.in_season,
                "Got season info"
            );

            let fetched = match league.schedule_weeks() {
                Some((regular, post)) => self.weekly_schedule(league, season.year, regular, post).await,
                None if league == League::Ncaab => self.team_schedules(league).await,
                None => self.date_range_schedule(league, &season).await,
            };
            let events = match fetched {
                Ok(events) => events,
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(%league, error = %e, "Failed to fetch schedule");
                    self.close_log(log, 0, Some(&e)).await;
                    report.leagues.push(LeagueReport::failed(league, &e));
                    continue;
                }
            };
            info!(%league, count = events.len(), "Found events");

            let processed = self.process_events(league, &events).await?;
            info!(%league, processed, "Finished syncing schedule");

            self.close_log(log, processed, None).await;
            report
                .leagues
                .push(LeagueReport::succeeded(league, events.len(), processed));
        }

        Ok(report)
    }

    /// Every regular and postseason week of `season`. Failed weeks are
    /// logged and skipped.
    async fn weekly_schedule(
        &self,
        league: League,
        season: i32,
        regular_weeks: i32,
        postseason_weeks: i32,
    ) -> Result<Vec<Event>, SyncError> {
        let mut events = Vec::new();
        let phases = [
            (SeasonType::Regular, regular_weeks),
            (SeasonType::Postseason, postseason_weeks),
        ];

        for (season_type, weeks) in phases {
            for week in 1..=weeks {
                self.ensure_running()?;
                let fetched = if league == League::Nfl {
                    self.provider.nfl_week(season, week, season_type).await
                } else {
                    let opts = ScoreboardOptions::for_week(season, week, season_type);
                    self.provider.get_scoreboard(league, &opts).await
                };
                match fetched {
                    Ok(mut batch) => {
                        debug!(%league, week, season_type = ?season_type, count = batch.len(), "Fetched week");
                        events.append(&mut batch);
                    }
                    Err(e) => {
                        let e = recoverable(e)?;
                        warn!(%league, week, season_type = ?season_type, error = %e, "Failed to fetch week");
                    }
                }
            }
        }

        Ok(events)
    }

    /// Union of every stored team's schedule, deduplicated by event id.
    /// Requires teams to have been synced first.
    async fn team_schedules(&self, league: League) -> Result<Vec<Event>, SyncError> {
        let teams = self.store.teams_by_league(league).await?;
        if teams.is_empty() {
            return Err(SyncError::NoTeams { league });
        }
        info!(%league, team_count = teams.len(), "Fetching schedules for all teams");

        let total = teams.len();
        let mut seen = HashSet::new();
        let mut events = Vec::new();

        for (i, team) in teams.iter().enumerate() {
            self.ensure_running()?;
            match self.provider.get_team_schedule(league, &team.id).await {
                Ok(batch) => {
                    events.extend(batch.into_iter().filter(|e| seen.insert(e.id.clone())));
                }
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(%league, team_id = %team.id, team = %team.name, error = %e, "Failed to fetch team schedule");
                }
            }

            let done = i + 1;
            if done % PROGRESS_EVERY == 0 || done == total {
                info!(%league, progress = %format!("{done}/{total}"), events_found = events.len(), "Team schedule progress");
            }
        }

        Ok(events)
    }

    /// From today (in season) or the season start through the season end.
    async fn date_range_schedule(
        &self,
        league: League,
        season: &SeasonInfo,
    ) -> Result<Vec<Event>, SyncError> {
        let start = if season.in_season {
            Utc::now().date_naive()
        } else {
            season.start_date.date_naive()
        };
        let end = season.end_date.date_naive();
        info!(%league, start_date = %start, end_date = %end, "Fetching schedule by date range");

        Ok(self
            .provider
            .get_scoreboard_for_date_range(league, start, end)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::espn::{MockSportsProvider, ProviderError};
    use crate::store::{MemoryStore, SportsStore, SportsTeam};
    use crate::sync::testing::{provider_event, team};
    use crate::sync::SyncOptions;
    use crate::types::EventStatus;
    use chrono::{Duration, TimeZone};
    use tokio_util::sync::CancellationToken;

    fn season(in_season: bool) -> SeasonInfo {
        SeasonInfo {
            year: 2024,
            start_date: Utc.with_ymd_and_hms(2024, 10, 22, 0, 0, 0).unwrap(),
            end_date: Utc.with_ymd_and_hms(2025, 4, 13, 0, 0, 0).unwrap(),
            type_name: "Regular Season".into(),
            in_season,
        }
    }

    fn sync<'a>(
        provider: &'a MockSportsProvider,
        store: &'a MemoryStore,
        league: League,
    ) -> SyncOrchestrator<'a> {
        SyncOrchestrator::new(
            provider,
            store,
            store,
            SyncOptions::new(Some(league), false),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_football_fetches_every_week() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Ok(season(true)));
        provider
            .expect_nfl_week()
            .times(23)
            .returning(|_, week, season_type| {
                let phase = season_type.code();
                if week == 3 && phase == 2 {
                    return Err(ProviderError::Status { status: 500, url: "u".into() });
                }
                let id = format!("{phase}-{week}");
                Ok(vec![provider_event(&id, "1", "2", EventStatus::Scheduled)])
            });
        let store = MemoryStore::new();

        let report = sync(&provider, &store, League::Nfl).sync_schedule().await.unwrap();

        // 18 regular + 5 postseason weeks, one failed.
        assert_eq!(report.leagues[0].fetched, 22);
        assert_eq!(report.processed(), 22);
        assert_eq!(store.event_count(Some(League::Nfl)).await.unwrap(), 22);
        let logs = store.sync_logs().await;
        assert_eq!(logs[0].records_processed, 22);
        assert_eq!(logs[0].success, Some(true));
    }

    #[tokio::test]
    async fn test_college_football_uses_week_scoreboards() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Ok(season(true)));
        provider
            .expect_get_scoreboard()
            .withf(|league, opts| *league == League::Ncaaf && opts.week.is_some())
            .times(18)
            .returning(|_, opts| {
                let week = opts.week.unwrap_or_default();
                let phase = opts.season_type.map(SeasonType::code).unwrap_or_default();
                let id = format!("{phase}-{week}");
                Ok(vec![provider_event(&id, "1", "2", EventStatus::Scheduled)])
            });
        let store = MemoryStore::new();

        let report = sync(&provider, &store, League::Ncaaf).sync_schedule().await.unwrap();

        // 15 regular + 3 postseason weeks.
        assert_eq!(report.processed(), 18);
        assert_eq!(store.event_count(Some(League::Ncaaf)).await.unwrap(), 18);
    }

    #[tokio::test]
    async fn test_ncaab_requires_teams() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Ok(season(true)));
        let store = MemoryStore::new();

        let report = sync(&provider, &store, League::Ncaab).sync_schedule().await.unwrap();

        assert!(!report.is_success());
        let message = report.leagues[0].error.clone().unwrap_or_default();
        assert!(message.contains("--sync-teams"));
        let logs = store.sync_logs().await;
        assert_eq!(logs[0].success, Some(false));
    }

    #[tokio::test]
    async fn test_ncaab_dedupes_team_schedules() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Ok(season(true)));
        provider
            .expect_get_team_schedule()
            .times(2)
            .returning(|_, team_id| {
                // Both teams play game 500; each also has one of its own.
                Ok(vec![
                    provider_event("500", "10", "20", EventStatus::Scheduled),
                    provider_event(&format!("6{team_id}"), team_id, "99", EventStatus::Scheduled),
                ])
            });
        let store = MemoryStore::new();
        for (id, name) in [("10", "Duke"), ("20", "Kansas")] {
            store
                .upsert_team(&SportsTeam::from_provider(League::Ncaab, &team(id, name)))
                .await
                .unwrap();
        }

        let report = sync(&provider, &store, League::Ncaab).sync_schedule().await.unwrap();

        assert_eq!(report.leagues[0].fetched, 3);
        assert_eq!(store.event_count(Some(League::Ncaab)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_date_range_starts_at_season_start_off_season() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Ok(season(false)));
        provider
            .expect_get_scoreboard_for_date_range()
            .withf(|_, start, end| {
                start.to_string() == "2024-10-22" && end.to_string() == "2025-04-13"
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![provider_event("1", "1", "2", EventStatus::Scheduled)]));
        let store = MemoryStore::new();

        let report = sync(&provider, &store, League::Nba).sync_schedule().await.unwrap();
        assert_eq!(report.processed(), 1);
    }

    #[tokio::test]
    async fn test_date_range_starts_today_in_season() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Ok(season(true)));
        provider
            .expect_get_scoreboard_for_date_range()
            .withf(|_, start, _| {
                let today = Utc::now().date_naive();
                *start == today || *start == today - Duration::days(1)
            })
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        let store = MemoryStore::new();

        let report = sync(&provider, &store, League::Wnba).sync_schedule().await.unwrap();
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_season_info_failure_marks_log_failed() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_season_info()
            .returning(|_| Err(ProviderError::MissingData("leagues")));
        let store = MemoryStore::new();

        let report = sync(&provider, &store, League::Nba).sync_schedule().await.unwrap();

        assert!(!report.is_success());
        let logs = store.sync_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].success, Some(false));
        assert_eq!(logs[0].error_message.as_deref(), Some("ESPN response has no leagues"));
    }
}
