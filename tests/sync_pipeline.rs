//! End-to-end sync runs over the in-memory store: teams, schedule and
//! scores feeding grid propagation and winning-square reads.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

use sqmgr_sports::espn::{ProviderError, SportsProvider};
use sqmgr_sports::scoring::{
    winning_squares_for_grid, GridType, NumberSet, NumberSetConfig, NumberSetType,
};
use sqmgr_sports::store::memory::{GridRecord, GridSettingsRecord, PoolRecord};
use sqmgr_sports::store::{MemoryStore, SportsStore, SyncType};
use sqmgr_sports::sync::{SyncOptions, SyncOrchestrator};
use sqmgr_sports::types::{
    Competitor, Event, EventStatus, League, LineScores, ScoreboardOptions, SeasonInfo, Team,
};

const IDENTITY: [i32; 10] = [0, 1, 2, 3, 4, 5, 6, 7, 8, 9];

/// Serves whatever events are currently scripted from every event endpoint.
struct ScriptedProvider {
    teams: Vec<Team>,
    events: Mutex<Vec<Event>>,
}

impl ScriptedProvider {
    fn new(teams: Vec<Team>) -> Self {
        Self {
            teams,
            events: Mutex::new(Vec::new()),
        }
    }

    fn script(&self, events: Vec<Event>) {
        *self.events.lock().unwrap() = events;
    }

    fn current(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl SportsProvider for ScriptedProvider {
    async fn get_teams(&self, _league: League) -> Result<Vec<Team>, ProviderError> {
        Ok(self.teams.clone())
    }

    async fn get_scoreboard(
        &self,
        _league: League,
        _opts: &ScoreboardOptions,
    ) -> Result<Vec<Event>, ProviderError> {
        Ok(self.current())
    }

    async fn get_scoreboard_for_date_range(
        &self,
        _league: League,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        Ok(self.current())
    }

    async fn get_team_schedule(
        &self,
        _league: League,
        _team_id: &str,
    ) -> Result<Vec<Event>, ProviderError> {
        Ok(self.current())
    }

    async fn get_event_summary(&self, league: League, event_id: &str) -> Result<Event, ProviderError> {
        Err(ProviderError::EventNotFound {
            league,
            event_id: event_id.to_string(),
        })
    }

    async fn get_season_info(&self, _league: League) -> Result<SeasonInfo, ProviderError> {
        Ok(SeasonInfo {
            year: 2024,
            start_date: Utc.with_ymd_and_hms(2024, 10, 22, 0, 0, 0).unwrap(),
            end_date: Utc::now() + Duration::days(90),
            type_name: "Regular Season".into(),
            in_season: true,
        })
    }
}

fn team(id: &str, name: &str, color: &str) -> Team {
    Team {
        id: id.into(),
        name: name.into(),
        display_name: format!("Team {name}"),
        abbreviation: name[..3].to_uppercase(),
        location: None,
        color: Some(color.into()),
        alternate_color: Some("ffffff".into()),
    }
}

fn teams() -> Vec<Team> {
    vec![
        team("1", "Hawks", "aa0000"),
        team("2", "Celtics", "00aa00"),
        team("3", "Knicks", "0000aa"),
    ]
}

fn competitor(team: Team, score: Option<i32>, periods: &[i32]) -> Competitor {
    Competitor {
        team,
        score,
        line_scores: LineScores::from_periods(periods),
    }
}

fn scheduled(away: Team) -> Event {
    Event {
        id: "401".into(),
        name: None,
        date: Utc::now() - Duration::hours(1),
        status: EventStatus::Scheduled,
        status_detail: String::new(),
        period: 0,
        clock: String::new(),
        season: 2024,
        season_type: 2,
        week: None,
        venue: Some("State Farm Arena".into()),
        home: competitor(teams()[0].clone(), None, &[]),
        away: competitor(away, None, &[]),
    }
}

fn final_score() -> Event {
    Event {
        status: EventStatus::Final,
        status_detail: "Final".into(),
        period: 4,
        home: competitor(teams()[0].clone(), Some(28), &[7, 7, 7, 7]),
        away: competitor(teams()[1].clone(), Some(24), &[3, 7, 7, 7]),
        ..scheduled(teams()[1].clone())
    }
}

async fn seed_grid(store: &MemoryStore) {
    store
        .insert_pool(PoolRecord {
            id: 1,
            token: "pool-token".into(),
            grid_type: GridType::Std100,
            number_set_config: NumberSetConfig::HalfFinal,
        })
        .await;
    // The first event written gets id 1.
    let mut grid = GridRecord::new(100, 1);
    grid.sports_event_id = Some(1);
    store.insert_grid(grid).await;
    store
        .insert_grid_settings(GridSettingsRecord {
            grid_id: 100,
            ..Default::default()
        })
        .await;
    for set_type in [NumberSetType::Half, NumberSetType::Final] {
        store
            .insert_number_set(NumberSet {
                grid_id: 100,
                set_type,
                home_numbers: Some(IDENTITY.to_vec()),
                away_numbers: Some(IDENTITY.to_vec()),
                manual_draw: false,
            })
            .await;
    }
}

fn orchestrator<'a>(
    provider: &'a ScriptedProvider,
    store: &'a MemoryStore,
    dry_run: bool,
) -> SyncOrchestrator<'a> {
    SyncOrchestrator::new(
        provider,
        store,
        store,
        SyncOptions::new(Some(League::Nba), dry_run),
        CancellationToken::new(),
    )
}

#[tokio::test]
async fn test_full_sync_to_winning_squares() {
    let provider = ScriptedProvider::new(teams());
    let store = MemoryStore::new();
    seed_grid(&store).await;
    let sync = orchestrator(&provider, &store, false);

    provider.script(vec![scheduled(teams()[1].clone())]);
    let reports = assert_ok!(sync.run(&[SyncType::Teams, SyncType::Schedule]).await);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].mode, SyncType::Teams);
    assert_eq!(reports[0].processed(), 3);
    assert_eq!(reports[1].processed(), 1);

    // New event: linked grid picks up names and colours.
    let grid = store.grid(100).await.unwrap();
    assert_eq!(grid.home_team_name.as_deref(), Some("Team Hawks"));
    assert_eq!(grid.away_team_name.as_deref(), Some("Team Celtics"));
    let settings = store.grid_settings(100).await.unwrap();
    assert_eq!(settings.home_team_color_1.as_deref(), Some("#aa0000"));
    assert_eq!(settings.away_team_color_2.as_deref(), Some("#ffffff"));

    // Nothing locked yet.
    let scoring = store.grid_scoring(100).await.unwrap().unwrap();
    assert!(winning_squares_for_grid(&scoring).is_empty());

    provider.script(vec![final_score()]);
    let reports = assert_ok!(sync.run(&[SyncType::Scores]).await);
    assert_eq!(reports[0].processed(), 1);
    assert_eq!(store.notifications().await, vec![1]);
    assert_eq!(store.pool_tokens_for_event(1).await.unwrap(), vec!["pool-token".to_string()]);

    let scoring = store.grid_scoring(100).await.unwrap().unwrap();
    assert_eq!(scoring.config, NumberSetConfig::HalfFinal);
    let squares = winning_squares_for_grid(&scoring);
    let expected: Vec<(NumberSetType, u32)> =
        vec![(NumberSetType::Half, 5), (NumberSetType::Final, 49)];
    assert_eq!(squares.into_iter().collect::<Vec<_>>(), expected);

    let logs = store.sync_logs().await;
    assert_eq!(logs.len(), 3);
    assert!(logs.iter().all(|l| l.success == Some(true) && l.is_complete()));
}

#[tokio::test]
async fn test_team_swap_keeps_customised_colours() {
    let provider = ScriptedProvider::new(teams());
    let store = MemoryStore::new();
    seed_grid(&store).await;
    let sync = orchestrator(&provider, &store, false);

    provider.script(vec![scheduled(teams()[1].clone())]);
    assert_ok!(sync.run(&[SyncType::Teams, SyncType::Schedule]).await);

    provider.script(vec![scheduled(teams()[2].clone())]);
    assert_ok!(sync.run(&[SyncType::Schedule]).await);

    let grid = store.grid(100).await.unwrap();
    assert_eq!(grid.away_team_name.as_deref(), Some("Team Knicks"));
    let settings = store.grid_settings(100).await.unwrap();
    assert_eq!(settings.away_team_color_1.as_deref(), Some("#00aa00"));
}

#[tokio::test]
async fn test_final_scores_survive_a_stale_scoreboard() {
    let provider = ScriptedProvider::new(teams());
    let store = MemoryStore::new();
    let sync = orchestrator(&provider, &store, false);

    provider.script(vec![final_score()]);
    assert_ok!(sync.run(&[SyncType::Schedule]).await);

    provider.script(vec![scheduled(teams()[1].clone())]);
    assert_ok!(sync.run(&[SyncType::Schedule]).await);

    let event = store.event_by_external_id("401").await.unwrap().unwrap();
    assert_eq!(event.status, EventStatus::Final);
    assert_eq!(event.home_score, Some(28));
    assert_eq!(event.away_q2, Some(7));
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let provider = ScriptedProvider::new(teams());
    let store = MemoryStore::new();
    seed_grid(&store).await;
    let sync = orchestrator(&provider, &store, true);

    provider.script(vec![final_score()]);
    let reports = assert_ok!(
        sync.run(&[SyncType::Scores, SyncType::Schedule, SyncType::Teams])
            .await
    );

    let modes: Vec<SyncType> = reports.iter().map(|r| r.mode).collect();
    assert_eq!(modes, vec![SyncType::Teams, SyncType::Schedule, SyncType::Scores]);
    assert_eq!(store.team_count(None).await.unwrap(), 0);
    assert_eq!(store.event_count(None).await.unwrap(), 0);
    assert!(store.sync_logs().await.is_empty());
    assert!(store.notifications().await.is_empty());
    assert_eq!(store.grid(100).await.unwrap().home_team_name, None);
}

#[tokio::test]
async fn test_grid_payout_config_overrides_pool() {
    let provider = ScriptedProvider::new(teams());
    let store = MemoryStore::new();
    seed_grid(&store).await;
    let mut grid = store.grid(100).await.unwrap();
    grid.payout_config = Some(NumberSetConfig::Standard);
    grid.home_numbers = Some(IDENTITY.to_vec());
    grid.away_numbers = Some(IDENTITY.iter().rev().copied().collect());
    store.insert_grid(grid).await;

    let sync = orchestrator(&provider, &store, false);
    provider.script(vec![final_score()]);
    assert_ok!(sync.run(&[SyncType::Schedule]).await);

    let scoring = store.grid_scoring(100).await.unwrap().unwrap();
    let squares = winning_squares_for_grid(&scoring);
    // 28-24 on reversed away numbers: away digit 4 sits at position 5.
    let expected: HashMap<NumberSetType, u32> = HashMap::from([(NumberSetType::All, 5 * 10 + 8 + 1)]);
    assert_eq!(squares.into_iter().collect::<HashMap<_, _>>(), expected);
}
