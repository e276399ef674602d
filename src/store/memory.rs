//! In-memory [`SportsStore`] and [`Notifier`].
//!
//! Mirrors the SQL in `postgres.rs` (COALESCE team upserts, the hot
//! window, stale finalization, colours filled only from null) so
//! orchestrator behaviour can be exercised without a database. Also holds
//! the minimal pool/grid rows the propagation and scoring reads touch.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use super::models::{GridScoring, Page, SportsEvent, SportsTeam, SyncLog, SyncType};
use super::notify::Notifier;
use super::{SportsStore, StoreError};
use crate::scoring::{GridType, NumberSet, NumberSetConfig};
use crate::types::{EventStatus, League};

// ---------------------------------------------------------------------------
// Grid-side rows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PoolRecord {
    pub id: i64,
    pub token: String,
    pub grid_type: GridType,
    pub number_set_config: NumberSetConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRecord {
    pub id: i64,
    pub pool_id: i64,
    pub active: bool,
    pub home_team_name: Option<String>,
    pub away_team_name: Option<String>,
    pub home_numbers: Option<Vec<i32>>,
    pub away_numbers: Option<Vec<i32>>,
    pub sports_event_id: Option<i64>,
    pub payout_config: Option<NumberSetConfig>,
}

impl GridRecord {
    /// An active grid in `pool_id` with nothing drawn or linked.
    pub fn new(id: i64, pool_id: i64) -> Self {
        Self {
            id,
            pool_id,
            active: true,
            home_team_name: None,
            away_team_name: None,
            home_numbers: None,
            away_numbers: None,
            sports_event_id: None,
            payout_config: None,
        }
    }
}

/// Colours are stored with a leading `#`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridSettingsRecord {
    pub grid_id: i64,
    pub home_team_color_1: Option<String>,
    pub home_team_color_2: Option<String>,
    pub away_team_color_1: Option<String>,
    pub away_team_color_2: Option<String>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    teams: HashMap<(String, League), SportsTeam>,
    events: BTreeMap<i64, SportsEvent>,
    next_event_id: i64,
    sync_logs: Vec<SyncLog>,
    pools: HashMap<i64, PoolRecord>,
    grids: BTreeMap<i64, GridRecord>,
    grid_settings: HashMap<i64, GridSettingsRecord>,
    number_sets: Vec<NumberSet>,
    notifications: Vec<i64>,
}

impl State {
    fn sorted_events<F>(&self, keep: F) -> Vec<SportsEvent>
    where
        F: Fn(&SportsEvent) -> bool,
    {
        let mut events: Vec<SportsEvent> = self.events.values().filter(|e| keep(e)).cloned().collect();
        events.sort_by_key(|e| (e.event_date, e.id));
        events
    }

    fn event_teams(&self, event: &SportsEvent) -> Option<(&SportsTeam, &SportsTeam)> {
        let home = self.teams.get(&(event.home_team_id.clone(), event.league))?;
        let away = self.teams.get(&(event.away_team_id.clone(), event.league))?;
        Some((home, away))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    force_error: AtomicBool,
    fail_notifications: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every store call fail until cleared.
    pub fn set_force_error(&self, on: bool) {
        self.force_error.store(on, Ordering::SeqCst);
    }

    /// Make `notify_event_updated` fail until cleared.
    pub fn set_fail_notifications(&self, on: bool) {
        self.fail_notifications.store(on, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.force_error.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "forced memory store error".into(),
            )));
        }
        Ok(())
    }

    pub async fn insert_pool(&self, pool: PoolRecord) {
        self.state.lock().await.pools.insert(pool.id, pool);
    }

    pub async fn insert_grid(&self, grid: GridRecord) {
        self.state.lock().await.grids.insert(grid.id, grid);
    }

    pub async fn insert_grid_settings(&self, settings: GridSettingsRecord) {
        self.state.lock().await.grid_settings.insert(settings.grid_id, settings);
    }

    pub async fn insert_number_set(&self, set: NumberSet) {
        let mut state = self.state.lock().await;
        state
            .number_sets
            .retain(|s| !(s.grid_id == set.grid_id && s.set_type == set.set_type));
        state.number_sets.push(set);
    }

    pub async fn grid(&self, id: i64) -> Option<GridRecord> {
        self.state.lock().await.grids.get(&id).cloned()
    }

    pub async fn grid_settings(&self, grid_id: i64) -> Option<GridSettingsRecord> {
        self.state.lock().await.grid_settings.get(&grid_id).cloned()
    }

    /// Event ids notified so far, in order.
    pub async fn notifications(&self) -> Vec<i64> {
        self.state.lock().await.notifications.clone()
    }

    pub async fn sync_logs(&self) -> Vec<SyncLog> {
        self.state.lock().await.sync_logs.clone()
    }

    pub async fn all_events(&self) -> Vec<SportsEvent> {
        self.state.lock().await.sorted_events(|_| true)
    }
}

fn needs_score_update(event: &SportsEvent, now: DateTime<Utc>) -> bool {
    let day_ago = now - Duration::days(1);
    let soon = now + Duration::hours(2);
    let date = event.event_date;
    (event.status == EventStatus::InProgress && date >= day_ago)
        || (event.status == EventStatus::Scheduled && date >= now && date <= soon)
        || (event.status != EventStatus::Final && date >= day_ago && date < now)
}

fn paginate(events: Vec<SportsEvent>, offset: i64, limit: i64) -> Page<SportsEvent> {
    let total = events.len() as i64;
    let items = events
        .into_iter()
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect();
    Page { items, total }
}

fn is_linkable(event: &SportsEvent) -> bool {
    matches!(event.status, EventStatus::Scheduled | EventStatus::InProgress)
}

/// Set a null grid colour from a team colour. Returns whether it changed.
fn fill_colour(slot: &mut Option<String>, team_colour: Option<&str>) -> bool {
    match (slot.as_ref(), team_colour) {
        (None, Some(c)) => {
            *slot = Some(format!("#{c}"));
            true
        }
        _ => false,
    }
}

fn team_matches(team: &SportsTeam, needle: &str) -> bool {
    [&team.name, &team.full_name, &team.abbreviation]
        .iter()
        .any(|field| field.to_lowercase().contains(needle))
}

#[async_trait]
impl SportsStore for MemoryStore {
    async fn upsert_team(&self, team: &SportsTeam) -> Result<(), StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let key = (team.id.clone(), team.league);
        match state.teams.get_mut(&key) {
            Some(existing) => {
                existing.name = team.name.clone();
                existing.full_name = team.full_name.clone();
                existing.abbreviation = team.abbreviation.clone();
                existing.location = team.location.clone().or(existing.location.take());
                existing.color = team.color.clone().or(existing.color.take());
                existing.alternate_color =
                    team.alternate_color.clone().or(existing.alternate_color.take());
                existing.conference = team.conference.clone().or(existing.conference.take());
                existing.division = team.division.clone().or(existing.division.take());
                existing.modified = now;
            }
            None => {
                let mut row = team.clone();
                row.created = now;
                row.modified = now;
                state.teams.insert(key, row);
            }
        }
        Ok(())
    }

    async fn team_by_id(
        &self,
        id: &str,
        league: League,
    ) -> Result<Option<SportsTeam>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        Ok(state.teams.get(&(id.to_string(), league)).cloned())
    }

    async fn teams_by_league(&self, league: League) -> Result<Vec<SportsTeam>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let mut teams: Vec<SportsTeam> = state
            .teams
            .values()
            .filter(|t| t.league == league)
            .cloned()
            .collect();
        teams.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(teams)
    }

    async fn team_count(&self, league: Option<League>) -> Result<i64, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let n = state
            .teams
            .values()
            .filter(|t| league.map_or(true, |l| t.league == l))
            .count();
        Ok(n as i64)
    }

    async fn upsert_event(&self, event: &SportsEvent) -> Result<SportsEvent, StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();

        let existing = state
            .events
            .values()
            .find(|e| e.espn_id == event.espn_id)
            .map(|e| (e.id, e.created));

        let mut row = event.clone();
        row.modified = now;
        row.last_synced = now;
        match existing {
            Some((id, created)) => {
                row.id = id;
                row.created = created;
            }
            None => {
                state.next_event_id += 1;
                row.id = state.next_event_id;
                row.created = now;
            }
        }
        state.events.insert(row.id, row.clone());
        Ok(row)
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<SportsEvent>, StoreError> {
        self.check()?;
        Ok(self.state.lock().await.events.get(&id).cloned())
    }

    async fn event_by_external_id(
        &self,
        espn_id: &str,
    ) -> Result<Option<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        Ok(state.events.values().find(|e| e.espn_id == espn_id).cloned())
    }

    async fn events_by_league(
        &self,
        league: League,
        status: Option<EventStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let mut events =
            state.sorted_events(|e| e.league == league && status.map_or(true, |s| e.status == s));
        if let Some(limit) = limit {
            events.truncate(limit.max(0) as usize);
        }
        Ok(events)
    }

    async fn upcoming_events(
        &self,
        league: League,
        limit: i64,
    ) -> Result<Vec<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let now = Utc::now();
        let mut events = state.sorted_events(|e| {
            e.league == league && e.status == EventStatus::Scheduled && e.event_date >= now
        });
        events.truncate(limit.max(0) as usize);
        Ok(events)
    }

    async fn in_progress_events(
        &self,
        league: Option<League>,
    ) -> Result<Vec<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        Ok(state.sorted_events(|e| {
            e.status == EventStatus::InProgress && league.map_or(true, |l| e.league == l)
        }))
    }

    async fn linkable_events(
        &self,
        league: League,
        offset: i64,
        limit: i64,
    ) -> Result<Page<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let events = state.sorted_events(|e| e.league == league && is_linkable(e));
        Ok(paginate(events, offset, limit))
    }

    async fn search_linkable_events(
        &self,
        league: League,
        search: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Page<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let needle = search.to_lowercase();
        let events = state.sorted_events(|e| {
            if e.league != league || !is_linkable(e) {
                return false;
            }
            match state.event_teams(e) {
                Some((home, away)) => team_matches(home, &needle) || team_matches(away, &needle),
                None => false,
            }
        });
        Ok(paginate(events, offset, limit))
    }

    async fn events_needing_score_update(&self) -> Result<Vec<SportsEvent>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let now = Utc::now();
        Ok(state.sorted_events(|e| needs_score_update(e, now)))
    }

    async fn finalize_stale_events(&self) -> Result<u64, StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let cutoff = now - Duration::days(1);

        let mut affected = 0;
        for e in state.events.values_mut() {
            if e.status == EventStatus::Final || e.event_date >= cutoff {
                continue;
            }
            e.status = EventStatus::Final;
            e.modified = now;
            e.home_score = None;
            e.away_score = None;
            e.home_q1 = None;
            e.home_q2 = None;
            e.home_q3 = None;
            e.home_q4 = None;
            e.home_ot = None;
            e.away_q1 = None;
            e.away_q2 = None;
            e.away_q3 = None;
            e.away_q4 = None;
            e.away_ot = None;
            e.period = None;
            e.clock = None;
            e.status_detail = None;
            affected += 1;
        }
        Ok(affected)
    }

    async fn event_count(&self, league: Option<League>) -> Result<i64, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let n = state
            .events
            .values()
            .filter(|e| league.map_or(true, |l| e.league == l))
            .count();
        Ok(n as i64)
    }

    async fn start_sync(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<SyncLog, StoreError> {
        self.check()?;
        let mut state = self.state.lock().await;
        let log = SyncLog {
            id: state.sync_logs.len() as i64 + 1,
            sync_type,
            league,
            started_at: Utc::now(),
            completed_at: None,
            records_processed: 0,
            success: None,
            error_message: None,
        };
        state.sync_logs.push(log.clone());
        Ok(log)
    }

    async fn complete_sync(
        &self,
        log: &mut SyncLog,
        records_processed: i32,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.check()?;
        log.completed_at = Some(Utc::now());
        log.records_processed = records_processed;
        log.success = Some(success);
        log.error_message = error_message.filter(|m| !m.is_empty()).map(str::to_string);

        let mut state = self.state.lock().await;
        if let Some(row) = state.sync_logs.iter_mut().find(|l| l.id == log.id) {
            *row = log.clone();
        }
        Ok(())
    }

    async fn last_successful_sync(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<Option<SyncLog>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        Ok(state
            .sync_logs
            .iter()
            .filter(|l| l.sync_type == sync_type && l.success == Some(true))
            .filter(|l| league.map_or(true, |lg| l.league == Some(lg)))
            .max_by_key(|l| (l.completed_at, l.id))
            .cloned())
    }

    async fn sync_grids_from_event(&self, event_id: i64) -> Result<u64, StoreError> {
        self.check()?;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(event) = state.events.get(&event_id) else {
            return Ok(0);
        };
        let Some((home, away)) = state.event_teams(event) else {
            return Ok(0);
        };
        let (home, away) = (home.clone(), away.clone());

        let linked: Vec<i64> = state
            .grids
            .values()
            .filter(|g| g.active && g.sports_event_id == Some(event_id))
            .map(|g| g.id)
            .collect();

        let mut affected = 0;
        for grid_id in &linked {
            if let Some(grid) = state.grids.get_mut(grid_id) {
                let home_name = Some(home.full_name.clone());
                let away_name = Some(away.full_name.clone());
                if grid.home_team_name != home_name || grid.away_team_name != away_name {
                    grid.home_team_name = home_name;
                    grid.away_team_name = away_name;
                    affected += 1;
                }
            }
        }

        for grid_id in &linked {
            if let Some(settings) = state.grid_settings.get_mut(grid_id) {
                let filled = [
                    fill_colour(&mut settings.home_team_color_1, home.color.as_deref()),
                    fill_colour(&mut settings.home_team_color_2, home.alternate_color.as_deref()),
                    fill_colour(&mut settings.away_team_color_1, away.color.as_deref()),
                    fill_colour(&mut settings.away_team_color_2, away.alternate_color.as_deref()),
                ];
                if filled.contains(&true) {
                    affected += 1;
                }
            }
        }

        Ok(affected)
    }

    async fn pool_tokens_for_event(&self, event_id: i64) -> Result<Vec<String>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let tokens: BTreeSet<String> = state
            .grids
            .values()
            .filter(|g| g.active && g.sports_event_id == Some(event_id))
            .filter_map(|g| state.pools.get(&g.pool_id))
            .map(|p| p.token.clone())
            .collect();
        Ok(tokens.into_iter().collect())
    }

    async fn grid_scoring(&self, grid_id: i64) -> Result<Option<GridScoring>, StoreError> {
        self.check()?;
        let state = self.state.lock().await;
        let Some(grid) = state.grids.get(&grid_id) else {
            return Ok(None);
        };
        let Some(pool) = state.pools.get(&grid.pool_id) else {
            return Ok(None);
        };

        let event = grid
            .sports_event_id
            .and_then(|id| state.events.get(&id))
            .cloned();
        let number_sets = state
            .number_sets
            .iter()
            .filter(|s| s.grid_id == grid_id)
            .map(|s| (s.set_type, s.clone()))
            .collect();

        Ok(Some(GridScoring {
            grid_id,
            grid_type: pool.grid_type,
            config: grid.payout_config.unwrap_or(pool.number_set_config),
            home_team_name: grid.home_team_name.clone(),
            away_team_name: grid.away_team_name.clone(),
            home_numbers: grid.home_numbers.clone(),
            away_numbers: grid.away_numbers.clone(),
            event,
            number_sets,
        }))
    }
}

#[async_trait]
impl Notifier for MemoryStore {
    async fn notify_event_updated(&self, event_id: i64) -> Result<(), StoreError> {
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::Protocol(
                "notification channel closed".into(),
            )));
        }
        self.state.lock().await.notifications.push(event_id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
