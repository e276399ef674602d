//! Team & event store.
//!
//! The `SportsStore` trait is the persistence seam for the sync layer.
//! `PgStore` is the production implementation; `MemoryStore` mirrors the
//! SQL semantics in memory for tests and dry local runs.

pub mod memory;
pub mod models;
pub mod notify;
pub mod postgres;

use async_trait::async_trait;

use crate::types::{EventStatus, League};

pub use memory::MemoryStore;
pub use models::{GridScoring, Page, SportsEvent, SportsTeam, SyncLog, SyncType};
pub use notify::{Notifier, PgNotifier, EVENT_UPDATED_CHANNEL};
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store operation cancelled")]
    Cancelled,
}

#[async_trait]
pub trait SportsStore: Send + Sync {
    // -- Teams --

    /// Insert or update by `(id, league)`. Optional fields only overwrite
    /// when the incoming value is present.
    async fn upsert_team(&self, team: &SportsTeam) -> Result<(), StoreError>;

    async fn team_by_id(&self, id: &str, league: League)
        -> Result<Option<SportsTeam>, StoreError>;

    /// Ordered by name.
    async fn teams_by_league(&self, league: League) -> Result<Vec<SportsTeam>, StoreError>;

    /// `None` counts every league.
    async fn team_count(&self, league: Option<League>) -> Result<i64, StoreError>;

    // -- Events --

    /// Insert or update by `espn_id`, replacing every score field even with
    /// nulls. Returns the stored row with its id and timestamps.
    async fn upsert_event(&self, event: &SportsEvent) -> Result<SportsEvent, StoreError>;

    async fn event_by_id(&self, id: i64) -> Result<Option<SportsEvent>, StoreError>;

    async fn event_by_external_id(&self, espn_id: &str)
        -> Result<Option<SportsEvent>, StoreError>;

    /// Ordered by start time.
    async fn events_by_league(
        &self,
        league: League,
        status: Option<EventStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<SportsEvent>, StoreError>;

    /// Scheduled events starting now or later.
    async fn upcoming_events(&self, league: League, limit: i64)
        -> Result<Vec<SportsEvent>, StoreError>;

    async fn in_progress_events(&self, league: Option<League>)
        -> Result<Vec<SportsEvent>, StoreError>;

    /// Scheduled or in-progress events, one page plus the total.
    async fn linkable_events(
        &self,
        league: League,
        offset: i64,
        limit: i64,
    ) -> Result<Page<SportsEvent>, StoreError>;

    /// `linkable_events` narrowed to a case-insensitive substring match on
    /// either team's name, full name or abbreviation.
    async fn search_linkable_events(
        &self,
        league: League,
        search: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Page<SportsEvent>, StoreError>;

    /// The score-update hot window.
    async fn events_needing_score_update(&self) -> Result<Vec<SportsEvent>, StoreError>;

    /// Force non-final events older than a day to `final`, clearing their
    /// live fields. Returns rows affected.
    async fn finalize_stale_events(&self) -> Result<u64, StoreError>;

    async fn event_count(&self, league: Option<League>) -> Result<i64, StoreError>;

    // -- Sync log --

    async fn start_sync(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<SyncLog, StoreError>;

    /// Close `log`. An empty message is stored as null.
    async fn complete_sync(
        &self,
        log: &mut SyncLog,
        records_processed: i32,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn last_successful_sync(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<Option<SyncLog>, StoreError>;

    // -- Grids --

    /// Copy team names (when different) and colours (when unset) from the
    /// event's teams onto every active grid linked to it. Returns the sum
    /// of rows touched by both updates.
    async fn sync_grids_from_event(&self, event_id: i64) -> Result<u64, StoreError>;

    /// Distinct tokens of pools with an active grid linked to the event.
    async fn pool_tokens_for_event(&self, event_id: i64) -> Result<Vec<String>, StoreError>;

    async fn grid_scoring(&self, grid_id: i64) -> Result<Option<GridScoring>, StoreError>;
}
