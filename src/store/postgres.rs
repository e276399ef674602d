//! PostgreSQL implementation of [`SportsStore`].
//!
//! Runtime-checked `sqlx::query_as` throughout, so the crate builds without
//! a live database. Every round-trip races the store's cancellation token;
//! multi-statement writes run in a transaction that rolls back on drop.

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::models::{GridScoring, Page, SportsEvent, SportsTeam, SyncLog, SyncType};
use super::{SportsStore, StoreError};
use crate::scoring::{GridType, NumberSet, NumberSetConfig};
use crate::types::{EventStatus, League};

// ---------------------------------------------------------------------------
// SQL
// ---------------------------------------------------------------------------

const TEAM_COLUMNS: &str = "id, league, name, full_name, abbreviation, location, color, \
    alternate_color, conference, division, created, modified";

const EVENT_COLUMNS: &str = "id, espn_id, league, name, home_team_id, away_team_id, \
    event_date, season, week, postseason, venue, status, status_detail, period, clock, \
    home_score, away_score, home_q1, home_q2, home_q3, home_q4, home_ot, \
    away_q1, away_q2, away_q3, away_q4, away_ot, created, modified, last_synced";

/// `EVENT_COLUMNS` qualified by the `e` alias, for joins.
const EVENT_COLUMNS_E: &str = "e.id, e.espn_id, e.league, e.name, e.home_team_id, \
    e.away_team_id, e.event_date, e.season, e.week, e.postseason, e.venue, e.status, \
    e.status_detail, e.period, e.clock, e.home_score, e.away_score, \
    e.home_q1, e.home_q2, e.home_q3, e.home_q4, e.home_ot, \
    e.away_q1, e.away_q2, e.away_q3, e.away_q4, e.away_ot, \
    e.created, e.modified, e.last_synced";

const SYNC_LOG_COLUMNS: &str = "id, sync_type, league, started_at, completed_at, \
    records_processed, success, error_message";

const UPSERT_TEAM: &str = r#"
    INSERT INTO sports_teams (
        id, league, name, full_name, abbreviation, location, color, alternate_color,
        conference, division, created, modified
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW())
    ON CONFLICT (id, league) DO UPDATE SET
        name = EXCLUDED.name,
        full_name = EXCLUDED.full_name,
        abbreviation = EXCLUDED.abbreviation,
        location = COALESCE(EXCLUDED.location, sports_teams.location),
        color = COALESCE(EXCLUDED.color, sports_teams.color),
        alternate_color = COALESCE(EXCLUDED.alternate_color, sports_teams.alternate_color),
        conference = COALESCE(EXCLUDED.conference, sports_teams.conference),
        division = COALESCE(EXCLUDED.division, sports_teams.division),
        modified = NOW()
"#;

const UPSERT_EVENT: &str = r#"
    INSERT INTO sports_events (
        espn_id, league, name, home_team_id, away_team_id, event_date, season, week,
        postseason, venue, status, status_detail, period, clock, home_score, away_score,
        home_q1, home_q2, home_q3, home_q4, home_ot,
        away_q1, away_q2, away_q3, away_q4, away_ot,
        created, modified, last_synced
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
        $17, $18, $19, $20, $21, $22, $23, $24, $25, $26,
        NOW(), NOW(), NOW()
    )
    ON CONFLICT (espn_id) DO UPDATE SET
        league = EXCLUDED.league,
        name = EXCLUDED.name,
        home_team_id = EXCLUDED.home_team_id,
        away_team_id = EXCLUDED.away_team_id,
        event_date = EXCLUDED.event_date,
        season = EXCLUDED.season,
        week = EXCLUDED.week,
        postseason = EXCLUDED.postseason,
        venue = EXCLUDED.venue,
        status = EXCLUDED.status,
        status_detail = EXCLUDED.status_detail,
        period = EXCLUDED.period,
        clock = EXCLUDED.clock,
        home_score = EXCLUDED.home_score,
        away_score = EXCLUDED.away_score,
        home_q1 = EXCLUDED.home_q1,
        home_q2 = EXCLUDED.home_q2,
        home_q3 = EXCLUDED.home_q3,
        home_q4 = EXCLUDED.home_q4,
        home_ot = EXCLUDED.home_ot,
        away_q1 = EXCLUDED.away_q1,
        away_q2 = EXCLUDED.away_q2,
        away_q3 = EXCLUDED.away_q3,
        away_q4 = EXCLUDED.away_q4,
        away_ot = EXCLUDED.away_ot,
        modified = NOW(),
        last_synced = NOW()
"#;

const NEEDING_SCORE_UPDATE_FILTER: &str = r#"
    (status = 'in_progress' AND event_date >= NOW() - INTERVAL '1 day')
    OR (status = 'scheduled' AND event_date BETWEEN NOW() AND NOW() + INTERVAL '2 hours')
    OR (status != 'final' AND event_date >= NOW() - INTERVAL '1 day' AND event_date < NOW())
"#;

const FINALIZE_STALE: &str = r#"
    UPDATE sports_events
    SET status = 'final',
        modified = NOW(),
        home_score = NULL, away_score = NULL,
        home_q1 = NULL, home_q2 = NULL, home_q3 = NULL, home_q4 = NULL, home_ot = NULL,
        away_q1 = NULL, away_q2 = NULL, away_q3 = NULL, away_q4 = NULL, away_ot = NULL,
        period = NULL, clock = NULL, status_detail = NULL
    WHERE status != 'final'
      AND event_date < NOW() - INTERVAL '1 day'
"#;

const SEARCH_LINKABLE_FROM: &str = r#"
    FROM sports_events e
    JOIN sports_teams ht ON ht.id = e.home_team_id AND ht.league = e.league
    JOIN sports_teams at ON at.id = e.away_team_id AND at.league = e.league
    WHERE e.league = $1
      AND e.status IN ('scheduled', 'in_progress')
      AND (ht.name ILIKE $2 OR ht.full_name ILIKE $2 OR ht.abbreviation ILIKE $2
        OR at.name ILIKE $2 OR at.full_name ILIKE $2 OR at.abbreviation ILIKE $2)
"#;

const SYNC_GRID_NAMES: &str = r#"
    UPDATE grids g
    SET home_team_name = st_home.full_name,
        away_team_name = st_away.full_name,
        modified = NOW()
    FROM sports_events se
    JOIN sports_teams st_home ON se.home_team_id = st_home.id AND se.league = st_home.league
    JOIN sports_teams st_away ON se.away_team_id = st_away.id AND se.league = st_away.league
    WHERE g.sports_event_id = se.id
      AND se.id = $1
      AND g.state = 'active'
      AND (g.home_team_name IS DISTINCT FROM st_home.full_name
           OR g.away_team_name IS DISTINCT FROM st_away.full_name)
"#;

// Each colour is filled from null only; a set colour is never overwritten.
const SYNC_GRID_COLOURS: &str = r#"
    UPDATE grid_settings gs
    SET home_team_color_1 = COALESCE(gs.home_team_color_1, '#' || st_home.color),
        home_team_color_2 = COALESCE(gs.home_team_color_2, '#' || st_home.alternate_color),
        away_team_color_1 = COALESCE(gs.away_team_color_1, '#' || st_away.color),
        away_team_color_2 = COALESCE(gs.away_team_color_2, '#' || st_away.alternate_color),
        modified = NOW()
    FROM grids g
    JOIN sports_events se ON g.sports_event_id = se.id
    JOIN sports_teams st_home ON se.home_team_id = st_home.id AND se.league = st_home.league
    JOIN sports_teams st_away ON se.away_team_id = st_away.id AND se.league = st_away.league
    WHERE gs.grid_id = g.id
      AND se.id = $1
      AND g.state = 'active'
      AND ((gs.home_team_color_1 IS NULL AND st_home.color IS NOT NULL)
        OR (gs.home_team_color_2 IS NULL AND st_home.alternate_color IS NOT NULL)
        OR (gs.away_team_color_1 IS NULL AND st_away.color IS NOT NULL)
        OR (gs.away_team_color_2 IS NULL AND st_away.alternate_color IS NOT NULL))
"#;

const GRID_SCORING: &str = r#"
    SELECT g.id AS grid_id,
           p.grid_type,
           COALESCE(g.payout_config, p.number_set_config) AS config,
           g.home_team_name,
           g.away_team_name,
           g.home_numbers,
           g.away_numbers,
           g.sports_event_id
    FROM grids g
    JOIN pools p ON p.id = g.pool_id
    WHERE g.id = $1
"#;

#[derive(sqlx::FromRow)]
struct GridScoringRow {
    grid_id: i64,
    #[sqlx(try_from = "String")]
    grid_type: GridType,
    #[sqlx(try_from = "String")]
    config: NumberSetConfig,
    home_team_name: Option<String>,
    away_team_name: Option<String>,
    home_numbers: Option<Vec<i32>>,
    away_numbers: Option<Vec<i32>>,
    sports_event_id: Option<i64>,
}

/// Escape `LIKE` wildcards so user input matches literally.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

pub struct PgStore {
    pool: PgPool,
    cancel: CancellationToken,
}

impl PgStore {
    pub fn new(pool: PgPool, cancel: CancellationToken) -> Self {
        Self { pool, cancel }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn guard<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StoreError::Cancelled),
            res = fut => res.map_err(StoreError::from),
        }
    }
}

#[async_trait]
impl SportsStore for PgStore {
    async fn upsert_team(&self, team: &SportsTeam) -> Result<(), StoreError> {
        let q = sqlx::query(UPSERT_TEAM)
            .bind(&team.id)
            .bind(team.league.as_str())
            .bind(&team.name)
            .bind(&team.full_name)
            .bind(&team.abbreviation)
            .bind(&team.location)
            .bind(&team.color)
            .bind(&team.alternate_color)
            .bind(&team.conference)
            .bind(&team.division)
            .execute(&self.pool);
        self.guard(q).await?;
        Ok(())
    }

    async fn team_by_id(
        &self,
        id: &str,
        league: League,
    ) -> Result<Option<SportsTeam>, StoreError> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM sports_teams WHERE id = $1 AND league = $2");
        let q = sqlx::query_as::<_, SportsTeam>(&sql)
            .bind(id)
            .bind(league.as_str())
            .fetch_optional(&self.pool);
        self.guard(q).await
    }

    async fn teams_by_league(&self, league: League) -> Result<Vec<SportsTeam>, StoreError> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM sports_teams WHERE league = $1 ORDER BY name");
        let q = sqlx::query_as::<_, SportsTeam>(&sql)
            .bind(league.as_str())
            .fetch_all(&self.pool);
        self.guard(q).await
    }

    async fn team_count(&self, league: Option<League>) -> Result<i64, StoreError> {
        let q = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sports_teams WHERE ($1::text IS NULL OR league = $1)",
        )
        .bind(league.map(League::as_str))
        .fetch_one(&self.pool);
        self.guard(q).await
    }

    async fn upsert_event(&self, event: &SportsEvent) -> Result<SportsEvent, StoreError> {
        let sql = format!("{UPSERT_EVENT} RETURNING {EVENT_COLUMNS}");
        let q = sqlx::query_as::<_, SportsEvent>(&sql)
            .bind(&event.espn_id)
            .bind(event.league.as_str())
            .bind(&event.name)
            .bind(&event.home_team_id)
            .bind(&event.away_team_id)
            .bind(event.event_date)
            .bind(event.season)
            .bind(event.week)
            .bind(event.postseason)
            .bind(&event.venue)
            .bind(event.status.as_str())
            .bind(&event.status_detail)
            .bind(event.period)
            .bind(&event.clock)
            .bind(event.home_score)
            .bind(event.away_score)
            .bind(event.home_q1)
            .bind(event.home_q2)
            .bind(event.home_q3)
            .bind(event.home_q4)
            .bind(event.home_ot)
            .bind(event.away_q1)
            .bind(event.away_q2)
            .bind(event.away_q3)
            .bind(event.away_q4)
            .bind(event.away_ot)
            .fetch_one(&self.pool);
        let stored = self.guard(q).await?;
        debug!(espn_id = %stored.espn_id, id = stored.id, "Upserted event");
        Ok(stored)
    }

    async fn event_by_id(&self, id: i64) -> Result<Option<SportsEvent>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM sports_events WHERE id = $1");
        let q = sqlx::query_as::<_, SportsEvent>(&sql)
            .bind(id)
            .fetch_optional(&self.pool);
        self.guard(q).await
    }

    async fn event_by_external_id(
        &self,
        espn_id: &str,
    ) -> Result<Option<SportsEvent>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM sports_events WHERE espn_id = $1");
        let q = sqlx::query_as::<_, SportsEvent>(&sql)
            .bind(espn_id)
            .fetch_optional(&self.pool);
        self.guard(q).await
    }

    async fn events_by_league(
        &self,
        league: League,
        status: Option<EventStatus>,
        limit: Option<i64>,
    ) -> Result<Vec<SportsEvent>, StoreError> {
        // LIMIT NULL is LIMIT ALL
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM sports_events \
             WHERE league = $1 AND ($2::text IS NULL OR status = $2) \
             ORDER BY event_date ASC LIMIT $3"
        );
        let q = sqlx::query_as::<_, SportsEvent>(&sql)
            .bind(league.as_str())
            .bind(status.map(EventStatus::as_str))
            .bind(limit)
            .fetch_all(&self.pool);
        self.guard(q).await
    }

    async fn upcoming_events(
        &self,
        league: League,
        limit: i64,
    ) -> Result<Vec<SportsEvent>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM sports_events \
             WHERE league = $1 AND status = 'scheduled' AND event_date >= NOW() \
             ORDER BY event_date ASC LIMIT $2"
        );
        let q = sqlx::query_as::<_, SportsEvent>(&sql)
            .bind(league.as_str())
            .bind(limit)
            .fetch_all(&self.pool);
        self.guard(q).await
    }

    async fn in_progress_events(
        &self,
        league: Option<League>,
    ) -> Result<Vec<SportsEvent>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM sports_events \
             WHERE status = 'in_progress' AND ($1::text IS NULL OR league = $1) \
             ORDER BY event_date ASC"
        );
        let q = sqlx::query_as::<_, SportsEvent>(&sql)
            .bind(league.map(League::as_str))
            .fetch_all(&self.pool);
        self.guard(q).await
    }

    async fn linkable_events(
        &self,
        league: League,
        offset: i64,
        limit: i64,
    ) -> Result<Page<SportsEvent>, StoreError> {
        const FILTER: &str = "WHERE league = $1 AND status IN ('scheduled', 'in_progress')";
        let count_sql = format!("SELECT COUNT(*) FROM sports_events {FILTER}");
        let data_sql = format!(
            "SELECT {EVENT_COLUMNS} FROM sports_events {FILTER} \
             ORDER BY event_date ASC OFFSET $2 LIMIT $3"
        );

        let total = self
            .guard(
                sqlx::query_scalar::<_, i64>(&count_sql)
                    .bind(league.as_str())
                    .fetch_one(&self.pool),
            )
            .await?;
        let items = self
            .guard(
                sqlx::query_as::<_, SportsEvent>(&data_sql)
                    .bind(league.as_str())
                    .bind(offset)
                    .bind(limit)
                    .fetch_all(&self.pool),
            )
            .await?;
        Ok(Page { items, total })
    }

    async fn search_linkable_events(
        &self,
        league: League,
        search: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Page<SportsEvent>, StoreError> {
        let pattern = like_pattern(search);
        let count_sql = format!("SELECT COUNT(*) {SEARCH_LINKABLE_FROM}");
        let data_sql = format!(
            "SELECT {EVENT_COLUMNS_E} {SEARCH_LINKABLE_FROM} \
             ORDER BY e.event_date ASC OFFSET $3 LIMIT $4"
        );

        let total = self
            .guard(
                sqlx::query_scalar::<_, i64>(&count_sql)
                    .bind(league.as_str())
                    .bind(&pattern)
                    .fetch_one(&self.pool),
            )
            .await?;
        let items = self
            .guard(
                sqlx::query_as::<_, SportsEvent>(&data_sql)
                    .bind(league.as_str())
                    .bind(&pattern)
                    .bind(offset)
                    .bind(limit)
                    .fetch_all(&self.pool),
            )
            .await?;
        Ok(Page { items, total })
    }

    async fn events_needing_score_update(&self) -> Result<Vec<SportsEvent>, StoreError> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM sports_events WHERE {NEEDING_SCORE_UPDATE_FILTER} \
             ORDER BY event_date ASC"
        );
        let q = sqlx::query_as::<_, SportsEvent>(&sql).fetch_all(&self.pool);
        self.guard(q).await
    }

    async fn finalize_stale_events(&self) -> Result<u64, StoreError> {
        let q = sqlx::query(FINALIZE_STALE).execute(&self.pool);
        Ok(self.guard(q).await?.rows_affected())
    }

    async fn event_count(&self, league: Option<League>) -> Result<i64, StoreError> {
        let q = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM sports_events WHERE ($1::text IS NULL OR league = $1)",
        )
        .bind(league.map(League::as_str))
        .fetch_one(&self.pool);
        self.guard(q).await
    }

    async fn start_sync(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<SyncLog, StoreError> {
        let sql = format!(
            "INSERT INTO sports_sync_log (sync_type, league, started_at) \
             VALUES ($1, $2, NOW()) RETURNING {SYNC_LOG_COLUMNS}"
        );
        let q = sqlx::query_as::<_, SyncLog>(&sql)
            .bind(sync_type.as_str())
            .bind(league.map(League::as_str))
            .fetch_one(&self.pool);
        self.guard(q).await
    }

    async fn complete_sync(
        &self,
        log: &mut SyncLog,
        records_processed: i32,
        success: bool,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let error_message = error_message.filter(|m| !m.is_empty());
        let q = sqlx::query_scalar::<_, DateTime<Utc>>(
            "UPDATE sports_sync_log \
             SET completed_at = NOW(), records_processed = $1, success = $2, error_message = $3 \
             WHERE id = $4 RETURNING completed_at",
        )
        .bind(records_processed)
        .bind(success)
        .bind(error_message)
        .bind(log.id)
        .fetch_one(&self.pool);
        let completed_at = self.guard(q).await?;

        log.completed_at = Some(completed_at);
        log.records_processed = records_processed;
        log.success = Some(success);
        log.error_message = error_message.map(str::to_string);
        Ok(())
    }

    async fn last_successful_sync(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<Option<SyncLog>, StoreError> {
        let sql = format!(
            "SELECT {SYNC_LOG_COLUMNS} FROM sports_sync_log \
             WHERE sync_type = $1 AND ($2::text IS NULL OR league = $2) AND success = true \
             ORDER BY completed_at DESC LIMIT 1"
        );
        let q = sqlx::query_as::<_, SyncLog>(&sql)
            .bind(sync_type.as_str())
            .bind(league.map(League::as_str))
            .fetch_optional(&self.pool);
        self.guard(q).await
    }

    async fn sync_grids_from_event(&self, event_id: i64) -> Result<u64, StoreError> {
        let pool = &self.pool;
        let run = async move {
            let mut tx = pool.begin().await?;
            let names = sqlx::query(SYNC_GRID_NAMES)
                .bind(event_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            let colours = sqlx::query(SYNC_GRID_COLOURS)
                .bind(event_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tx.commit().await?;
            Ok::<_, sqlx::Error>(names + colours)
        };
        self.guard(run).await
    }

    async fn pool_tokens_for_event(&self, event_id: i64) -> Result<Vec<String>, StoreError> {
        let q = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT p.token FROM pools p \
             JOIN grids g ON g.pool_id = p.id \
             WHERE g.sports_event_id = $1 AND g.state = 'active' \
             ORDER BY p.token",
        )
        .bind(event_id)
        .fetch_all(&self.pool);
        self.guard(q).await
    }

    async fn grid_scoring(&self, grid_id: i64) -> Result<Option<GridScoring>, StoreError> {
        let q = sqlx::query_as::<_, GridScoringRow>(GRID_SCORING)
            .bind(grid_id)
            .fetch_optional(&self.pool);
        let Some(row) = self.guard(q).await? else {
            return Ok(None);
        };

        let event = match row.sports_event_id {
            Some(id) => self.event_by_id(id).await?,
            None => None,
        };

        let q = sqlx::query_as::<_, NumberSet>(
            "SELECT grid_id, set_type, home_numbers, away_numbers, manual_draw \
             FROM grid_number_sets WHERE grid_id = $1",
        )
        .bind(grid_id)
        .fetch_all(&self.pool);
        let number_sets: HashMap<_, _> = self
            .guard(q)
            .await?
            .into_iter()
            .map(|ns| (ns.set_type, ns))
            .collect();

        Ok(Some(GridScoring {
            grid_id: row.grid_id,
            grid_type: row.grid_type,
            config: row.config,
            home_team_name: row.home_team_name,
            away_team_name: row.away_team_name,
            home_numbers: row.home_numbers,
            away_numbers: row.away_numbers,
            event,
            number_sets,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("chiefs"), "%chiefs%");
        assert_eq!(like_pattern("100%_"), "%100\\%\\_%");
        assert_eq!(like_pattern(r"a\b"), r"%a\\b%");
    }

    #[test]
    fn test_prefixed_columns_match() {
        let plain: Vec<&str> = EVENT_COLUMNS.split(',').map(str::trim).collect();
        let prefixed: Vec<String> = EVENT_COLUMNS_E
            .split(',')
            .map(|c| c.trim().trim_start_matches("e.").to_string())
            .collect();
        assert_eq!(plain, prefixed);
    }
}
