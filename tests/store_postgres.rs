//! `PgStore` and `PgNotifier` against a real database.
//!
//! Runs only when `TEST_DATABASE_URL` is set. Each test builds
//! `sql/schema.sql` in its own schema and drops it afterwards.

use chrono::{Duration, Utc};
use sqlx::postgres::{PgConnectOptions, PgListener, PgPool, PgPoolOptions};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sqmgr_sports::scoring::{GridType, NumberSetConfig, NumberSetType};
use sqmgr_sports::store::{
    Notifier, PgNotifier, PgStore, SportsEvent, SportsStore, SportsTeam, SyncType,
    EVENT_UPDATED_CHANNEL,
};
use sqmgr_sports::types::{EventStatus, League};

const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

struct TestDb {
    pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl TestDb {
    async fn create() -> Option<Self> {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set, skipping");
            return None;
        };
        let schema = format!("sqmgr_test_{}", Uuid::new_v4().simple());

        let admin = PgPool::connect(&url).await.unwrap();
        sqlx::raw_sql(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .unwrap();

        let options: PgConnectOptions = url.parse().unwrap();
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options.options([("search_path", schema.as_str())]))
            .await
            .unwrap();
        sqlx::raw_sql(SCHEMA_SQL).execute(&pool).await.unwrap();

        Some(Self { pool, admin, schema })
    }

    fn store(&self) -> PgStore {
        PgStore::new(self.pool.clone(), CancellationToken::new())
    }

    async fn teardown(self) {
        self.pool.close().await;
        sqlx::raw_sql(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .unwrap();
    }
}

fn team(id: &str, name: &str, color: Option<&str>) -> SportsTeam {
    let now = Utc::now();
    SportsTeam {
        id: id.into(),
        league: League::Nfl,
        name: name.into(),
        full_name: format!("Full {name}"),
        abbreviation: name[..3].to_uppercase(),
        location: Some("Somewhere".into()),
        color: color.map(str::to_string),
        alternate_color: None,
        conference: None,
        division: None,
        created: now,
        modified: now,
    }
}

fn event(espn_id: &str, status: EventStatus, offset: Duration) -> SportsEvent {
    let now = Utc::now();
    SportsEvent {
        id: 0,
        espn_id: espn_id.into(),
        league: League::Nfl,
        name: None,
        home_team_id: "1".into(),
        away_team_id: "2".into(),
        event_date: now + offset,
        season: 2024,
        week: Some(1),
        postseason: false,
        venue: None,
        status,
        status_detail: None,
        period: Some(0),
        clock: None,
        home_score: None,
        away_score: None,
        home_q1: None,
        home_q2: None,
        home_q3: None,
        home_q4: None,
        home_ot: None,
        away_q1: None,
        away_q2: None,
        away_q3: None,
        away_q4: None,
        away_ot: None,
        created: now,
        modified: now,
        last_synced: now,
    }
}

// -- Team tests --

#[tokio::test]
async fn test_team_upsert_keeps_stored_optionals() {
    let Some(db) = TestDb::create().await else { return };
    let store = db.store();

    store.upsert_team(&team("1", "Chiefs", Some("e31837"))).await.unwrap();
    let mut bare = team("1", "Chiefs", None);
    bare.location = None;
    bare.full_name = "Kansas City Chiefs".into();
    store.upsert_team(&bare).await.unwrap();

    let stored = store.team_by_id("1", League::Nfl).await.unwrap().unwrap();
    assert_eq!(stored.full_name, "Kansas City Chiefs");
    assert_eq!(stored.color.as_deref(), Some("e31837"));
    assert_eq!(stored.location.as_deref(), Some("Somewhere"));
    assert_eq!(store.team_count(Some(League::Nfl)).await.unwrap(), 1);
    assert_eq!(store.team_count(Some(League::Nba)).await.unwrap(), 0);

    db.teardown().await;
}

// -- Event tests --

#[tokio::test]
async fn test_event_upsert_and_hot_window() {
    let Some(db) = TestDb::create().await else { return };
    let store = db.store();

    let mut live = event("live", EventStatus::InProgress, Duration::hours(-1));
    live.home_q1 = Some(7);
    let created = store.upsert_event(&live).await.unwrap();
    assert!(created.id > 0);

    live.home_q1 = None;
    let updated = store.upsert_event(&live).await.unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.home_q1, None);

    store
        .upsert_event(&event("soon", EventStatus::Scheduled, Duration::hours(1)))
        .await
        .unwrap();
    store
        .upsert_event(&event("later", EventStatus::Scheduled, Duration::days(2)))
        .await
        .unwrap();
    store
        .upsert_event(&event("stale", EventStatus::InProgress, Duration::days(-3)))
        .await
        .unwrap();

    let hot: Vec<String> = store
        .events_needing_score_update()
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.espn_id)
        .collect();
    assert_eq!(hot, vec!["live".to_string(), "soon".to_string()]);

    assert_eq!(store.finalize_stale_events().await.unwrap(), 1);
    assert_eq!(store.finalize_stale_events().await.unwrap(), 0);
    let stale = store.event_by_external_id("stale").await.unwrap().unwrap();
    assert_eq!(stale.status, EventStatus::Final);
    assert_eq!(store.event_count(None).await.unwrap(), 4);

    db.teardown().await;
}

#[tokio::test]
async fn test_search_linkable_events() {
    let Some(db) = TestDb::create().await else { return };
    let store = db.store();

    store.upsert_team(&team("1", "Chiefs", None)).await.unwrap();
    store.upsert_team(&team("2", "Bills", None)).await.unwrap();
    store
        .upsert_event(&event("401", EventStatus::Scheduled, Duration::days(1)))
        .await
        .unwrap();

    let page = store
        .search_linkable_events(League::Nfl, "bil", 0, 10)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].espn_id, "401");

    let none = store
        .search_linkable_events(League::Nfl, "%", 0, 10)
        .await
        .unwrap();
    assert_eq!(none.total, 0);

    db.teardown().await;
}

// -- Sync log tests --

#[tokio::test]
async fn test_sync_log_lifecycle() {
    let Some(db) = TestDb::create().await else { return };
    let store = db.store();

    let mut log = store.start_sync(SyncType::Teams, Some(League::Nba)).await.unwrap();
    assert!(!log.is_complete());
    store.complete_sync(&mut log, 30, true, None).await.unwrap();
    assert!(log.is_complete());

    let mut failed = store.start_sync(SyncType::Teams, Some(League::Nba)).await.unwrap();
    store
        .complete_sync(&mut failed, 0, false, Some("ESPN returned 503"))
        .await
        .unwrap();

    let last = store
        .last_successful_sync(SyncType::Teams, Some(League::Nba))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(last.id, log.id);
    assert_eq!(last.records_processed, 30);
    assert!(store
        .last_successful_sync(SyncType::Scores, None)
        .await
        .unwrap()
        .is_none());

    db.teardown().await;
}

// -- Grid tests --

#[tokio::test]
async fn test_grid_propagation_and_scoring() {
    let Some(db) = TestDb::create().await else { return };
    let store = db.store();

    store.upsert_team(&team("1", "Chiefs", Some("e31837"))).await.unwrap();
    store.upsert_team(&team("2", "Bills", Some("00338d"))).await.unwrap();
    let ev = store
        .upsert_event(&event("401", EventStatus::Scheduled, Duration::days(1)))
        .await
        .unwrap();

    let pool_id: i64 = sqlx::query_scalar(
        "INSERT INTO pools (token, grid_type, number_set_config) VALUES ('tok', 'std25', 'hf') RETURNING id",
    )
    .fetch_one(&db.pool)
    .await
    .unwrap();
    let grid_id: i64 = sqlx::query_scalar(
        "INSERT INTO grids (pool_id, sports_event_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(pool_id)
    .bind(ev.id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    sqlx::query("INSERT INTO grid_settings (grid_id) VALUES ($1)")
        .bind(grid_id)
        .execute(&db.pool)
        .await
        .unwrap();
    sqlx::query(
        "INSERT INTO grid_number_sets (grid_id, set_type, home_numbers, away_numbers) \
         VALUES ($1, 'half', '{0,1,2,3,4,5,6,7,8,9}', '{9,8,7,6,5,4,3,2,1,0}')",
    )
    .bind(grid_id)
    .execute(&db.pool)
    .await
    .unwrap();

    // Names + colours, then nothing left to change.
    assert_eq!(store.sync_grids_from_event(ev.id).await.unwrap(), 2);
    assert_eq!(store.sync_grids_from_event(ev.id).await.unwrap(), 0);

    let colour: Option<String> =
        sqlx::query_scalar("SELECT home_team_color_1 FROM grid_settings WHERE grid_id = $1")
            .bind(grid_id)
            .fetch_one(&db.pool)
            .await
            .unwrap();
    assert_eq!(colour.as_deref(), Some("#e31837"));

    assert_eq!(store.pool_tokens_for_event(ev.id).await.unwrap(), vec!["tok".to_string()]);

    let scoring = store.grid_scoring(grid_id).await.unwrap().unwrap();
    assert_eq!(scoring.grid_type, GridType::Std25);
    assert_eq!(scoring.config, NumberSetConfig::HalfFinal);
    assert_eq!(scoring.home_team_name.as_deref(), Some("Full Chiefs"));
    assert_eq!(scoring.event.map(|e| e.id), Some(ev.id));
    let half = &scoring.number_sets[&NumberSetType::Half];
    assert_eq!(half.away_numbers.as_ref().map(|n| n[0]), Some(9));

    db.teardown().await;
}

#[tokio::test]
async fn test_grid_colours_fill_only_null_columns() {
    let Some(db) = TestDb::create().await else { return };
    let store = db.store();

    let mut home = team("1", "Chiefs", Some("e31837"));
    home.alternate_color = Some("445566".into());
    store.upsert_team(&home).await.unwrap();
    store.upsert_team(&team("2", "Bills", Some("00338d"))).await.unwrap();
    let ev = store
        .upsert_event(&event("401", EventStatus::Scheduled, Duration::days(1)))
        .await
        .unwrap();

    let pool_id: i64 =
        sqlx::query_scalar("INSERT INTO pools (token) VALUES ('tok') RETURNING id")
            .fetch_one(&db.pool)
            .await
            .unwrap();
    let grid_id: i64 = sqlx::query_scalar(
        "INSERT INTO grids (pool_id, sports_event_id) VALUES ($1, $2) RETURNING id",
    )
    .bind(pool_id)
    .bind(ev.id)
    .fetch_one(&db.pool)
    .await
    .unwrap();
    sqlx::query(
        "INSERT INTO grid_settings (grid_id, home_team_color_2, away_team_color_2) \
         VALUES ($1, '#abcdef', '#fedcba')",
    )
    .bind(grid_id)
    .execute(&db.pool)
    .await
    .unwrap();

    assert_eq!(store.sync_grids_from_event(ev.id).await.unwrap(), 2);
    assert_eq!(store.sync_grids_from_event(ev.id).await.unwrap(), 0);

    let colours: (Option<String>, Option<String>, Option<String>, Option<String>) =
        sqlx::query_as(
            "SELECT home_team_color_1, home_team_color_2, away_team_color_1, away_team_color_2 \
             FROM grid_settings WHERE grid_id = $1",
        )
        .bind(grid_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(colours.0.as_deref(), Some("#e31837"));
    assert_eq!(colours.1.as_deref(), Some("#abcdef"));
    assert_eq!(colours.2.as_deref(), Some("#00338d"));
    assert_eq!(colours.3.as_deref(), Some("#fedcba"));

    db.teardown().await;
}

// -- Notification tests --

#[tokio::test]
async fn test_notifier_publishes_event_id() {
    let Some(db) = TestDb::create().await else { return };

    let mut listener = PgListener::connect_with(&db.pool).await.unwrap();
    listener.listen(EVENT_UPDATED_CHANNEL).await.unwrap();

    let notifier = PgNotifier::new(db.pool.clone(), CancellationToken::new());
    notifier.notify_event_updated(42).await.unwrap();

    let notification = tokio::time::timeout(std::time::Duration::from_secs(5), listener.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(notification.channel(), EVENT_UPDATED_CHANNEL);
    assert_eq!(notification.payload(), "42");

    drop(listener);
    db.teardown().await;
}
