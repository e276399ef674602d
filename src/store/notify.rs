//! Change notifications over Postgres `LISTEN`/`NOTIFY`.
//!
//! Delivery is best-effort. Listeners treat a notification as a hint to
//! refetch the event, never as the event's state.

use async_trait::async_trait;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::StoreError;

pub const EVENT_UPDATED_CHANNEL: &str = "sports_event_updated";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publish `event_id` on [`EVENT_UPDATED_CHANNEL`].
    async fn notify_event_updated(&self, event_id: i64) -> Result<(), StoreError>;
}

pub struct PgNotifier {
    pool: PgPool,
    cancel: CancellationToken,
}

impl PgNotifier {
    pub fn new(pool: PgPool, cancel: CancellationToken) -> Self {
        Self { pool, cancel }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify_event_updated(&self, event_id: i64) -> Result<(), StoreError> {
        let send = sqlx::query("SELECT pg_notify($1, $2)")
            .bind(EVENT_UPDATED_CHANNEL)
            .bind(event_id.to_string())
            .execute(&self.pool);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StoreError::Cancelled),
            res = send => { res?; }
        }
        debug!(event_id, channel = EVENT_UPDATED_CHANNEL, "Sent event notification");
        Ok(())
    }
}
