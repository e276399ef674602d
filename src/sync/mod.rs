//! Sync orchestrator.
//!
//! Three modes (teams, schedule, scores) run sequentially in that order.
//! Each writes sync-log rows, pulls from the [`SportsProvider`] and funnels
//! every event through [`SyncOrchestrator::process_event`]. Per-week,
//! per-team and per-event failures are logged and skipped. Cancellation
//! aborts the run at the next suspension point.

pub mod change;
pub mod reconcile;
mod schedule;
mod scores;
mod teams;

use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::espn::{ProviderError, SportsProvider};
use crate::store::{Notifier, SportsStore, StoreError, SyncLog, SyncType};
use crate::types::League;

pub use change::sports_event_data_changed;
pub use reconcile::ReconcileOutcome;

/// Longest error message stored on a sync-log row, in characters.
const MAX_ERROR_MESSAGE_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("no teams found in the store for {league}; run --sync-teams first")]
    NoTeams { league: League },

    #[error("sync cancelled")]
    Cancelled,
}

impl SyncError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SyncError::Cancelled
                | SyncError::Provider(ProviderError::Cancelled)
                | SyncError::Store(StoreError::Cancelled)
        )
    }
}

/// Cancellation aborts the run; anything else is handed back to be logged.
pub(crate) fn recoverable(err: impl Into<SyncError>) -> Result<SyncError, SyncError> {
    let err = err.into();
    if err.is_cancelled() {
        Err(SyncError::Cancelled)
    } else {
        Ok(err)
    }
}

pub(crate) fn truncate_error(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Options & reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    pub leagues: Vec<League>,
    /// Log intended writes instead of performing them.
    pub dry_run: bool,
}

impl SyncOptions {
    /// One league, or every league when `None`.
    pub fn new(league: Option<League>, dry_run: bool) -> Self {
        let leagues = match league {
            Some(l) => vec![l],
            None => League::ALL.to_vec(),
        };
        Self { leagues, dry_run }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeagueReport {
    /// `None` for a scores run across several leagues.
    pub league: Option<League>,
    pub fetched: usize,
    pub processed: usize,
    pub success: bool,
    pub error: Option<String>,
}

impl LeagueReport {
    fn succeeded(league: League, fetched: usize, processed: usize) -> Self {
        Self {
            league: Some(league),
            fetched,
            processed,
            success: true,
            error: None,
        }
    }

    fn failed(league: League, error: &SyncError) -> Self {
        Self {
            league: Some(league),
            fetched: 0,
            processed: 0,
            success: false,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub mode: SyncType,
    pub leagues: Vec<LeagueReport>,
}

impl SyncReport {
    fn new(mode: SyncType) -> Self {
        Self {
            mode,
            leagues: Vec::new(),
        }
    }

    pub fn processed(&self) -> usize {
        self.leagues.iter().map(|l| l.processed).sum()
    }

    pub fn is_success(&self) -> bool {
        self.leagues.iter().all(|l| l.success)
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator<'a> {
    provider: &'a dyn SportsProvider,
    store: &'a dyn SportsStore,
    notifier: &'a dyn Notifier,
    options: SyncOptions,
    cancel: CancellationToken,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(
        provider: &'a dyn SportsProvider,
        store: &'a dyn SportsStore,
        notifier: &'a dyn Notifier,
        options: SyncOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            provider,
            store,
            notifier,
            options,
            cancel,
        }
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Run the requested modes in teams, schedule, scores order.
    pub async fn run(&self, modes: &[SyncType]) -> Result<Vec<SyncReport>, SyncError> {
        let mut reports = Vec::new();

        for mode in [SyncType::Teams, SyncType::Schedule, SyncType::Scores] {
            if !modes.contains(&mode) {
                continue;
            }
            self.ensure_running()?;

            let span = info_span!("sync", mode = %mode, dry_run = self.options.dry_run);
            let report = async {
                match mode {
                    SyncType::Teams => self.sync_teams().await,
                    SyncType::Schedule => self.sync_schedule().await,
                    SyncType::Scores => self.sync_scores().await,
                }
            }
            .instrument(span)
            .await?;

            info!(
                mode = %mode,
                processed = report.processed(),
                success = report.is_success(),
                "Sync mode finished"
            );
            reports.push(report);
        }

        Ok(reports)
    }

    fn ensure_running(&self) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }
        Ok(())
    }

    /// Open a sync log unless dry-running. Failing to open one is logged
    /// and the run continues untracked.
    async fn open_log(
        &self,
        sync_type: SyncType,
        league: Option<League>,
    ) -> Result<Option<SyncLog>, SyncError> {
        if self.options.dry_run {
            return Ok(None);
        }
        match self.store.start_sync(sync_type, league).await {
            Ok(log) => Ok(Some(log)),
            Err(e) => {
                let e = recoverable(e)?;
                warn!(error = %e, "Failed to create sync log");
                Ok(None)
            }
        }
    }

    /// Close `log`; success is implied by the absence of `error`.
    async fn close_log(&self, log: Option<SyncLog>, records: usize, error: Option<&SyncError>) {
        let Some(mut log) = log else {
            return;
        };
        let message = error.map(|e| truncate_error(&e.to_string()));
        let records = i32::try_from(records).unwrap_or(i32::MAX);
        if let Err(e) = self
            .store
            .complete_sync(&mut log, records, error.is_none(), message.as_deref())
            .await
        {
            warn!(sync_log_id = log.id, error = %e, "Failed to complete sync log");
        }
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use chrono::Utc;

    use crate::types::{Competitor, Event, EventStatus, LineScores, Team};

    pub fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.into(),
            name: name.into(),
            display_name: format!("{name} FC"),
            abbreviation: name.chars().take(3).collect::<String>().to_uppercase(),
            location: None,
            color: Some("112233".into()),
            alternate_color: None,
        }
    }

    /// A provider event between `home` and `away` with the given status.
    pub fn provider_event(id: &str, home: &str, away: &str, status: EventStatus) -> Event {
        let period = match status {
            EventStatus::Scheduled => 0,
            EventStatus::InProgress => 2,
            EventStatus::Final => 4,
        };
        Event {
            id: id.into(),
            name: None,
            date: Utc::now(),
            status,
            status_detail: String::new(),
            period,
            clock: String::new(),
            season: 2024,
            season_type: 2,
            week: Some(1),
            venue: None,
            home: Competitor {
                team: team(home, &format!("Home{home}")),
                score: (status != EventStatus::Scheduled).then_some(14),
                line_scores: LineScores::from_periods(&[7, 7]),
            },
            away: Competitor {
                team: team(away, &format!("Away{away}")),
                score: (status != EventStatus::Scheduled).then_some(3),
                line_scores: LineScores::from_periods(&[3, 0]),
            },
        }
    }
}
