//! Event reconciliation: the single write path every sync mode uses.

use tracing::{debug, info, warn};

use super::{recoverable, sports_event_data_changed, SyncError, SyncOrchestrator};
use crate::store::{SportsEvent, SportsTeam};
use crate::types::{Event, League};

/// What [`SyncOrchestrator::process_event`] did with one provider event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Dry run; the event was only logged.
    DryRun,
    /// The stored event is final and the provider reported it otherwise.
    /// Only a changed matchup is written through.
    KeptFinal { event_id: i64, grids_updated: u64 },
    Applied {
        event_id: i64,
        created: bool,
        notified: bool,
        grids_updated: u64,
    },
}

impl SyncOrchestrator<'_> {
    /// Upsert both teams and the event, notify listeners when score data
    /// moved, and refresh linked grids when the matchup is new or changed.
    pub async fn process_event(
        &self,
        league: League,
        event: &Event,
    ) -> Result<ReconcileOutcome, SyncError> {
        if self.options.dry_run {
            info!(
                %league,
                espn_id = %event.id,
                home = %event.home.team.abbreviation,
                away = %event.away.team.abbreviation,
                status = %event.status,
                "Would process event"
            );
            return Ok(ReconcileOutcome::DryRun);
        }

        self.store
            .upsert_team(&SportsTeam::from_provider(league, &event.home.team))
            .await?;
        self.store
            .upsert_team(&SportsTeam::from_provider(league, &event.away.team))
            .await?;

        let existing = self.store.event_by_external_id(&event.id).await?;
        let record = SportsEvent::from_provider(league, event);

        if let Some(old) = &existing {
            if old.status.is_final() && !record.status.is_final() {
                debug!(
                    event_id = old.id,
                    espn_id = %event.id,
                    reported = %record.status,
                    "Keeping final event"
                );
                let mut grids_updated = 0;
                if teams_differ(old, &record) {
                    let kept = SportsEvent {
                        home_team_id: record.home_team_id.clone(),
                        away_team_id: record.away_team_id.clone(),
                        ..old.clone()
                    };
                    let stored = self.store.upsert_event(&kept).await?;
                    grids_updated = self.resync_grids(stored.id).await?;
                }
                return Ok(ReconcileOutcome::KeptFinal { event_id: old.id, grids_updated });
            }
        }

        let stored = self.store.upsert_event(&record).await?;

        let mut notified = false;
        if let Some(old) = &existing {
            if sports_event_data_changed(old, &record) {
                match self.notifier.notify_event_updated(stored.id).await {
                    Ok(()) => notified = true,
                    Err(e) => {
                        let e = recoverable(e)?;
                        warn!(event_id = stored.id, error = %e, "Failed to send event notification");
                    }
                }
            }
        }

        let teams_changed = existing.as_ref().map_or(true, |old| teams_differ(old, &stored));
        let mut grids_updated = 0;
        if teams_changed {
            grids_updated = self.resync_grids(stored.id).await?;
        }

        Ok(ReconcileOutcome::Applied {
            event_id: stored.id,
            created: existing.is_none(),
            notified,
            grids_updated,
        })
    }

    async fn resync_grids(&self, event_id: i64) -> Result<u64, SyncError> {
        let updated = self.store.sync_grids_from_event(event_id).await?;
        if updated > 0 {
            info!(event_id, grids = updated, "Synced grids from event");
        }
        Ok(updated)
    }

    /// Reconcile each event in turn. Returns how many were processed;
    /// individual failures are logged and skipped.
    pub(crate) async fn process_events(
        &self,
        league: League,
        events: &[Event],
    ) -> Result<usize, SyncError> {
        let mut processed = 0;
        for event in events {
            self.ensure_running()?;
            match self.process_event(league, event).await {
                Ok(_) => processed += 1,
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(%league, espn_id = %event.id, error = %e, "Failed to process event");
                }
            }
        }
        Ok(processed)
    }
}

fn teams_differ(old: &SportsEvent, new: &SportsEvent) -> bool {
    old.home_team_id != new.home_team_id || old.away_team_id != new.away_team_id
}
