//! Scores mode: refresh the hot window.
//!
//! Stale events are finalized first, then every tracked event inside the
//! window is matched against today's and yesterday's scoreboards. Events
//! missing from both are fetched individually from the summary endpoint.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use super::{recoverable, LeagueReport, SyncError, SyncOrchestrator, SyncReport};
use crate::store::{SportsEvent, SyncType};
use crate::types::{Event, League, ScoreboardOptions};

impl SyncOrchestrator<'_> {
    pub async fn sync_scores(&self) -> Result<SyncReport, SyncError> {
        info!("Syncing scores");
        let scope = match self.options.leagues.as_slice() {
            [only] => Some(*only),
            _ => None,
        };
        let log = self.open_log(SyncType::Scores, scope).await?;

        if !self.options.dry_run {
            match self.store.finalize_stale_events().await {
                Ok(0) => {}
                Ok(count) => info!(count, "Finalized stale events"),
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(error = %e, "Failed to finalize stale events");
                }
            }
        }

        let tracked = match self.store.events_needing_score_update().await {
            Ok(events) => events,
            Err(e) => {
                let e = recoverable(e)?;
                self.close_log(log, 0, Some(&e)).await;
                return Err(e);
            }
        };

        let mut by_league: BTreeMap<League, Vec<SportsEvent>> = BTreeMap::new();
        for event in tracked {
            if self.options.leagues.contains(&event.league) {
                by_league.entry(event.league).or_default().push(event);
            }
        }
        let total: usize = by_league.values().map(Vec::len).sum();
        info!(count = total, "Found events needing score update");

        let mut report = SyncReport::new(SyncType::Scores);
        let mut updated = 0;

        for (league, events) in by_league {
            self.ensure_running()?;
            let live = self.recent_scoreboards(league).await?;

            let mut processed = 0;
            for tracked in &events {
                self.ensure_running()?;

                let summary;
                let event = match live.get(&tracked.espn_id) {
                    Some(event) => event,
                    None => {
                        debug!(%league, espn_id = %tracked.espn_id, "Event not on scoreboard, fetching summary");
                        match self.provider.get_event_summary(league, &tracked.espn_id).await {
                            Ok(event) => {
                                summary = event;
                                &summary
                            }
                            Err(e) => {
                                let e = recoverable(e)?;
                                debug!(%league, espn_id = %tracked.espn_id, error = %e, "Failed to fetch event summary");
                                continue;
                            }
                        }
                    }
                };

                match self.process_event(league, event).await {
                    Ok(_) => processed += 1,
                    Err(e) => {
                        let e = recoverable(e)?;
                        warn!(%league, espn_id = %tracked.espn_id, error = %e, "Failed to update event");
                    }
                }
            }

            updated += processed;
            report
                .leagues
                .push(LeagueReport::succeeded(league, events.len(), processed));
        }

        info!(updated, "Finished syncing scores");
        self.close_log(log, updated, None).await;
        Ok(report)
    }

    /// Today's and yesterday's scoreboards keyed by event id. A failed
    /// fetch is logged and contributes nothing.
    async fn recent_scoreboards(&self, league: League) -> Result<HashMap<String, Event>, SyncError> {
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap_or(today);
        let today_opts = ScoreboardOptions::for_date(today);
        let yesterday_opts = ScoreboardOptions::for_date(yesterday);

        let (today_res, yesterday_res) = futures::join!(
            self.provider.get_scoreboard(league, &today_opts),
            self.provider.get_scoreboard(league, &yesterday_opts),
        );

        let mut live = HashMap::new();
        // Today last so it wins for games spanning midnight.
        let results: [(NaiveDate, _); 2] = [(yesterday, yesterday_res), (today, today_res)];
        for (date, result) in results {
            match result {
                Ok(events) => {
                    for event in events {
                        live.insert(event.id.clone(), event);
                    }
                }
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(%league, date = %date.format("%Y%m%d"), error = %e, "Failed to fetch scoreboard");
                }
            }
        }
        Ok(live)
    }
}
