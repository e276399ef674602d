//! Teams mode: refresh every team per league.

use tracing::{debug, info, warn};

use super::{recoverable, LeagueReport, SyncError, SyncOrchestrator, SyncReport};
use crate::store::{SportsTeam, SyncType};

impl SyncOrchestrator<'_> {
    pub async fn sync_teams(&self) -> Result<SyncReport, SyncError> {
        info!("Syncing teams");
        let mut report = SyncReport::new(SyncType::Teams);

        for &league in &self.options.leagues {
            self.ensure_running()?;
            info!(%league, "Fetching teams");
            let log = self.open_log(SyncType::Teams, Some(league)).await?;

            let teams = match self.provider.get_teams(league).await {
                Ok(teams) => teams,
                Err(e) => {
                    let e = recoverable(e)?;
                    warn!(%league, error = %e, "Failed to fetch teams");
                    self.close_log(log, 0, Some(&e)).await;
                    report.leagues.push(LeagueReport::failed(league, &e));
                    continue;
                }
            };
            info!(%league, count = teams.len(), "Found teams");

            let mut processed = 0;
            for team in &teams {
                self.ensure_running()?;
                debug!(%league, team_id = %team.id, name = %team.display_name, "Processing team");
                if self.options.dry_run {
                    processed += 1;
                    continue;
                }
                match self.store.upsert_team(&SportsTeam::from_provider(league, team)).await {
                    Ok(()) => processed += 1,
                    Err(e) => {
                        let e = recoverable(e)?;
                        warn!(%league, team_id = %team.id, error = %e, "Failed to upsert team");
                    }
                }
            }

            self.close_log(log, teams.len(), None).await;
            report
                .leagues
                .push(LeagueReport::succeeded(league, teams.len(), processed));
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::espn::{MockSportsProvider, ProviderError};
    use crate::store::{MemoryStore, SportsStore};
    use crate::sync::testing::team;
    use crate::sync::SyncOptions;
    use crate::types::League;
    use tokio_util::sync::CancellationToken;

    fn options(leagues: Vec<League>, dry_run: bool) -> SyncOptions {
        SyncOptions { leagues, dry_run }
    }

    #[tokio::test]
    async fn test_teams_upserted_and_logged() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_teams()
            .withf(|league| *league == League::Nba)
            .times(1)
            .returning(|_| Ok(vec![team("1", "Hawks"), team("2", "Celtics")]));
        let store = MemoryStore::new();
        let sync = SyncOrchestrator::new(
            &provider,
            &store,
            &store,
            options(vec![League::Nba], false),
            CancellationToken::new(),
        );

        let report = sync.sync_teams().await.unwrap();

        assert_eq!(report.processed(), 2);
        assert_eq!(store.team_count(Some(League::Nba)).await.unwrap(), 2);
        let logs = store.sync_logs().await;
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].success, Some(true));
        assert_eq!(logs[0].records_processed, 2);
        assert_eq!(logs[0].league, Some(League::Nba));
    }

    #[tokio::test]
    async fn test_provider_failure_continues_with_next_league() {
        let mut provider = MockSportsProvider::new();
        provider.expect_get_teams().returning(|league| match league {
            League::Nfl => Err(ProviderError::Status { status: 503, url: "u".into() }),
            _ => Ok(vec![team("9", "Aces")]),
        });
        let store = MemoryStore::new();
        let sync = SyncOrchestrator::new(
            &provider,
            &store,
            &store,
            options(vec![League::Nfl, League::Wnba], false),
            CancellationToken::new(),
        );

        let report = sync.sync_teams().await.unwrap();

        assert!(!report.is_success());
        assert_eq!(report.leagues[0].error.as_deref(), Some("ESPN returned 503 for u"));
        assert!(report.leagues[1].success);
        let logs = store.sync_logs().await;
        assert_eq!(logs[0].success, Some(false));
        assert_eq!(logs[0].error_message.as_deref(), Some("ESPN returned 503 for u"));
        assert_eq!(logs[1].success, Some(true));
    }

    #[tokio::test]
    async fn test_dry_run_skips_writes_and_logs() {
        let mut provider = MockSportsProvider::new();
        provider
            .expect_get_teams()
            .returning(|_| Ok(vec![team("1", "Hawks")]));
        let store = MemoryStore::new();
        let sync = SyncOrchestrator::new(
            &provider,
            &store,
            &store,
            options(vec![League::Nba], true),
            CancellationToken::new(),
        );

        let report = sync.sync_teams().await.unwrap();

        assert_eq!(report.processed(), 1);
        assert_eq!(store.team_count(None).await.unwrap(), 0);
        assert!(store.sync_logs().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let provider = MockSportsProvider::new();
        let store = MemoryStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let sync = SyncOrchestrator::new(
            &provider,
            &store,
            &store,
            options(vec![League::Nba], false),
            cancel,
        );

        let err = sync.run(&[SyncType::Teams]).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
