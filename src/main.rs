//! sqmgr-sports-sync: one-shot sync of teams, schedules and scores from
//! ESPN into the SqMGR database.
//!
//! Loads `.env` and configuration, initialises structured logging, opens
//! the connection pool and runs the requested sync modes. Ctrl-C cancels
//! in-flight work at the next suspension point.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use sqmgr_sports::config::AppConfig;
use sqmgr_sports::espn::EspnClient;
use sqmgr_sports::logging;
use sqmgr_sports::store::{PgNotifier, PgStore, SyncType};
use sqmgr_sports::sync::{SyncOptions, SyncOrchestrator};
use sqmgr_sports::types::League;

#[derive(Debug, Parser)]
#[command(
    name = "sqmgr-sports-sync",
    version,
    about = "Sync teams, schedules and live scores from ESPN"
)]
struct Cli {
    /// Sync teams for each league
    #[arg(long)]
    sync_teams: bool,

    /// Sync the season schedule for each league
    #[arg(long)]
    sync_schedule: bool,

    /// Update scores for live and recent events
    #[arg(long)]
    sync_scores: bool,

    /// Log intended writes without performing them
    #[arg(long)]
    dry_run: bool,

    /// Restrict to one league (nfl, nba, wnba, ncaab, ncaaf)
    #[arg(long)]
    league: Option<League>,

    /// Path to a TOML config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn modes(&self) -> Vec<SyncType> {
        [
            (self.sync_teams, SyncType::Teams),
            (self.sync_schedule, SyncType::Schedule),
            (self.sync_scores, SyncType::Scores),
        ]
        .into_iter()
        .filter_map(|(on, mode)| on.then_some(mode))
        .collect()
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let modes = cli.modes();
    if modes.is_empty() {
        eprintln!("error: no sync mode selected; pass --sync-teams, --sync-schedule or --sync-scores\n");
        Cli::command().print_help()?;
        return Ok(ExitCode::from(2));
    }

    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = AppConfig::load(cli.config.as_deref())?;
    logging::init(cfg.logging.json);

    let options = SyncOptions::new(cli.league, cli.dry_run);
    info!(
        modes = ?modes,
        leagues = ?options.leagues,
        dry_run = options.dry_run,
        "Starting sports sync"
    );

    // -- Shutdown --------------------------------------------------------

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Shutdown signal received, cancelling sync");
                cancel.cancel();
            }
        });
    }

    // -- Components ------------------------------------------------------

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(cfg.database_url())
        .await
        .context("Failed to connect to database")?;
    info!(max_connections = cfg.database.max_connections, "Connected to database");

    let espn_config = cfg.espn.client_config();
    info!(
        base_url = %espn_config.base_url,
        requests_per_second = espn_config.requests_per_second,
        "ESPN client ready"
    );
    let provider =
        EspnClient::new(espn_config, cancel.clone()).context("Failed to build ESPN client")?;
    let store = PgStore::new(pool.clone(), cancel.clone());
    let notifier = PgNotifier::new(pool.clone(), cancel.clone());

    let orchestrator = SyncOrchestrator::new(&provider, &store, &notifier, options, cancel);

    // -- Run -------------------------------------------------------------

    let result = orchestrator.run(&modes).await;
    pool.close().await;

    match result {
        Ok(reports) => {
            for report in &reports {
                for league in report.leagues.iter().filter(|l| !l.success) {
                    warn!(
                        mode = %report.mode,
                        league = ?league.league,
                        error = ?league.error,
                        "Sync completed with failures"
                    );
                }
            }
            let processed: usize = reports.iter().map(|r| r.processed()).sum();
            info!(processed, "Sync complete");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => {
            warn!("Sync cancelled");
            Ok(ExitCode::from(130))
        }
        Err(e) => {
            error!(error = %e, "Sync failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
