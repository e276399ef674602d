//! HTTP client for the public ESPN site API.
//!
//! Every request waits on a shared token-bucket limiter, then retries HTTP
//! 429 with exponential backoff (1s, 2s, 4s by default). Any other non-2xx
//! status fails immediately. All waits race the client's cancellation token.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::{Days, NaiveDate, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::ProviderError;
use super::parse;
use super::wire::{ScoreboardResponse, SummaryResponse, TeamScheduleResponse, TeamsResponse};
use super::SportsProvider;
use crate::types::{Event, League, ScoreboardOptions, SeasonInfo, Team};

pub const DEFAULT_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";

/// College leagues have 700+ teams; ESPN pages at 50 by default.
const TEAMS_PAGE_LIMIT: u32 = 1000;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct EspnConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub requests_per_second: u32,
    /// Retries after the first attempt, 429 only.
    pub max_retries: usize,
    pub retry_base_delay: Duration,
    pub user_agent: String,
}

impl Default for EspnConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            requests_per_second: 10,
            max_retries: 3,
            retry_base_delay: Duration::from_millis(1000),
            user_agent: concat!("sqmgr-sports/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct EspnClient {
    http: Client,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
    backoff: ExponentialBuilder,
    cancel: CancellationToken,
}

impl EspnClient {
    pub fn new(config: EspnConfig, cancel: CancellationToken) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(rps).allow_burst(NonZeroU32::MIN));

        let max_delay = config
            .retry_base_delay
            .saturating_mul(1u32 << config.max_retries.min(16));
        let backoff = ExponentialBuilder::default()
            .with_min_delay(config.retry_base_delay)
            .with_max_delay(max_delay)
            .with_factor(2.0)
            .with_max_times(config.max_retries);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter,
            backoff,
            cancel,
        })
    }

    fn league_url(&self, league: League, rest: &str) -> String {
        format!("{}/{}/{}", self.base_url, league.espn_path(), rest)
    }

    fn scoreboard_url(&self, league: League, opts: &ScoreboardOptions) -> String {
        let mut params: Vec<(&str, String)> = Vec::new();
        if let Some(date) = opts.date.as_deref().filter(|d| !d.is_empty()) {
            params.push(("dates", date.to_string()));
        }
        if league.is_football() {
            if let Some(week) = opts.week.filter(|w| *w > 0) {
                params.push(("week", week.to_string()));
            }
        }
        if let Some(season) = opts.season.filter(|s| *s > 0) {
            params.push(("seasonYear", season.to_string()));
        }
        if let Some(season_type) = opts.season_type {
            params.push(("seasontype", season_type.code().to_string()));
        }

        let mut url = self.league_url(league, "scoreboard");
        if !params.is_empty() {
            let query: Vec<String> = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&query.join("&"));
        }
        url
    }

    /// GET `url` and decode the body, honouring the limiter, the retry
    /// policy and cancellation.
    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        url: &str,
    ) -> Result<T, ProviderError> {
        let body = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(ProviderError::Cancelled),
            body = self.fetch_with_retry(url) => body?,
        };
        serde_json::from_str(&body).map_err(|source| ProviderError::Decode { endpoint, source })
    }

    async fn fetch_with_retry(&self, url: &str) -> Result<String, ProviderError> {
        let attempts = AtomicU32::new(0);
        let attempts = &attempts;

        let fetch = || async move {
            let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
            self.limiter.until_ready().await;
            debug!(url, attempt, "Making ESPN API request");

            let resp = self
                .http
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = resp.status();
            debug!(url, status = status.as_u16(), "Received ESPN API response");

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited {
                    attempts: attempt,
                    url: url.to_string(),
                });
            }
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }
            Ok(resp.text().await?)
        };

        fetch
            .retry(self.backoff)
            .when(ProviderError::is_retryable)
            .notify(|err: &ProviderError, delay: Duration| {
                warn!(
                    url,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Rate limited, backing off"
                );
            })
            .await
    }
}

#[async_trait]
impl SportsProvider for EspnClient {
    async fn get_teams(&self, league: League) -> Result<Vec<Team>, ProviderError> {
        let url = self.league_url(league, &format!("teams?limit={TEAMS_PAGE_LIMIT}"));
        let resp: TeamsResponse = self.get_json("teams", &url).await?;
        Ok(parse::parse_teams(resp))
    }

    async fn get_scoreboard(
        &self,
        league: League,
        opts: &ScoreboardOptions,
    ) -> Result<Vec<Event>, ProviderError> {
        let url = self.scoreboard_url(league, opts);
        let resp: ScoreboardResponse = self.get_json("scoreboard", &url).await?;

        let mut events = Vec::with_capacity(resp.events.len());
        for raw in resp.events {
            let event_id = raw.id.clone();
            match parse::parse_scoreboard_event(raw) {
                Ok(event) => events.push(event),
                Err(e) => warn!(%league, event_id = %event_id, error = %e, "Failed to parse scoreboard event"),
            }
        }
        Ok(events)
    }

    async fn get_scoreboard_for_date_range(
        &self,
        league: League,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Event>, ProviderError> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();

        let mut day = start;
        while day <= end {
            let events = self
                .get_scoreboard(league, &ScoreboardOptions::for_date(day))
                .await?;
            // ESPN can list a late game under two dates
            all.extend(events.into_iter().filter(|e| seen.insert(e.id.clone())));

            day = match day.checked_add_days(Days::new(1)) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(all)
    }

    async fn get_team_schedule(
        &self,
        league: League,
        team_id: &str,
    ) -> Result<Vec<Event>, ProviderError> {
        let url = self.league_url(
            league,
            &format!("teams/{}/schedule", urlencoding::encode(team_id)),
        );
        let resp: TeamScheduleResponse = self.get_json("schedule", &url).await?;

        let mut events = Vec::with_capacity(resp.events.len());
        for raw in resp.events {
            let event_id = raw.id.clone();
            match parse::parse_schedule_event(raw) {
                Ok(event) => events.push(event),
                Err(e) => warn!(%league, team_id, event_id = %event_id, error = %e, "Failed to parse schedule event"),
            }
        }
        Ok(events)
    }

    async fn get_event_summary(
        &self,
        league: League,
        event_id: &str,
    ) -> Result<Event, ProviderError> {
        let url = self.league_url(
            league,
            &format!("summary?event={}", urlencoding::encode(event_id)),
        );
        let resp: SummaryResponse = match self.get_json("summary", &url).await {
            Err(ProviderError::Status { status: 404, .. }) => {
                return Err(ProviderError::EventNotFound {
                    league,
                    event_id: event_id.to_string(),
                });
            }
            other => other?,
        };
        parse::parse_summary(resp)
    }

    async fn get_season_info(&self, league: League) -> Result<SeasonInfo, ProviderError> {
        let url = self.league_url(league, "scoreboard");
        let resp: ScoreboardResponse = self.get_json("scoreboard", &url).await?;
        parse::parse_season_info(&resp, Utc::now())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
