//! Structured logging setup.

use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_JSON_ENV: &str = "SQMGR_LOG_JSON";

const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn crate_directives(level: &str) -> String {
    format!("sqmgr_sports={level},sqmgr_sports_sync={level}")
}

/// Resolve filter directives from `LOG_LEVEL` and `RUST_LOG`. The second
/// value is a `LOG_LEVEL` that was set but not recognised.
fn filter_directives(log_level: Option<&str>, rust_log: Option<&str>) -> (String, Option<String>) {
    if let Some(raw) = log_level.map(str::trim).filter(|l| !l.is_empty()) {
        let level = raw.to_lowercase();
        if LEVELS.contains(&level.as_str()) {
            return (crate_directives(&level), None);
        }
        return (crate_directives("info"), Some(raw.to_string()));
    }
    match rust_log.filter(|r| !r.trim().is_empty()) {
        Some(directives) => (directives.to_string(), None),
        None => (crate_directives("info"), None),
    }
}

/// Install the global subscriber. JSON output when `json` is set or
/// `SQMGR_LOG_JSON` is `1`/`true`.
pub fn init(json: bool) {
    let log_level = std::env::var(LOG_LEVEL_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (directives, rejected) = filter_directives(log_level.as_deref(), rust_log.as_deref());

    let env_filter =
        EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(crate_directives("info")));

    let json = json
        || std::env::var(LOG_JSON_ENV)
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

    if json {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }

    if let Some(level) = rejected {
        warn!(level = %level, "Unrecognised LOG_LEVEL, falling back to info");
    }
}
