//! Configuration loading.
//!
//! Built-in defaults, then an optional `config.toml`, then environment
//! overrides. The database DSN is held as a [`SecretString`] so it never
//! appears in `Debug` output or logs.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::espn::{EspnConfig, DEFAULT_BASE_URL};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
pub const CONFIG_PATH_ENV: &str = "SQMGR_SPORTS_CONFIG";
pub const DEFAULT_DSN: &str = "postgres://postgres@localhost:5432/postgres?sslmode=disable";

/// Top-level application configuration. Every section is optional.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub espn: EspnSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: SecretString,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: SecretString::new(DEFAULT_DSN.to_string()),
            max_connections: 30,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EspnSettings {
    pub base_url: String,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_ms: u64,
    /// Falls back to the client's built-in agent string.
    pub user_agent: Option<String>,
}

impl Default for EspnSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_second: 10,
            timeout_secs: 30,
            max_retries: 3,
            retry_base_ms: 1000,
            user_agent: None,
        }
    }
}

impl EspnSettings {
    pub fn client_config(&self) -> EspnConfig {
        let defaults = EspnConfig::default();
        EspnConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            requests_per_second: self.requests_per_second,
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_ms),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    /// Load from `path`, else `$SQMGR_SPORTS_CONFIG`, else `config.toml`
    /// when it exists, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply environment overrides through `lookup`. `SQMGR_CONF_DSN` wins
    /// over `DATABASE_URL`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dsn) = value("SQMGR_CONF_DSN").or_else(|| value("DATABASE_URL")) {
            self.database.url = SecretString::new(dsn);
        }
        if let Some(url) = value("ESPN_BASE_URL") {
            self.espn.base_url = url;
        }
        if let Some(rps) = value("ESPN_REQUESTS_PER_SECOND") {
            self.espn.requests_per_second = parse_env("ESPN_REQUESTS_PER_SECOND", &rps)?;
        }
        if let Some(secs) = value("ESPN_TIMEOUT_SECS") {
            self.espn.timeout_secs = parse_env("ESPN_TIMEOUT_SECS", &secs)?;
        }
        Ok(())
    }

    pub fn database_url(&self) -> &str {
        self.database.url.expose_secret()
    }
}

fn parse_env<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {raw}"))
}
