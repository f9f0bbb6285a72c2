use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::layout::{Strategy, DEFAULT_DPI};

/// Remote font-build endpoints and timing.
#[derive(Debug, Clone)]
pub struct FontServiceConfig {
    /// `None` disables the font-job endpoints.
    pub base_url: Option<String>,
    pub create_path: String,
    /// Contains a `{jobId}` placeholder.
    pub status_path: String,
    /// Contains a `{jobId}` placeholder.
    pub font_path: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub job_timeout: Duration,
    /// How long a finished job stays queryable.
    pub job_retention: Duration,
}

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed values fail startup with context.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub render_dpi: f32,
    pub compose_strategy: Strategy,
    pub max_pages_limit: usize,
    pub compose_debounce: Duration,
    /// Preview sessions unused for this long are dropped.
    pub preview_idle_ttl: Duration,
    pub font_service: FontServiceConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let render_dpi: f32 = parse_or(&lookup, "RENDER_DPI", DEFAULT_DPI)?;
        if !(render_dpi.is_finite() && render_dpi > 0.0) {
            return Err(anyhow!("RENDER_DPI must be a positive number, got {render_dpi}"));
        }

        let max_pages_limit: usize = parse_or(&lookup, "MAX_PAGES_LIMIT", 10)?;
        if max_pages_limit == 0 {
            return Err(anyhow!("MAX_PAGES_LIMIT must be at least 1"));
        }

        let compose_strategy = match lookup("COMPOSE_STRATEGY") {
            Some(raw) => raw.parse::<Strategy>().map_err(|e| anyhow!(e)).context("COMPOSE_STRATEGY")?,
            None => Strategy::default(),
        };

        let base_url = lookup("FONT_API_BASE")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            render_dpi,
            compose_strategy,
            max_pages_limit,
            compose_debounce: Duration::from_millis(parse_or(&lookup, "COMPOSE_DEBOUNCE_MS", 16)?),
            preview_idle_ttl: Duration::from_secs(parse_or(&lookup, "PREVIEW_IDLE_TTL_SECS", 1800)?),
            font_service: FontServiceConfig {
                base_url,
                create_path: lookup("FONT_API_CREATE_PATH").unwrap_or_else(|| "/api/font/jobs".to_string()),
                status_path: lookup("FONT_API_STATUS_PATH")
                    .unwrap_or_else(|| "/api/font/jobs/{jobId}".to_string()),
                font_path: lookup("FONT_API_FONT_PATH")
                    .unwrap_or_else(|| "/api/font/jobs/{jobId}/font".to_string()),
                poll_interval: Duration::from_millis(parse_or(&lookup, "FONT_POLL_INTERVAL_MS", 1100)?),
                request_timeout: Duration::from_millis(parse_or(&lookup, "FONT_REQUEST_TIMEOUT_MS", 60_000)?),
                job_timeout: Duration::from_secs(parse_or(&lookup, "FONT_JOB_TIMEOUT_SECS", 600)?),
                job_retention: Duration::from_secs(parse_or(&lookup, "FONT_JOB_RETENTION_SECS", 3600)?),
            },
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}
