use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use crate::error::{AppError, Result};
use crate::generator::session::SessionTiming;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    /// Forwarded as a bearer token, never inspected
    pub api_token: Option<String>,
    pub poll_interval: Duration,
    pub ticker_interval: Duration,
    pub request_timeout: Duration,
    pub fov_deg: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            poll_interval: Duration::from_millis(2000),
            ticker_interval: Duration::from_millis(3000),
            request_timeout: Duration::from_millis(10_000),
            fov_deg: 45.0,
        }
    }
}

impl AppConfig {
    /// Environment variables, optionally seeded from a `.env` file
    pub fn load() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(AppError::Config(e.to_string())),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration> {
            parse_var(&lookup, key, default.as_millis() as u64).map(Duration::from_millis)
        };

        Ok(Self {
            api_url: lookup("VOXPLAN_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            api_token: lookup("VOXPLAN_API_TOKEN").filter(|t| !t.is_empty()),
            poll_interval: millis("VOXPLAN_POLL_INTERVAL_MS", defaults.poll_interval)?,
            ticker_interval: millis("VOXPLAN_TICKER_INTERVAL_MS", defaults.ticker_interval)?,
            request_timeout: millis("VOXPLAN_REQUEST_TIMEOUT_MS", defaults.request_timeout)?,
            fov_deg: parse_var(&lookup, "VOXPLAN_FOV_DEG", defaults.fov_deg)?,
        })
    }

    /// Command-line values win over the environment
    pub fn with_overrides(mut self, api_url: Option<String>, api_token: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        if api_token.is_some() {
            self.api_token = api_token;
        }
        self
    }

    pub fn timing(&self) -> SessionTiming {
        SessionTiming {
            poll_interval: self.poll_interval,
            ticker_interval: self.ticker_interval,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} must be a number, got '{}'", key, raw))),
        None => Ok(default),
    }
}
