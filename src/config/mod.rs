//! Environment-driven configuration
//!
//! Every setting has a default so the server starts with an empty
//! environment. `.env` files are loaded by the binaries via `dotenvy`.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

use crate::services::market_data::DEFAULT_RESOLUTION;
use crate::signals::SignalThresholds;
use crate::stats::{AnalysisConfig, DEFAULT_WINDOW};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_JOB_RETENTION: usize = 10_000;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Z_ENTRY_UPPER ({upper}) must be greater than Z_ENTRY_LOWER ({lower})")]
    InvertedThresholds { upper: f64, lower: f64 },
}

/// Deployment environment name, `sandbox` when unset
pub fn get_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string())
}

pub fn is_production() -> bool {
    matches!(get_environment().as_str(), "production" | "prod")
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataConfig {
    /// Base URL of the history API; `None` leaves the server without a live source
    pub base_url: Option<String>,
    pub access_token: Option<String>,
    /// Bar resolution in minutes
    pub resolution: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub port: u16,
    pub market_data: MarketDataConfig,
    pub analysis: AnalysisConfig,
    /// Directory for persisted pair documents; `None` keeps them in memory
    pub data_dir: Option<PathBuf>,
    /// Terminal jobs kept for status lookups; `None` keeps all of them
    pub job_retention: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = parse_or(&lookup, "PORT", DEFAULT_PORT)?;
        let resolution = parse_or(&lookup, "MARKET_DATA_RESOLUTION", DEFAULT_RESOLUTION)?;
        let window = parse_or(&lookup, "ROLLING_WINDOW", DEFAULT_WINDOW)?;
        if window < 2 {
            return Err(ConfigError::InvalidValue {
                key: "ROLLING_WINDOW",
                value: window.to_string(),
            });
        }

        let defaults = SignalThresholds::default();
        let upper = parse_or(&lookup, "Z_ENTRY_UPPER", defaults.upper)?;
        let lower = parse_or(&lookup, "Z_ENTRY_LOWER", defaults.lower)?;
        if !(upper > lower) {
            return Err(ConfigError::InvertedThresholds { upper, lower });
        }

        let data_dir = match lookup("PAIRS_DATA_DIR") {
            Some(dir) if dir.trim().is_empty() => None,
            Some(dir) => Some(PathBuf::from(dir)),
            None => Some(PathBuf::from(DEFAULT_DATA_DIR)),
        };

        let job_retention = match parse_or(&lookup, "JOB_RETENTION", DEFAULT_JOB_RETENTION)? {
            0 => None,
            limit => Some(limit),
        };

        Ok(Self {
            port,
            market_data: MarketDataConfig {
                base_url: non_empty("MARKET_DATA_URL"),
                access_token: non_empty("MARKET_DATA_TOKEN"),
                resolution,
            },
            analysis: AnalysisConfig {
                window,
                thresholds: SignalThresholds { upper, lower },
                capital: None,
            },
            data_dir,
            job_retention,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key,
            value: raw,
        }),
    }
}
