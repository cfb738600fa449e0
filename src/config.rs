// Configuration module: reads the service endpoint, key and a few tuning
// knobs from the environment. `main` merges a `.env` file into the process
// environment before calling `Config::from_env`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const ENDPOINT_VAR: &str = "DOC_INTELLIGENCE_ENDPOINT";
pub const KEY_VAR: &str = "DOC_INTELLIGENCE_KEY";
pub const API_VERSION_VAR: &str = "DOC_INTELLIGENCE_API_VERSION";
pub const POLL_INTERVAL_VAR: &str = "DOC_INTELLIGENCE_POLL_INTERVAL_MS";
pub const TIMEOUT_VAR: &str = "DOC_INTELLIGENCE_TIMEOUT_SECS";
pub const OUTPUT_DIR_VAR: &str = "DOC_INTELLIGENCE_OUTPUT_DIR";

pub const DEFAULT_API_VERSION: &str = "2023-07-31";
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the client and the output writers need, resolved once at
/// startup and read-only afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub output_dir: PathBuf,
}

impl Config {
    /// Build a `Config` from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a `Config` from an arbitrary variable lookup. Blank values are
    /// treated the same as unset ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let endpoint = get(ENDPOINT_VAR).ok_or(ConfigError::Missing(ENDPOINT_VAR))?;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::Invalid {
                var: ENDPOINT_VAR,
                value: endpoint,
                reason: "expected an http:// or https:// URL".into(),
            });
        }
        let api_key = get(KEY_VAR).ok_or(ConfigError::Missing(KEY_VAR))?;

        let poll_ms = parse_u64(
            POLL_INTERVAL_VAR,
            get(POLL_INTERVAL_VAR),
            DEFAULT_POLL_INTERVAL_MS,
        )?;
        let timeout_secs = parse_u64(TIMEOUT_VAR, get(TIMEOUT_VAR), DEFAULT_TIMEOUT_SECS)?;

        Ok(Config {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version: get(API_VERSION_VAR).unwrap_or_else(|| DEFAULT_API_VERSION.into()),
            poll_interval: Duration::from_millis(poll_ms),
            timeout: Duration::from_secs(timeout_secs),
            output_dir: get(OUTPUT_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
        })
    }
}

fn parse_u64(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}
