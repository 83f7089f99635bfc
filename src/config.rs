//! Centralized configuration management for edgar-index

use anyhow::{Context, Result};
use chrono::Datelike;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::MergeMode;

pub const DEFAULT_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/full-index";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory receiving the fragment files and `master.tsv`
    pub save_directory: PathBuf,
    /// First year to fetch (inclusive)
    pub start_year: i32,
    /// Last year to fetch (inclusive)
    pub end_year: i32,
    /// Root of the remote full-index tree
    pub base_url: String,
    /// Ceiling on in-flight downloads; 0 disables the limit
    pub max_concurrent_downloads: usize,
    pub merge_mode: MergeMode,
    /// HTTP client configuration
    pub http: HttpConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: "edgar-index/0.1.0 (your.email@example.com)".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let current_year = chrono::Local::now().year();
        Self {
            save_directory: PathBuf::from("./indexes"),
            start_year: current_year,
            end_year: current_year,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_concurrent_downloads: 8,
            merge_mode: MergeMode::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let save_directory = std::env::var("EDGAR_INDEX_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.save_directory);

        let merge_mode = match std::env::var("EDGAR_INDEX_MERGE_MODE") {
            Ok(val) => val
                .parse::<MergeMode>()
                .with_context(|| format!("Invalid EDGAR_INDEX_MERGE_MODE = '{}'", val))?,
            Err(_) => defaults.merge_mode,
        };

        let http = HttpConfig {
            timeout_seconds: parse_env_var("EDGAR_INDEX_HTTP_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.http.timeout_seconds),
            user_agent: std::env::var("EDGAR_INDEX_USER_AGENT")
                .unwrap_or(defaults.http.user_agent),
        };

        Ok(Config {
            save_directory,
            start_year: parse_env_var("EDGAR_INDEX_START_YEAR")?.unwrap_or(defaults.start_year),
            end_year: parse_env_var("EDGAR_INDEX_END_YEAR")?.unwrap_or(defaults.end_year),
            base_url: std::env::var("EDGAR_INDEX_BASE_URL").unwrap_or(defaults.base_url),
            max_concurrent_downloads: parse_env_var("EDGAR_INDEX_MAX_CONCURRENT")?
                .unwrap_or(defaults.max_concurrent_downloads),
            merge_mode,
            http,
        })
    }

    /// Get HTTP timeout as Duration
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    /// Validate configuration, creating the save directory if needed
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(anyhow::anyhow!("Base URL must not be empty"));
        }

        std::fs::create_dir_all(&self.save_directory).with_context(|| {
            format!(
                "Cannot create save directory: {}",
                self.save_directory.display()
            )
        })?;

        Ok(())
    }
}

/// Helper function to parse environment variable as a specific type
fn parse_env_var<T>(var_name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match std::env::var(var_name) {
        Ok(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        Err(_) => Ok(None),
    }
}
