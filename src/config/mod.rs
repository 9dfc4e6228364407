//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Tunables for the sampling aggregator and fallback ladder.
///
/// Sample sizes and the minimum-support threshold are reported back in
/// response metadata so consumers can reason about estimate confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Sample cap for simple totals.
    #[serde(default = "default_totals_sample")]
    pub totals_sample: usize,

    /// Sample cap for high-cardinality breakdowns (patch, duration,
    /// rating); under-sampling there produces sparse, noisy buckets.
    #[serde(default = "default_breakdown_sample")]
    pub breakdown_sample: usize,

    /// Sample cap for matchup tables.
    #[serde(default = "default_matchup_sample")]
    pub matchup_sample: usize,

    /// Observations below this are suppressed as too noisy to report.
    #[serde(default = "default_min_support")]
    pub min_support: u32,

    /// Per-facet time budget in milliseconds.
    #[serde(default = "default_facet_budget_ms")]
    pub facet_budget_ms: u64,

    /// Snapshot staleness window in hours.
    #[serde(default = "default_snapshot_max_age_hours")]
    pub snapshot_max_age_hours: i64,

    /// Maximum rows in a best/worst-against table.
    #[serde(default = "default_matchup_table_len")]
    pub matchup_table_len: usize,
}

fn default_totals_sample() -> usize {
    2000
}

fn default_breakdown_sample() -> usize {
    8000
}

fn default_matchup_sample() -> usize {
    4000
}

fn default_min_support() -> u32 {
    5
}

fn default_facet_budget_ms() -> u64 {
    3000
}

fn default_snapshot_max_age_hours() -> i64 {
    24
}

fn default_matchup_table_len() -> usize {
    10
}

impl StatsConfig {
    pub fn facet_budget(&self) -> Duration {
        Duration::from_millis(self.facet_budget_ms)
    }

    pub fn snapshot_max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.snapshot_max_age_hours)
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            totals_sample: default_totals_sample(),
            breakdown_sample: default_breakdown_sample(),
            matchup_sample: default_matchup_sample(),
            min_support: default_min_support(),
            facet_budget_ms: default_facet_budget_ms(),
            snapshot_max_age_hours: default_snapshot_max_age_hours(),
            matchup_table_len: default_matchup_table_len(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.stats.totals_sample == 0
            || self.stats.breakdown_sample == 0
            || self.stats.matchup_sample == 0
        {
            return Err(ConfigError::ValidationError(
                "Sample sizes must be greater than 0".to_string(),
            ));
        }

        if self.stats.min_support == 0 {
            return Err(ConfigError::ValidationError(
                "Minimum support must be at least 1".to_string(),
            ));
        }

        if self.stats.facet_budget_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Facet budget must be greater than 0".to_string(),
            ));
        }

        if self.stats.snapshot_max_age_hours <= 0 {
            return Err(ConfigError::ValidationError(
                "Snapshot max age must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.stats.min_support, 5);
        assert_eq!(config.stats.breakdown_sample, 8000);
    }

    #[test]
    fn test_stats_config_durations() {
        let stats = StatsConfig::default();
        assert_eq!(stats.facet_budget(), Duration::from_millis(3000));
        assert_eq!(stats.snapshot_max_age(), chrono::Duration::hours(24));
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_sample() {
        let mut config = AppConfig::default();
        config.stats.totals_sample = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_min_support() {
        let mut config = AppConfig::default();
        config.stats.min_support = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.stats.matchup_sample, parsed.stats.matchup_sample);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: AppConfig = toml::from_str(
            r#"
            data_dir = "/srv/civ-data"

            [stats]
            min_support = 8
            "#,
        )
        .unwrap();

        assert_eq!(parsed.data_dir, PathBuf::from("/srv/civ-data"));
        assert_eq!(parsed.stats.min_support, 8);
        assert_eq!(parsed.stats.totals_sample, 2000);
        assert_eq!(parsed.server.port, 8080);
    }
}
