//! Configuration management for Gridwatch
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files with support for environment variable overrides.

use crate::error::{GridwatchError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod defaults;

/// Environment variable holding the EIA API key
pub const ENV_API_KEY: &str = "EIA_API_KEY";
/// Environment variable overriding the EIA base URL
pub const ENV_API_BASE_URL: &str = "EIA_API_BASE_URL";
/// Environment variable toggling use of the live API
pub const ENV_USE_REAL_API: &str = "GRIDWATCH_USE_REAL_API";
/// Environment variable pointing at an explicit config file
pub const ENV_CONFIG_PATH: &str = "GRIDWATCH_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// EIA API access configuration
    pub eia: EiaConfig,

    /// Balancing authorities polled every cycle
    pub regions: Vec<String>,

    /// Polling cadence and cache lifetimes
    pub polling: PollingConfig,

    /// Network reachability probing
    pub network: NetworkConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Web server binding configuration
    pub web: WebConfig,

    /// Timezone used to classify peak/night hours
    pub timezone: String,

    /// Fixed seed for synthetic data; random when unset
    pub synthesis_seed: Option<u64>,
}

/// EIA API configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct EiaConfig {
    /// EIA API key; empty means synthetic data only
    #[schemars(skip)]
    #[serde(skip_serializing)]
    pub api_key: String,

    /// API base URL
    pub base_url: String,

    /// Whether the live API is used at all when a key is present
    pub use_real_api: bool,

    /// State facet for the retail-sales lookup
    pub state_id: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Residential rate (cents/kWh) reported when the lookup fails
    pub fallback_residential_rate: f64,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PollingConfig {
    /// Seconds between fetch-and-broadcast cycles
    pub interval_secs: u64,

    /// Freshness window for live snapshots and the residential rate
    pub live_cache_ttl_secs: u64,

    /// Freshness window for historical rollups
    pub historical_cache_ttl_secs: u64,
}

/// Network probe configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct NetworkConfig {
    /// Whether the reachability probe runs
    pub probe_enabled: bool,

    /// host:port checked with a TCP connect
    pub probe_host: String,

    /// Seconds between probes
    pub probe_interval_secs: u64,

    /// Connect timeout in milliseconds
    pub probe_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console-specific level
    pub console_level: Option<String>,

    /// Optional file-specific level
    pub file_level: Option<String>,

    /// Path to log file (or directory)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

impl PollingConfig {
    pub const fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub const fn live_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.live_cache_ttl_secs)
    }

    pub const fn historical_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.historical_cache_ttl_secs)
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => Self::load_from_default_paths()?,
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn load_from_default_paths() -> Result<Self> {
        let default_paths = ["gridwatch_config.yaml", "/etc/gridwatch/config.yaml"];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Self::default())
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary lookup (used by tests)
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(ENV_API_KEY) {
            self.eia.api_key = key.trim().to_string();
        }
        if let Some(url) = lookup(ENV_API_BASE_URL)
            && !url.trim().is_empty()
        {
            self.eia.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(flag) = lookup(ENV_USE_REAL_API) {
            self.eia.use_real_api = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed timezone; defaults to UTC when the name is unknown
    pub fn tz(&self) -> chrono_tz::Tz {
        self.timezone.parse().unwrap_or(chrono_tz::UTC)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.regions.iter().all(|r| r.trim().is_empty()) {
            return Err(GridwatchError::validation(
                "regions",
                "At least one balancing authority is required",
            ));
        }

        if self.eia.base_url.trim().is_empty() {
            return Err(GridwatchError::validation(
                "eia.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.eia.request_timeout_secs == 0 {
            return Err(GridwatchError::validation(
                "eia.request_timeout_secs",
                "Must be greater than 0",
            ));
        }

        if !self.eia.fallback_residential_rate.is_finite()
            || self.eia.fallback_residential_rate <= 0.0
        {
            return Err(GridwatchError::validation(
                "eia.fallback_residential_rate",
                "Must be a positive number",
            ));
        }

        if self.polling.interval_secs == 0 {
            return Err(GridwatchError::validation(
                "polling.interval_secs",
                "Must be greater than 0",
            ));
        }

        if self.polling.live_cache_ttl_secs == 0 || self.polling.historical_cache_ttl_secs == 0 {
            return Err(GridwatchError::validation(
                "polling.cache_ttl",
                "Cache TTLs must be greater than 0",
            ));
        }

        if self.network.probe_enabled
            && (self.network.probe_host.trim().is_empty() || self.network.probe_interval_secs == 0)
        {
            return Err(GridwatchError::validation(
                "network",
                "Probe requires a host and a non-zero interval",
            ));
        }

        if self.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(GridwatchError::validation(
                "timezone",
                "Unknown timezone name",
            ));
        }

        if self.web.port == 0 {
            return Err(GridwatchError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.regions, vec!["AZPS".to_string(), "SRP".to_string()]);
        assert_eq!(config.polling.interval_secs, 30);
        assert_eq!(config.polling.live_cache_ttl_secs, 300);
        assert_eq!(config.polling.historical_cache_ttl_secs, 1800);
        assert!(config.eia.api_key.is_empty());
        assert_eq!(config.tz(), chrono_tz::America::Phoenix);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.regions = vec![];
        assert!(config.validate().is_err());

        config = Config::default();
        config.polling.interval_secs = 0;
        assert!(config.validate().is_err());

        config = Config::default();
        config.timezone = "Mars/Olympus_Mons".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.logging.level = "LOUD".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_overrides_from(|name| match name {
            ENV_API_KEY => Some("  abc123 ".to_string()),
            ENV_API_BASE_URL => Some("http://localhost:9000/v2/".to_string()),
            ENV_USE_REAL_API => Some("false".to_string()),
            _ => None,
        });
        assert_eq!(config.eia.api_key, "abc123");
        assert_eq!(config.eia.base_url, "http://localhost:9000/v2");
        assert!(!config.eia.use_real_api);
    }

    #[test]
    fn test_config_serialization_omits_key() {
        let mut config = Config::default();
        config.eia.api_key = "secret".to_string();
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("secret"));
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.polling.interval_secs, deserialized.polling.interval_secs);
        assert!(deserialized.eia.api_key.is_empty());
    }
}
