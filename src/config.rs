/// Service configuration loader - parses surfwatch.toml
///
/// Keeps tunables (feed location, timeouts, retention window, forecast
/// horizon, chart size) out of the code so they can be adjusted without
/// recompiling. Every key is optional; a missing file means defaults.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default location of the service configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "surfwatch.toml";

/// NDBC realtime2 directory holding one `<station>.txt` per buoy.
pub const NDBC_REALTIME_URL: &str = "https://www.ndbc.noaa.gov/data/realtime2";

/// Errors raised while loading configuration or the station registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Tunables for one running service instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the realtime feed directory.
    pub ndbc_base_url: String,
    /// Upper bound for a single station fetch.
    pub fetch_timeout_secs: u64,
    /// Worker threads used to fetch stations within one request.
    pub fetch_workers: usize,

    /// Observations older than this are dropped by the normalizer.
    pub retention_hours: i64,
    pub forecast_horizon_hours: u32,
    /// Minimum wave-height samples before a trend is fitted.
    pub min_forecast_samples: usize,

    pub chart_width: u32,
    pub chart_height: u32,

    /// Path of the region registry file.
    pub regions_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ndbc_base_url: NDBC_REALTIME_URL.to_string(),
            fetch_timeout_secs: 10,
            fetch_workers: 4,
            retention_hours: 72,
            forecast_horizon_hours: 12,
            min_forecast_samples: 10,
            chart_width: 1000,
            chart_height: 500,
            regions_path: "regions.toml".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Parses configuration from TOML text and validates it.
    pub fn from_toml_str(contents: &str, path: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `SURFWATCH_*` environment overrides on top of file values.
    pub fn apply_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = env::var("SURFWATCH_NDBC_URL") {
            self.ndbc_base_url = url;
        }
        if let Ok(secs) = env::var("SURFWATCH_FETCH_TIMEOUT_SECS") {
            self.fetch_timeout_secs = secs.parse().map_err(|_| {
                ConfigError::Invalid(format!("SURFWATCH_FETCH_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        if let Ok(path) = env::var("SURFWATCH_REGIONS") {
            self.regions_path = path;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ndbc_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("ndbc_base_url must not be empty".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ConfigError::Invalid("fetch_timeout_secs must be positive".to_string()));
        }
        if self.fetch_workers == 0 {
            return Err(ConfigError::Invalid("fetch_workers must be at least 1".to_string()));
        }
        if self.retention_hours <= 0 {
            return Err(ConfigError::Invalid("retention_hours must be positive".to_string()));
        }
        if self.forecast_horizon_hours == 0 {
            return Err(ConfigError::Invalid("forecast_horizon_hours must be positive".to_string()));
        }
        if self.min_forecast_samples < 2 {
            // A line needs two distinct points.
            return Err(ConfigError::Invalid("min_forecast_samples must be at least 2".to_string()));
        }
        if self.chart_width < 200 || self.chart_height < 150 {
            return Err(ConfigError::Invalid("chart must be at least 200x150".to_string()));
        }
        Ok(())
    }
}

/// Loads the service configuration from `path`.
///
/// A missing file yields the defaults; an unreadable or malformed one is an
/// error since the operator clearly meant to configure something.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ServiceConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if !path.exists() {
        log::info!("{} not found, using default configuration", display);
        return Ok(ServiceConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: display.clone(),
        source: e,
    })?;

    ServiceConfig::from_toml_str(&contents, &display)
}
