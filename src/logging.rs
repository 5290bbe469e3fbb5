/// Logging setup and fetch-failure reporting.
///
/// Messages go through the `log` facade; `init_logger` installs
/// `env_logger` with `RUST_LOG` taking precedence over the default level.
/// Fetch failures are classified before logging so that a buoy that is
/// simply offline does not read like a service fault.

use std::fmt;

use log::LevelFilter;

use crate::model::FetchError;

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Installs the global logger. Safe to call more than once; later calls
/// are ignored.
pub fn init_logger(default_level: LevelFilter, timestamps: bool) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(default_level);
    builder.parse_default_env();
    if !timestamps {
        builder.format_timestamp(None);
    }
    let _ = builder.try_init();
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - buoy offline, adrift, or not reporting
    Expected,
    /// Unexpected failure - feed format change or service degradation
    Unexpected,
    /// Unknown - cannot tell whether this is the buoy or the network
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a station fetch failure.
///
/// NDBC answers 404 for stations that have stopped reporting, which is
/// routine. Schema and parse errors mean the feed format moved under us.
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        FetchError::Http(404) => FailureType::Expected,
        FetchError::Http(code) if *code >= 500 => FailureType::Unexpected,
        FetchError::Schema(_) | FetchError::Parse { .. } | FetchError::Worker(_) => FailureType::Unexpected,
        FetchError::Http(_) | FetchError::Timeout | FetchError::Network(_) => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a station fetch failure with automatic classification
pub fn log_fetch_failure(station_id: &str, operation: &str, err: &FetchError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("[{}] {} failed [{}]: {}", station_id, operation, failure_type, err);

    match failure_type {
        FailureType::Expected => log::debug!(target: "ndbc", "{}", message),
        FailureType::Unexpected => log::error!(target: "ndbc", "{}", message),
        FailureType::Unknown => log::warn!(target: "ndbc", "{}", message),
    }
}

/// Log a summary of one round of station fetches
pub fn log_fetch_summary(total: usize, successful: usize, failed: usize) {
    let message = format!("Fetched {}/{} stations, {} failed", successful, total, failed);

    if failed == 0 {
        log::info!(target: "ndbc", "{}", message);
    } else if successful == 0 {
        log::error!(target: "ndbc", "{}", message);
    } else {
        log::warn!(target: "ndbc", "{}", message);
    }
}
