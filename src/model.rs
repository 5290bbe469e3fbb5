/// Core data types for the surfwatch buoy service.
///
/// This module defines the shared domain model imported by all other modules:
/// raw and normalized observations, per-location series, forecast results,
/// chart artifacts and the error types that flow between them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Raw telemetry (source units)
// ---------------------------------------------------------------------------

/// One row of an NDBC realtime feed, still in metric units.
///
/// Every measurement is optional: the feed marks missing values with the
/// `MM` sentinel, which the parser maps to `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub timestamp: DateTime<Utc>,
    pub wave_height_m: Option<f64>,     // WVHT
    pub dominant_period_s: Option<f64>, // DPD
    pub water_temp_c: Option<f64>,      // WTMP
    pub air_temp_c: Option<f64>,        // ATMP
}

/// All rows of one station feed, in feed order (NDBC lists newest first).
pub type RawSeries = Vec<RawObservation>;

// ---------------------------------------------------------------------------
// Normalized observations
// ---------------------------------------------------------------------------

/// A single normalized telemetry sample in display units.
///
/// Serializes as an ordered mapping keyed by the display column names used
/// by the history view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "Wave Height (ft)")]
    pub wave_height_ft: Option<f64>,
    #[serde(rename = "Dominant Period (s)")]
    pub dominant_period_s: Option<f64>,
    #[serde(rename = "Water Temp (°F)")]
    pub water_temp_f: Option<f64>,
    #[serde(rename = "Air Temp (°F)")]
    pub air_temp_f: Option<f64>,
}

/// Normalized observations for one station, sorted by ascending timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series(Vec<Observation>);

impl Series {
    /// Builds a series, sorting the observations by timestamp.
    pub fn new(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Series(observations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.0
    }

    /// Most recent observation that carries a wave height.
    pub fn latest_wave_height(&self) -> Option<&Observation> {
        self.0.iter().rev().find(|o| o.wave_height_ft.is_some())
    }

    /// `(timestamp, wave height)` pairs for rows with a wave height.
    pub fn wave_heights(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.0
            .iter()
            .filter_map(|o| o.wave_height_ft.map(|h| (o.timestamp, h)))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The outcome of fetching and normalizing one location's station.
///
/// A failed fetch stays attached to its location so multi-station views can
/// still report it; it never aborts the surrounding aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationSeries {
    pub region: String,
    pub location: String,
    pub station_id: String,
    pub data: Result<Series, FetchError>,
}

impl LocationSeries {
    /// The series, if the fetch succeeded.
    pub fn series(&self) -> Option<&Series> {
        self.data.as_ref().ok()
    }

    /// Observations of a successful fetch, or an empty slice.
    pub fn observations(&self) -> &[Observation] {
        self.series().map(Series::as_slice).unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Forecast types
// ---------------------------------------------------------------------------

/// One extrapolated point of the wave-height trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub wave_height_ft: f64,
}

/// Linear trend fitted to a station's wave heights.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Prediction at the last horizon step, rounded to 2 decimals.
    pub final_wave_height_ft: f64,
    /// Full-precision predictions, one per hour after the latest sample.
    pub points: Vec<ForecastPoint>,
    pub slope_ft_per_hour: f64,
    pub sample_count: usize,
}

/// A location whose series produced a usable forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationForecast {
    pub location: String,
    pub station_id: String,
    /// Observations with a wave height, as used for the fit.
    pub history: Series,
    pub forecast: ForecastResult,
}

// ---------------------------------------------------------------------------
// Chart artifact
// ---------------------------------------------------------------------------

/// A self-contained encoded image, embeddable without a separate asset.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching or parsing one station's feed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Non-2xx HTTP response from the feed server.
    #[error("HTTP error: {0}")]
    Http(u16),
    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,
    /// Connection, TLS or body transfer failure.
    #[error("network error: {0}")]
    Network(String),
    /// The header row lacks a required column.
    #[error("schema error: {0}")]
    Schema(String),
    /// A data row could not be parsed.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
    /// The fetch worker died before reporting a result.
    #[error("fetch worker failed: {0}")]
    Worker(String),
}

/// Chart drawing or encoding failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("chart drawing failed: {0}")]
    Draw(String),
}
