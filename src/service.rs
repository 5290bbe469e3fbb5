/// Request-scoped pipeline behind every outbound view.
///
/// `SurfService` owns the immutable registry and configuration and a shared
/// telemetry source. Each call captures `now` once, fetches fresh data for
/// the stations it needs and builds one of three views:
/// 1. `history`  — per-location observation records for a region
/// 2. `compare`  — every location of every region on one chart, plus the top location
/// 3. `forecast` — trend forecasts for a region's locations
///
/// Nothing is cached between calls.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use crate::analysis::aggregate::{aggregate, aggregate_region, AggregateOptions};
use crate::analysis::forecast::{forecast_locations, Forecaster};
use crate::config::{ConfigError, ServiceConfig};
use crate::ingest::ndbc::NdbcClient;
use crate::ingest::TelemetrySource;
use crate::model::{FetchError, LocationSeries, Observation, RenderError};
use crate::render::{render_comparison, render_forecast, ChartOptions};
use crate::stations::{load_registry, Region, StationRegistry};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ServiceError {
    /// The caller asked for a region that is not in the registry.
    #[error("unknown region: {0}")]
    UnknownRegion(String),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(FetchError),
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Observation records for each location of one region.
#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub region: String,
    pub locations: Vec<LocationHistory>,
}

#[derive(Debug, Serialize)]
pub struct LocationHistory {
    pub location: String,
    pub station_id: String,
    pub observations: Vec<Observation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One row of the combined comparison dataset.
#[derive(Debug, Serialize)]
pub struct CombinedRow {
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(flatten)]
    pub observation: Observation,
}

/// A location whose station could not be fetched.
#[derive(Debug, Serialize)]
pub struct LocationError {
    pub location: String,
    pub station_id: String,
    pub error: String,
}

/// Cross-region comparison chart and dataset.
#[derive(Debug, Serialize)]
pub struct ComparisonView {
    /// `data:image/svg+xml;base64,...`
    pub chart: String,
    pub combined: Vec<CombinedRow>,
    pub top_location: Option<String>,
    pub failed_locations: Vec<LocationError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastEntry {
    pub location: String,
    pub predicted_wave_height_ft: f64,
}

/// Forecast chart and final predictions for one region.
#[derive(Debug, Serialize)]
pub struct ForecastView {
    pub region: String,
    pub chart: String,
    pub results: Vec<ForecastEntry>,
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

pub struct SurfService {
    config: ServiceConfig,
    registry: StationRegistry,
    source: Arc<dyn TelemetrySource>,
}

impl SurfService {
    pub fn new(config: ServiceConfig, registry: StationRegistry, source: Arc<dyn TelemetrySource>) -> Self {
        Self { config, registry, source }
    }

    /// Loads the registry named by the config and wires up the NDBC client.
    pub fn from_config(config: ServiceConfig) -> Result<Self, ServiceError> {
        let registry = load_registry(&config.regions_path)?;
        let client = NdbcClient::from_config(&config).map_err(ServiceError::Client)?;
        Ok(Self::new(config, registry, Arc::new(client)))
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &StationRegistry {
        &self.registry
    }

    fn region(&self, id: &str) -> Result<&Region, ServiceError> {
        self.registry
            .region(id)
            .ok_or_else(|| ServiceError::UnknownRegion(id.to_string()))
    }

    fn options(&self, now: DateTime<Utc>) -> AggregateOptions {
        AggregateOptions {
            now,
            retention: Duration::hours(self.config.retention_hours),
            workers: self.config.fetch_workers,
        }
    }

    fn chart_options(&self) -> ChartOptions {
        ChartOptions {
            width: self.config.chart_width,
            height: self.config.chart_height,
        }
    }

    fn forecaster(&self) -> Forecaster {
        Forecaster {
            horizon_hours: self.config.forecast_horizon_hours,
            min_samples: self.config.min_forecast_samples,
        }
    }

    /// Per-location observation records for `region_id`.
    pub fn history(&self, region_id: &str) -> Result<HistoryView, ServiceError> {
        self.history_at(region_id, Utc::now())
    }

    pub fn history_at(&self, region_id: &str, now: DateTime<Utc>) -> Result<HistoryView, ServiceError> {
        let region = self.region(region_id)?;
        let series = aggregate_region(region, &self.source, &self.options(now));

        let locations = series
            .into_iter()
            .map(|entry| {
                let (observations, error) = match entry.data {
                    Ok(series) => (series.as_slice().to_vec(), None),
                    Err(err) => (Vec::new(), Some(err.to_string())),
                };
                LocationHistory {
                    location: entry.location,
                    station_id: entry.station_id,
                    observations,
                    error,
                }
            })
            .collect();

        Ok(HistoryView {
            region: region.id.clone(),
            locations,
        })
    }

    /// Every location of every region on one chart.
    pub fn compare(&self) -> Result<ComparisonView, ServiceError> {
        self.compare_at(Utc::now())
    }

    pub fn compare_at(&self, now: DateTime<Utc>) -> Result<ComparisonView, ServiceError> {
        let aggregation = aggregate(&self.registry, &self.source, &self.options(now));
        let chart = render_comparison(&aggregation.combined, &self.chart_options())?;

        Ok(ComparisonView {
            chart: chart.to_data_uri(),
            combined: combined_rows(&aggregation.combined),
            top_location: aggregation.top_location,
            failed_locations: failed_locations(&aggregation.combined),
        })
    }

    /// Trend forecasts for the locations of `region_id`.
    pub fn forecast(&self, region_id: &str) -> Result<ForecastView, ServiceError> {
        self.forecast_at(region_id, Utc::now())
    }

    pub fn forecast_at(&self, region_id: &str, now: DateTime<Utc>) -> Result<ForecastView, ServiceError> {
        let region = self.region(region_id)?;
        let series = aggregate_region(region, &self.source, &self.options(now));
        let forecasts = forecast_locations(&series, &self.forecaster());
        let chart = render_forecast(&forecasts, &self.chart_options())?;

        let results = forecasts
            .iter()
            .map(|f| ForecastEntry {
                location: f.location.clone(),
                predicted_wave_height_ft: f.forecast.final_wave_height_ft,
            })
            .collect();

        Ok(ForecastView {
            region: region.id.clone(),
            chart: chart.to_data_uri(),
            results,
        })
    }
}

fn combined_rows(series: &[LocationSeries]) -> Vec<CombinedRow> {
    series
        .iter()
        .flat_map(|entry| {
            entry.observations().iter().map(|obs| CombinedRow {
                location: entry.location.clone(),
                observation: obs.clone(),
            })
        })
        .collect()
}

fn failed_locations(series: &[LocationSeries]) -> Vec<LocationError> {
    series
        .iter()
        .filter_map(|entry| {
            entry.data.as_ref().err().map(|err| LocationError {
                location: entry.location.clone(),
                station_id: entry.station_id.clone(),
                error: err.to_string(),
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::{generated_feed, FixtureSource};
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 4, 12, 0, 0).unwrap()
    }

    fn service() -> SurfService {
        let registry = StationRegistry::from_toml_str(
            r#"
[[region]]
id = "central"
[[region.location]]
name = "New Smyrna Beach"
station = "41012"
[[region.location]]
name = "Flagler Pier"
station = "41113"

[[region]]
id = "south"
[[region.location]]
name = "Jupiter"
station = "41114"
"#,
        )
        .expect("fixture registry should parse");

        let now = fixed_now();
        let source = FixtureSource::default()
            // rising 0.05 m/h toward now
            .with_feed("41012", generated_feed(now, 96, |k| Some(2.0 - 0.05 * k as f64 / 2.0)))
            .with_failure("41113", FetchError::Http(404))
            // only 6 wave heights in the window
            .with_feed("41114", generated_feed(now, 48, |k| if k < 6 { Some(1.5) } else { None }));

        SurfService::new(ServiceConfig::default(), registry, Arc::new(source))
    }

    #[test]
    fn test_unknown_region_is_surfaced() {
        let err = service().history_at("east", fixed_now()).expect_err("east is not registered");
        assert!(matches!(err, ServiceError::UnknownRegion(ref r) if r == "east"));
        assert_eq!(err.to_string(), "unknown region: east");

        assert!(matches!(
            service().forecast_at("nowhere", fixed_now()),
            Err(ServiceError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_history_lists_every_location_with_errors_flagged() {
        let view = service().history_at("central", fixed_now()).unwrap();
        assert_eq!(view.region, "central");
        assert_eq!(view.locations.len(), 2);

        let nsb = &view.locations[0];
        assert_eq!(nsb.location, "New Smyrna Beach");
        assert_eq!(nsb.observations.len(), 72);
        assert!(nsb.error.is_none());

        let flagler = &view.locations[1];
        assert!(flagler.observations.is_empty());
        assert_eq!(flagler.error.as_deref(), Some("HTTP error: 404"));
    }

    #[test]
    fn test_history_serializes_display_column_names() {
        let view = service().history_at("central", fixed_now()).unwrap();
        let json = serde_json::to_value(&view).unwrap();
        let first = &json["locations"][0]["observations"][0];
        assert!(first.get("Timestamp").is_some());
        assert!(first.get("Wave Height (ft)").is_some());
        assert!(first.get("Water Temp (°F)").is_some());
        assert!(json["locations"][0].get("error").is_none());
    }

    #[test]
    fn test_compare_covers_all_regions() {
        let view = service().compare_at(fixed_now()).unwrap();
        assert!(view.chart.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(view.top_location.as_deref(), Some("New Smyrna Beach"));
        assert_eq!(view.failed_locations.len(), 1);
        assert_eq!(view.failed_locations[0].location, "Flagler Pier");

        let jupiter_rows = view.combined.iter().filter(|r| r.location == "Jupiter").count();
        assert_eq!(jupiter_rows, 48);
    }

    #[test]
    fn test_combined_rows_are_tagged_with_location() {
        let view = service().compare_at(fixed_now()).unwrap();
        let json = serde_json::to_value(&view.combined[0]).unwrap();
        assert_eq!(json["Location"], "New Smyrna Beach");
        assert!(json.get("Wave Height (ft)").is_some());
    }

    #[test]
    fn test_forecast_excludes_failed_and_sparse_locations() {
        let view = service().forecast_at("central", fixed_now()).unwrap();
        assert_eq!(view.results.len(), 1);
        assert_eq!(view.results[0].location, "New Smyrna Beach");
        assert!(view.chart.starts_with("data:image/svg+xml;base64,"));

        let south = service().forecast_at("south", fixed_now()).unwrap();
        assert!(south.results.is_empty(), "6 samples is not enough to forecast");
        assert!(!south.chart.is_empty());
    }

    #[test]
    fn test_forecast_predicts_rising_trend() {
        let view = service().forecast_at("central", fixed_now()).unwrap();
        let latest_ft = crate::units::m_to_ft(2.0);
        assert!(view.results[0].predicted_wave_height_ft > latest_ft);
    }
}
