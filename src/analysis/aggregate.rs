/// Multi-station aggregation.
///
/// `aggregate` runs fetch → normalize for every location of every region
/// and returns one `LocationSeries` per declared location, in declaration
/// order, whether or not its station answered. `aggregate_region` does the
/// same for a single region.
///
/// Station fetches are independent, so each distinct station id is fetched
/// once per call on a small worker pool and the results are fanned back out
/// to every location that shares the buoy.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use threadpool::ThreadPool;

use super::normalize::normalize_with_retention;
use crate::ingest::TelemetrySource;
use crate::logging;
use crate::model::{FetchError, LocationSeries, RawSeries};
use crate::stations::{Region, StationRegistry};

/// Per-call knobs for fetching and normalizing.
#[derive(Debug, Clone)]
pub struct AggregateOptions {
    pub now: DateTime<Utc>,
    pub retention: Duration,
    pub workers: usize,
}

impl AggregateOptions {
    /// 72 hour window ending now, sequential fetches.
    pub fn now() -> Self {
        AggregateOptions {
            now: Utc::now(),
            retention: Duration::hours(super::normalize::RETENTION_HOURS),
            workers: 1,
        }
    }
}

/// Combined multi-region result for the comparison view.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub combined: Vec<LocationSeries>,
    pub top_location: Option<String>,
}

// ---------------------------------------------------------------------------
// Fetching
// ---------------------------------------------------------------------------

/// Fetches each station once on a pool of `workers` threads.
///
/// Every requested id is present in the returned map; a worker that dies
/// without reporting is recorded as `FetchError::Worker`.
pub fn fetch_stations(
    source: &Arc<dyn TelemetrySource>,
    station_ids: &[&str],
    workers: usize,
) -> HashMap<String, Result<RawSeries, FetchError>> {
    let mut results = HashMap::new();
    if station_ids.is_empty() {
        return results;
    }

    let pool = ThreadPool::new(workers.max(1).min(station_ids.len()));
    let (tx, rx) = mpsc::channel();

    for &station_id in station_ids {
        let source = Arc::clone(source);
        let tx = tx.clone();
        let station_id = station_id.to_string();
        pool.execute(move || {
            let result = source.fetch(&station_id);
            // Receiver outlives the pool; a send error means nobody is listening.
            let _ = tx.send((station_id, result));
        });
    }
    drop(tx);

    for (station_id, result) in rx.iter() {
        results.insert(station_id, result);
    }

    for &station_id in station_ids {
        results
            .entry(station_id.to_string())
            .or_insert_with(|| Err(FetchError::Worker(format!("no result for station {}", station_id))));
    }

    results
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Fetches and normalizes every location of one region.
pub fn aggregate_region(
    region: &Region,
    source: &Arc<dyn TelemetrySource>,
    options: &AggregateOptions,
) -> Vec<LocationSeries> {
    collect_regions(std::slice::from_ref(region), source, options)
}

/// Fetches and normalizes every location of every region, and picks the
/// location with the highest latest wave height.
pub fn aggregate(
    registry: &StationRegistry,
    source: &Arc<dyn TelemetrySource>,
    options: &AggregateOptions,
) -> Aggregation {
    let combined = collect_regions(registry.regions(), source, options);
    let top_location = top_location(&combined).map(str::to_string);
    Aggregation { combined, top_location }
}

fn collect_regions(
    regions: &[Region],
    source: &Arc<dyn TelemetrySource>,
    options: &AggregateOptions,
) -> Vec<LocationSeries> {
    let mut station_ids: Vec<&str> = Vec::new();
    for location in regions.iter().flat_map(|r| r.locations.iter()) {
        if !station_ids.contains(&location.station_id.as_str()) {
            station_ids.push(&location.station_id);
        }
    }

    let fetched = fetch_stations(source, &station_ids, options.workers);

    let failed = fetched.values().filter(|r| r.is_err()).count();
    for (station_id, result) in &fetched {
        if let Err(err) = result {
            logging::log_fetch_failure(station_id, "fetch realtime feed", err);
        }
    }
    logging::log_fetch_summary(fetched.len(), fetched.len() - failed, failed);

    let mut combined = Vec::new();
    for region in regions {
        for location in &region.locations {
            let data = match fetched.get(&location.station_id) {
                Some(Ok(raw)) => Ok(normalize_with_retention(raw, options.now, options.retention)),
                Some(Err(err)) => Err(err.clone()),
                None => Err(FetchError::Worker(format!("station {} was not fetched", location.station_id))),
            };

            combined.push(LocationSeries {
                region: region.id.clone(),
                location: location.name.clone(),
                station_id: location.station_id.clone(),
                data,
            });
        }
    }

    combined
}

/// Location whose most recent wave-height reading is the highest.
///
/// Each location contributes its latest observation that carries a wave
/// height; ties keep the location encountered first. `None` when no
/// location has any wave height.
pub fn top_location(series: &[LocationSeries]) -> Option<&str> {
    let mut best: Option<(&str, f64)> = None;

    for entry in series {
        let Some(height) = entry
            .series()
            .and_then(|s| s.latest_wave_height())
            .and_then(|o| o.wave_height_ft)
        else {
            continue;
        };

        match best {
            Some((_, best_height)) if height <= best_height => {}
            _ => best = Some((entry.location.as_str(), height)),
        }
    }

    best.map(|(name, _)| name)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
