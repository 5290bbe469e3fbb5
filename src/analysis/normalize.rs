/// Normalization of raw feed rows into display-unit series.
///
/// Converts metric values to feet / Fahrenheit, drops rows outside the
/// retention window and collapses duplicate timestamps. The output always
/// carries exactly the five `Observation` fields.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::model::{Observation, RawObservation, RawSeries, Series};
use crate::units::{c_to_f, m_to_ft};

/// Trailing window of observations kept for display and analysis.
pub const RETENTION_HOURS: i64 = 72;

/// Normalizes with the default 72 hour window, measured from `now`.
pub fn normalize(raw: &RawSeries, now: DateTime<Utc>) -> Series {
    normalize_with_retention(raw, now, Duration::hours(RETENTION_HOURS))
}

/// Normalizes against the current wall clock, read once per call.
pub fn normalize_now(raw: &RawSeries) -> Series {
    normalize(raw, Utc::now())
}

/// Keeps rows with `now - retention < timestamp <= now`.
///
/// When the feed repeats a timestamp only the first row is kept. NDBC lists
/// newest first, so that is the most recently written revision of the row.
pub fn normalize_with_retention(raw: &RawSeries, now: DateTime<Utc>, retention: Duration) -> Series {
    let cutoff = now - retention;
    let mut seen = HashSet::new();

    let observations = raw
        .iter()
        .filter(|r| r.timestamp > cutoff && r.timestamp <= now)
        .filter(|r| seen.insert(r.timestamp))
        .map(convert)
        .collect();

    Series::new(observations)
}

fn convert(raw: &RawObservation) -> Observation {
    Observation {
        timestamp: raw.timestamp,
        wave_height_ft: raw.wave_height_m.map(m_to_ft),
        dominant_period_s: raw.dominant_period_s,
        water_temp_f: raw.water_temp_c.map(c_to_f),
        air_temp_f: raw.air_temp_c.map(c_to_f),
    }
}
