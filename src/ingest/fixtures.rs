/// Test fixtures: representative NDBC realtime2 payloads.
///
/// The static fixtures are truncated copies of a real standard
/// meteorological file. Since the normalizer keeps only the trailing 72
/// hours, `generated_feed` builds feeds relative to a caller-supplied "now"
/// so pipeline tests do not depend on the wall clock.
///
/// Feed shape:
///   line 1 — column names, prefixed with '#'
///   line 2 — units, prefixed with '#'
///   rows   — newest first, `MM` for missing values

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use super::ndbc::parse_realtime_txt;
use super::TelemetrySource;
use crate::model::{FetchError, RawSeries};

const HEADER: &str = "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
#yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
";

/// Station 41112 (offshore Fernandina Beach), four rows around 2024-05-01.
/// The 12:10 row is missing wave height and dominant period.
pub(crate) fn fixture_station_41112_txt() -> &'static str {
    "\
#YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
#yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
2024 05 01 12 40  MM   MM   MM   1.2     9   6.5 100     MM  25.1  26.0    MM   MM   MM    MM
2024 05 01 12 10  MM   MM   MM    MM    MM    MM  MM     MM  25.0  25.9    MM   MM   MM    MM
2024 05 01 11 40  MM   MM   MM   1.1    10   6.3  95     MM  24.8  25.9    MM   MM   MM    MM
2024 05 01 11 10  MM   MM   MM   1.1    10   6.2  95     MM  24.6  25.8    MM   MM   MM    MM
"
}

/// A feed with headers but no rows (buoy adrift or newly deployed).
pub(crate) fn fixture_header_only_txt() -> &'static str {
    HEADER
}

/// Builds a feed with one row per hour ending at `now`, newest first.
///
/// Row `k` (k hours before `now`) reports `wave_height_m(k)`; temperatures
/// are fixed at 25.0 °C air / 26.0 °C water.
pub(crate) fn generated_feed(
    now: DateTime<Utc>,
    hours: i64,
    wave_height_m: impl Fn(i64) -> Option<f64>,
) -> String {
    let mut text = String::from(HEADER);
    for k in 0..hours {
        let t = now - Duration::hours(k);
        let wvht = wave_height_m(k)
            .map(|h| format!("{:.2}", h))
            .unwrap_or_else(|| "MM".to_string());
        text.push_str(&format!(
            "{} 180  5.0  6.0 {:>5}     8   6.0 180 1015.0  25.0  26.0  21.0   MM   MM    MM\n",
            t.format("%Y %m %d %H %M"),
            wvht
        ));
    }
    text
}

/// In-memory `TelemetrySource` serving canned feeds or failures.
#[derive(Default)]
pub(crate) struct FixtureSource {
    feeds: HashMap<String, Result<String, FetchError>>,
}

impl FixtureSource {
    pub(crate) fn with_feed(mut self, station_id: &str, text: String) -> Self {
        self.feeds.insert(station_id.to_string(), Ok(text));
        self
    }

    pub(crate) fn with_failure(mut self, station_id: &str, err: FetchError) -> Self {
        self.feeds.insert(station_id.to_string(), Err(err));
        self
    }
}

impl TelemetrySource for FixtureSource {
    fn fetch(&self, station_id: &str) -> Result<RawSeries, FetchError> {
        match self.feeds.get(station_id) {
            Some(Ok(text)) => parse_realtime_txt(text),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::Http(404)),
        }
    }
}
