/// Telemetry ingestion.
///
/// Submodules:
/// - `ndbc`     — NDBC realtime2 feed: URL construction, HTTP fetch, text parsing.
/// - `fixtures` — (test only) representative feed payloads and an in-memory source.
///
/// `TelemetrySource` is the seam between the aggregation layer and the
/// network: production code uses `ndbc::NdbcClient`, tests plug in fixtures.

use crate::model::{FetchError, RawSeries};

pub mod ndbc;

#[cfg(test)]
pub(crate) mod fixtures;

/// Anything that can produce the raw feed rows for a station id.
///
/// Implementations must be shareable across fetch worker threads.
pub trait TelemetrySource: Send + Sync {
    fn fetch(&self, station_id: &str) -> Result<RawSeries, FetchError>;
}
