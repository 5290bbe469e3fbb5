/// surfwatch_service: buoy observation, comparison and forecast service
/// for Florida surf regions.
///
/// # Module structure
///
/// ```text
/// surfwatch_service
/// ├── model       — shared data types (Observation, Series, LocationSeries, FetchError, …)
/// ├── units       — metric to imperial conversions
/// ├── config      — service configuration loader (surfwatch.toml + env overrides)
/// ├── stations    — region and location registry (regions.toml)
/// ├── logging     — env_logger setup and fetch failure classification
/// ├── ingest
/// │   ├── ndbc    — NDBC realtime2 feed: URL construction, HTTP client, text parsing
/// │   └── fixtures (test only) — canned feeds and an in-memory source
/// ├── analysis
/// │   ├── normalize — retention window, dedup, unit conversion
/// │   ├── aggregate — per-region and cross-region fetch + normalize
/// │   └── forecast  — linear trend extrapolation
/// ├── render      — SVG line charts encoded as data URIs
/// ├── service     — request-scoped history / compare / forecast views
/// └── endpoint    — HTTP API over the service
/// ```

/// Public modules
pub mod analysis;
pub mod config;
pub mod endpoint;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod render;
pub mod service;
pub mod stations;
pub mod units;
