/// Short-horizon wave height forecasting by linear trend extrapolation.
///
/// Fits an ordinary-least-squares line of wave height against a continuous
/// time coordinate (day ordinal plus fraction of the day) and projects it
/// hourly past the latest observation. There is no seasonality and no
/// clamping: a falling trend may predict negative wave heights.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

use crate::model::{ForecastPoint, ForecastResult, LocationForecast, LocationSeries, Series};
use crate::units::round_to;

/// Number of hourly steps predicted past the latest observation.
pub const FORECAST_HORIZON_HOURS: u32 = 12;

/// Fewer non-null wave heights than this and no trend is fitted.
pub const MIN_FORECAST_SAMPLES: usize = 10;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Forecast settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Forecaster {
    pub horizon_hours: u32,
    pub min_samples: usize,
}

impl Default for Forecaster {
    fn default() -> Self {
        Forecaster {
            horizon_hours: FORECAST_HORIZON_HOURS,
            min_samples: MIN_FORECAST_SAMPLES,
        }
    }
}

/// Ordinary-least-squares line `y = mean_y + slope * (x - mean_x)`.
///
/// Kept in centered form: day ordinals are around 7.4e5, and centering
/// avoids cancellation when summing their squares.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TrendLine {
    mean_x: f64,
    mean_y: f64,
    slope: f64,
}

impl TrendLine {
    fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;

        let (sxx, sxy) = points.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });

        // All samples at the same instant: no time spread to fit against.
        if sxx <= f64::EPSILON {
            return None;
        }

        Some(TrendLine { mean_x, mean_y, slope: sxy / sxx })
    }

    fn predict(&self, x: f64) -> f64 {
        self.mean_y + self.slope * (x - self.mean_x)
    }
}

/// Continuous time coordinate in days: proleptic Gregorian day ordinal
/// (0001-01-01 is day 1) plus the elapsed fraction of that day.
pub fn time_coordinate(timestamp: DateTime<Utc>) -> f64 {
    let seconds = timestamp.num_seconds_from_midnight() as f64;
    timestamp.date_naive().num_days_from_ce() as f64 + seconds / SECONDS_PER_DAY
}

impl Forecaster {
    /// Fits a trend to `series` and extrapolates `horizon_hours` steps.
    ///
    /// Returns `None` when fewer than `min_samples` rows carry a wave
    /// height, or when all of them share one timestamp.
    pub fn forecast(&self, series: &Series) -> Option<ForecastResult> {
        let samples = series.wave_heights();
        if samples.len() < self.min_samples || self.horizon_hours == 0 {
            return None;
        }

        let points: Vec<(f64, f64)> = samples
            .iter()
            .map(|(t, h)| (time_coordinate(*t), *h))
            .collect();
        let trend = TrendLine::fit(&points)?;

        let latest = samples.iter().map(|(t, _)| *t).max()?;
        let predictions: Vec<ForecastPoint> = (1..=self.horizon_hours)
            .map(|step| {
                let timestamp = latest + Duration::hours(step as i64);
                ForecastPoint {
                    timestamp,
                    wave_height_ft: trend.predict(time_coordinate(timestamp)),
                }
            })
            .collect();

        let final_wave_height_ft = round_to(predictions.last()?.wave_height_ft, 2);

        Some(ForecastResult {
            final_wave_height_ft,
            points: predictions,
            slope_ft_per_hour: trend.slope / 24.0,
            sample_count: samples.len(),
        })
    }
}

/// Forecasts with the default 10 sample minimum.
pub fn forecast(series: &Series, horizon_hours: u32) -> Option<ForecastResult> {
    Forecaster {
        horizon_hours,
        ..Forecaster::default()
    }
    .forecast(series)
}

/// Forecasts every location with a usable series, preserving input order.
///
/// Failed fetches and locations with too little data are left out.
pub fn forecast_locations(series: &[LocationSeries], forecaster: &Forecaster) -> Vec<LocationForecast> {
    let mut results = Vec::new();

    for entry in series {
        let Some(data) = entry.series() else {
            continue;
        };

        let history = Series::new(
            data.iter()
                .filter(|o| o.wave_height_ft.is_some())
                .cloned()
                .collect(),
        );

        match forecaster.forecast(&history) {
            Some(forecast) => results.push(LocationForecast {
                location: entry.location.clone(),
                station_id: entry.station_id.clone(),
                history,
                forecast,
            }),
            None => log::debug!(
                target: "forecast",
                "[{}] skipped: {} wave height samples (need {})",
                entry.location,
                history.len(),
                forecaster.min_samples
            ),
        }
    }

    results
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
