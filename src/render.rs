/// Chart rendering for the comparison and forecast views.
///
/// Charts are drawn with plotters into an in-memory SVG document and handed
/// out as a `ChartArtifact`, which the boundary layer embeds as a base64
/// `data:` URI. Nothing is written to disk.
///
/// Line colors come from `ColorAssignment`: each location gets the next
/// palette slot the first time it is seen, so a location keeps its color
/// for the whole chart regardless of how many of its traces are drawn.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use plotters::prelude::*;
use std::ops::Range;

use crate::model::{ChartArtifact, LocationForecast, LocationSeries, RenderError};

pub const SVG_MIME_TYPE: &str = "image/svg+xml";

/// Ten-color categorical palette (the common "tab10" set).
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Fraction of each forecast step drawn when dashing.
const DASH_FILL: f64 = 0.6;

/// Output size of rendered charts, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions { width: 1000, height: 500 }
    }
}

// ---------------------------------------------------------------------------
// Color assignment
// ---------------------------------------------------------------------------

/// Location name -> palette color, in first-encounter order.
#[derive(Debug, Default)]
pub struct ColorAssignment {
    seen: Vec<String>,
}

impl ColorAssignment {
    pub fn new() -> Self {
        Self::default()
    }

    /// The color for `location`, assigning the next slot on first sight.
    pub fn color_for(&mut self, location: &str) -> RGBColor {
        let slot = match self.seen.iter().position(|s| s == location) {
            Some(slot) => slot,
            None => {
                self.seen.push(location.to_string());
                self.seen.len() - 1
            }
        };
        PALETTE[slot % PALETTE.len()]
    }
}

// ---------------------------------------------------------------------------
// Artifact encoding
// ---------------------------------------------------------------------------

impl ChartArtifact {
    /// `data:<mime>;base64,<payload>`, embeddable in an `<img src>`.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

// ---------------------------------------------------------------------------
// Public renderers
// ---------------------------------------------------------------------------

/// One solid wave-height line per location.
///
/// Failed or empty series draw nothing but still consume their color slot,
/// so the remaining locations keep stable colors when a buoy is down.
pub fn render_comparison(series: &[LocationSeries], options: &ChartOptions) -> Result<ChartArtifact, RenderError> {
    let mut colors = ColorAssignment::new();
    let traces: Vec<Trace> = series
        .iter()
        .map(|entry| Trace {
            label: Some(entry.location.clone()),
            color: colors.color_for(&entry.location),
            points: entry.series().map(|s| s.wave_heights()).unwrap_or_default(),
            dashed: false,
        })
        .collect();

    draw_chart("Wave Height Comparison", &traces, options)
}

/// Solid history plus dashed forecast per location, sharing one color.
pub fn render_forecast(forecasts: &[LocationForecast], options: &ChartOptions) -> Result<ChartArtifact, RenderError> {
    let mut colors = ColorAssignment::new();
    let mut traces = Vec::with_capacity(forecasts.len() * 2);

    for entry in forecasts {
        let color = colors.color_for(&entry.location);
        traces.push(Trace {
            label: Some(entry.location.clone()),
            color,
            points: entry.history.wave_heights(),
            dashed: false,
        });
        traces.push(Trace {
            label: None,
            color,
            points: entry
                .forecast
                .points
                .iter()
                .map(|p| (p.timestamp, p.wave_height_ft))
                .collect(),
            dashed: true,
        });
    }

    draw_chart("Wave Height Forecast", &traces, options)
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

type Point = (DateTime<Utc>, f64);

struct Trace {
    /// Legend entry; `None` for traces that share another trace's entry.
    label: Option<String>,
    color: RGBColor,
    points: Vec<Point>,
    dashed: bool,
}

fn draw_err<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Draw(err.to_string())
}

fn draw_chart(title: &str, traces: &[Trace], options: &ChartOptions) -> Result<ChartArtifact, RenderError> {
    let (x_range, y_range) = axis_ranges(traces, Utc::now());
    let x_axis: RangedDateTime<DateTime<Utc>> = x_range.into();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 20))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_axis, y_range)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&|t: &DateTime<Utc>| t.format("%m/%d %H:%M").to_string())
            .y_label_formatter(&|v: &f64| format!("{:.1}", v))
            .x_desc("Time (UTC)")
            .y_desc("Wave Height (ft)")
            .draw()
            .map_err(draw_err)?;

        let mut has_legend = false;
        for trace in traces.iter().filter(|t| !t.points.is_empty()) {
            let style = trace.color.stroke_width(2);

            if trace.dashed {
                chart
                    .draw_series(
                        dash_segments(&trace.points)
                            .into_iter()
                            .map(|segment| PathElement::new(segment, style)),
                    )
                    .map_err(draw_err)?;
                continue;
            }

            let anno = chart
                .draw_series(LineSeries::new(trace.points.iter().copied(), style))
                .map_err(draw_err)?;
            if let Some(label) = &trace.label {
                has_legend = true;
                anno.label(label.clone())
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
            }
        }

        if has_legend {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
    }

    Ok(ChartArtifact {
        mime_type: SVG_MIME_TYPE,
        bytes: svg.into_bytes(),
    })
}

/// Axis ranges covering every point, padded so a single point or a flat
/// line still has extent. With no points at all the chart shows the
/// trailing 72 hours before `now` and 0..1 ft.
fn axis_ranges(traces: &[Trace], now: DateTime<Utc>) -> (Range<DateTime<Utc>>, Range<f64>) {
    let points = || traces.iter().flat_map(|t| t.points.iter());

    let x_min = points().map(|(t, _)| *t).min();
    let x_max = points().map(|(t, _)| *t).max();
    let x_range = match (x_min, x_max) {
        (Some(min), Some(max)) if min < max => min..max,
        (Some(min), Some(_)) => (min - Duration::hours(1))..(min + Duration::hours(1)),
        _ => (now - Duration::hours(72))..now,
    };

    let y_min = points().map(|(_, h)| *h).fold(f64::INFINITY, f64::min);
    let y_max = points().map(|(_, h)| *h).fold(f64::NEG_INFINITY, f64::max);
    let y_range = if !y_min.is_finite() || !y_max.is_finite() {
        0.0..1.0
    } else if (y_max - y_min).abs() < f64::EPSILON {
        (y_min - 1.0)..(y_max + 1.0)
    } else {
        let pad = (y_max - y_min) * 0.1;
        (y_min - pad)..(y_max + pad)
    };

    (x_range, y_range)
}

/// Splits a polyline into dashes: each step between consecutive points is
/// drawn for its first `DASH_FILL` fraction and left blank for the rest.
fn dash_segments(points: &[Point]) -> Vec<Vec<Point>> {
    points
        .windows(2)
        .map(|pair| {
            let (t0, h0) = pair[0];
            let (t1, h1) = pair[1];
            let span_ms = (t1 - t0).num_milliseconds() as f64;
            let t_end = t0 + Duration::milliseconds((span_ms * DASH_FILL) as i64);
            let h_end = h0 + (h1 - h0) * DASH_FILL;
            vec![(t0, h0), (t_end, h_end)]
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::forecast::{forecast_locations, Forecaster};
    use crate::model::{FetchError, Observation, Series};
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn location(name: &str, heights: Vec<Option<f64>>) -> LocationSeries {
        let observations = heights
            .into_iter()
            .enumerate()
            .map(|(k, h)| Observation {
                timestamp: start() + Duration::hours(k as i64),
                wave_height_ft: h,
                dominant_period_s: None,
                water_temp_f: None,
                air_temp_f: None,
            })
            .collect();
        LocationSeries {
            region: "central".to_string(),
            location: name.to_string(),
            station_id: "41012".to_string(),
            data: Ok(Series::new(observations)),
        }
    }

    fn svg_text(artifact: &ChartArtifact) -> String {
        String::from_utf8(artifact.bytes.clone()).expect("SVG output is UTF-8")
    }

    // --- Colors --------------------------------------------------------------

    #[test]
    fn test_colors_follow_first_encounter_order() {
        let mut colors = ColorAssignment::new();
        assert_eq!(colors.color_for("A"), PALETTE[0]);
        assert_eq!(colors.color_for("B"), PALETTE[1]);
        assert_eq!(colors.color_for("A"), PALETTE[0], "repeat lookups are stable");
        assert_eq!(colors.color_for("C"), PALETTE[2]);
    }

    #[test]
    fn test_colors_wrap_after_palette() {
        let mut colors = ColorAssignment::new();
        for i in 0..PALETTE.len() {
            colors.color_for(&format!("loc{}", i));
        }
        assert_eq!(colors.color_for("one more"), PALETTE[0]);
    }

    // --- Comparison charts ---------------------------------------------------

    #[test]
    fn test_comparison_with_zero_locations_still_renders() {
        let artifact = render_comparison(&[], &ChartOptions::default()).expect("empty chart renders");
        assert_eq!(artifact.mime_type, SVG_MIME_TYPE);
        assert!(!artifact.bytes.is_empty());
        assert!(svg_text(&artifact).contains("<svg"));
    }

    #[test]
    fn test_comparison_with_all_null_heights_renders() {
        let series = vec![location("Flagler Pier", vec![None; 12])];
        let artifact = render_comparison(&series, &ChartOptions::default()).expect("null data renders");
        assert!(!artifact.bytes.is_empty());
    }

    #[test]
    fn test_comparison_failed_location_draws_nothing_but_does_not_error() {
        let failed = LocationSeries {
            region: "central".to_string(),
            location: "Down".to_string(),
            station_id: "41113".to_string(),
            data: Err(FetchError::Http(500)),
        };
        let series = vec![failed, location("Up", vec![Some(2.0), Some(2.5), Some(3.0)])];
        let artifact = render_comparison(&series, &ChartOptions::default()).expect("chart renders");
        let svg = svg_text(&artifact);
        assert!(svg.contains("Up"), "legend should name the drawn location");
    }

    #[test]
    fn test_comparison_does_not_mutate_input() {
        let series = vec![location("A", vec![Some(1.0), Some(2.0)])];
        let before = series.clone();
        render_comparison(&series, &ChartOptions::default()).unwrap();
        assert_eq!(series, before);
    }

    // --- Forecast charts -----------------------------------------------------

    #[test]
    fn test_forecast_chart_renders_history_and_forecast() {
        let series = vec![location("Jupiter", (0..24).map(|k| Some(2.0 + 0.05 * k as f64)).collect())];
        let forecasts = forecast_locations(&series, &Forecaster::default());
        assert_eq!(forecasts.len(), 1);

        let artifact = render_forecast(&forecasts, &ChartOptions { width: 640, height: 360 })
            .expect("forecast chart renders");
        let svg = svg_text(&artifact);
        assert!(svg.contains("Jupiter"));
        assert!(svg.contains("640"), "requested width should appear in the SVG header");
    }

    #[test]
    fn test_forecast_chart_with_no_forecasts_renders() {
        let artifact = render_forecast(&[], &ChartOptions::default()).expect("empty forecast renders");
        assert!(!artifact.bytes.is_empty());
    }

    // --- Helpers -------------------------------------------------------------

    #[test]
    fn test_data_uri_prefix_and_payload() {
        let artifact = ChartArtifact { mime_type: SVG_MIME_TYPE, bytes: b"<svg/>".to_vec() };
        assert_eq!(artifact.to_data_uri(), "data:image/svg+xml;base64,PHN2Zy8+");
    }

    #[test]
    fn test_axis_ranges_default_when_empty() {
        let now = start();
        let (x, y) = axis_ranges(&[], now);
        assert_eq!(x, (now - Duration::hours(72))..now);
        assert_eq!(y, 0.0..1.0);
    }

    #[test]
    fn test_axis_ranges_pad_single_point() {
        let trace = Trace {
            label: None,
            color: PALETTE[0],
            points: vec![(start(), 3.0)],
            dashed: false,
        };
        let (x, y) = axis_ranges(&[trace], start());
        assert!(x.start < x.end);
        assert_eq!(y, 2.0..4.0);
    }

    #[test]
    fn test_axis_ranges_include_negative_forecasts() {
        let trace = Trace {
            label: None,
            color: PALETTE[0],
            points: vec![(start(), 1.0), (start() + Duration::hours(1), -1.0)],
            dashed: true,
        };
        let (_, y) = axis_ranges(&[trace], start());
        assert!(y.start < -1.0 && y.end > 1.0);
    }

    #[test]
    fn test_dash_segments_cover_part_of_each_step() {
        let points = vec![(start(), 0.0), (start() + Duration::hours(1), 10.0), (start() + Duration::hours(2), 0.0)];
        let dashes = dash_segments(&points);
        assert_eq!(dashes.len(), 2);
        assert_eq!(dashes[0][1].0, start() + Duration::minutes(36));
        assert!((dashes[0][1].1 - 6.0).abs() < 1e-9);
    }
}
