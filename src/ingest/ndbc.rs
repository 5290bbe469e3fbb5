/// NDBC (National Data Buoy Center) realtime feed client.
///
/// Retrieves the "standard meteorological" realtime2 text file for a buoy:
///   https://www.ndbc.noaa.gov/data/realtime2/{station}.txt
///
/// The file covers roughly the last 45 days, newest row first:
///
/// ```text
/// #YY  MM DD hh mm WDIR WSPD GST  WVHT   DPD   APD MWD   PRES  ATMP  WTMP  DEWP  VIS PTDY  TIDE
/// #yr  mo dy hr mn degT m/s  m/s     m   sec   sec degT   hPa  degC  degC  degC  nmi  hPa    ft
/// 2024 05 01 12 40 100  5.0  6.0   1.2     9   6.5 100 1015.2  25.1  26.0  21.0   MM   MM    MM
/// ```
///
/// Missing values are the literal token `MM` (which is also the name of the
/// month column; the two never collide because headers and data are parsed
/// separately).

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::time::Duration;

use super::TelemetrySource;
use crate::config::ServiceConfig;
use crate::model::{FetchError, RawObservation, RawSeries};

/// Missing-value sentinel used throughout the realtime2 files.
pub const MISSING_VALUE: &str = "MM";

// Column names in the header row (leading '#' stripped).
const COL_YEAR: &str = "YY";
const COL_MONTH: &str = "MM";
const COL_DAY: &str = "DD";
const COL_HOUR: &str = "hh";
const COL_MINUTE: &str = "mm";
const COL_WAVE_HEIGHT: &str = "WVHT";
const COL_DOMINANT_PERIOD: &str = "DPD";
const COL_WATER_TEMP: &str = "WTMP";
const COL_AIR_TEMP: &str = "ATMP";

const REQUIRED_COLUMNS: [&str; 9] = [
    COL_YEAR,
    COL_MONTH,
    COL_DAY,
    COL_HOUR,
    COL_MINUTE,
    COL_WAVE_HEIGHT,
    COL_DOMINANT_PERIOD,
    COL_WATER_TEMP,
    COL_AIR_TEMP,
];

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Builds the realtime2 URL for one station.
///
/// # Example
/// ```
/// use surfwatch_service::ingest::ndbc::build_realtime_url;
///
/// let url = build_realtime_url("https://www.ndbc.noaa.gov/data/realtime2/", "41112");
/// assert_eq!(url, "https://www.ndbc.noaa.gov/data/realtime2/41112.txt");
/// ```
pub fn build_realtime_url(base_url: &str, station_id: &str) -> String {
    format!(
        "{}/{}.txt",
        base_url.trim_end_matches('/'),
        urlencoding::encode(station_id)
    )
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Blocking HTTP source for NDBC realtime feeds.
pub struct NdbcClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl NdbcClient {
    /// Creates a client whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("surfwatch_service/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(map_reqwest_error)?;

        Ok(NdbcClient {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, FetchError> {
        Self::new(&config.ndbc_base_url, config.fetch_timeout())
    }

    pub fn feed_url(&self, station_id: &str) -> String {
        build_realtime_url(&self.base_url, station_id)
    }
}

impl TelemetrySource for NdbcClient {
    fn fetch(&self, station_id: &str) -> Result<RawSeries, FetchError> {
        let url = self.feed_url(station_id);
        log::debug!(target: "ndbc", "GET {}", url);

        let response = self.client.get(&url).send().map_err(map_reqwest_error)?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let text = response.text().map_err(map_reqwest_error)?;
        parse_realtime_txt(&text)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if let Some(status) = err.status() {
        FetchError::Http(status.as_u16())
    } else {
        FetchError::Network(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a realtime2 standard meteorological file into raw rows.
///
/// The first line names the columns, the second gives their units; any line
/// starting with `#` is treated as header. Columns are located by name so
/// extra or reordered columns are tolerated.
///
/// # Errors
/// - `FetchError::Schema` — empty body or a required column is missing.
/// - `FetchError::Parse`  — a data row has the wrong number of fields, an
///   impossible date, or a value that is neither numeric nor `MM`.
pub fn parse_realtime_txt(text: &str) -> Result<RawSeries, FetchError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (_, header_line) = lines
        .next()
        .ok_or_else(|| FetchError::Schema("empty feed".to_string()))?;

    let headers: Vec<&str> = header_line.trim_start_matches('#').split_whitespace().collect();

    // Build column index map
    let mut col_map: HashMap<&str, usize> = HashMap::new();
    for (idx, &header) in headers.iter().enumerate() {
        col_map.entry(header).or_insert(idx);
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !col_map.contains_key(c))
        .collect();
    if !missing.is_empty() {
        return Err(FetchError::Schema(format!("missing columns: {}", missing.join(", "))));
    }

    let col = |name: &str| col_map[name];
    let mut observations = Vec::new();

    for (line_no, line) in lines {
        if line.starts_with('#') {
            continue; // units row
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != headers.len() {
            return Err(FetchError::Parse {
                line: line_no,
                message: format!("expected {} fields, found {}", headers.len(), fields.len()),
            });
        }

        let timestamp = parse_timestamp(
            fields[col(COL_YEAR)],
            fields[col(COL_MONTH)],
            fields[col(COL_DAY)],
            fields[col(COL_HOUR)],
            fields[col(COL_MINUTE)],
        )
        .map_err(|message| FetchError::Parse { line: line_no, message })?;

        let value = |name: &str| {
            parse_value(fields[col(name)])
                .map_err(|message| FetchError::Parse { line: line_no, message: format!("{}: {}", name, message) })
        };

        observations.push(RawObservation {
            timestamp,
            wave_height_m: value(COL_WAVE_HEIGHT)?,
            dominant_period_s: value(COL_DOMINANT_PERIOD)?,
            water_temp_c: value(COL_WATER_TEMP)?,
            air_temp_c: value(COL_AIR_TEMP)?,
        });
    }

    Ok(observations)
}

/// Combines the five date/time columns into a UTC instant.
fn parse_timestamp(
    year: &str,
    month: &str,
    day: &str,
    hour: &str,
    minute: &str,
) -> Result<DateTime<Utc>, String> {
    let year: i32 = year.parse().map_err(|_| format!("invalid year '{}'", year))?;
    let month: u32 = month.parse().map_err(|_| format!("invalid month '{}'", month))?;
    let day: u32 = day.parse().map_err(|_| format!("invalid day '{}'", day))?;
    let hour: u32 = hour.parse().map_err(|_| format!("invalid hour '{}'", hour))?;
    let minute: u32 = minute.parse().map_err(|_| format!("invalid minute '{}'", minute))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| format!("invalid date {:04}-{:02}-{:02} {:02}:{:02}", year, month, day, hour, minute))
}

/// `MM` maps to `None`; anything else must be a number.
fn parse_value(token: &str) -> Result<Option<f64>, String> {
    if token == MISSING_VALUE {
        return Ok(None);
    }
    token
        .parse::<f64>()
        .map(Some)
        .map_err(|_| format!("invalid value '{}'", token))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use chrono::TimeZone;

    #[test]
    fn test_build_realtime_url_trims_trailing_slash() {
        assert_eq!(
            build_realtime_url("https://example.test/realtime2/", "41112"),
            "https://example.test/realtime2/41112.txt"
        );
        assert_eq!(
            build_realtime_url("https://example.test/realtime2", "41012"),
            "https://example.test/realtime2/41012.txt"
        );
    }

    #[test]
    fn test_build_realtime_url_encodes_station() {
        let url = build_realtime_url("https://example.test", "a b");
        assert_eq!(url, "https://example.test/a%20b.txt");
    }

    #[test]
    fn test_parse_skips_both_header_rows() {
        let rows = parse_realtime_txt(fixture_station_41112_txt()).expect("fixture should parse");
        assert_eq!(rows.len(), 4, "all four data rows should be kept");
    }

    #[test]
    fn test_parse_maps_columns_by_name() {
        let rows = parse_realtime_txt(fixture_station_41112_txt()).expect("fixture should parse");
        let newest = &rows[0];

        assert_eq!(newest.timestamp, Utc.with_ymd_and_hms(2024, 5, 1, 12, 40, 0).unwrap());
        assert_eq!(newest.wave_height_m, Some(1.2));
        assert_eq!(newest.dominant_period_s, Some(9.0));
        assert_eq!(newest.water_temp_c, Some(26.0));
        assert_eq!(newest.air_temp_c, Some(25.1));
    }

    #[test]
    fn test_parse_maps_sentinel_to_none() {
        let rows = parse_realtime_txt(fixture_station_41112_txt()).expect("fixture should parse");
        // Second row has MM for WVHT and DPD
        assert_eq!(rows[1].wave_height_m, None);
        assert_eq!(rows[1].dominant_period_s, None);
        assert_eq!(rows[1].water_temp_c, Some(25.9));
    }

    #[test]
    fn test_parse_header_only_is_empty_series() {
        let rows = parse_realtime_txt(fixture_header_only_txt()).expect("headers alone are valid");
        assert!(rows.is_empty());
    }

    #[test]
    fn test_parse_empty_body_is_schema_error() {
        assert!(matches!(parse_realtime_txt(""), Err(FetchError::Schema(_))));
        assert!(matches!(parse_realtime_txt("\n\n"), Err(FetchError::Schema(_))));
    }

    #[test]
    fn test_parse_missing_column_is_schema_error() {
        let text = "#YY  MM DD hh mm WDIR\n#yr  mo dy hr mn degT\n2024 05 01 12 40 100\n";
        match parse_realtime_txt(text) {
            Err(FetchError::Schema(msg)) => {
                assert!(msg.contains("WVHT"), "should name the missing column: {}", msg);
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_short_row_reports_line() {
        let text = format!("{}2024 05 01 12 40 1.2\n", fixture_header_only_txt());
        match parse_realtime_txt(&text) {
            Err(FetchError::Parse { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_garbage_value_is_parse_error() {
        let text = fixture_station_41112_txt().replace("  1.2 ", " abc ");
        assert!(matches!(parse_realtime_txt(&text), Err(FetchError::Parse { .. })));
    }

    #[test]
    fn test_parse_impossible_date_is_parse_error() {
        let text = fixture_station_41112_txt().replace("2024 05 01 12 40", "2024 02 30 12 40");
        assert!(matches!(parse_realtime_txt(&text), Err(FetchError::Parse { .. })));
    }

    #[test]
    fn test_client_builds_feed_url_from_config() {
        let config = ServiceConfig {
            ndbc_base_url: "http://localhost:9/realtime2".to_string(),
            ..ServiceConfig::default()
        };
        let client = NdbcClient::from_config(&config).expect("client should build");
        assert_eq!(client.feed_url("41114"), "http://localhost:9/realtime2/41114.txt");
    }
}
