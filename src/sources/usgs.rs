/// USGS NWIS Instantaneous Values (IV) API client.
///
/// Handles URL construction, JSON response parsing, and grouping for the
/// USGS Water Services IV endpoint:
///   https://waterservices.usgs.gov/nwis/iv/
///
/// The IV service returns WaterML rendered as JSON. See `fixtures.rs` for
/// annotated examples of the response structure.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::model::{
    GaugeReading, Reading, SourceError, StationReading, PARAM_DISCHARGE, PARAM_STAGE,
};
use crate::sources::LiveReadings;

// ---------------------------------------------------------------------------
// WaterML JSON
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct IvResponse {
    value: IvBody,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IvBody {
    time_series: Vec<Series>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    source_info: Site,
    variable: Variable,
    values: Vec<ValueBlock>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Site {
    site_name: String,
    site_code: Vec<Code>,
}

/// `siteCode[]` and `variableCode[]` entries share this shape.
#[derive(Deserialize)]
struct Code {
    value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Variable {
    variable_code: Vec<Code>,
    unit: VariableUnit,
    no_data_value: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariableUnit {
    unit_code: String,
}

#[derive(Deserialize)]
struct ValueBlock {
    value: Vec<Point>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Point {
    /// Numeric, but sent as a string.
    value: String,
    #[serde(default)]
    qualifiers: Vec<String>,
    date_time: String,
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

pub const IV_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/iv/";

/// How far back the live fetch looks for the latest value.
const LIVE_PERIOD: &str = "PT12H";

/// Builds a USGS IV API URL for the given site codes, parameter codes,
/// and ISO 8601 period (e.g. `"PT1H"` for the past hour).
///
/// The returned URL always requests JSON format and filters to active
/// sites only.
pub fn build_iv_url(base_url: &str, sites: &[&str], param_codes: &[&str], period: &str) -> String {
    format!(
        "{}?sites={}&parameterCd={}&period={}&format=json&siteStatus=active",
        base_url,
        sites.join(","),
        param_codes.join(","),
        period
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parses a USGS IV API JSON response body into a flat list of
/// `GaugeReading`s, one per `timeSeries` entry that contains valid data.
/// Only the most recent value of each series is kept.
///
/// # Errors
/// - `SourceError::ParseError` - malformed or unexpected JSON structure.
/// - `SourceError::NoDataAvailable` - all `timeSeries` entries had either
///   an empty `value` array or the USGS sentinel value (`-999999`).
pub fn parse_iv_response(json: &str) -> Result<Vec<GaugeReading>, SourceError> {
    let response: IvResponse = serde_json::from_str(json)
        .map_err(|e| SourceError::ParseError(format!("JSON deserialization failed: {}", e)))?;

    if response.value.time_series.is_empty() {
        return Err(SourceError::NoDataAvailable(
            "No timeSeries entries in response".to_string(),
        ));
    }

    let mut readings = Vec::with_capacity(response.value.time_series.len());
    for series in response.value.time_series {
        if let Some(reading) = latest_reading(series)? {
            readings.push(reading);
        }
    }

    if readings.is_empty() {
        return Err(SourceError::NoDataAvailable(
            "Every timeSeries was empty or held only the no-data sentinel".to_string(),
        ));
    }
    Ok(readings)
}

fn first_code(codes: &[Code], field: &str) -> Result<String, SourceError> {
    codes
        .first()
        .map(|c| c.value.clone())
        .ok_or_else(|| SourceError::ParseError(format!("Missing {}", field)))
}

/// Newest value of one series, or `None` when the series is empty or its
/// newest value is the no-data sentinel.
fn latest_reading(series: Series) -> Result<Option<GaugeReading>, SourceError> {
    let site_code = first_code(&series.source_info.site_code, "siteCode")?;
    let parameter_code = first_code(&series.variable.variable_code, "variableCode")?;
    let block = series
        .values
        .first()
        .ok_or_else(|| SourceError::ParseError("Missing values array".to_string()))?;

    // Points arrive oldest first
    let Some(point) = block.value.last() else {
        return Ok(None);
    };
    let value: f64 = point.value.trim().parse().map_err(|e| {
        SourceError::ParseError(format!("Value '{}' for site {} is not a number: {}", point.value, site_code, e))
    })?;
    if (value - series.variable.no_data_value).abs() < 0.1 {
        return Ok(None);
    }

    Ok(Some(GaugeReading {
        site_code,
        site_name: series.source_info.site_name,
        parameter_code,
        unit: series.variable.unit.unit_code,
        value,
        datetime: point.date_time.clone(),
        qualifier: point.qualifiers.first().cloned().unwrap_or_else(|| "P".to_string()),
    }))
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Folds per-parameter readings into one `StationReading` per site.
///
/// Discharge comes from parameter `00060` and stage from `00065`; other
/// parameters are ignored. The station timestamp is the newer of the two.
/// Readings whose datetime cannot be parsed are dropped. Output is sorted
/// by site code.
pub fn group_by_station(readings: Vec<GaugeReading>) -> Vec<StationReading> {
    let mut grouped: HashMap<String, StationReading> = HashMap::new();

    for reading in readings {
        let Some(timestamp) = parse_datetime(&reading.datetime) else {
            continue;
        };

        let entry = grouped
            .entry(reading.site_code.clone())
            .or_insert_with(|| StationReading {
                site_code: reading.site_code.clone(),
                reading: Reading {
                    height_ft: None,
                    discharge_cfs: None,
                    timestamp,
                },
            });

        match reading.parameter_code.as_str() {
            PARAM_DISCHARGE => entry.reading.discharge_cfs = Some(reading.value),
            PARAM_STAGE => entry.reading.height_ft = Some(reading.value),
            _ => continue,
        }
        if timestamp > entry.reading.timestamp {
            entry.reading.timestamp = timestamp;
        }
    }

    let mut stations: Vec<StationReading> = grouped.into_values().collect();
    stations.sort_by(|a, b| a.site_code.cmp(&b.site_code));
    stations
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Blocking IV client. Cloneable and shareable across worker threads.
#[derive(Clone)]
pub struct UsgsClient {
    http: reqwest::blocking::Client,
    iv_base_url: String,
}

impl UsgsClient {
    pub fn new(http: reqwest::blocking::Client, iv_base_url: &str) -> Self {
        UsgsClient {
            http,
            iv_base_url: iv_base_url.to_string(),
        }
    }

    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(SourceError::HttpError(response.status().as_u16()));
        }

        Ok(response.text()?)
    }
}

impl LiveReadings for UsgsClient {
    fn readings(&self, site_codes: &[&str]) -> Result<Vec<StationReading>, SourceError> {
        if site_codes.is_empty() {
            return Ok(Vec::new());
        }
        let url = build_iv_url(
            &self.iv_base_url,
            site_codes,
            &[PARAM_DISCHARGE, PARAM_STAGE],
            LIVE_PERIOD,
        );
        let body = self.fetch(&url)?;
        Ok(group_by_station(parse_iv_response(&body)?))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
