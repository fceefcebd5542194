/// USGS NWIS Daily Statistics Parser
///
/// Parses day-of-year discharge statistics from the USGS Statistics Service.
/// Format: Tab-delimited RDB (Research Data BYte-stream)
/// Source: https://waterservices.usgs.gov/nwis/stat/?format=rdb&sites={site}&statReportType=daily&statTypeCd=all&parameterCd=00060
///
/// Each data row covers one calendar day (month_nu, day_nu) and summarizes
/// every recorded year for that day: min, max, mean and a set of
/// percentiles. The plan uses them to say where today's flow sits relative
/// to history ("flowing at the 62nd percentile for May 1").

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::model::{SourceError, PARAM_DISCHARGE};
use crate::sources::FlowStatistics;

pub const STAT_BASE_URL: &str = "https://waterservices.usgs.gov/nwis/stat/";

/// Discharge statistics (cfs) for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStatistics {
    pub month: u32,
    pub day: u32,
    pub min: Option<f64>,
    pub p05: Option<f64>,
    pub p10: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub max: Option<f64>,
    pub years_of_record: Option<u32>,
}

impl DailyStatistics {
    /// (percentile, value) pairs for every statistic present, ascending.
    fn curve(&self) -> Vec<(f64, f64)> {
        [
            (0.0, self.min),
            (5.0, self.p05),
            (10.0, self.p10),
            (25.0, self.p25),
            (50.0, self.p50),
            (75.0, self.p75),
            (90.0, self.p90),
            (95.0, self.p95),
            (100.0, self.max),
        ]
        .into_iter()
        .filter_map(|(pct, v)| v.filter(|v| v.is_finite()).map(|v| (pct, v)))
        .collect()
    }
}

/// Where `value` falls in the historical distribution, 0–100.
///
/// Interpolates linearly between the two bracketing statistics. Values
/// outside the recorded range clamp to the outermost percentile present.
/// Returns `None` for a non-finite value, fewer than two statistics, or
/// statistics that decrease with percentile.
pub fn percentile(value: f64, stats: &DailyStatistics) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    let curve = stats.curve();
    if curve.len() < 2 || curve.windows(2).any(|w| w[1].1 < w[0].1) {
        return None;
    }

    let (first_pct, first_val) = curve[0];
    let (last_pct, last_val) = curve[curve.len() - 1];
    if value <= first_val {
        return Some(first_pct);
    }
    if value >= last_val {
        return Some(last_pct);
    }

    for pair in curve.windows(2) {
        let (lo_pct, lo_val) = pair[0];
        let (hi_pct, hi_val) = pair[1];
        if value >= lo_val && value <= hi_val {
            if hi_val == lo_val {
                return Some(lo_pct);
            }
            let fraction = (value - lo_val) / (hi_val - lo_val);
            let pct = lo_pct + fraction * (hi_pct - lo_pct);
            return Some((pct * 10.0).round() / 10.0);
        }
    }
    None
}

/// Builds the statistics service URL for one site's daily discharge stats.
pub fn build_stat_url(base_url: &str, site_code: &str) -> String {
    format!(
        "{}?format=rdb&sites={}&statReportType=daily&statTypeCd=all&parameterCd={}",
        base_url, site_code, PARAM_DISCHARGE
    )
}

/// Parse a USGS daily statistics RDB document and return the row for
/// `month`/`day`.
///
/// RDB format structure:
/// - Lines starting with '#' are comments (metadata header)
/// - First non-comment line: tab-delimited column names
/// - Second non-comment line: tab-delimited format descriptors (e.g., "5s", "12s")
/// - Remaining lines: tab-delimited data rows
///
/// Returns `Ok(None)` when the document is well formed but has no row for
/// the requested day.
pub fn parse_daily_statistics(
    rdb_text: &str,
    month: u32,
    day: u32,
) -> Result<Option<DailyStatistics>, SourceError> {
    let mut data_lines = rdb_text
        .lines()
        .filter(|line| !line.trim().starts_with('#') && !line.trim().is_empty());

    let header_line = data_lines
        .next()
        .ok_or_else(|| SourceError::ParseError("No header line found in RDB data".into()))?;
    let col_map: HashMap<&str, usize> = header_line
        .split('\t')
        .enumerate()
        .map(|(idx, header)| (header.trim(), idx))
        .collect();

    for required in ["month_nu", "day_nu"] {
        if !col_map.contains_key(required) {
            return Err(SourceError::ParseError(format!("Missing {} column", required)));
        }
    }

    // Format descriptors
    data_lines
        .next()
        .ok_or_else(|| SourceError::ParseError("No format line found in RDB data".into()))?;

    for line in data_lines {
        let fields: Vec<&str> = line.split('\t').collect();
        let field = |name: &str| column(&fields, &col_map, name);
        let number = |name: &str| field(name).and_then(|s| s.parse::<f64>().ok());

        let row_month = field("month_nu").and_then(|s| s.parse::<u32>().ok());
        let row_day = field("day_nu").and_then(|s| s.parse::<u32>().ok());
        if row_month != Some(month) || row_day != Some(day) {
            continue;
        }

        return Ok(Some(DailyStatistics {
            month,
            day,
            min: number("min_va"),
            p05: number("p05_va"),
            p10: number("p10_va"),
            p25: number("p25_va"),
            p50: number("p50_va"),
            p75: number("p75_va"),
            p90: number("p90_va"),
            p95: number("p95_va"),
            max: number("max_va"),
            years_of_record: field("count_nu").and_then(|s| s.parse::<u32>().ok()),
        }));
    }

    Ok(None)
}

/// Trimmed, non-empty value of a named column.
fn column<'a>(fields: &[&'a str], col_map: &HashMap<&str, usize>, name: &str) -> Option<&'a str> {
    col_map
        .get(name)
        .and_then(|&idx| fields.get(idx).copied())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Blocking client for the USGS statistics service.
#[derive(Clone)]
pub struct StatsClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl StatsClient {
    pub fn new(http: reqwest::blocking::Client, base_url: &str) -> Self {
        StatsClient {
            http,
            base_url: base_url.to_string(),
        }
    }
}

impl FlowStatistics for StatsClient {
    fn daily_statistics(
        &self,
        site_code: &str,
        on: NaiveDate,
    ) -> Result<Option<DailyStatistics>, SourceError> {
        let url = build_stat_url(&self.base_url, site_code);
        let response = self.http.get(&url).send()?;

        // The service answers 404 for sites without published statistics
        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::HttpError(response.status().as_u16()));
        }

        let body = response.text()?;
        parse_daily_statistics(&body, on.month(), on.day())
    }
}
