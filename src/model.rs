/// Core data types for the float plan service.
///
/// This module defines the shared domain model imported by all other modules:
/// reference data (rivers, access points, gauges, vessels, hazards), gauge
/// readings, condition thresholds, and the collaborator error type. It holds
/// no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Parameter codes
// ---------------------------------------------------------------------------

/// USGS parameter code for discharge (streamflow), in cubic feet per second.
pub const PARAM_DISCHARGE: &str = "00060";

/// USGS parameter code for gage height (stage), in feet.
pub const PARAM_STAGE: &str = "00065";

/// A reading older than this is reported as stale everywhere in the service.
pub const STALE_READING_HOURS: i64 = 6;

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

/// WGS84 longitude/latitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lng: f64,
    pub lat: f64,
}

impl Coordinates {
    pub fn new(lng: f64, lat: f64) -> Self {
        Coordinates { lng, lat }
    }

    pub fn is_valid(&self) -> bool {
        self.lng.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lng)
            && (-90.0..=90.0).contains(&self.lat)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct River {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub length_miles: f64,
}

/// A put-in or take-out location on a river.
///
/// `river_mile` increases downstream and is the ordering key for everything
/// the planner compares: access points, gauges, and hazards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessPoint {
    pub id: String,
    pub river_id: String,
    pub name: String,
    pub river_mile: f64,
    pub coordinates: Coordinates,
    /// Parking-lot or road-end location, when it differs from the river bank.
    pub driving_coordinates: Option<Coordinates>,
    /// Position snapped to the river centerline.
    pub snapped_coordinates: Option<Coordinates>,
    /// Street address that routing should geocode instead of using coordinates.
    pub directions_override: Option<String>,
    pub is_public: bool,
    #[serde(skip)]
    pub approved: bool,
    pub amenities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GaugeStation {
    pub id: String,
    /// 8-digit (or longer) USGS site number.
    pub site_code: String,
    pub name: String,
    pub coordinates: Option<Coordinates>,
}

/// Whether a river's condition boundaries are expressed as stage or discharge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdUnit {
    Ft,
    Cfs,
}

impl ThresholdUnit {
    /// Unknown unit strings are treated as feet, the historical default.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "cfs" => ThresholdUnit::Cfs,
            _ => ThresholdUnit::Ft,
        }
    }
}

/// Condition boundaries for one river/gauge pair.
///
/// Built once where association rows are read and passed by value into the
/// classifier. Any boundary may be absent.
///
/// Expected ordering:
///   too_low <= low <= optimal_min <= optimal_max <= high <= dangerous
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionThresholds {
    pub unit: ThresholdUnit,
    pub too_low: Option<f64>,
    pub low: Option<f64>,
    pub optimal_min: Option<f64>,
    pub optimal_max: Option<f64>,
    pub high: Option<f64>,
    pub dangerous: Option<f64>,
}

impl ConditionThresholds {
    pub fn empty(unit: ThresholdUnit) -> Self {
        ConditionThresholds {
            unit,
            too_low: None,
            low: None,
            optimal_min: None,
            optimal_max: None,
            high: None,
            dangerous: None,
        }
    }

    /// Boundaries in ascending order, absent ones included.
    pub fn boundaries(&self) -> [Option<f64>; 6] {
        [
            self.too_low,
            self.low,
            self.optimal_min,
            self.optimal_max,
            self.high,
            self.dangerous,
        ]
    }

    pub fn has_any_boundary(&self) -> bool {
        self.boundaries().iter().any(Option::is_some)
    }

    /// True when every present boundary is finite and none is below an
    /// earlier present boundary.
    pub fn is_ordered(&self) -> bool {
        let mut previous: Option<f64> = None;
        for bound in self.boundaries().into_iter().flatten() {
            if !bound.is_finite() {
                return false;
            }
            if let Some(p) = previous {
                if bound < p {
                    return false;
                }
            }
            previous = Some(bound);
        }
        true
    }
}

/// Links a river to a gauge station with the thresholds used to classify
/// that gauge's readings for that river.
#[derive(Debug, Clone, PartialEq)]
pub struct RiverGaugeAssociation {
    pub river_id: String,
    pub gauge: GaugeStation,
    pub thresholds: ConditionThresholds,
    pub is_primary: bool,
    /// Position of the gauge along the river, when known.
    pub river_mile: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VesselType {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub speed_low_water: f64,
    pub speed_normal: f64,
    pub speed_high_water: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HazardSeverity {
    Info,
    Caution,
    Warning,
    Danger,
}

impl HazardSeverity {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "danger" | "dangerous" => HazardSeverity::Danger,
            "warning" => HazardSeverity::Warning,
            "caution" => HazardSeverity::Caution,
            _ => HazardSeverity::Info,
        }
    }
}

/// A known obstacle on a river: low-water bridge, rootwad, dam, rapid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    pub id: String,
    pub river_id: String,
    pub name: String,
    pub hazard_type: String,
    pub river_mile: f64,
    pub severity: HazardSeverity,
    pub portage_required: bool,
    pub portage_side: Option<String>,
    pub description: Option<String>,
    #[serde(skip)]
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single instantaneous measurement from a USGS gauge station.
///
/// Corresponds to one entry in the `values[].value[]` array of a USGS
/// IV API response, enriched with site and parameter metadata from the
/// enclosing `timeSeries` object.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeReading {
    pub site_code: String,
    pub site_name: String,
    pub parameter_code: String,
    pub unit: String,
    pub value: f64,
    pub datetime: String,   // ISO 8601, e.g. "2024-05-01T12:00:00.000-05:00"
    pub qualifier: String,  // "P" = provisional, "A" = approved
}

/// Stage and discharge for one station at one moment. Either value may be
/// absent when the station does not report it.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// A live reading tagged with the station that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct StationReading {
    pub site_code: String,
    pub reading: Reading,
}

// ---------------------------------------------------------------------------
// Condition codes
// ---------------------------------------------------------------------------

/// Classified severity band of the current water level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionCode {
    TooLow,
    VeryLow,
    Low,
    Optimal,
    High,
    Dangerous,
    Unknown,
}

impl ConditionCode {
    /// Severity rank for ordered codes; `Unknown` has no rank.
    pub fn rank(self) -> Option<u8> {
        match self {
            ConditionCode::TooLow => Some(0),
            ConditionCode::VeryLow => Some(1),
            ConditionCode::Low => Some(2),
            ConditionCode::Optimal => Some(3),
            ConditionCode::High => Some(4),
            ConditionCode::Dangerous => Some(5),
            ConditionCode::Unknown => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConditionCode::TooLow => "too_low",
            ConditionCode::VeryLow => "very_low",
            ConditionCode::Low => "low",
            ConditionCode::Optimal => "optimal",
            ConditionCode::High => "high",
            ConditionCode::Dangerous => "dangerous",
            ConditionCode::Unknown => "unknown",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ConditionCode::TooLow => "Too Low",
            ConditionCode::VeryLow => "Very Low",
            ConditionCode::Low => "Low",
            ConditionCode::Optimal => "Optimal",
            ConditionCode::High => "High",
            ConditionCode::Dangerous => "Dangerous",
            ConditionCode::Unknown => "Unknown",
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by external collaborators: the database, the USGS APIs,
/// the routing provider, and the geometry engine.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    /// Non-2xx HTTP response from an upstream API.
    HttpError(u16),
    /// The request could not be sent or the connection dropped.
    Transport(String),
    /// The request exceeded the configured timeout.
    Timeout(String),
    /// The response body could not be deserialized.
    ParseError(String),
    /// The source answered but contained no usable data values.
    NoDataAvailable(String),
    /// Database query failed.
    Database(String),
    /// The collaborator is not configured (e.g. missing API token).
    Unavailable(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::HttpError(code) => write!(f, "HTTP error: {}", code),
            SourceError::Transport(msg) => write!(f, "Transport error: {}", msg),
            SourceError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            SourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            SourceError::NoDataAvailable(msg) => write!(f, "No data available: {}", msg),
            SourceError::Database(msg) => write!(f, "Database error: {}", msg),
            SourceError::Unavailable(msg) => write!(f, "Source unavailable: {}", msg),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<reqwest::Error> for SourceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SourceError::Timeout(e.to_string())
        } else if let Some(status) = e.status() {
            SourceError::HttpError(status.as_u16())
        } else if e.is_decode() {
            SourceError::ParseError(e.to_string())
        } else {
            SourceError::Transport(e.to_string())
        }
    }
}

impl From<postgres::Error> for SourceError {
    fn from(e: postgres::Error) -> Self {
        SourceError::Database(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
