/// Float plan assembly.
///
/// Submodules:
/// - `assembler` - validate, compute, and aggregate one plan
/// - `shuttle`   - drive-back routing between take-out and put-in
///
/// This module holds the plan's output types and the request/error types
/// shared with the HTTP layer.

pub mod assembler;
pub mod shuttle;

pub use assembler::{PlanAssembler, PlanSettings, PlanSources};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::condition::ResolvedCondition;
use crate::float_time::FloatTimeEstimate;
use crate::model::{AccessPoint, ConditionCode, Hazard, River, VesselType};

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlanRequest {
    pub river_id: String,
    pub start_id: String,
    pub end_id: String,
    /// Vessel id or slug; the configured default vessel when absent.
    pub vessel_type_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatPlan {
    pub river: River,
    pub put_in: AccessPoint,
    pub take_out: AccessPoint,
    pub vessel: VesselType,
    pub distance_miles: f64,
    pub start_mile: f64,
    pub end_mile: f64,
    pub geometry: serde_json::Value,
    /// `None` when no estimate could be made; never zero.
    pub float_time: Option<FloatTimeEstimate>,
    pub drive_back: DriveBack,
    pub condition: ResolvedCondition,
    pub flow: FlowSummary,
    pub hazards: Vec<Hazard>,
    pub warnings: Vec<PlanWarning>,
    /// Fields narrowed because a collaborator failed.
    pub degraded: Vec<DegradedField>,
    pub generated_at: DateTime<Utc>,
}

impl FloatPlan {
    pub fn is_degraded(&self, field: DegradedField) -> bool {
        self.degraded.contains(&field)
    }
}

/// Shuttle drive from the take-out back to the put-in.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveBack {
    pub minutes: i64,
    pub miles: f64,
    pub formatted: String,
    pub route_summary: Option<String>,
    pub route: Option<serde_json::Value>,
}

impl DriveBack {
    /// Placeholder returned when routing fails.
    pub fn unknown() -> Self {
        DriveBack {
            minutes: 0,
            miles: 0.0,
            formatted: "Unknown".to_string(),
            route_summary: None,
            route: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradedField {
    Condition,
    FloatTime,
    DriveBack,
    Hazards,
    Statistics,
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningLevel {
    Info,
    Caution,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    GaugeAccuracy,
    DangerousWater,
    HighWater,
    StaleReading,
    Upstream,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanWarning {
    pub kind: WarningKind,
    pub level: WarningLevel,
    pub message: String,
}

// ---------------------------------------------------------------------------
// Flow rating
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowRating {
    Poor,
    Low,
    Good,
    High,
    Flood,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowSummary {
    pub rating: FlowRating,
    pub description: String,
    /// Where the current discharge sits among all recorded years for today.
    pub percentile: Option<f64>,
    pub median_cfs: Option<f64>,
}

impl FlowSummary {
    /// Rating and description from the condition code alone.
    pub fn for_condition(code: ConditionCode) -> Self {
        let (rating, description) = match code {
            ConditionCode::TooLow => (FlowRating::Poor, "Too low to float; expect to walk your boat"),
            ConditionCode::VeryLow => (FlowRating::Poor, "Very low; frequent dragging through riffles"),
            ConditionCode::Low => (FlowRating::Low, "Floatable with some scraping in shallow spots"),
            ConditionCode::Optimal => (FlowRating::Good, "Good floating conditions"),
            ConditionCode::High => (FlowRating::High, "High, fast water; experienced paddlers only"),
            ConditionCode::Dangerous => (FlowRating::Flood, "Flood conditions; do not float"),
            ConditionCode::Unknown => (FlowRating::Unknown, "Current conditions are unavailable"),
        };
        FlowSummary {
            rating,
            description: description.to_string(),
            percentile: None,
            median_cfs: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal plan failures. Degraded collaborators never surface here.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The request itself is malformed.
    Validation(String),
    /// River, access point, or vessel does not exist or is not published.
    NotFound(String),
    /// The river segment could not be computed.
    Computation(String),
    /// The reference store failed while validating the request.
    Internal(String),
}

impl PlanError {
    pub fn status_code(&self) -> u16 {
        match self {
            PlanError::Validation(_) => 400,
            PlanError::NotFound(_) => 404,
            PlanError::Computation(_) | PlanError::Internal(_) => 500,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PlanError::Validation(m)
            | PlanError::NotFound(m)
            | PlanError::Computation(m)
            | PlanError::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::Validation(msg) => write!(f, "Invalid request: {}", msg),
            PlanError::NotFound(msg) => write!(f, "Not found: {}", msg),
            PlanError::Computation(msg) => write!(f, "Could not compute plan: {}", msg),
            PlanError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for PlanError {}
