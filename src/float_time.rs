/// Float time estimation.
///
/// A recorded time for the exact put-in/take-out/vessel combination always
/// wins over the speed model. Without one, the vessel's speed for the
/// current water level sets the pace:
///
///   too_low, very_low, low  →  low-water speed
///   optimal, unknown        →  normal speed
///   high, dangerous         →  high-water speed

use serde::Serialize;

use crate::model::{ConditionCode, VesselType};

/// Historically recorded float times, in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownSegmentTime {
    pub avg_minutes: Option<f64>,
    pub min_minutes: Option<f64>,
    pub max_minutes: Option<f64>,
    /// The record was taken paddling from take-out to put-in.
    pub is_reverse: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub min_minutes: i64,
    pub max_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloatTimeEstimate {
    pub minutes: i64,
    pub speed_mph: f64,
    /// False when the time comes from recorded trips.
    pub is_estimate: bool,
    pub time_range: Option<TimeRange>,
    pub formatted: String,
}

/// Vessel speed for a condition band.
pub fn speed_for_condition(vessel: &VesselType, condition: ConditionCode) -> f64 {
    match condition {
        ConditionCode::TooLow | ConditionCode::VeryLow | ConditionCode::Low => vessel.speed_low_water,
        ConditionCode::Optimal | ConditionCode::Unknown => vessel.speed_normal,
        ConditionCode::High | ConditionCode::Dangerous => vessel.speed_high_water,
    }
}

fn usable(speed: f64) -> bool {
    speed.is_finite() && speed > 0.0
}

/// Estimates how long the float takes. `None` means unknown, never zero.
pub fn estimate(
    distance_miles: f64,
    vessel: &VesselType,
    condition: ConditionCode,
    known: Option<&KnownSegmentTime>,
) -> Option<FloatTimeEstimate> {
    if !distance_miles.is_finite() || distance_miles <= 0.0 {
        return None;
    }

    if let Some(recorded) = known.and_then(|k| from_known_time(k, distance_miles)) {
        return Some(recorded);
    }

    let tier = speed_for_condition(vessel, condition);
    let speed = if usable(tier) {
        tier
    } else if usable(vessel.speed_normal) {
        vessel.speed_normal
    } else {
        return None;
    };

    let minutes = (distance_miles / speed * 60.0).round() as i64;
    Some(FloatTimeEstimate {
        minutes,
        speed_mph: round_to(speed, 2),
        is_estimate: true,
        time_range: None,
        formatted: format_duration(minutes),
    })
}

fn from_known_time(known: &KnownSegmentTime, distance_miles: f64) -> Option<FloatTimeEstimate> {
    let avg = known.avg_minutes.filter(|m| m.is_finite() && *m > 0.0)?;
    let minutes = avg.round() as i64;
    let time_range = match (known.min_minutes, known.max_minutes) {
        (Some(min), Some(max)) if min.is_finite() && max.is_finite() => Some(TimeRange {
            min_minutes: min.round() as i64,
            max_minutes: max.round() as i64,
        }),
        _ => None,
    };
    let formatted = match &time_range {
        Some(range) if range.min_minutes != range.max_minutes => format!(
            "{} – {}",
            format_duration(range.min_minutes),
            format_duration(range.max_minutes)
        ),
        _ => format_duration(minutes),
    };

    Some(FloatTimeEstimate {
        minutes,
        speed_mph: round_to(distance_miles / (avg / 60.0), 2),
        is_estimate: false,
        time_range,
        formatted,
    })
}

/// Human-readable duration: `"45 min"`, `"2 hr"`, `"4 hr 8 min"`.
pub fn format_duration(minutes: i64) -> String {
    let minutes = minutes.max(0);
    let hours = minutes / 60;
    let rest = minutes % 60;
    match (hours, rest) {
        (0, m) => format!("{} min", m),
        (h, 0) => format!("{} hr", h),
        (h, m) => format!("{} hr {} min", h, m),
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
