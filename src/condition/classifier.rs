//! Water condition classification.
//!
//! Maps a gauge reading onto one of the six ordered condition bands using a
//! river's thresholds. Pure and total: malformed thresholds or missing
//! readings produce `ConditionCode::Unknown`, never a panic.

use crate::model::{ConditionCode, ConditionThresholds, ThresholdUnit};

/// Picks the reading the thresholds are expressed in, falling back to the
/// other measurement when the preferred one is absent.
pub fn governing_value(
    height_ft: Option<f64>,
    discharge_cfs: Option<f64>,
    thresholds: &ConditionThresholds,
) -> Option<f64> {
    match thresholds.unit {
        ThresholdUnit::Cfs => discharge_cfs.or(height_ft),
        ThresholdUnit::Ft => height_ft.or(discharge_cfs),
    }
}

/// Classifies a reading against `thresholds`.
///
/// Bands, lower bound inclusive:
///
/// ```text
///   v <  too_low                      too_low
///   too_low     <= v <  low           very_low
///   low         <= v <  optimal_min   low
///   optimal_min <= v <= optimal_max   optimal
///   optimal_max <  v <  dangerous     high   (also high <= v)
///   dangerous   <= v                  dangerous
/// ```
///
/// A missing boundary disables its check. When the value sits below every
/// present lower boundary it lands in the band just under the lowest one.
pub fn classify(
    height_ft: Option<f64>,
    discharge_cfs: Option<f64>,
    thresholds: &ConditionThresholds,
) -> ConditionCode {
    let value = match governing_value(height_ft, discharge_cfs, thresholds) {
        Some(v) if v.is_finite() => v,
        _ => return ConditionCode::Unknown,
    };

    if !thresholds.has_any_boundary() || !thresholds.is_ordered() {
        return ConditionCode::Unknown;
    }

    let at_least = |bound: Option<f64>| bound.is_some_and(|b| value >= b);

    if at_least(thresholds.dangerous) {
        return ConditionCode::Dangerous;
    }
    if at_least(thresholds.high) || thresholds.optimal_max.is_some_and(|b| value > b) {
        return ConditionCode::High;
    }
    if at_least(thresholds.optimal_min) {
        return ConditionCode::Optimal;
    }
    if at_least(thresholds.low) {
        return ConditionCode::Low;
    }
    if at_least(thresholds.too_low) {
        return ConditionCode::VeryLow;
    }

    below_lowest_boundary(thresholds)
}

/// Band directly beneath the lowest present boundary.
fn below_lowest_boundary(t: &ConditionThresholds) -> ConditionCode {
    let bands = [
        (t.too_low, ConditionCode::TooLow),
        (t.low, ConditionCode::VeryLow),
        (t.optimal_min, ConditionCode::Low),
        (t.optimal_max, ConditionCode::Optimal),
        (t.high, ConditionCode::Optimal),
        (t.dangerous, ConditionCode::High),
    ];
    bands
        .iter()
        .find(|(bound, _)| bound.is_some())
        .map(|(_, code)| *code)
        .unwrap_or(ConditionCode::Unknown)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
