//! Condition resolution ladder.
//!
//! Rungs run strictly in order and stop at the first usable reading:
//!
//! 1. cached, segment-aware lookup (`ConditionLookup`)
//! 2. live reading for the gauge rung 1 identified
//! 3. live reading for the river's primary gauge, only when rung 1
//!    identified no gauge at all
//! 4. `unknown` with no reading
//!
//! Collaborator failures are logged and treated as a failed rung. Running
//! out of rungs is a normal outcome, not an error.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::condition::classifier::{classify, governing_value};
use crate::condition::gauge::GaugeResolver;
use crate::logging::{self, DataSource};
use crate::model::{ConditionCode, ConditionThresholds, Coordinates, Reading, STALE_READING_HOURS};
use crate::sources::{ConditionLookup, LiveReadings, ReferenceStore, SegmentCondition};

/// Which rung produced a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionSource {
    Cached,
    LiveSegment,
    LivePrimary,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedCondition {
    pub label: String,
    pub code: ConditionCode,
    pub height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    pub reading_timestamp: Option<DateTime<Utc>>,
    pub reading_age_minutes: Option<i64>,
    pub is_stale: bool,
    pub gauge_name: Option<String>,
    pub source_gauge_id: Option<String>,
    pub source: ConditionSource,
    pub accuracy_warning: bool,
    pub accuracy_warning_reason: Option<String>,
    /// Why the condition is unknown, when it is.
    pub diagnostic: Option<String>,
}

impl ResolvedCondition {
    fn unknown(diagnostic: &str) -> Self {
        ResolvedCondition {
            label: ConditionCode::Unknown.label().to_string(),
            code: ConditionCode::Unknown,
            height_ft: None,
            discharge_cfs: None,
            reading_timestamp: None,
            reading_age_minutes: None,
            is_stale: false,
            gauge_name: None,
            source_gauge_id: None,
            source: ConditionSource::None,
            accuracy_warning: false,
            accuracy_warning_reason: None,
            diagnostic: Some(diagnostic.to_string()),
        }
    }
}

/// Whole minutes between `timestamp` and `now`, and whether the full age
/// exceeds the shared staleness boundary (strictly greater than).
pub fn reading_age(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> (i64, bool) {
    let age = now - timestamp;
    (age.num_minutes(), age > Duration::hours(STALE_READING_HOURS))
}

pub struct ConditionResolver<'a> {
    lookup: &'a dyn ConditionLookup,
    live: &'a dyn LiveReadings,
    store: &'a dyn ReferenceStore,
}

impl<'a> ConditionResolver<'a> {
    pub fn new(
        lookup: &'a dyn ConditionLookup,
        live: &'a dyn LiveReadings,
        store: &'a dyn ReferenceStore,
    ) -> Self {
        ConditionResolver { lookup, live, store }
    }

    pub fn resolve(
        &self,
        river_id: &str,
        reference_mile: f64,
        reference_point: Option<Coordinates>,
        now: DateTime<Utc>,
    ) -> ResolvedCondition {
        // Rung 1: cached, segment-aware
        let cached = match self
            .lookup
            .condition_for_segment(river_id, reference_mile, reference_point)
        {
            Ok(found) => found,
            Err(e) => {
                logging::log_dependency_failure(
                    DataSource::Database,
                    Some(river_id),
                    "Cached condition lookup",
                    &e,
                );
                None
            }
        };

        if let Some(ref condition) = cached {
            if is_usable_cached(condition) {
                return from_cached(condition, now);
            }
        }

        // Rung 2: live reading for the identified gauge
        if let Some(ref condition) = cached {
            if let Some(site_code) = condition.gauge_id.as_deref() {
                if let Some(reading) = self.live_reading(site_code) {
                    let gauge_name = condition
                        .gauge_name
                        .clone()
                        .unwrap_or_else(|| site_code.to_string());
                    return classified(
                        &reading,
                        condition.thresholds.as_ref(),
                        site_code,
                        gauge_name,
                        ConditionSource::LiveSegment,
                        condition.accuracy_warning_reason.clone(),
                        now,
                    );
                }
                return ResolvedCondition::unknown(&format!(
                    "No current reading available from gauge {}",
                    site_code
                ));
            }
        }

        // Rung 3: live reading for the primary gauge
        let primary = match GaugeResolver::new(self.store).primary(river_id) {
            Ok(found) => found,
            Err(e) => {
                logging::log_dependency_failure(
                    DataSource::Database,
                    Some(river_id),
                    "Primary gauge lookup",
                    &e,
                );
                None
            }
        };

        let Some(primary) = primary else {
            return ResolvedCondition::unknown("No gauge is associated with this river");
        };

        match self.live_reading(&primary.gauge.site_code) {
            Some(reading) => classified(
                &reading,
                Some(&primary.thresholds),
                &primary.gauge.site_code,
                primary.gauge.name.clone(),
                ConditionSource::LivePrimary,
                Some(format!(
                    "Conditions are from the river's primary gauge ({})",
                    primary.gauge.name
                )),
                now,
            ),
            None => ResolvedCondition::unknown(&format!(
                "No current reading available from gauge {}",
                primary.gauge.site_code
            )),
        }
    }

    /// Latest live reading for one gauge, or `None` on failure or when the
    /// reading carries neither stage nor discharge.
    fn live_reading(&self, site_code: &str) -> Option<Reading> {
        match self.live.readings(&[site_code]) {
            Ok(readings) => readings
                .into_iter()
                .find(|r| r.site_code == site_code)
                .map(|r| r.reading)
                .filter(|r| r.height_ft.is_some() || r.discharge_cfs.is_some()),
            Err(e) => {
                logging::log_dependency_failure(
                    DataSource::Usgs,
                    Some(site_code),
                    "Live reading fetch",
                    &e,
                );
                None
            }
        }
    }
}

/// A cached condition counts only when it is classified and carries the
/// reading its thresholds are expressed in (or the fallback measurement).
fn is_usable_cached(condition: &SegmentCondition) -> bool {
    if condition.code == ConditionCode::Unknown {
        return false;
    }
    match &condition.thresholds {
        Some(t) => governing_value(condition.height_ft, condition.discharge_cfs, t).is_some(),
        None => condition.height_ft.is_some() || condition.discharge_cfs.is_some(),
    }
}

fn from_cached(condition: &SegmentCondition, now: DateTime<Utc>) -> ResolvedCondition {
    let (reading_age_minutes, is_stale) = match condition.reading_timestamp {
        Some(ts) => {
            let (age, stale) = reading_age(ts, now);
            (Some(age), stale)
        }
        None => (None, false),
    };

    ResolvedCondition {
        label: condition.code.label().to_string(),
        code: condition.code,
        height_ft: condition.height_ft,
        discharge_cfs: condition.discharge_cfs,
        reading_timestamp: condition.reading_timestamp,
        reading_age_minutes,
        is_stale,
        gauge_name: condition.gauge_name.clone(),
        source_gauge_id: condition.gauge_id.clone(),
        source: ConditionSource::Cached,
        accuracy_warning: condition.accuracy_warning,
        accuracy_warning_reason: condition.accuracy_warning_reason.clone(),
        diagnostic: None,
    }
}

fn classified(
    reading: &Reading,
    thresholds: Option<&ConditionThresholds>,
    site_code: &str,
    gauge_name: String,
    source: ConditionSource,
    accuracy_note: Option<String>,
    now: DateTime<Utc>,
) -> ResolvedCondition {
    let code = thresholds
        .map(|t| classify(reading.height_ft, reading.discharge_cfs, t))
        .unwrap_or(ConditionCode::Unknown);
    let (age, is_stale) = reading_age(reading.timestamp, now);
    let diagnostic = match (code, thresholds) {
        (ConditionCode::Unknown, None) => Some(format!("No thresholds configured for gauge {}", site_code)),
        (ConditionCode::Unknown, Some(_)) => Some(format!(
            "Thresholds for gauge {} are incomplete or out of order",
            site_code
        )),
        _ => None,
    };

    ResolvedCondition {
        label: code.label().to_string(),
        code,
        height_ft: reading.height_ft,
        discharge_cfs: reading.discharge_cfs,
        reading_timestamp: Some(reading.timestamp),
        reading_age_minutes: Some(age),
        is_stale,
        gauge_name: Some(gauge_name),
        source_gauge_id: Some(site_code.to_string()),
        source,
        accuracy_warning: accuracy_note.is_some(),
        accuracy_warning_reason: accuracy_note,
        diagnostic,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
