//! Segment-aware condition lookup over the reading cache.
//!
//! First rung of the condition ladder: pick the governing gauge with
//! `select_gauge`, read its most recent stored reading, and classify it.
//! No network calls are made here.

use crate::condition::classifier::classify;
use crate::condition::gauge::select_gauge;
use crate::model::{ConditionCode, Coordinates, SourceError};
use crate::sources::{ConditionLookup, ReferenceStore, SegmentCondition};

pub struct CachedConditions<'a> {
    store: &'a dyn ReferenceStore,
    accuracy_distance_miles: f64,
}

impl<'a> CachedConditions<'a> {
    pub fn new(store: &'a dyn ReferenceStore, accuracy_distance_miles: f64) -> Self {
        CachedConditions {
            store,
            accuracy_distance_miles,
        }
    }
}

impl ConditionLookup for CachedConditions<'_> {
    fn condition_for_segment(
        &self,
        river_id: &str,
        put_in_mile: f64,
        _put_in_point: Option<Coordinates>,
    ) -> Result<Option<SegmentCondition>, SourceError> {
        let associations = self.store.gauge_associations(river_id)?;
        let Some(selection) = select_gauge(&associations, put_in_mile) else {
            return Ok(None);
        };

        let association = selection.association;
        let note = selection.accuracy_note(self.accuracy_distance_miles);
        let reading = self.store.latest_cached_reading(&association.gauge.site_code)?;

        let (code, height_ft, discharge_cfs, reading_timestamp) = match reading {
            Some(r) => (
                classify(r.height_ft, r.discharge_cfs, &association.thresholds),
                r.height_ft,
                r.discharge_cfs,
                Some(r.timestamp),
            ),
            None => (ConditionCode::Unknown, None, None, None),
        };

        Ok(Some(SegmentCondition {
            code,
            height_ft,
            discharge_cfs,
            reading_timestamp,
            gauge_id: Some(association.gauge.site_code.clone()),
            gauge_name: Some(association.gauge.name.clone()),
            thresholds: Some(association.thresholds.clone()),
            accuracy_warning: note.is_some(),
            accuracy_warning_reason: note,
        }))
    }
}
