//! Plan assembly: one request in, one consistent `FloatPlan` out.
//!
//! Validation and river geometry are fatal. Everything after that degrades:
//! a failed collaborator narrows its field, adds a `DegradedField` marker,
//! and is logged, but the plan is still returned.

use chrono::{DateTime, Utc};

use crate::condition::{ConditionResolver, ConditionSource, ResolvedCondition};
use crate::float_time::{self, FloatTimeEstimate, KnownSegmentTime};
use crate::hazards;
use crate::logging::{self, DataSource};
use crate::model::{AccessPoint, ConditionCode, River, SourceError, VesselType};
use crate::plan::shuttle;
use crate::plan::{
    DegradedField, DriveBack, FloatPlan, FlowSummary, PlanError, PlanRequest, PlanWarning,
    WarningKind, WarningLevel,
};
use crate::sources::{
    percentile, ConditionLookup, FlowStatistics, GeometryEngine, LiveReadings, ReferenceStore,
    RoutingService, Segment, SegmentTimes,
};

/// Collaborators a plan is assembled from.
#[derive(Clone, Copy)]
pub struct PlanSources<'a> {
    pub store: &'a dyn ReferenceStore,
    pub lookup: &'a dyn ConditionLookup,
    pub geometry: &'a dyn GeometryEngine,
    pub live: &'a dyn LiveReadings,
    pub stats: &'a dyn FlowStatistics,
    pub routing: &'a dyn RoutingService,
    pub times: &'a dyn SegmentTimes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanSettings {
    /// Vessel used when the request names none.
    pub default_vessel_slug: String,
}

impl Default for PlanSettings {
    fn default() -> Self {
        PlanSettings {
            default_vessel_slug: "canoe".to_string(),
        }
    }
}

pub struct PlanAssembler<'a> {
    sources: PlanSources<'a>,
    settings: PlanSettings,
}

struct Validated {
    river: River,
    put_in: AccessPoint,
    take_out: AccessPoint,
    vessel: VesselType,
}

impl<'a> PlanAssembler<'a> {
    pub fn new(sources: PlanSources<'a>, settings: PlanSettings) -> Self {
        PlanAssembler { sources, settings }
    }

    pub fn assemble(&self, request: &PlanRequest, now: DateTime<Utc>) -> Result<FloatPlan, PlanError> {
        let Validated {
            river,
            put_in,
            take_out,
            vessel,
        } = self.validate(request)?;
        let segment = self.segment(&put_in, &take_out)?;

        let mut degraded = Vec::new();

        // Condition at the put-in
        let reference_point = put_in.snapped_coordinates.or(Some(put_in.coordinates));
        let condition = ConditionResolver::new(self.sources.lookup, self.sources.live, self.sources.store)
            .resolve(&river.id, segment.start_mile, reference_point, now);
        if condition.source == ConditionSource::None {
            degraded.push(DegradedField::Condition);
        }

        // Float time
        let known = match self.sources.times.known_time(&put_in.id, &take_out.id, &vessel.slug) {
            Ok(known) => known,
            Err(e) => {
                logging::log_dependency_failure(DataSource::Database, Some(&put_in.id), "Known segment time lookup", &e);
                degraded.push(DegradedField::FloatTime);
                None
            }
        };
        let float_time = float_time::estimate(segment.distance_miles, &vessel, condition.code, known.as_ref());
        if float_time.is_none() && !degraded.contains(&DegradedField::FloatTime) {
            logging::warn(
                DataSource::System,
                Some(&vessel.slug),
                &format!("No float time for {:.2} mi; vessel has no usable speed", segment.distance_miles),
            );
            degraded.push(DegradedField::FloatTime);
        }

        // Shuttle
        let drive_back = match shuttle::drive_back(self.sources.routing, &take_out, &put_in, condition.code) {
            Ok(drive) => drive,
            Err(e) => {
                logging::log_dependency_failure(DataSource::Routing, Some(&take_out.id), "Drive-back routing", &e);
                degraded.push(DegradedField::DriveBack);
                DriveBack::unknown()
            }
        };

        // Hazards
        let hazards = match self.sources.store.hazards(&river.id) {
            Ok(all) => hazards::filter(&all, segment.start_mile, segment.end_mile),
            Err(e) => {
                logging::log_dependency_failure(DataSource::Database, Some(&river.id), "Hazard lookup", &e);
                degraded.push(DegradedField::Hazards);
                Vec::new()
            }
        };

        // Flow rating and historical context
        let mut flow = FlowSummary::for_condition(condition.code);
        if let Err(e) = self.add_statistics(&mut flow, &condition, now) {
            logging::log_dependency_failure(
                DataSource::Stats,
                condition.source_gauge_id.as_deref(),
                "Daily statistics",
                &e,
            );
            degraded.push(DegradedField::Statistics);
        }

        let warnings = build_warnings(&condition, &segment, float_time.as_ref(), known.as_ref());

        logging::info(
            DataSource::System,
            Some(&river.id),
            &format!(
                "Plan {} -> {}: {:.2} mi, condition {}, {} hazard(s), {} warning(s){}",
                put_in.id,
                take_out.id,
                segment.distance_miles,
                condition.code.as_str(),
                hazards.len(),
                warnings.len(),
                if degraded.is_empty() { String::new() } else { format!(", degraded {:?}", degraded) }
            ),
        );

        Ok(FloatPlan {
            river,
            put_in,
            take_out,
            vessel,
            distance_miles: (segment.distance_miles * 100.0).round() / 100.0,
            start_mile: segment.start_mile,
            end_mile: segment.end_mile,
            geometry: segment.geometry,
            float_time,
            drive_back,
            condition,
            flow,
            hazards,
            warnings,
            degraded,
            generated_at: now,
        })
    }

    fn validate(&self, request: &PlanRequest) -> Result<Validated, PlanError> {
        for (name, value) in [
            ("riverId", &request.river_id),
            ("startId", &request.start_id),
            ("endId", &request.end_id),
        ] {
            if value.trim().is_empty() {
                return Err(PlanError::Validation(format!("{} is required", name)));
            }
        }
        if request.start_id == request.end_id {
            return Err(PlanError::Validation(
                "Put-in and take-out must be different access points".to_string(),
            ));
        }

        let store = self.sources.store;
        let river = store
            .river(&request.river_id)
            .map_err(internal("river lookup"))?
            .ok_or_else(|| PlanError::NotFound(format!("River '{}' not found", request.river_id)))?;

        let put_in = self.access_point(&river, &request.start_id)?;
        let take_out = self.access_point(&river, &request.end_id)?;

        let vessel = match request.vessel_type_id.as_deref().filter(|v| !v.trim().is_empty()) {
            Some(id) => match store.vessel_type(id).map_err(internal("vessel lookup"))? {
                Some(vessel) => Some(vessel),
                None => store.vessel_type_by_slug(id).map_err(internal("vessel lookup"))?,
            },
            None => store
                .vessel_type_by_slug(&self.settings.default_vessel_slug)
                .map_err(internal("vessel lookup"))?,
        };
        let vessel = vessel.ok_or_else(|| {
            PlanError::NotFound(format!(
                "Vessel type '{}' not found",
                request
                    .vessel_type_id
                    .as_deref()
                    .unwrap_or(&self.settings.default_vessel_slug)
            ))
        })?;

        Ok(Validated {
            river,
            put_in,
            take_out,
            vessel,
        })
    }

    /// Approved access point on `river`; anything else is not found.
    fn access_point(&self, river: &River, id: &str) -> Result<AccessPoint, PlanError> {
        let found = self
            .sources
            .store
            .access_point(id)
            .map_err(internal("access point lookup"))?;
        match found {
            Some(ap) if ap.approved && ap.river_id == river.id => Ok(ap),
            _ => Err(PlanError::NotFound(format!(
                "Access point '{}' not found on {}",
                id, river.name
            ))),
        }
    }

    fn segment(&self, put_in: &AccessPoint, take_out: &AccessPoint) -> Result<Segment, PlanError> {
        let segment = self.sources.geometry.segment(&put_in.id, &take_out.id).map_err(|e| {
            logging::log_dependency_failure(DataSource::Geometry, Some(&put_in.id), "Segment computation", &e);
            PlanError::Computation(format!("River segment could not be computed: {}", e))
        })?;

        if !segment.distance_miles.is_finite() || segment.distance_miles <= 0.0 {
            logging::error(
                DataSource::Geometry,
                Some(&put_in.id),
                &format!("Segment to {} has distance {}", take_out.id, segment.distance_miles),
            );
            return Err(PlanError::Computation(
                "River segment has no positive distance".to_string(),
            ));
        }
        if !segment.start_mile.is_finite() || !segment.end_mile.is_finite() {
            return Err(PlanError::Computation(
                "River segment endpoints are not numbers".to_string(),
            ));
        }
        Ok(segment)
    }

    /// Percentile of the current discharge among recorded years for today.
    /// Missing statistics are not a failure.
    fn add_statistics(
        &self,
        flow: &mut FlowSummary,
        condition: &ResolvedCondition,
        now: DateTime<Utc>,
    ) -> Result<(), SourceError> {
        let (Some(site_code), Some(discharge)) = (condition.source_gauge_id.as_deref(), condition.discharge_cfs) else {
            return Ok(());
        };
        if let Some(stats) = self.sources.stats.daily_statistics(site_code, now.date_naive())? {
            flow.percentile = percentile(discharge, &stats);
            flow.median_cfs = stats.p50;
        }
        Ok(())
    }
}

fn internal(what: &'static str) -> impl Fn(SourceError) -> PlanError {
    move |e| {
        logging::log_dependency_failure(DataSource::Database, None, what, &e);
        PlanError::Internal(format!("{} failed", what))
    }
}

/// Warnings in display order: gauge accuracy, dangerous water, high water,
/// stale reading, upstream travel.
fn build_warnings(
    condition: &ResolvedCondition,
    segment: &Segment,
    float_time: Option<&FloatTimeEstimate>,
    known: Option<&KnownSegmentTime>,
) -> Vec<PlanWarning> {
    let mut warnings = Vec::new();

    if condition.accuracy_warning {
        warnings.push(PlanWarning {
            kind: WarningKind::GaugeAccuracy,
            level: WarningLevel::Caution,
            message: condition
                .accuracy_warning_reason
                .clone()
                .unwrap_or_else(|| "The governing gauge may not reflect conditions on this section".to_string()),
        });
    }

    match condition.code {
        ConditionCode::Dangerous => warnings.push(PlanWarning {
            kind: WarningKind::DangerousWater,
            level: WarningLevel::Danger,
            message: "Water levels are dangerous. Do not float this section until the river drops.".to_string(),
        }),
        ConditionCode::High => warnings.push(PlanWarning {
            kind: WarningKind::HighWater,
            level: WarningLevel::Caution,
            message: "Water is running high and fast. Only experienced paddlers should attempt this float."
                .to_string(),
        }),
        _ => {}
    }

    if condition.is_stale {
        let hours = condition.reading_age_minutes.unwrap_or(0) / 60;
        warnings.push(PlanWarning {
            kind: WarningKind::StaleReading,
            level: WarningLevel::Info,
            message: format!(
                "The latest gauge reading is {} hours old; conditions may have changed.",
                hours
            ),
        });
    }

    // A recorded time only flags reverse travel when it drove the estimate
    let reverse_record = known.is_some_and(|k| k.is_reverse) && float_time.is_some_and(|f| !f.is_estimate);
    if segment.end_mile < segment.start_mile || reverse_record {
        warnings.push(PlanWarning {
            kind: WarningKind::Upstream,
            level: WarningLevel::Info,
            message: "This trip travels upstream. Expect to paddle against the current; times may be longer."
                .to_string(),
        });
    }

    warnings
}
