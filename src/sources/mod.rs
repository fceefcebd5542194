/// External collaborators of the planning engine.
///
/// Each collaborator is a trait so the engine can run against PostgreSQL
/// and the live HTTP APIs in production and against in-memory fakes in
/// tests. Implementations:
///
/// - `postgres`   - reference data, cached readings, segment geometry,
///                  historical segment times
/// - `usgs`       - USGS NWIS IV API: live stage and discharge
/// - `usgs_stats` - USGS NWIS daily statistics (RDB) + percentile math
/// - `routing`    - Mapbox directions and geocoding for the shuttle
/// - `fixtures` (test only) - representative API response payloads

pub mod postgres;
pub mod routing;
pub mod usgs;
pub mod usgs_stats;

#[cfg(test)]
pub(crate) mod fixtures;

use chrono::{DateTime, NaiveDate, Utc};

use crate::float_time::KnownSegmentTime;
use crate::model::{
    AccessPoint, ConditionCode, ConditionThresholds, Coordinates, Hazard, Reading, River,
    RiverGaugeAssociation, SourceError, StationReading, VesselType,
};

pub use usgs_stats::{percentile, DailyStatistics};

// ---------------------------------------------------------------------------
// Collaborator payloads
// ---------------------------------------------------------------------------

/// Distance and mile endpoints of the river between two access points.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub distance_miles: f64,
    pub start_mile: f64,
    pub end_mile: f64,
    /// GeoJSON geometry of the segment, passed through untouched.
    pub geometry: serde_json::Value,
}

/// Precomputed condition for a river at a reference mile.
///
/// `gauge_id` is set whenever a governing gauge was identified, even when
/// no reading could be classified.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentCondition {
    pub code: ConditionCode,
    pub height_ft: Option<f64>,
    pub discharge_cfs: Option<f64>,
    pub reading_timestamp: Option<DateTime<Utc>>,
    /// USGS site code of the governing gauge.
    pub gauge_id: Option<String>,
    pub gauge_name: Option<String>,
    /// Thresholds of the governing gauge, so later rungs can classify a
    /// live reading from it without reloading the river's associations.
    pub thresholds: Option<ConditionThresholds>,
    pub accuracy_warning: bool,
    pub accuracy_warning_reason: Option<String>,
}

/// One driving route between two points.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveRoute {
    pub minutes: f64,
    pub miles: f64,
    pub summary: Option<String>,
    pub geometry: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Collaborator contracts
// ---------------------------------------------------------------------------

/// Read access to reference data and the reading cache.
pub trait ReferenceStore {
    fn river(&self, river_id: &str) -> Result<Option<River>, SourceError>;

    fn access_point(&self, access_point_id: &str) -> Result<Option<AccessPoint>, SourceError>;

    fn vessel_type(&self, vessel_type_id: &str) -> Result<Option<VesselType>, SourceError>;

    fn vessel_type_by_slug(&self, slug: &str) -> Result<Option<VesselType>, SourceError>;

    /// All gauge associations for a river, in a stable order.
    fn gauge_associations(&self, river_id: &str) -> Result<Vec<RiverGaugeAssociation>, SourceError>;

    fn hazards(&self, river_id: &str) -> Result<Vec<Hazard>, SourceError>;

    /// Most recent stored reading for a gauge, however old.
    fn latest_cached_reading(&self, site_code: &str) -> Result<Option<Reading>, SourceError>;
}

/// Cached/precomputed condition keyed by river and reference mile.
pub trait ConditionLookup {
    fn condition_for_segment(
        &self,
        river_id: &str,
        put_in_mile: f64,
        put_in_point: Option<Coordinates>,
    ) -> Result<Option<SegmentCondition>, SourceError>;
}

/// Distance-along-river between two access points.
pub trait GeometryEngine {
    fn segment(&self, start_access_id: &str, end_access_id: &str) -> Result<Segment, SourceError>;
}

/// Live gauge readings from the upstream sensor network.
pub trait LiveReadings {
    fn readings(&self, site_codes: &[&str]) -> Result<Vec<StationReading>, SourceError>;
}

/// Historical daily flow statistics for a gauge.
pub trait FlowStatistics {
    /// Statistics for the calendar day of `on`, across all recorded years.
    fn daily_statistics(
        &self,
        site_code: &str,
        on: NaiveDate,
    ) -> Result<Option<DailyStatistics>, SourceError>;
}

/// Driving directions and geocoding for the shuttle.
pub trait RoutingService {
    fn drive_time(
        &self,
        from: Coordinates,
        to: Coordinates,
        condition: ConditionCode,
    ) -> Result<DriveRoute, SourceError>;

    fn geocode(&self, address: &str) -> Result<Option<Coordinates>, SourceError>;
}

/// Recorded float times for specific put-in/take-out/vessel combinations.
pub trait SegmentTimes {
    fn known_time(
        &self,
        put_in_id: &str,
        take_out_id: &str,
        vessel_slug: &str,
    ) -> Result<Option<KnownSegmentTime>, SourceError>;
}
