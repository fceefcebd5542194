//! Shared in-memory collaborators for integration tests.
//!
//! `World` models a short stretch of the Jacks Fork with two gauges and a
//! handful of access points, and implements every collaborator trait so a
//! full plan can be assembled without a database or network.
//!
//!   mile  2.0  Blue Spring       (put-in above every gauge)
//!   mile  5.0  Alley Spring      (gauge 07065495 here)
//!   mile  9.0  Private Ford      (not approved)
//!   mile 17.4  Eminence          (take-out for the 12.4 mi run)
//!   mile 22.0  Buck Hollow       (17 mi below Alley Spring)
//!   mile 25.0                    (gauge 07066000, primary)
//!   mile 31.0  Two Rivers

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use floplan_service::condition::cached::CachedConditions;
use floplan_service::condition::{ConditionResolver, ResolvedCondition};
use floplan_service::endpoint::PlanService;
use floplan_service::float_time::KnownSegmentTime;
use floplan_service::model::{
    AccessPoint, ConditionCode, ConditionThresholds, Coordinates, GaugeStation, Hazard,
    HazardSeverity, Reading, River, RiverGaugeAssociation, SourceError, StationReading,
    ThresholdUnit, VesselType,
};
use floplan_service::plan::{FloatPlan, PlanAssembler, PlanError, PlanRequest, PlanSettings, PlanSources};
use floplan_service::sources::{
    DailyStatistics, DriveRoute, FlowStatistics, GeometryEngine, LiveReadings, ReferenceStore,
    RoutingService, Segment, SegmentTimes,
};

pub const ALLEY_GAUGE: &str = "07065495";
pub const EMINENCE_GAUGE: &str = "07066000";

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
}

pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - Duration::minutes(minutes)
}

pub fn request(start: &str, end: &str) -> PlanRequest {
    PlanRequest {
        river_id: "jacks-fork".to_string(),
        start_id: start.to_string(),
        end_id: end.to_string(),
        vessel_type_id: None,
    }
}

fn access_point(id: &str, name: &str, mile: f64, approved: bool) -> AccessPoint {
    AccessPoint {
        id: id.to_string(),
        river_id: "jacks-fork".to_string(),
        name: name.to_string(),
        river_mile: mile,
        coordinates: Coordinates::new(-91.45 + mile * 0.005, 37.14 + mile * 0.001),
        driving_coordinates: None,
        snapped_coordinates: None,
        directions_override: None,
        is_public: true,
        approved,
        amenities: vec!["parking".to_string()],
    }
}

fn gauge(id: &str, site_code: &str, name: &str, mile: f64, is_primary: bool) -> RiverGaugeAssociation {
    RiverGaugeAssociation {
        river_id: "jacks-fork".to_string(),
        gauge: GaugeStation {
            id: id.to_string(),
            site_code: site_code.to_string(),
            name: name.to_string(),
            coordinates: None,
        },
        thresholds: ConditionThresholds {
            unit: ThresholdUnit::Ft,
            too_low: Some(1.0),
            low: Some(1.5),
            optimal_min: Some(2.0),
            optimal_max: Some(3.5),
            high: Some(4.0),
            dangerous: Some(4.5),
        },
        is_primary,
        river_mile: Some(mile),
    }
}

fn hazard(id: &str, name: &str, mile: f64, severity: HazardSeverity, active: bool) -> Hazard {
    Hazard {
        id: id.to_string(),
        river_id: "jacks-fork".to_string(),
        name: name.to_string(),
        hazard_type: "low_water_bridge".to_string(),
        river_mile: mile,
        severity,
        portage_required: severity == HazardSeverity::Danger,
        portage_side: None,
        description: None,
        active,
    }
}

/// Everything a plan needs, in memory. Each collaborator can be made to
/// fail independently.
pub struct World {
    pub river: River,
    pub access_points: HashMap<String, AccessPoint>,
    pub vessels: Vec<VesselType>,
    pub associations: Vec<RiverGaugeAssociation>,
    pub hazards: Vec<Hazard>,
    pub cached: HashMap<String, Reading>,
    pub live: HashMap<String, Reading>,
    pub known_times: HashMap<(String, String, String), KnownSegmentTime>,
    pub statistics: Option<DailyStatistics>,

    pub store_fails: bool,
    pub cache_fails: bool,
    pub geometry_fails: bool,
    pub live_fails: bool,
    pub routing_fails: bool,
    pub stats_fails: bool,
    pub hazards_fail: bool,

    pub live_requests: Mutex<Vec<String>>,
}

impl World {
    /// Jacks Fork with no readings anywhere.
    pub fn jacks_fork() -> Self {
        let access_points = [
            access_point("ap-blue-spring", "Blue Spring", 2.0, true),
            access_point("ap-alley", "Alley Spring", 5.0, true),
            access_point("ap-private-ford", "Private Ford", 9.0, false),
            access_point("ap-eminence", "Eminence", 17.4, true),
            access_point("ap-buck-hollow", "Buck Hollow", 22.0, true),
            access_point("ap-two-rivers", "Two Rivers", 31.0, true),
        ]
        .into_iter()
        .map(|ap| (ap.id.clone(), ap))
        .collect();

        World {
            river: River {
                id: "jacks-fork".to_string(),
                name: "Jacks Fork".to_string(),
                slug: "jacks-fork".to_string(),
                length_miles: 46.0,
            },
            access_points,
            vessels: vec![
                VesselType {
                    id: "v-canoe".to_string(),
                    slug: "canoe".to_string(),
                    name: "Canoe".to_string(),
                    speed_low_water: 2.0,
                    speed_normal: 3.0,
                    speed_high_water: 4.0,
                },
                VesselType {
                    id: "v-tube".to_string(),
                    slug: "tube".to_string(),
                    name: "Tube".to_string(),
                    speed_low_water: 1.0,
                    speed_normal: 1.5,
                    speed_high_water: 2.0,
                },
            ],
            associations: vec![
                gauge("g-alley", ALLEY_GAUGE, "Jacks Fork at Alley Spring, MO", 5.0, false),
                gauge("g-eminence", EMINENCE_GAUGE, "Jacks Fork at Eminence, MO", 25.0, true),
            ],
            hazards: vec![
                hazard("hz-bridge", "Alley low-water bridge", 8.0, HazardSeverity::Danger, true),
                hazard("hz-old", "Washed-out ford", 10.0, HazardSeverity::Caution, false),
                hazard("hz-rootwad", "Rootwad on left bend", 15.0, HazardSeverity::Caution, true),
                hazard("hz-dam", "Old mill dam", 28.0, HazardSeverity::Warning, true),
            ],
            cached: HashMap::new(),
            live: HashMap::new(),
            known_times: HashMap::new(),
            statistics: None,
            store_fails: false,
            cache_fails: false,
            geometry_fails: false,
            live_fails: false,
            routing_fails: false,
            stats_fails: false,
            hazards_fail: false,
            live_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_cached_height(mut self, site_code: &str, height_ft: f64, minutes_old: i64) -> Self {
        self.cached.insert(
            site_code.to_string(),
            Reading {
                height_ft: Some(height_ft),
                discharge_cfs: None,
                timestamp: minutes_ago(minutes_old),
            },
        );
        self
    }

    pub fn with_live_height(mut self, site_code: &str, height_ft: f64, minutes_old: i64) -> Self {
        self.live.insert(
            site_code.to_string(),
            Reading {
                height_ft: Some(height_ft),
                discharge_cfs: None,
                timestamp: minutes_ago(minutes_old),
            },
        );
        self
    }

    pub fn with_cached_reading(mut self, site_code: &str, height_ft: f64, discharge_cfs: f64, minutes_old: i64) -> Self {
        self.cached.insert(
            site_code.to_string(),
            Reading {
                height_ft: Some(height_ft),
                discharge_cfs: Some(discharge_cfs),
                timestamp: minutes_ago(minutes_old),
            },
        );
        self
    }

    pub fn live_requests(&self) -> Vec<String> {
        self.live_requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn assemble(&self, request: &PlanRequest) -> Result<FloatPlan, PlanError> {
        let lookup = CachedConditions::new(self, 15.0);
        let sources = PlanSources {
            store: self,
            lookup: &lookup,
            geometry: self,
            live: self,
            stats: self,
            routing: self,
            times: self,
        };
        PlanAssembler::new(sources, PlanSettings::default()).assemble(request, now())
    }

    fn check(&self, fails: bool, what: &str) -> Result<(), SourceError> {
        if fails {
            Err(SourceError::Timeout(what.to_string()))
        } else {
            Ok(())
        }
    }
}

impl ReferenceStore for World {
    fn river(&self, river_id: &str) -> Result<Option<River>, SourceError> {
        self.check(self.store_fails, "rivers")?;
        Ok(Some(self.river.clone()).filter(|r| r.id == river_id))
    }

    fn access_point(&self, access_point_id: &str) -> Result<Option<AccessPoint>, SourceError> {
        self.check(self.store_fails, "access_points")?;
        Ok(self.access_points.get(access_point_id).cloned())
    }

    fn vessel_type(&self, vessel_type_id: &str) -> Result<Option<VesselType>, SourceError> {
        self.check(self.store_fails, "vessel_types")?;
        Ok(self.vessels.iter().find(|v| v.id == vessel_type_id).cloned())
    }

    fn vessel_type_by_slug(&self, slug: &str) -> Result<Option<VesselType>, SourceError> {
        self.check(self.store_fails, "vessel_types")?;
        Ok(self.vessels.iter().find(|v| v.slug == slug).cloned())
    }

    fn gauge_associations(&self, river_id: &str) -> Result<Vec<RiverGaugeAssociation>, SourceError> {
        self.check(self.store_fails, "river_gauges")?;
        Ok(self
            .associations
            .iter()
            .filter(|a| a.river_id == river_id)
            .cloned()
            .collect())
    }

    fn hazards(&self, river_id: &str) -> Result<Vec<Hazard>, SourceError> {
        self.check(self.store_fails || self.hazards_fail, "hazards")?;
        Ok(self
            .hazards
            .iter()
            .filter(|h| h.river_id == river_id)
            .cloned()
            .collect())
    }

    fn latest_cached_reading(&self, site_code: &str) -> Result<Option<Reading>, SourceError> {
        self.check(self.store_fails || self.cache_fails, "gauge_readings")?;
        Ok(self.cached.get(site_code).cloned())
    }
}

impl GeometryEngine for World {
    fn segment(&self, start_access_id: &str, end_access_id: &str) -> Result<Segment, SourceError> {
        self.check(self.geometry_fails, "segment_between")?;
        let start = self.access_points.get(start_access_id);
        let end = self.access_points.get(end_access_id);
        match (start, end) {
            (Some(s), Some(e)) => Ok(Segment {
                distance_miles: (e.river_mile - s.river_mile).abs(),
                start_mile: s.river_mile,
                end_mile: e.river_mile,
                geometry: serde_json::json!({
                    "type": "LineString",
                    "coordinates": [
                        [s.coordinates.lng, s.coordinates.lat],
                        [e.coordinates.lng, e.coordinates.lat]
                    ]
                }),
            }),
            _ => Err(SourceError::NoDataAvailable("unknown access point".to_string())),
        }
    }
}

impl LiveReadings for World {
    fn readings(&self, site_codes: &[&str]) -> Result<Vec<StationReading>, SourceError> {
        if let Ok(mut requests) = self.live_requests.lock() {
            requests.extend(site_codes.iter().map(|s| s.to_string()));
        }
        self.check(self.live_fails, "waterservices.usgs.gov")?;
        Ok(site_codes
            .iter()
            .filter_map(|code| {
                self.live.get(*code).map(|reading| StationReading {
                    site_code: code.to_string(),
                    reading: reading.clone(),
                })
            })
            .collect())
    }
}

impl FlowStatistics for World {
    fn daily_statistics(&self, _site_code: &str, _on: NaiveDate) -> Result<Option<DailyStatistics>, SourceError> {
        self.check(self.stats_fails, "waterservices.usgs.gov/nwis/stat")?;
        Ok(self.statistics.clone())
    }
}

impl RoutingService for World {
    fn drive_time(
        &self,
        _from: Coordinates,
        _to: Coordinates,
        _condition: ConditionCode,
    ) -> Result<DriveRoute, SourceError> {
        self.check(self.routing_fails, "api.mapbox.com")?;
        Ok(DriveRoute {
            minutes: 24.6,
            miles: 16.84,
            summary: Some("MO 106".to_string()),
            geometry: None,
        })
    }

    fn geocode(&self, _address: &str) -> Result<Option<Coordinates>, SourceError> {
        self.check(self.routing_fails, "api.mapbox.com")?;
        Ok(None)
    }
}

impl SegmentTimes for World {
    fn known_time(
        &self,
        put_in_id: &str,
        take_out_id: &str,
        vessel_slug: &str,
    ) -> Result<Option<KnownSegmentTime>, SourceError> {
        self.check(self.store_fails, "segment_times")?;
        Ok(self
            .known_times
            .get(&(put_in_id.to_string(), take_out_id.to_string(), vessel_slug.to_string()))
            .cloned())
    }
}

impl PlanService for World {
    fn plan(&self, request: &PlanRequest, _now: DateTime<Utc>) -> Result<FloatPlan, PlanError> {
        self.assemble(request)
    }

    fn river_condition(
        &self,
        river_id: &str,
        mile: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedCondition, PlanError> {
        if river_id != self.river.id {
            return Err(PlanError::NotFound(format!("River '{}' not found", river_id)));
        }
        let lookup = CachedConditions::new(self, 15.0);
        Ok(ConditionResolver::new(&lookup, self, self).resolve(river_id, mile.unwrap_or(f64::NAN), None, now))
    }
}
