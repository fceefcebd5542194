/// Test fixtures: representative upstream payloads and in-memory
/// collaborators.
///
/// The JSON and RDB payloads are structurally complete but truncated to the
/// minimum needed to exercise the parsers. They reflect the real envelopes
/// returned by:
///   https://waterservices.usgs.gov/nwis/iv/?format=json&...
///   https://waterservices.usgs.gov/nwis/stat/?format=rdb&statReportType=daily&...
///   https://api.mapbox.com/directions/v5/mapbox/driving/...
///   https://api.mapbox.com/geocoding/v5/mapbox.places/...
///
/// USGS IV response shape:
///   response.value.timeSeries[]
///     .sourceInfo.siteCode[0].value  - site number (string)
///     .sourceInfo.siteName
///     .variable.variableCode[0].value - parameter code (string)
///     .variable.unit.unitCode
///     .variable.noDataValue          - sentinel for missing data (-999999)
///     .values[0].value[]
///       .value     - the measurement as a STRING (not a number)
///       .dateTime  - ISO 8601 with offset
///       .qualifiers[] - e.g. ["P"] or ["A"]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::float_time::KnownSegmentTime;
use crate::model::{
    AccessPoint, ConditionThresholds, Coordinates, GaugeStation, Hazard, Reading, River,
    RiverGaugeAssociation, SourceError, StationReading, ThresholdUnit, VesselType,
};
use crate::sources::{
    ConditionLookup, GeometryEngine, LiveReadings, ReferenceStore, Segment, SegmentCondition,
    SegmentTimes,
};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// 2024-05-01 13:00 UTC, a weekday morning in the Ozarks.
pub(crate) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

pub(crate) fn jacks_fork_thresholds() -> ConditionThresholds {
    ConditionThresholds {
        unit: ThresholdUnit::Ft,
        too_low: Some(1.0),
        low: Some(1.5),
        optimal_min: Some(2.0),
        optimal_max: Some(3.5),
        high: Some(4.0),
        dangerous: Some(4.5),
    }
}

/// Jacks Fork: Alley Spring at mile 5 and Eminence (primary) at mile 25.
pub(crate) fn jacks_fork_associations() -> Vec<RiverGaugeAssociation> {
    vec![
        RiverGaugeAssociation {
            river_id: "jacks-fork".to_string(),
            gauge: GaugeStation {
                id: "g-alley".to_string(),
                site_code: "07065495".to_string(),
                name: "Jacks Fork at Alley Spring, MO".to_string(),
                coordinates: Some(Coordinates::new(-91.4418, 37.1445)),
            },
            thresholds: jacks_fork_thresholds(),
            is_primary: false,
            river_mile: Some(5.0),
        },
        RiverGaugeAssociation {
            river_id: "jacks-fork".to_string(),
            gauge: GaugeStation {
                id: "g-eminence".to_string(),
                site_code: "07066000".to_string(),
                name: "Jacks Fork at Eminence, MO".to_string(),
                coordinates: Some(Coordinates::new(-91.3579, 37.1542)),
            },
            thresholds: jacks_fork_thresholds(),
            is_primary: true,
            river_mile: Some(25.0),
        },
    ]
}

pub(crate) fn jacks_fork_river() -> River {
    River {
        id: "jacks-fork".to_string(),
        name: "Jacks Fork".to_string(),
        slug: "jacks-fork".to_string(),
        length_miles: 46.0,
    }
}

pub(crate) fn access_point(id: &str, name: &str, mile: f64, lng: f64, lat: f64) -> AccessPoint {
    AccessPoint {
        id: id.to_string(),
        river_id: "jacks-fork".to_string(),
        name: name.to_string(),
        river_mile: mile,
        coordinates: Coordinates::new(lng, lat),
        driving_coordinates: None,
        snapped_coordinates: None,
        directions_override: None,
        is_public: true,
        approved: true,
        amenities: Vec::new(),
    }
}

pub(crate) fn canoe() -> VesselType {
    VesselType {
        id: "v-canoe".to_string(),
        slug: "canoe".to_string(),
        name: "Canoe".to_string(),
        speed_low_water: 2.0,
        speed_normal: 3.0,
        speed_high_water: 4.0,
    }
}

// ---------------------------------------------------------------------------
// In-memory collaborators
// ---------------------------------------------------------------------------

/// Reference store, geometry engine, and segment-time table backed by maps.
#[derive(Default)]
pub(crate) struct MemoryStore {
    pub rivers: HashMap<String, River>,
    pub access_points: HashMap<String, AccessPoint>,
    pub vessels: Vec<VesselType>,
    pub associations: HashMap<String, Vec<RiverGaugeAssociation>>,
    pub hazards: HashMap<String, Vec<Hazard>>,
    pub readings: HashMap<String, Reading>,
    pub segments: HashMap<(String, String), Segment>,
    pub known_times: HashMap<(String, String, String), KnownSegmentTime>,
    /// When set, every call fails with this error.
    pub fail_with: Option<SourceError>,
}

impl MemoryStore {
    fn check(&self) -> Result<(), SourceError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

impl ReferenceStore for MemoryStore {
    fn river(&self, river_id: &str) -> Result<Option<River>, SourceError> {
        self.check()?;
        Ok(self.rivers.get(river_id).cloned())
    }

    fn access_point(&self, access_point_id: &str) -> Result<Option<AccessPoint>, SourceError> {
        self.check()?;
        Ok(self.access_points.get(access_point_id).cloned())
    }

    fn vessel_type(&self, vessel_type_id: &str) -> Result<Option<VesselType>, SourceError> {
        self.check()?;
        Ok(self.vessels.iter().find(|v| v.id == vessel_type_id).cloned())
    }

    fn vessel_type_by_slug(&self, slug: &str) -> Result<Option<VesselType>, SourceError> {
        self.check()?;
        Ok(self.vessels.iter().find(|v| v.slug == slug).cloned())
    }

    fn gauge_associations(&self, river_id: &str) -> Result<Vec<RiverGaugeAssociation>, SourceError> {
        self.check()?;
        Ok(self.associations.get(river_id).cloned().unwrap_or_default())
    }

    fn hazards(&self, river_id: &str) -> Result<Vec<Hazard>, SourceError> {
        self.check()?;
        Ok(self.hazards.get(river_id).cloned().unwrap_or_default())
    }

    fn latest_cached_reading(&self, site_code: &str) -> Result<Option<Reading>, SourceError> {
        self.check()?;
        Ok(self.readings.get(site_code).cloned())
    }
}

impl GeometryEngine for MemoryStore {
    fn segment(&self, start_access_id: &str, end_access_id: &str) -> Result<Segment, SourceError> {
        self.check()?;
        self.segments
            .get(&(start_access_id.to_string(), end_access_id.to_string()))
            .cloned()
            .ok_or_else(|| SourceError::NoDataAvailable("no segment between access points".into()))
    }
}

impl SegmentTimes for MemoryStore {
    fn known_time(
        &self,
        put_in_id: &str,
        take_out_id: &str,
        vessel_slug: &str,
    ) -> Result<Option<KnownSegmentTime>, SourceError> {
        self.check()?;
        Ok(self
            .known_times
            .get(&(put_in_id.to_string(), take_out_id.to_string(), vessel_slug.to_string()))
            .cloned())
    }
}

/// Cached condition lookup that returns a canned answer.
pub(crate) struct FakeLookup {
    result: Result<Option<SegmentCondition>, SourceError>,
}

impl FakeLookup {
    pub fn returning(condition: Option<SegmentCondition>) -> Self {
        FakeLookup { result: Ok(condition) }
    }

    pub fn failing() -> Self {
        FakeLookup {
            result: Err(SourceError::Database("canceling statement due to statement timeout".into())),
        }
    }
}

impl ConditionLookup for FakeLookup {
    fn condition_for_segment(
        &self,
        _river_id: &str,
        _put_in_mile: f64,
        _put_in_point: Option<Coordinates>,
    ) -> Result<Option<SegmentCondition>, SourceError> {
        self.result.clone()
    }
}

/// Live reading source that records what it was asked for.
pub(crate) struct FakeLive {
    readings: Option<Vec<StationReading>>,
    calls: Cell<usize>,
    requested: RefCell<Vec<String>>,
}

impl FakeLive {
    pub fn with_height(site_code: &str, height_ft: f64, timestamp: DateTime<Utc>) -> Self {
        FakeLive {
            readings: Some(vec![StationReading {
                site_code: site_code.to_string(),
                reading: Reading {
                    height_ft: Some(height_ft),
                    discharge_cfs: None,
                    timestamp,
                },
            }]),
            calls: Cell::new(0),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        FakeLive {
            readings: None,
            calls: Cell::new(0),
            requested: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn requested_sites(&self) -> Vec<String> {
        self.requested.borrow().clone()
    }
}

impl LiveReadings for FakeLive {
    fn readings(&self, site_codes: &[&str]) -> Result<Vec<StationReading>, SourceError> {
        self.calls.set(self.calls.get() + 1);
        self.requested
            .borrow_mut()
            .extend(site_codes.iter().map(|s| s.to_string()));
        match &self.readings {
            Some(readings) => Ok(readings
                .iter()
                .filter(|r| site_codes.contains(&r.site_code.as_str()))
                .cloned()
                .collect()),
            None => Err(SourceError::Timeout("waterservices.usgs.gov".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// USGS IV payloads
// ---------------------------------------------------------------------------

/// Current River at Van Buren (07067000) with discharge and stage. The stage
/// series holds three values; only the last (3.21 ft) is current.
pub(crate) fn fixture_van_buren_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "Current River at Van Buren, MO",
              "siteCode": [{ "value": "07067000", "network": "NWIS", "agencyCode": "USGS" }],
              "geoLocation": {
                "geogLocation": { "srs": "EPSG:4326", "latitude": 36.9912, "longitude": -91.0135 }
              }
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "variableName": "Streamflow, ft&#179;/s",
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "1870", "qualifiers": ["P"], "dateTime": "2025-06-14T12:15:00.000-05:00" }
              ],
              "qualifier": [{ "qualifierCode": "P", "qualifierDescription": "Provisional data subject to revision." }]
            }]
          },
          {
            "sourceInfo": {
              "siteName": "Current River at Van Buren, MO",
              "siteCode": [{ "value": "07067000", "network": "NWIS", "agencyCode": "USGS" }],
              "geoLocation": {
                "geogLocation": { "srs": "EPSG:4326", "latitude": 36.9912, "longitude": -91.0135 }
              }
            },
            "variable": {
              "variableCode": [{ "value": "00065", "network": "NWIS" }],
              "variableName": "Gage height, ft",
              "unit": { "unitCode": "ft" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "3.25", "qualifiers": ["P"], "dateTime": "2025-06-14T12:00:00.000-05:00" },
                { "value": "3.23", "qualifiers": ["P"], "dateTime": "2025-06-14T12:15:00.000-05:00" },
                { "value": "3.21", "qualifiers": ["P"], "dateTime": "2025-06-14T12:30:00.000-05:00" }
              ],
              "qualifier": [{ "qualifierCode": "P", "qualifierDescription": "Provisional data subject to revision." }]
            }]
          }
        ]
      }
    }"#
}

/// Two Jacks Fork sites in one response: Alley Spring (stage only) and
/// Eminence (discharge only). Exercises sparse parameter coverage.
pub(crate) fn fixture_two_site_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "Jacks Fork at Alley Spring, MO",
              "siteCode": [{ "value": "07065495", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00065", "network": "NWIS" }],
              "variableName": "Gage height, ft",
              "unit": { "unitCode": "ft" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "2.64", "qualifiers": ["P"], "dateTime": "2024-05-01T07:45:00.000-05:00" }
              ],
              "qualifier": []
            }]
          },
          {
            "sourceInfo": {
              "siteName": "Jacks Fork at Eminence, MO",
              "siteCode": [{ "value": "07066000", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00060", "network": "NWIS" }],
              "variableName": "Streamflow, ft&#179;/s",
              "unit": { "unitCode": "ft3/s" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "512", "qualifiers": ["P"], "dateTime": "2024-05-01T07:30:00.000-05:00" }
              ],
              "qualifier": []
            }]
          }
        ]
      }
    }"#
}

/// Only series carries the USGS sentinel. Parser should return
/// NoDataAvailable.
pub(crate) fn fixture_sentinel_no_data_json() -> &'static str {
    r#"{
      "value": {
        "timeSeries": [
          {
            "sourceInfo": {
              "siteName": "Jacks Fork at Alley Spring, MO",
              "siteCode": [{ "value": "07065495", "network": "NWIS", "agencyCode": "USGS" }]
            },
            "variable": {
              "variableCode": [{ "value": "00065", "network": "NWIS" }],
              "variableName": "Gage height, ft",
              "unit": { "unitCode": "ft" },
              "noDataValue": -999999.0
            },
            "values": [{
              "value": [
                { "value": "-999999", "qualifiers": ["P", "Eqp"], "dateTime": "2024-05-01T07:45:00.000-05:00" }
              ],
              "qualifier": []
            }]
          }
        ]
      }
    }"#
}

// ---------------------------------------------------------------------------
// USGS daily statistics (RDB)
// ---------------------------------------------------------------------------

/// Daily discharge statistics for Van Buren, May 1 and May 2. Columns are
/// tab separated; the second non-comment line holds format descriptors.
pub(crate) fn fixture_daily_stats_rdb() -> &'static str {
    concat!(
        "# //UNITED STATES GEOLOGICAL SURVEY       https://waterdata.usgs.gov/nwis/\n",
        "# //STATISTIC TYPE: daily\n",
        "# //PARAMETER: 00060 Discharge, cubic feet per second\n",
        "#\n",
        "agency_cd\tsite_no\tparameter_cd\tts_id\tloc_web_ds\tmonth_nu\tday_nu\tbegin_yr\tend_yr\tcount_nu\tmax_va_yr\tmax_va\tmin_va_yr\tmin_va\tmean_va\tp05_va\tp10_va\tp20_va\tp25_va\tp50_va\tp75_va\tp80_va\tp90_va\tp95_va\n",
        "5s\t15s\t5s\t10n\t15s\t3n\t3n\t6n\t6n\t8n\t6n\t12s\t6n\t12s\t12s\t12s\t12s\t12s\t12s\t12s\t12s\t12s\t12s\t12s\n",
        "USGS\t07067000\t00060\t59383\t\t5\t1\t1922\t2023\t102\t2017\t86700\t1954\t1040\t4120\t1420\t1690\t2110\t2300\t3150\t4680\t5220\t7350\t10100\n",
        "USGS\t07067000\t00060\t59383\t\t5\t2\t1922\t2023\t102\t2017\t81300\t1954\t1010\t4010\t1400\t1660\t2080\t2270\t3090\t4590\t5110\t7100\t9800\n",
    )
}

// ---------------------------------------------------------------------------
// Mapbox payloads
// ---------------------------------------------------------------------------

/// One driving route: 1520 s, 27 036 m.
pub(crate) fn fixture_mapbox_directions_json() -> &'static str {
    r#"{
      "routes": [
        {
          "weight_name": "auto",
          "weight": 1702.4,
          "duration": 1520.3,
          "distance": 27036.8,
          "legs": [{ "summary": "MO 106, County Road 106-425", "duration": 1520.3, "distance": 27036.8 }],
          "geometry": {
            "type": "LineString",
            "coordinates": [[-91.3579, 37.1542], [-91.4018, 37.1490], [-91.4418, 37.1445]]
          }
        }
      ],
      "waypoints": [
        { "name": "Main Street", "location": [-91.3579, 37.1542] },
        { "name": "", "location": [-91.4418, 37.1445] }
      ],
      "code": "Ok",
      "uuid": "b9l3Rk9f1i0gC8oZk7w4v2JYqQb0N5pZ"
    }"#
}

pub(crate) fn fixture_mapbox_no_route_json() -> &'static str {
    r#"{ "code": "NoRoute", "message": "No route found", "routes": [] }"#
}

pub(crate) fn fixture_mapbox_geocode_json() -> &'static str {
    r#"{
      "type": "FeatureCollection",
      "query": ["alley", "spring", "mill", "eminence", "mo"],
      "features": [
        {
          "id": "poi.1236950581248",
          "type": "Feature",
          "place_type": ["poi"],
          "relevance": 0.96,
          "text": "Alley Spring Mill",
          "place_name": "Alley Spring Mill, MO 106, Eminence, Missouri 65466, United States",
          "center": [-91.4431, 37.1452],
          "geometry": { "type": "Point", "coordinates": [-91.4431, 37.1452] }
        }
      ]
    }"#
}

pub(crate) fn fixture_mapbox_geocode_empty_json() -> &'static str {
    r#"{ "type": "FeatureCollection", "query": ["nowhere"], "features": [] }"#
}
