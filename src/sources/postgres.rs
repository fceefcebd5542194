/// PostgreSQL-backed reference store, geometry engine, and segment times.
///
/// All tables live in the `floatplan` schema (see
/// `sql/001_floatplan_schema.sql`). Rows are converted to domain types
/// here, at the data boundary: NUMERIC columns arrive as `rust_decimal`
/// values and threshold sets are assembled into one `ConditionThresholds`
/// per association.
///
/// The connection is shared behind a `Mutex` so one store can serve every
/// worker thread. Queries are short; the connection's `statement_timeout`
/// bounds the worst case.

use std::sync::{Mutex, MutexGuard};

use postgres::{Client, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::float_time::KnownSegmentTime;
use crate::model::{
    AccessPoint, ConditionThresholds, Coordinates, GaugeStation, Hazard, HazardSeverity, Reading,
    River, RiverGaugeAssociation, SourceError, ThresholdUnit, VesselType,
};
use crate::sources::{GeometryEngine, ReferenceStore, Segment, SegmentTimes};

pub const SCHEMA: &str = "floatplan";

pub struct PgStore {
    client: Mutex<Client>,
}

impl PgStore {
    pub fn new(client: Client) -> Self {
        PgStore {
            client: Mutex::new(client),
        }
    }

    fn with_client<T>(
        &self,
        f: impl FnOnce(&mut Client) -> Result<T, postgres::Error>,
    ) -> Result<T, SourceError> {
        let mut client = lock_recovering(&self.client);
        Ok(f(&mut *client)?)
    }
}

/// Locks the shared connection even after a worker panicked while holding
/// it. The connection carries no state between queries, so the poison
/// flag is cleared and the next request proceeds.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        mutex.clear_poison();
        poisoned.into_inner()
    })
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn decimal_to_f64(value: Option<Decimal>) -> Option<f64> {
    value.and_then(|d| d.to_f64())
}

fn point(lng: Option<f64>, lat: Option<f64>) -> Option<Coordinates> {
    match (lng, lat) {
        (Some(lng), Some(lat)) => Some(Coordinates::new(lng, lat)).filter(Coordinates::is_valid),
        _ => None,
    }
}

fn river_from_row(row: &Row) -> River {
    River {
        id: row.get("id"),
        name: row.get("name"),
        slug: row.get("slug"),
        length_miles: decimal_to_f64(row.get("length_miles")).unwrap_or(0.0),
    }
}

fn access_point_from_row(row: &Row) -> AccessPoint {
    AccessPoint {
        id: row.get("id"),
        river_id: row.get("river_id"),
        name: row.get("name"),
        river_mile: decimal_to_f64(row.get("river_mile")).unwrap_or(f64::NAN),
        coordinates: Coordinates::new(row.get("lng"), row.get("lat")),
        driving_coordinates: point(row.get("driving_lng"), row.get("driving_lat")),
        snapped_coordinates: point(row.get("snapped_lng"), row.get("snapped_lat")),
        directions_override: row
            .get::<_, Option<String>>("directions_override")
            .filter(|s| !s.trim().is_empty()),
        is_public: row.get("is_public"),
        approved: row.get("approved"),
        amenities: row.get::<_, Option<Vec<String>>>("amenities").unwrap_or_default(),
    }
}

fn vessel_from_row(row: &Row) -> VesselType {
    VesselType {
        id: row.get("id"),
        slug: row.get("slug"),
        name: row.get("name"),
        speed_low_water: decimal_to_f64(row.get("speed_low_water")).unwrap_or(0.0),
        speed_normal: decimal_to_f64(row.get("speed_normal")).unwrap_or(0.0),
        speed_high_water: decimal_to_f64(row.get("speed_high_water")).unwrap_or(0.0),
    }
}

fn association_from_row(row: &Row) -> RiverGaugeAssociation {
    let unit: Option<String> = row.get("threshold_unit");
    RiverGaugeAssociation {
        river_id: row.get("river_id"),
        gauge: GaugeStation {
            id: row.get("gauge_id"),
            site_code: row.get("site_code"),
            name: row.get("gauge_name"),
            coordinates: point(row.get("lng"), row.get("lat")),
        },
        thresholds: ConditionThresholds {
            unit: ThresholdUnit::parse(unit.as_deref().unwrap_or("ft")),
            too_low: decimal_to_f64(row.get("level_too_low")),
            low: decimal_to_f64(row.get("level_low")),
            optimal_min: decimal_to_f64(row.get("level_optimal_min")),
            optimal_max: decimal_to_f64(row.get("level_optimal_max")),
            high: decimal_to_f64(row.get("level_high")),
            dangerous: decimal_to_f64(row.get("level_dangerous")),
        },
        is_primary: row.get("is_primary"),
        river_mile: decimal_to_f64(row.get("river_mile")),
    }
}

fn hazard_from_row(row: &Row) -> Hazard {
    let severity: String = row.get("severity");
    Hazard {
        id: row.get("id"),
        river_id: row.get("river_id"),
        name: row.get("name"),
        hazard_type: row.get("hazard_type"),
        river_mile: decimal_to_f64(row.get("river_mile")).unwrap_or(f64::NAN),
        severity: HazardSeverity::parse(&severity),
        portage_required: row.get("portage_required"),
        portage_side: row.get("portage_side"),
        description: row.get("description"),
        active: row.get("active"),
    }
}

// ---------------------------------------------------------------------------
// ReferenceStore
// ---------------------------------------------------------------------------

const ACCESS_POINT_COLUMNS: &str = "id, river_id, name, river_mile, lng, lat, \
     driving_lng, driving_lat, snapped_lng, snapped_lat, directions_override, \
     is_public, approved, amenities";

const VESSEL_COLUMNS: &str = "id, slug, name, speed_low_water, speed_normal, speed_high_water";

impl ReferenceStore for PgStore {
    fn river(&self, river_id: &str) -> Result<Option<River>, SourceError> {
        let row = self.with_client(|c| {
            c.query_opt(
                "SELECT id, name, slug, length_miles FROM floatplan.rivers WHERE id = $1",
                &[&river_id],
            )
        })?;
        Ok(row.as_ref().map(river_from_row))
    }

    fn access_point(&self, access_point_id: &str) -> Result<Option<AccessPoint>, SourceError> {
        let sql = format!(
            "SELECT {} FROM floatplan.access_points WHERE id = $1",
            ACCESS_POINT_COLUMNS
        );
        let row = self.with_client(|c| c.query_opt(sql.as_str(), &[&access_point_id]))?;
        Ok(row.as_ref().map(access_point_from_row))
    }

    fn vessel_type(&self, vessel_type_id: &str) -> Result<Option<VesselType>, SourceError> {
        let sql = format!("SELECT {} FROM floatplan.vessel_types WHERE id = $1", VESSEL_COLUMNS);
        let row = self.with_client(|c| c.query_opt(sql.as_str(), &[&vessel_type_id]))?;
        Ok(row.as_ref().map(vessel_from_row))
    }

    fn vessel_type_by_slug(&self, slug: &str) -> Result<Option<VesselType>, SourceError> {
        let sql = format!("SELECT {} FROM floatplan.vessel_types WHERE slug = $1", VESSEL_COLUMNS);
        let row = self.with_client(|c| c.query_opt(sql.as_str(), &[&slug]))?;
        Ok(row.as_ref().map(vessel_from_row))
    }

    fn gauge_associations(&self, river_id: &str) -> Result<Vec<RiverGaugeAssociation>, SourceError> {
        let rows = self.with_client(|c| {
            c.query(
                "SELECT rg.river_id, g.id AS gauge_id, g.site_code, g.name AS gauge_name,
                        g.lng, g.lat, rg.threshold_unit,
                        rg.level_too_low, rg.level_low, rg.level_optimal_min,
                        rg.level_optimal_max, rg.level_high, rg.level_dangerous,
                        rg.is_primary, rg.river_mile
                 FROM floatplan.river_gauges rg
                 JOIN floatplan.gauge_stations g ON g.id = rg.gauge_id
                 WHERE rg.river_id = $1
                 ORDER BY rg.created_at, g.id",
                &[&river_id],
            )
        })?;
        Ok(rows.iter().map(association_from_row).collect())
    }

    fn hazards(&self, river_id: &str) -> Result<Vec<Hazard>, SourceError> {
        let rows = self.with_client(|c| {
            c.query(
                "SELECT id, river_id, name, hazard_type, river_mile, severity,
                        portage_required, portage_side, description, active
                 FROM floatplan.hazards
                 WHERE river_id = $1
                 ORDER BY river_mile, id",
                &[&river_id],
            )
        })?;
        Ok(rows.iter().map(hazard_from_row).collect())
    }

    fn latest_cached_reading(&self, site_code: &str) -> Result<Option<Reading>, SourceError> {
        let row = self.with_client(|c| {
            c.query_opt(
                "SELECT gauge_height_ft, discharge_cfs, reading_time
                 FROM floatplan.gauge_readings
                 WHERE site_code = $1
                 ORDER BY reading_time DESC
                 LIMIT 1",
                &[&site_code],
            )
        })?;
        Ok(row.map(|r| Reading {
            height_ft: decimal_to_f64(r.get("gauge_height_ft")),
            discharge_cfs: decimal_to_f64(r.get("discharge_cfs")),
            timestamp: r.get("reading_time"),
        }))
    }
}

// ---------------------------------------------------------------------------
// GeometryEngine
// ---------------------------------------------------------------------------

impl GeometryEngine for PgStore {
    /// Delegates to the database's `floatplan.segment_between` function,
    /// which owns snapping and distance-along-river.
    fn segment(&self, start_access_id: &str, end_access_id: &str) -> Result<Segment, SourceError> {
        let row = self.with_client(|c| {
            c.query_opt(
                "SELECT distance_miles, start_mile, end_mile, geometry_json
                 FROM floatplan.segment_between($1, $2)",
                &[&start_access_id, &end_access_id],
            )
        })?;
        let row = row.ok_or_else(|| {
            SourceError::NoDataAvailable(format!(
                "No segment between {} and {}",
                start_access_id, end_access_id
            ))
        })?;

        let missing = |column: &str| SourceError::ParseError(format!("segment_between returned null {}", column));
        let distance_miles = decimal_to_f64(row.get("distance_miles")).ok_or_else(|| missing("distance_miles"))?;
        let start_mile = decimal_to_f64(row.get("start_mile")).ok_or_else(|| missing("start_mile"))?;
        let end_mile = decimal_to_f64(row.get("end_mile")).ok_or_else(|| missing("end_mile"))?;

        let geometry = match row.get::<_, Option<String>>("geometry_json") {
            Some(text) => serde_json::from_str(&text)
                .map_err(|e| SourceError::ParseError(format!("Segment geometry is not GeoJSON: {}", e)))?,
            None => serde_json::Value::Null,
        };

        Ok(Segment {
            distance_miles,
            start_mile,
            end_mile,
            geometry,
        })
    }
}

// ---------------------------------------------------------------------------
// SegmentTimes
// ---------------------------------------------------------------------------

impl SegmentTimes for PgStore {
    /// Exact direction first, then the reverse pair flagged `is_reverse`.
    fn known_time(
        &self,
        put_in_id: &str,
        take_out_id: &str,
        vessel_slug: &str,
    ) -> Result<Option<KnownSegmentTime>, SourceError> {
        let sql = "SELECT avg_minutes, min_minutes, max_minutes
                   FROM floatplan.segment_times
                   WHERE put_in_id = $1 AND take_out_id = $2 AND vessel_slug = $3";

        for (from, to, is_reverse) in [(put_in_id, take_out_id, false), (take_out_id, put_in_id, true)] {
            let row = self.with_client(|c| c.query_opt(sql, &[&from, &to, &vessel_slug]))?;
            if let Some(row) = row {
                return Ok(Some(KnownSegmentTime {
                    avg_minutes: decimal_to_f64(row.get("avg_minutes")),
                    min_minutes: decimal_to_f64(row.get("min_minutes")),
                    max_minutes: decimal_to_f64(row.get("max_minutes")),
                    is_reverse,
                }));
            }
        }
        Ok(None)
    }
}
