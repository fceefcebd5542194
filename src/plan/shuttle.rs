/// Shuttle drive-back between the take-out and the put-in.
///
/// Each end is routed from the best location we have for it, in order:
/// a geocoded directions override, the parking/driving coordinates, the
/// river-snapped coordinates, then the access point's own coordinates.

use crate::float_time::format_duration;
use crate::logging::{self, DataSource};
use crate::model::{AccessPoint, ConditionCode, Coordinates, SourceError};
use crate::plan::DriveBack;
use crate::sources::RoutingService;

/// Location to route to or from for an access point. A failed or empty
/// geocode falls through to the stored coordinates.
pub fn routing_point(access_point: &AccessPoint, routing: &dyn RoutingService) -> Coordinates {
    if let Some(address) = access_point.directions_override.as_deref() {
        match routing.geocode(address) {
            Ok(Some(point)) => return point,
            Ok(None) => logging::debug(
                DataSource::Routing,
                Some(&access_point.id),
                &format!("No geocoding match for '{}'; using stored coordinates", address),
            ),
            Err(e) => logging::log_dependency_failure(
                DataSource::Routing,
                Some(&access_point.id),
                "Geocoding directions override",
                &e,
            ),
        }
    }

    access_point
        .driving_coordinates
        .or(access_point.snapped_coordinates)
        .unwrap_or(access_point.coordinates)
}

/// Drive time from `take_out` back to `put_in`.
pub fn drive_back(
    routing: &dyn RoutingService,
    take_out: &AccessPoint,
    put_in: &AccessPoint,
    condition: ConditionCode,
) -> Result<DriveBack, SourceError> {
    let from = routing_point(take_out, routing);
    let to = routing_point(put_in, routing);
    let route = routing.drive_time(from, to, condition)?;

    if !route.minutes.is_finite() || route.minutes < 0.0 {
        return Err(SourceError::ParseError(format!(
            "Route duration {} is not usable",
            route.minutes
        )));
    }

    let minutes = route.minutes.round() as i64;
    Ok(DriveBack {
        minutes,
        miles: (route.miles * 10.0).round() / 10.0,
        formatted: format_duration(minutes),
        route_summary: route.summary,
        route: route.geometry,
    })
}
