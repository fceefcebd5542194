/// Mapbox Directions and Geocoding client for shuttle drive times.
///
/// Directions: https://api.mapbox.com/directions/v5/mapbox/driving/{lng,lat};{lng,lat}
/// Geocoding:  https://api.mapbox.com/geocoding/v5/mapbox.places/{query}.json
///
/// When the river is running high the shuttle avoids unpaved roads: county
/// gravel roads down to Ozark access points are the first to wash out.

use serde::Deserialize;

use crate::model::{ConditionCode, Coordinates, SourceError};
use crate::sources::{DriveRoute, RoutingService};

pub const MAPBOX_BASE_URL: &str = "https://api.mapbox.com";

const METERS_PER_MILE: f64 = 1609.344;

// ---------------------------------------------------------------------------
// Serde structures
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct DirectionsResponse {
    code: String,
    #[serde(default)]
    routes: Vec<Route>,
}

#[derive(Deserialize)]
struct Route {
    duration: f64, // seconds
    distance: f64, // meters
    #[serde(default)]
    legs: Vec<Leg>,
    geometry: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct Leg {
    #[serde(default)]
    summary: String,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    center: Vec<f64>, // [lng, lat]
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

/// Gravel county roads are avoided once the water is high.
pub fn avoids_unpaved(condition: ConditionCode) -> bool {
    matches!(condition, ConditionCode::High | ConditionCode::Dangerous)
}

pub fn build_directions_url(
    base_url: &str,
    from: Coordinates,
    to: Coordinates,
    condition: ConditionCode,
    token: &str,
) -> String {
    let mut url = format!(
        "{}/directions/v5/mapbox/driving/{},{};{},{}?geometries=geojson&overview=simplified&access_token={}",
        base_url.trim_end_matches('/'),
        from.lng,
        from.lat,
        to.lng,
        to.lat,
        urlencoding::encode(token)
    );
    if avoids_unpaved(condition) {
        url.push_str("&exclude=unpaved");
    }
    url
}

pub fn build_geocode_url(base_url: &str, address: &str, token: &str) -> String {
    format!(
        "{}/geocoding/v5/mapbox.places/{}.json?limit=1&country=us&access_token={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(address),
        urlencoding::encode(token)
    )
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// First route of a directions response.
///
/// # Errors
/// - `SourceError::ParseError` - body is not a directions response.
/// - `SourceError::NoDataAvailable` - Mapbox answered without a route.
pub fn parse_directions(json: &str) -> Result<DriveRoute, SourceError> {
    let response: DirectionsResponse = serde_json::from_str(json)
        .map_err(|e| SourceError::ParseError(format!("Directions deserialization failed: {}", e)))?;

    if response.code != "Ok" {
        return Err(SourceError::NoDataAvailable(format!(
            "Directions returned code {}",
            response.code
        )));
    }

    let route = response
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::NoDataAvailable("Directions returned no routes".into()))?;

    if !route.duration.is_finite() || !route.distance.is_finite() {
        return Err(SourceError::ParseError("Route duration or distance is not a number".into()));
    }

    let summary = route
        .legs
        .first()
        .map(|leg| leg.summary.trim().to_string())
        .filter(|s| !s.is_empty());

    Ok(DriveRoute {
        minutes: route.duration / 60.0,
        miles: route.distance / METERS_PER_MILE,
        summary,
        geometry: route.geometry,
    })
}

/// Best geocoding match, or `None` when nothing matched.
pub fn parse_geocode(json: &str) -> Result<Option<Coordinates>, SourceError> {
    let response: GeocodeResponse = serde_json::from_str(json)
        .map_err(|e| SourceError::ParseError(format!("Geocoding deserialization failed: {}", e)))?;

    Ok(response.features.into_iter().next().and_then(|f| match f.center.as_slice() {
        [lng, lat] => Some(Coordinates::new(*lng, *lat)).filter(Coordinates::is_valid),
        _ => None,
    }))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct MapboxClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: Option<String>,
}

impl MapboxClient {
    pub fn new(http: reqwest::blocking::Client, base_url: &str, token: Option<String>) -> Self {
        MapboxClient {
            http,
            base_url: base_url.to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    fn token(&self) -> Result<&str, SourceError> {
        self.token
            .as_deref()
            .ok_or_else(|| SourceError::Unavailable("MAPBOX_TOKEN is not set".into()))
    }

    fn fetch(&self, url: &str) -> Result<String, SourceError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()?;

        if !response.status().is_success() {
            return Err(SourceError::HttpError(response.status().as_u16()));
        }

        Ok(response.text()?)
    }
}

impl RoutingService for MapboxClient {
    fn drive_time(
        &self,
        from: Coordinates,
        to: Coordinates,
        condition: ConditionCode,
    ) -> Result<DriveRoute, SourceError> {
        let url = build_directions_url(&self.base_url, from, to, condition, self.token()?);
        parse_directions(&self.fetch(&url)?)
    }

    fn geocode(&self, address: &str) -> Result<Option<Coordinates>, SourceError> {
        if address.trim().is_empty() {
            return Ok(None);
        }
        let url = build_geocode_url(&self.base_url, address, self.token()?);
        parse_geocode(&self.fetch(&url)?)
    }
}
