/// HTTP endpoint for float plans and river conditions
///
/// Read-only JSON API. Requests are accepted on one thread and handed to a
/// fixed worker pool; every request builds its own plan from shared,
/// thread-safe collaborators.
///
/// Endpoints:
/// - GET /plan?riverId=&startId=&endId=&vesselTypeId= - Float plan
/// - GET /rivers/{river_id}/condition?mile=            - Current condition
/// - GET /health                                       - Service health check

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use threadpool::ThreadPool;

use crate::condition::cached::CachedConditions;
use crate::condition::{ConditionResolver, ResolvedCondition};
use crate::logging::{self, DataSource};
use crate::plan::{FloatPlan, PlanAssembler, PlanError, PlanRequest, PlanSettings, PlanSources};
use crate::sources::postgres::PgStore;
use crate::sources::routing::MapboxClient;
use crate::sources::usgs::UsgsClient;
use crate::sources::usgs_stats::StatsClient;
use crate::sources::ReferenceStore;

pub const SERVICE_NAME: &str = "floplan_service";

const ENDPOINTS: [&str; 3] = [
    "/plan?riverId=&startId=&endId=&vesselTypeId=",
    "/rivers/{river_id}/condition?mile=",
    "/health",
];

// ---------------------------------------------------------------------------
// Service seam
// ---------------------------------------------------------------------------

/// What the HTTP layer needs from the planning engine.
pub trait PlanService: Send + Sync {
    fn plan(&self, request: &PlanRequest, now: DateTime<Utc>) -> Result<FloatPlan, PlanError>;

    /// Current condition for a river. Without a mile the primary gauge
    /// governs.
    fn river_condition(
        &self,
        river_id: &str,
        mile: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedCondition, PlanError>;
}

/// Production collaborators: PostgreSQL plus the USGS and Mapbox APIs.
pub struct Backends {
    pub store: PgStore,
    pub usgs: UsgsClient,
    pub stats: StatsClient,
    pub routing: MapboxClient,
    pub settings: PlanSettings,
    pub accuracy_distance_miles: f64,
}

impl PlanService for Backends {
    fn plan(&self, request: &PlanRequest, now: DateTime<Utc>) -> Result<FloatPlan, PlanError> {
        let lookup = CachedConditions::new(&self.store, self.accuracy_distance_miles);
        let sources = PlanSources {
            store: &self.store,
            lookup: &lookup,
            geometry: &self.store,
            live: &self.usgs,
            stats: &self.stats,
            routing: &self.routing,
            times: &self.store,
        };
        PlanAssembler::new(sources, self.settings.clone()).assemble(request, now)
    }

    fn river_condition(
        &self,
        river_id: &str,
        mile: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<ResolvedCondition, PlanError> {
        let river = self.store.river(river_id).map_err(|e| {
            logging::log_dependency_failure(DataSource::Database, Some(river_id), "River lookup", &e);
            PlanError::Internal("river lookup failed".to_string())
        })?;
        if river.is_none() {
            return Err(PlanError::NotFound(format!("River '{}' not found", river_id)));
        }

        let lookup = CachedConditions::new(&self.store, self.accuracy_distance_miles);
        let resolver = ConditionResolver::new(&lookup, &self.usgs, &self.store);
        Ok(resolver.resolve(river_id, mile.unwrap_or(f64::NAN), None, now))
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Splits a request URL into its path and decoded query parameters.
/// Later duplicates of a key win.
pub fn parse_url(url: &str) -> (&str, HashMap<String, String>) {
    let (path, query) = match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    };

    let params = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key, value))
        })
        .collect();

    (path, params)
}

fn param(params: &HashMap<String, String>, name: &str) -> Option<String> {
    params
        .get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Dispatches one request and returns status and JSON body.
pub fn route(service: &dyn PlanService, method: &str, url: &str, now: DateTime<Utc>) -> (u16, serde_json::Value) {
    if method != "GET" {
        return error_body(405, &format!("Method {} not allowed", method));
    }

    let (path, params) = parse_url(url);
    let path = path.trim_end_matches('/');

    if path == "/health" {
        return handle_health();
    }
    if path == "/plan" {
        return handle_plan(service, &params, now);
    }
    if let Some(river_id) = path
        .strip_prefix("/rivers/")
        .and_then(|rest| rest.strip_suffix("/condition"))
        .filter(|id| !id.is_empty() && !id.contains('/'))
    {
        return handle_river_condition(service, river_id, &params, now);
    }

    (
        404,
        serde_json::json!({
            "error": "Not found",
            "availableEndpoints": ENDPOINTS,
        }),
    )
}

/// Handle /health endpoint
fn handle_health() -> (u16, serde_json::Value) {
    (
        200,
        serde_json::json!({
            "status": "ok",
            "service": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Handle /plan endpoint
fn handle_plan(
    service: &dyn PlanService,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> (u16, serde_json::Value) {
    let missing: Vec<&str> = ["riverId", "startId", "endId"]
        .into_iter()
        .filter(|name| param(params, name).is_none())
        .collect();
    if !missing.is_empty() {
        return error_body(400, &format!("Missing required parameter(s): {}", missing.join(", ")));
    }

    let request = PlanRequest {
        river_id: param(params, "riverId").unwrap_or_default(),
        start_id: param(params, "startId").unwrap_or_default(),
        end_id: param(params, "endId").unwrap_or_default(),
        vessel_type_id: param(params, "vesselTypeId"),
    };

    match service.plan(&request, now) {
        Ok(plan) => match serde_json::to_value(&plan) {
            Ok(value) => (200, serde_json::json!({ "plan": value })),
            Err(e) => serialization_failure(&e),
        },
        Err(e) => plan_error(&e),
    }
}

/// Handle /rivers/{river_id}/condition endpoint
fn handle_river_condition(
    service: &dyn PlanService,
    river_id: &str,
    params: &HashMap<String, String>,
    now: DateTime<Utc>,
) -> (u16, serde_json::Value) {
    let mile = match param(params, "mile") {
        None => None,
        Some(raw) => match raw.parse::<f64>() {
            Ok(mile) if mile.is_finite() => Some(mile),
            _ => return error_body(400, &format!("mile must be a number, got '{}'", raw)),
        },
    };

    match service.river_condition(river_id, mile, now) {
        Ok(condition) => match serde_json::to_value(&condition) {
            Ok(value) => (200, serde_json::json!({ "riverId": river_id, "condition": value })),
            Err(e) => serialization_failure(&e),
        },
        Err(e) => plan_error(&e),
    }
}

fn plan_error(e: &PlanError) -> (u16, serde_json::Value) {
    let status = e.status_code();
    if status >= 500 {
        logging::error(DataSource::Http, None, &e.to_string());
    } else {
        logging::debug(DataSource::Http, None, &e.to_string());
    }
    error_body(status, e.message())
}

fn serialization_failure(e: &serde_json::Error) -> (u16, serde_json::Value) {
    logging::error(DataSource::Http, None, &format!("Response serialization failed: {}", e));
    error_body(500, "Response could not be serialized")
}

fn error_body(status: u16, message: &str) -> (u16, serde_json::Value) {
    (status, serde_json::json!({ "error": message, "status": status }))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP endpoint server on the specified port. Blocks for the life of
/// the server.
pub fn start_endpoint_server(port: u16, workers: usize, service: Arc<dyn PlanService>) -> Result<(), String> {
    let server = tiny_http::Server::http(format!("0.0.0.0:{}", port))
        .map_err(|e| format!("Failed to start HTTP server: {}", e))?;
    let pool = ThreadPool::new(workers.max(1));

    println!("📡 HTTP endpoint listening on http://0.0.0.0:{}", port);
    for endpoint in ENDPOINTS {
        println!("   GET {}", endpoint);
    }
    println!("   Workers: {}\n", workers.max(1));

    for request in server.incoming_requests() {
        let service = Arc::clone(&service);
        pool.execute(move || {
            let method = request.method().as_str().to_string();
            let url = request.url().to_string();
            let (status, body) = route(service.as_ref(), &method, &url, Utc::now());

            logging::debug(DataSource::Http, None, &format!("{} {} -> {}", method, url, status));

            if let Err(e) = request.respond(create_response(status, &body)) {
                logging::warn(DataSource::Http, None, &format!("Failed to send response: {}", e));
            }
        });
    }

    Ok(())
}

/// Create HTTP response with JSON body
fn create_response(status_code: u16, json: &serde_json::Value) -> tiny_http::Response<Cursor<Vec<u8>>> {
    let body = serde_json::to_string_pretty(json)
        .unwrap_or_else(|_| r#"{"error":"Response could not be serialized","status":500}"#.to_string());

    let response = tiny_http::Response::from_data(body.into_bytes())
        .with_status_code(tiny_http::StatusCode::from(status_code));
    match tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
