/// floplan_service: river float trip planning service.
///
/// Turns (river, put-in, take-out, vessel) into one float plan: distance,
/// float time, shuttle drive time, current water condition, and hazards.
///
/// # Module structure
///
/// ```text
/// floplan_service
/// ├── model       - shared data types (AccessPoint, ConditionThresholds, SourceError, …)
/// ├── config      - service configuration loader (floplan.toml)
/// ├── logging     - leveled console/file logger with failure classification
/// ├── db          - PostgreSQL connection + schema validation
/// ├── endpoint    - JSON HTTP API on tiny_http + worker pool
/// ├── condition
/// │   ├── classifier - reading + thresholds → condition code
/// │   ├── gauge      - governing gauge selection by river-mile
/// │   ├── cached     - condition from the reading cache
/// │   └── resolver   - cached → live → primary fallback ladder
/// ├── float_time  - recorded times or vessel speed model
/// ├── hazards     - hazards between two river-miles
/// ├── plan
/// │   ├── assembler  - validate, compute, aggregate one plan
/// │   └── shuttle    - drive-back routing
/// └── sources
///     ├── postgres   - reference data, cached readings, geometry, segment times
///     ├── usgs       - USGS NWIS IV API: URL construction + JSON parsing
///     ├── usgs_stats - USGS daily statistics (RDB) + percentiles
///     ├── routing    - Mapbox directions + geocoding
///     └── fixtures (test only) - representative payloads and in-memory fakes
/// ```

/// Public modules
pub mod condition;
pub mod config;
pub mod db;
pub mod endpoint;
pub mod float_time;
pub mod hazards;
pub mod logging;
pub mod model;
pub mod plan;
pub mod sources;
