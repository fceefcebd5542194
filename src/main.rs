//! Float Plan Service - HTTP server
//!
//! Serves float plans and river conditions:
//! 1. Loads floplan.toml (or built-in defaults)
//! 2. Connects to PostgreSQL and validates the floatplan schema
//! 3. Builds the USGS and Mapbox clients with a bounded timeout
//! 4. Serves the JSON API on a worker pool
//!
//! Usage:
//!   cargo run --release                           # Port and config from floplan.toml
//!   cargo run --release -- --port 9090            # Override the listen port
//!   cargo run --release -- --config other.toml    # Alternate config file
//!
//! Environment:
//!   DATABASE_URL - PostgreSQL connection string
//!   MAPBOX_TOKEN - Mapbox access token (drive times are "Unknown" without it)

use floplan_service::config::{self, DEFAULT_CONFIG_PATH};
use floplan_service::db;
use floplan_service::endpoint::{self, Backends};
use floplan_service::logging;
use floplan_service::plan::PlanSettings;
use floplan_service::sources::postgres::{PgStore, SCHEMA};
use floplan_service::sources::routing::MapboxClient;
use floplan_service::sources::usgs::UsgsClient;
use floplan_service::sources::usgs_stats::StatsClient;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--port PORT] [--config PATH]", program);
    std::process::exit(1);
}

fn main() {
    println!("🛶 Float Plan Service");
    println!("=====================\n");

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut port_override: Option<u16> = None;
    let mut config_path = PathBuf::from(DEFAULT_CONFIG_PATH);

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                match args.get(i + 1).and_then(|p| p.parse().ok()) {
                    Some(port) => port_override = Some(port),
                    None => {
                        eprintln!("Error: --port requires a port number");
                        usage(&args[0]);
                    }
                }
                i += 2;
            }
            "--config" => {
                match args.get(i + 1) {
                    Some(path) => config_path = PathBuf::from(path),
                    None => {
                        eprintln!("Error: --config requires a file path");
                        usage(&args[0]);
                    }
                }
                i += 2;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                usage(&args[0]);
            }
        }
    }

    // Load .env before anything reads the environment
    dotenv::dotenv().ok();

    println!("⚙️  Loading configuration from {}...", config_path.display());
    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            std::process::exit(1);
        }
    };
    let port = port_override.unwrap_or(config.server.port);
    println!("✓ Configuration loaded\n");

    logging::init_logger(config.log_level(), config.logging.file.as_deref(), config.logging.timestamps);

    println!("📊 Connecting to database...");
    let client = match db::connect_and_verify(&[SCHEMA], config.sources.statement_timeout_ms) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            std::process::exit(1);
        }
    };
    println!("✓ Connected (statement timeout {} ms)\n", config.sources.statement_timeout_ms);

    // HTTP client with timeout
    let http = match reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.sources.request_timeout_secs))
        .user_agent(concat!("floplan_service/", env!("CARGO_PKG_VERSION")))
        .build()
    {
        Ok(http) => http,
        Err(e) => {
            eprintln!("\n❌ Failed to build HTTP client: {}\n", e);
            std::process::exit(1);
        }
    };

    let mapbox_token = env::var("MAPBOX_TOKEN").ok();
    if mapbox_token.is_none() {
        println!("⚠️  MAPBOX_TOKEN not set; shuttle drive times will be reported as Unknown\n");
    }

    let backends = Backends {
        store: PgStore::new(client),
        usgs: UsgsClient::new(http.clone(), &config.sources.usgs_iv_base_url),
        stats: StatsClient::new(http.clone(), &config.sources.usgs_stat_base_url),
        routing: MapboxClient::new(http, &config.sources.mapbox_base_url, mapbox_token),
        settings: PlanSettings {
            default_vessel_slug: config.planning.default_vessel_slug.clone(),
        },
        accuracy_distance_miles: config.planning.accuracy_distance_miles,
    };

    println!("🚀 Starting HTTP endpoint server...");
    if let Err(e) = endpoint::start_endpoint_server(port, config.server.workers, Arc::new(backends)) {
        eprintln!("\n❌ Endpoint server error: {}", e);
        std::process::exit(1);
    }
}
