//! ==============================================================================
//! main.rs - cloudwatcher host entry point
//! ==============================================================================
//!
//! purpose:
//!     stand-alone host for the cloudwatcher core. it plays the part an
//!     observatory control program would: picks up the stored station address,
//!     connects, logs readings, and exposes the latest report over http.
//!
//! responsibilities:
//!     - load host.toml and set up logging
//!     - create the http connector once for the whole process
//!     - connect the session (blocking work goes through spawn_blocking)
//!     - log a report line every poll interval
//!     - serve GET /api with the latest report as json
//!     - disconnect cleanly on ctrl-c
//!
//! architecture:
//!
//! ```text
//!     ┌──────────────────────── host (this file) ────────────────────────┐
//!     │  ┌──────────────┐   ┌──────────────┐   ┌──────────────────────┐  │
//!     │  │ report loop  │   │ web server   │   │ ctrl-c -> disconnect │  │
//!     │  │ (interval)   │   │ (port 3000)  │   │                      │  │
//!     │  └──────┬───────┘   └──────┬───────┘   └──────────┬───────────┘  │
//!     │         └──────────────────┼──────────────────────┘              │
//!     │                     ┌──────┴───────┐                             │
//!     │                     │ DeviceSession│ <- session.rs               │
//!     │                     └──────┬───────┘                             │
//!     └────────────────────────────┼─────────────────────────────────────┘
//!                                  │ poller thread, GET every interval
//!                                  v
//!                    http://<address>/cgi-bin/cgiLastData
//! ```
//!
//! ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cloudwatcher::config::HostConfig;
use cloudwatcher::settings::AddressStore;
use cloudwatcher::{DeviceSession, HttpConnector, WeatherReport};

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration
    let config = HostConfig::load_or_default();
    init_logging(&config.logging.level);
    config.print_summary();

    // step 2: resolve the station address
    let store = AddressStore::new(&config.device.settings_file);
    let address = store.read_address(&config.device.default_address);
    if let Err(e) = store.write_address(&address) {
        warn!(error = %format!("{e:#}"), "could not persist station address");
    }

    // step 3: process-wide transport setup, then the session
    let connector = Arc::new(HttpConnector::new(config.transport_settings()));
    let session = Arc::new(DeviceSession::new(connector, config.poller_settings()));
    session.set_address(&address)?;

    info!(%address, "connecting to station");
    let connecting = Arc::clone(&session);
    tokio::task::spawn_blocking(move || connecting.connect())
        .await
        .context("connect task failed")?
        .with_context(|| format!("could not reach station at {address}"))?;
    info!(firmware = %session.firmware(), "station online");

    // step 4: json endpoint in background
    if config.server.enabled {
        let web_session = Arc::clone(&session);
        let bind = config.server.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = run_server(web_session, &bind).await {
                error!(error = %format!("{e:#}"), "web server stopped");
            }
        });
    }

    // step 5: report loop until ctrl-c
    let mut ticker = tokio::time::interval(Duration::from_secs(config.polling.interval_seconds.max(1)));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if config.logging.show_readings {
                    match session.report() {
                        Ok(report) => info!("{report}"),
                        Err(e) => warn!(error = %e, "no report"),
                    }
                }
            }
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        }
    }

    let closing = Arc::clone(&session);
    tokio::task::spawn_blocking(move || closing.disconnect())
        .await
        .context("disconnect task failed")?;
    Ok(())
}

/// `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

// ==============================================================================
// web server
// ==============================================================================

async fn run_server(session: Arc<DeviceSession>, bind: &str) -> Result<()> {
    let app = Router::new()
        .route("/api", get(api_handler))
        .layer(CorsLayer::permissive())
        .with_state(session);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("api live at http://{bind}/api");
    axum::serve(listener, app).await?;
    Ok(())
}

/// latest report as json, 503 while the session is down
async fn api_handler(
    State(session): State<Arc<DeviceSession>>,
) -> Result<Json<WeatherReport>, (StatusCode, Json<serde_json::Value>)> {
    session.report().map(Json).map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({"status": "error", "message": e.to_string()})),
        )
    })
}
