//! # beacon-server
//!
//! HTTP server for the BLE beacon position estimator.
//!
//! This binary provides:
//! - REST API for beacon scanning, observer fixes and position estimates
//! - A background loop that re-estimates the beacon position periodically
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development (mock radio)
//! cargo run --package beacon-server
//!
//! # Production with BlueZ
//! BEACON_ENV=production BEACON__BLUETOOTH__BACKEND=bluez ./beacon-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use anyhow::Context;
use beacon_core::{default_config_path, Config};
use beacon_server::api::create_router;
use beacon_server::logging::{self, LogMode};
use beacon_server::state::{build_radio, AppState};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mode = LogMode::from_env();
    logging::init(mode)?;

    info!(version = env!("CARGO_PKG_VERSION"), ?mode, "Starting beacon-server");

    let config_path = default_config_path();
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .with_context(|| format!("Invalid bind address '{}'", config.server.bind_address))?;

    let radio = build_radio(&config.bluetooth).await;
    let tracking = config.tracking;
    let state = AppState::new(config, Some(config_path), radio);
    let tracker = state.tracker.clone();

    let (stop_tx, stop_rx) = oneshot::channel();
    let tracking_task = match tracker {
        Some(tracker) if tracking.enabled => {
            Some(tokio::spawn(tracker.run(tracking.interval(), stop_rx)))
        }
        Some(_) => {
            info!("Tracking disabled by configuration");
            None
        }
        None => {
            warn!("No radio available, tracking disabled");
            None
        }
    };

    let app = create_router(state.into_shared());
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = stop_tx.send(());
    if let Some(task) = tracking_task {
        task.await?;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
