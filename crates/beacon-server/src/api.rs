//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `bluetooth` - Beacon scanning and connection
//! - `config` - Estimator and tracking configuration
//! - `estimate` - Stateless distance and ring calculations
//! - `health` - Service health checks
//! - `location` - Observer GPS fixes
//! - `tracking` - Latest position estimate
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod bluetooth;
pub mod config;
pub mod error;
pub mod estimate;
pub mod health;
pub mod location;
pub mod openapi;
pub mod tracking;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                          - Health check
/// /swagger-ui                      - Interactive API docs
/// /api
/// ├── /devices                     - Scan for beacons
/// ├── /devices/{address}/connect   - Connect to a beacon
/// ├── /devices/{address}/disconnect
/// ├── /connection                  - Connected beacon
/// ├── /location                    - Observer fix (GET, PUT)
/// ├── /tracking                    - Latest estimate
/// ├── /tracking/refresh            - Estimate now
/// ├── /estimate/{distance,ring,position}
/// ├── /config                      - Configuration (GET)
/// ├── /config/{estimator,tracking} - Configuration updates (PUT)
/// └── /openapi.json                - OpenAPI specification
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(bluetooth::router())
        .merge(location::router())
        .merge(tracking::router())
        .merge(estimate::router())
        .merge(config::router())
        .merge(SwaggerUi::new("/swagger-ui").url("/api/openapi.json", openapi::ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .with_state(state)
}
