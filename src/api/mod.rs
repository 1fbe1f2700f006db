//! Status HTTP API
//!
//! Serves Nagios service status and accepts passive check results.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (always returns 200 if running)
//! - `GET /metrics` - Prometheus metrics
//! - `GET /v1/api/status/{host}/{service}` - Status of one service (404 if unknown)
//! - `POST /v1/api/status` - Status of several services
//! - `POST /v1/api/submit` - Queue a passive check result (202 when queued)

mod error;
mod metrics;
mod server;
mod state;

pub use error::ApiError;
pub use server::{build_cors_layer, create_router, start_api_server};
pub use state::{ApiStats, AppState, HealthResponse, ServiceQuery, ServiceStatusResponse};
