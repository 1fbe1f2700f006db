//! HTTP Server for the status API
//!
//! Axum-based HTTP server providing status and submission endpoints.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderName, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::error::ApiError;
use super::metrics::metrics_handler;
use super::state::{AppState, HealthResponse, ServiceQuery, ServiceStatusResponse};
use crate::config::{ConfigError, CorsConfig};
use crate::submission::ServiceResult;

/// Start the API server on the given address
///
/// Runs until `shutdown` completes, then stops accepting connections and
/// waits for in-flight requests.
pub async fn start_api_server(
    addr: SocketAddr,
    state: AppState,
    cors: Option<CorsLayer>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = create_router(state, cors);

    let listener = TcpListener::bind(addr).await?;

    info!(addr = %addr, "Starting status API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Status API server stopped");
    Ok(())
}

/// Build the CORS layer, or `None` when CORS is disabled
pub fn build_cors_layer(config: &CorsConfig) -> Result<Option<CorsLayer>, ConfigError> {
    if !config.enabled {
        return Ok(None);
    }
    if config.allow_credentials && config.allows_any_origin() {
        return Err(ConfigError::Invalid(
            "CORS credentials cannot be allowed for any origin".to_string(),
        ));
    }

    let origins = if config.allows_any_origin() {
        AllowOrigin::from(Any)
    } else {
        let origins = config
            .allowed_origins
            .iter()
            .map(|o| {
                HeaderValue::from_str(o)
                    .map_err(|_| ConfigError::Invalid(format!("invalid CORS origin '{}'", o)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    let methods = config
        .allowed_methods
        .iter()
        .map(|m| {
            Method::from_bytes(m.as_bytes())
                .map_err(|_| ConfigError::Invalid(format!("invalid CORS method '{}'", m)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let headers = config
        .allowed_headers
        .iter()
        .map(|h| {
            HeaderName::from_bytes(h.as_bytes())
                .map_err(|_| ConfigError::Invalid(format!("invalid CORS header '{}'", h)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(config.allow_credentials)
            .max_age(config.max_age),
    ))
}

/// Create the API router
pub fn create_router(state: AppState, cors: Option<CorsLayer>) -> Router {
    let router = Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/api/status", post(status_multi_handler))
        .route("/v1/api/status/{host}/{service}", get(status_handler))
        .route("/v1/api/submit", post(submit_handler))
        .layer(TraceLayer::new_for_http());

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

/// Health check endpoint
///
/// Returns 200 if the service is running.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let repo = state.repository().stats();
    Json(HealthResponse {
        healthy: true,
        hosts: repo.hosts,
        services: repo.services,
        queued_commands: state.writer().stats().queued,
        uptime_secs: state.uptime().as_secs(),
    })
}

/// Status of a single service
///
/// Returns 404 when the host or the service is not monitored.
async fn status_handler(
    State(state): State<AppState>,
    Path((host, service)): Path<(String, String)>,
) -> Result<Json<ServiceStatusResponse>, ApiError> {
    let result = state.repository().lookup(&host, &service);
    state.record_lookup(&result);

    let status = result?;
    Ok(Json(ServiceStatusResponse::found(&host, &service, &status)))
}

/// Status of several services
///
/// All entries are answered from the same index; misses are reported with
/// `is_found: false`.
async fn status_multi_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<ServiceStatusResponse>>, ApiError> {
    let queries: Vec<ServiceQuery> = serde_json::from_slice(&body)?;

    let index = state.repository().snapshot();
    let responses = queries
        .iter()
        .map(|q| {
            let result = index.lookup(&q.hostname, &q.service);
            state.record_lookup(&result);
            match result {
                Ok(status) => ServiceStatusResponse::found(&q.hostname, &q.service, &status),
                Err(_) => ServiceStatusResponse::not_found(&q.hostname, &q.service),
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Submit a passive check result
///
/// Returns 202 once the command is queued.
async fn submit_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<&'static str>), ApiError> {
    let result: ServiceResult = serde_json::from_slice(&body)?;

    match state.submissions().submit(&result).await {
        Ok(()) => {
            state.record_submission(true);
            Ok((StatusCode::ACCEPTED, Json("ok")))
        }
        Err(e) => {
            state.record_submission(false);
            warn!(
                host = %result.hostname,
                service = %result.service_name,
                error = %e,
                "Rejected check result"
            );
            Err(e.into())
        }
    }
}
