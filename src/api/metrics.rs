//! Prometheus metrics
//!
//! Exposes metrics in Prometheus text format at `/metrics`.
//!
//! ## Metrics Exposed
//!
//! - `nagapi_status_hosts` / `nagapi_status_services` - Size of the status index
//! - `nagapi_status_loads_total` - Successful status file loads
//! - `nagapi_status_load_failures_total` - Failed status file loads
//! - `nagapi_status_last_load_timestamp_seconds` - Time of the last successful load
//! - `nagapi_command_queue_length` / `nagapi_command_queue_capacity` - Command queue usage
//! - `nagapi_commands_written_total` - Commands written to the command file
//! - `nagapi_command_write_failures_total` / `nagapi_command_open_failures_total` - Command file errors
//! - `nagapi_lookups_total{result}` - Status lookups by outcome
//! - `nagapi_submissions_total{result}` - Check result submissions by outcome
//!
//! ## Scrape configuration
//!
//! ```yaml
//! scrape_configs:
//!   - job_name: 'nagapi'
//!     static_configs:
//!       - targets: ['nagapi:3000']
//!     metrics_path: '/metrics'
//! ```

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::fmt::{Display, Write};

use super::state::AppState;

/// Generate Prometheus-format metrics
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let repo = state.repository().stats();
    let writer = state.writer().stats();
    let api = state.stats();

    let mut output = String::new();

    let version = format!("version=\"{}\"", env!("CARGO_PKG_VERSION"));
    metric(
        &mut output,
        "nagapi_info",
        "gauge",
        "nagapi build information",
        &[(version.as_str(), 1)],
    );
    metric(
        &mut output,
        "nagapi_uptime_seconds",
        "gauge",
        "Time elapsed since start",
        &[("", state.uptime().as_secs_f64())],
    );

    metric(
        &mut output,
        "nagapi_status_hosts",
        "gauge",
        "Hosts in the status index",
        &[("", repo.hosts)],
    );
    metric(
        &mut output,
        "nagapi_status_services",
        "gauge",
        "Services in the status index",
        &[("", repo.services)],
    );
    metric(
        &mut output,
        "nagapi_status_loads_total",
        "counter",
        "Successful status file loads",
        &[("", repo.loads)],
    );
    metric(
        &mut output,
        "nagapi_status_load_failures_total",
        "counter",
        "Failed status file loads",
        &[("", repo.load_failures)],
    );
    metric(
        &mut output,
        "nagapi_status_last_load_timestamp_seconds",
        "gauge",
        "Unix time of the last successful status file load",
        &[("", repo.last_load)],
    );

    metric(
        &mut output,
        "nagapi_command_queue_length",
        "gauge",
        "Commands waiting to be written",
        &[("", writer.queued)],
    );
    metric(
        &mut output,
        "nagapi_command_queue_capacity",
        "gauge",
        "Maximum number of queued commands",
        &[("", writer.capacity)],
    );
    metric(
        &mut output,
        "nagapi_commands_written_total",
        "counter",
        "Commands written to the external command file",
        &[("", writer.written)],
    );
    metric(
        &mut output,
        "nagapi_command_write_failures_total",
        "counter",
        "Failed writes to the external command file",
        &[("", writer.write_failures)],
    );
    metric(
        &mut output,
        "nagapi_command_open_failures_total",
        "counter",
        "Failed attempts to open the external command file",
        &[("", writer.open_failures)],
    );

    metric(
        &mut output,
        "nagapi_lookups_total",
        "counter",
        "Service status lookups by result",
        &[
            ("result=\"found\"", api.lookups_found),
            ("result=\"unknown_host\"", api.lookups_unknown_host),
            ("result=\"unknown_service\"", api.lookups_unknown_service),
        ],
    );
    metric(
        &mut output,
        "nagapi_submissions_total",
        "counter",
        "Check result submissions by result",
        &[
            ("result=\"accepted\"", api.submissions_accepted),
            ("result=\"rejected\"", api.submissions_rejected),
        ],
    );

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

/// Append one metric family; an empty label set writes a bare sample
fn metric<V: Display>(out: &mut String, name: &str, kind: &str, help: &str, samples: &[(&str, V)]) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
    for (labels, value) in samples {
        if labels.is_empty() {
            let _ = writeln!(out, "{} {}", name, value);
        } else {
            let _ = writeln!(out, "{}{{{}}} {}", name, labels, value);
        }
    }
    out.push('\n');
}
