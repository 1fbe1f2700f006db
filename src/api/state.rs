//! API State management
//!
//! Shared state for the HTTP API: the status repository, the command writer
//! and request counters.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::command::CommandWriter;
use crate::statusdata::{LookupError, Repository};
use crate::submission::SubmissionService;
use crate::xdata::ServiceStatus;

/// Request counters
#[derive(Debug, Default)]
struct Counters {
    found: AtomicU64,
    unknown_host: AtomicU64,
    unknown_service: AtomicU64,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Snapshot of the request counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApiStats {
    pub lookups_found: u64,
    pub lookups_unknown_host: u64,
    pub lookups_unknown_service: u64,
    pub submissions_accepted: u64,
    pub submissions_rejected: u64,
}

/// Shared API state
#[derive(Clone)]
pub struct AppState {
    repository: Arc<Repository>,
    writer: CommandWriter,
    submissions: SubmissionService,
    counters: Arc<Counters>,
    started_at: Instant,
}

impl AppState {
    /// Create new API state
    pub fn new(repository: Arc<Repository>, writer: CommandWriter) -> Self {
        let submissions = SubmissionService::new(Arc::new(writer.clone()));
        Self {
            repository,
            writer,
            submissions,
            counters: Arc::new(Counters::default()),
            started_at: Instant::now(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    pub fn writer(&self) -> &CommandWriter {
        &self.writer
    }

    pub fn submissions(&self) -> &SubmissionService {
        &self.submissions
    }

    /// Count the outcome of a lookup
    pub fn record_lookup<T>(&self, result: &Result<T, LookupError>) {
        let counter = match result {
            Ok(_) => &self.counters.found,
            Err(LookupError::UnknownHost(_)) => &self.counters.unknown_host,
            Err(LookupError::UnknownService { .. }) => &self.counters.unknown_service,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count the outcome of a submission
    pub fn record_submission(&self, accepted: bool) {
        let counter = if accepted {
            &self.counters.accepted
        } else {
            &self.counters.rejected
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ApiStats {
        ApiStats {
            lookups_found: self.counters.found.load(Ordering::Relaxed),
            lookups_unknown_host: self.counters.unknown_host.load(Ordering::Relaxed),
            lookups_unknown_service: self.counters.unknown_service.load(Ordering::Relaxed),
            submissions_accepted: self.counters.accepted.load(Ordering::Relaxed),
            submissions_rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }

    /// Get elapsed time
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// Status of one service, as returned by the status endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatusResponse {
    pub is_found: bool,
    pub hostname: String,
    pub service: String,
    pub output: String,
    pub status: String,
}

impl ServiceStatusResponse {
    pub fn found(hostname: &str, service: &str, status: &ServiceStatus) -> Self {
        Self {
            is_found: true,
            hostname: hostname.to_string(),
            service: service.to_string(),
            output: status.plugin_output.clone(),
            status: status.current_state.to_string(),
        }
    }

    pub fn not_found(hostname: &str, service: &str) -> Self {
        Self {
            is_found: false,
            hostname: hostname.to_string(),
            service: service.to_string(),
            output: String::new(),
            status: String::new(),
        }
    }
}

/// One entry of a multi-service status request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceQuery {
    pub hostname: String,
    pub service: String,
}

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub hosts: usize,
    pub services: usize,
    pub queued_commands: usize,
    pub uptime_secs: u64,
}
