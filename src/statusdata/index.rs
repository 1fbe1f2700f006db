//! Host/service lookup index

use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::xdata::ServiceStatus;

/// A lookup that found nothing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No service of this host is monitored
    #[error("unknown host '{0}'")]
    UnknownHost(String),

    /// The host is monitored but has no such service
    #[error("unknown service '{service}' on host '{host}'")]
    UnknownService { host: String, service: String },
}

/// Service status records indexed by host name, then service description
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceIndex {
    hosts: HashMap<String, HashMap<String, Arc<ServiceStatus>>>,
    services: usize,
}

impl ServiceIndex {
    /// Build an index; a later record for the same host and service replaces an earlier one
    pub fn from_services(records: impl IntoIterator<Item = ServiceStatus>) -> Self {
        let mut hosts: HashMap<String, HashMap<String, Arc<ServiceStatus>>> = HashMap::new();
        for record in records {
            hosts
                .entry(record.host_name.clone())
                .or_default()
                .insert(record.service_description.clone(), Arc::new(record));
        }
        let services = hosts.values().map(HashMap::len).sum();
        Self { hosts, services }
    }

    pub fn lookup(&self, host: &str, service: &str) -> Result<Arc<ServiceStatus>, LookupError> {
        let services = self
            .hosts
            .get(host)
            .ok_or_else(|| LookupError::UnknownHost(host.to_string()))?;

        services
            .get(service)
            .cloned()
            .ok_or_else(|| LookupError::UnknownService {
                host: host.to_string(),
                service: service.to_string(),
            })
    }

    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    pub fn service_count(&self) -> usize {
        self.services
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}
