//! Mock Nagios data for unit testing
//!
//! Builders that render `status.dat` text, so repository and API tests can
//! run against realistic files without a Nagios installation, plus a shared
//! log for recording what a fake command pipe received.
//!
//! # Example
//!
//! ```rust
//! use nagapi_testkit::mock::{MockService, MockStatusFile};
//!
//! let file = MockStatusFile::new()
//!     .with_service(MockService::new("web-1", "HTTP").with_state(2))
//!     .with_service(MockService::new("web-1", "SSH"));
//!
//! assert_eq!(file.service_count(), 2);
//! assert!(file.render().contains("service_description=HTTP"));
//! ```

use std::fmt::Write as _;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Mock representation of a `servicestatus` block
#[derive(Debug, Clone)]
pub struct MockService {
    pub host_name: String,
    pub service_description: String,
    /// Raw state code (0 OK, 1 WARNING, 2 CRITICAL, 3 UNKNOWN)
    pub current_state: u8,
    pub plugin_output: String,
    pub long_plugin_output: String,
    pub performance_data: String,
    pub check_interval: f64,
    pub notifications_enabled: bool,
    pub last_check: i64,
}

impl MockService {
    /// Create an OK service with default settings
    pub fn new(host: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            host_name: host.into(),
            service_description: service.into(),
            current_state: 0,
            plugin_output: "OK".to_string(),
            long_plugin_output: String::new(),
            performance_data: String::new(),
            check_interval: 5.0,
            notifications_enabled: true,
            last_check: 1_700_000_000,
        }
    }

    pub fn with_state(mut self, state: u8) -> Self {
        self.current_state = state;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.plugin_output = output.into();
        self
    }

    pub fn with_long_output(mut self, output: impl Into<String>) -> Self {
        self.long_plugin_output = output.into();
        self
    }

    pub fn with_performance_data(mut self, data: impl Into<String>) -> Self {
        self.performance_data = data.into();
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Render as a `servicestatus` block
    pub fn render(&self) -> String {
        let mut out = String::from("servicestatus {\n");
        let _ = writeln!(out, "\thost_name={}", self.host_name);
        let _ = writeln!(out, "\tservice_description={}", self.service_description);
        let _ = writeln!(out, "\tcheck_interval={:.6}", self.check_interval);
        let _ = writeln!(out, "\tcurrent_state={}", self.current_state);
        let _ = writeln!(out, "\tstate_type=1");
        let _ = writeln!(out, "\tlast_check={}", self.last_check);
        let _ = writeln!(out, "\tplugin_output={}", self.plugin_output);
        let _ = writeln!(out, "\tlong_plugin_output={}", self.long_plugin_output);
        let _ = writeln!(out, "\tperformance_data={}", self.performance_data);
        let _ = writeln!(
            out,
            "\tnotifications_enabled={}",
            u8::from(self.notifications_enabled)
        );
        out.push_str("\t}\n");
        out
    }
}

/// Mock representation of a `hoststatus` block
#[derive(Debug, Clone)]
pub struct MockHost {
    pub host_name: String,
    /// Raw state code (0 UP, 1 DOWN, 2 UNREACHABLE)
    pub current_state: u8,
    pub plugin_output: String,
}

impl MockHost {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            host_name: name.into(),
            current_state: 0,
            plugin_output: "PING OK".to_string(),
        }
    }

    pub fn with_state(mut self, state: u8) -> Self {
        self.current_state = state;
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.plugin_output = output.into();
        self
    }

    /// Render as a `hoststatus` block
    pub fn render(&self) -> String {
        let mut out = String::from("hoststatus {\n");
        let _ = writeln!(out, "\thost_name={}", self.host_name);
        let _ = writeln!(out, "\tcurrent_state={}", self.current_state);
        let _ = writeln!(out, "\tplugin_output={}", self.plugin_output);
        out.push_str("\t}\n");
        out
    }
}

/// Mock `status.dat` file
#[derive(Debug, Clone)]
pub struct MockStatusFile {
    pub version: String,
    pub nagios_pid: u32,
    pub hosts: Vec<MockHost>,
    pub services: Vec<MockService>,
    /// Blocks appended verbatim after the generated ones
    pub raw_blocks: Vec<String>,
}

impl Default for MockStatusFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStatusFile {
    pub fn new() -> Self {
        Self {
            version: "4.4.6".to_string(),
            nagios_pid: 4242,
            hosts: Vec::new(),
            services: Vec::new(),
            raw_blocks: Vec::new(),
        }
    }

    pub fn with_host(mut self, host: MockHost) -> Self {
        self.hosts.push(host);
        self
    }

    pub fn with_service(mut self, service: MockService) -> Self {
        self.services.push(service);
        self
    }

    /// Add a service in place
    pub fn add_service(&mut self, service: MockService) {
        self.services.push(service);
    }

    /// Append a block of raw text, e.g. a block type the builders do not cover
    pub fn with_raw_block(mut self, block: impl Into<String>) -> Self {
        self.raw_blocks.push(block.into());
        self
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    /// Render the complete file
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str("########################################\n");
        out.push_str("#          NAGIOS STATUS FILE\n");
        out.push_str("########################################\n\n");

        out.push_str("info {\n");
        out.push_str("\tcreated=1700000000\n");
        let _ = writeln!(out, "\tversion={}", self.version);
        out.push_str("\t}\n\n");

        out.push_str("programstatus {\n");
        let _ = writeln!(out, "\tnagios_pid={}", self.nagios_pid);
        out.push_str("\tdaemon_mode=1\n");
        out.push_str("\t}\n\n");

        for host in &self.hosts {
            out.push_str(&host.render());
            out.push('\n');
        }
        for service in &self.services {
            out.push_str(&service.render());
            out.push('\n');
        }
        for block in &self.raw_blocks {
            out.push_str(block);
            if !block.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }

    /// Write the rendered file to `path`
    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        std::fs::write(path, self.render())
    }
}

/// Create a status file with `host_count` hosts, each running `services_per_host` services
///
/// Hosts are named `host-<i>`, services `service-<j>`.
pub fn create_test_status(host_count: usize, services_per_host: usize) -> MockStatusFile {
    let mut file = MockStatusFile::new();
    for i in 0..host_count {
        let host = format!("host-{}", i);
        file.hosts.push(MockHost::new(host.clone()));
        for j in 0..services_per_host {
            let service = MockService::new(host.clone(), format!("service-{}", j))
                .with_output(format!("OK - service {} on host {}", j, i));
            file.add_service(service);
        }
    }
    file
}

/// Thread-safe record of what a fake command pipe received
#[derive(Debug, Default)]
pub struct MockCommandLog {
    /// Lines written, in order
    pub lines: RwLock<Vec<String>>,
    /// Number of times the pipe was opened
    pub open_count: RwLock<usize>,
}

impl MockCommandLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub async fn record_open(&self) {
        let mut count = self.open_count.write().await;
        *count += 1;
    }

    pub async fn record_line(&self, line: impl Into<String>) {
        self.lines.write().await.push(line.into());
    }

    pub async fn lines(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }

    pub async fn opens(&self) -> usize {
        *self.open_count.read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_service_builder() {
        let service = MockService::new("web-1", "HTTP")
            .with_state(2)
            .with_output("CRITICAL - timeout")
            .with_notifications(false);

        assert_eq!(service.host_name, "web-1");
        assert_eq!(service.current_state, 2);

        let block = service.render();
        assert!(block.starts_with("servicestatus {\n"));
        assert!(block.contains("\tcurrent_state=2\n"));
        assert!(block.contains("\tplugin_output=CRITICAL - timeout\n"));
        assert!(block.contains("\tnotifications_enabled=0\n"));
        assert!(block.ends_with("\t}\n"));
    }

    #[test]
    fn test_render_status_file() {
        let file = MockStatusFile::new()
            .with_host(MockHost::new("db-1").with_state(1))
            .with_service(MockService::new("db-1", "PGSQL"))
            .with_raw_block("hostdowntime {\n\thost_name=db-1\n\t}\n");

        let text = file.render();
        assert!(text.starts_with("####"));
        assert!(text.contains("info {\n"));
        assert!(text.contains("\tnagios_pid=4242\n"));
        assert!(text.contains("hoststatus {\n\thost_name=db-1\n\tcurrent_state=1\n"));
        assert!(text.contains("service_description=PGSQL"));
        assert!(text.ends_with("hostdowntime {\n\thost_name=db-1\n\t}\n"));
    }

    #[test]
    fn test_create_test_status() {
        let file = create_test_status(3, 2);
        assert_eq!(file.hosts.len(), 3);
        assert_eq!(file.service_count(), 6);
        assert_eq!(file.services[5].host_name, "host-2");
        assert_eq!(file.services[5].service_description, "service-1");
    }

    #[test]
    fn test_write_to() {
        let path = std::env::temp_dir().join(format!("nagapi-testkit-{}.dat", std::process::id()));
        create_test_status(1, 1).write_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("host_name=host-0"));
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_command_log() {
        let log = MockCommandLog::new();

        log.record_open().await;
        log.record_line("first").await;
        log.record_line("second").await;

        assert_eq!(log.opens().await, 1);
        assert_eq!(log.lines().await, vec!["first", "second"]);
    }
}
