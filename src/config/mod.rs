//! Configuration parsing
//!
//! Handles parsing of the nagapi configuration file.
//!
//! ## Configuration Format
//!
//! ```yaml
//! api:
//!   addr: 0.0.0.0:3000
//!   cors:
//!     enabled: false
//!     allowed_origins: ["*"]
//!     max_age: 5m
//!
//! nagios:
//!   status_file: /var/log/nagios/status.dat
//!   reload_status_file: true
//!   reload_interval: 1m
//!   ignore_invalid_types: false
//!   ignore_invalid_lines: false
//!   external_commands_file: /usr/local/nagios/var/rw/nagios.cmd
//!   queue_capacity: 1000
//!   non_blocking: true
//!   retry_interval: 1s
//! ```
//!
//! Every key is optional; missing keys take the values shown above.

mod app;

pub use app::{ApiConfig, Config, ConfigError, CorsConfig, NagiosConfig};
