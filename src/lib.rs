//! Nagapi - HTTP API for Nagios
//!
//! Exposes the service check results Nagios writes to `status.dat` over
//! HTTP, and relays passive check results submitted over HTTP to the Nagios
//! external command pipe.
//!
//! ## Architecture
//!
//! - The status file is decoded with [`xdata`] and indexed by
//!   [`statusdata::Repository`], which reloads it in the background
//! - Submitted results are formatted by [`submission`] and queued on a
//!   [`command::CommandWriter`], whose delivery task writes them to the pipe
//!   and retries while Nagios is not reading
//!
//! ## Modules
//!
//! - [`xdata`] - Decoder for the Nagios status/retention file format
//! - [`statusdata`] - Reloading service status index
//! - [`command`] - External command queue and writer
//! - [`submission`] - Passive check result submission
//! - [`config`] - Configuration parsing
//! - [`api`] - HTTP API and Prometheus metrics

pub mod api;
pub mod command;
pub mod config;
pub mod statusdata;
pub mod submission;
pub mod xdata;
