//! Nagapi Test Kit
//!
//! Test infrastructure for the Nagios status API.
//!
//! This crate provides:
//! - Seeded random data generation for reproducible tests
//! - `status.dat` builders and a recorder for fake command pipes
//!
//! # Example
//!
//! ```rust
//! use nagapi_testkit::mock::MockStatusFile;
//! use nagapi_testkit::random::PseudoGenerator;
//!
//! // Create reproducible random generator
//! let mut rng = PseudoGenerator::new(12345);
//!
//! // Build a status file with a random service
//! let host = rng.random_host_name();
//! let file = MockStatusFile::new().with_service(rng.random_service(&host));
//! assert!(file.render().contains(&host));
//! ```

pub mod mock;
pub mod random;

// Re-exports for convenience
pub use mock::{MockCommandLog, MockHost, MockService, MockStatusFile};
pub use random::PseudoGenerator;
