//! Service status repository
//!
//! Loads the Nagios `status.dat` file, indexes service check results by host
//! and service description, and keeps the index fresh from a background task.

mod index;
mod repository;

pub use index::{LookupError, ServiceIndex};
pub use repository::{
    DEFAULT_REFRESH_INTERVAL, DEFAULT_STATUS_FILE, Repository, RepositoryError, RepositoryOptions,
    RepositoryStats,
};
