//! Passive check result submission
//!
//! Converts check results into `PROCESS_SERVICE_CHECK_RESULT` external
//! commands and queues them on the command writer.

mod result;
mod service;

pub use result::ServiceResult;
pub use service::{SubmissionService, format_command};
