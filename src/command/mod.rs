//! Nagios external commands
//!
//! Commands are queued in memory and written to the external command file (a
//! named pipe read by Nagios) by a single background [`DeliveryTask`]. The pipe
//! is only writable while Nagios is reading it, so the task keeps retrying
//! until each command is written.

mod sanitize;
mod writer;

pub use sanitize::sanitize;
pub use writer::{
    CommandQueue, CommandWriter, DEFAULT_EXTERNAL_COMMANDS_FILE, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RETRY_INTERVAL, DeliveryTask, EnqueueError, FileSink, MAX_QUEUE_CAPACITY, Sink, SinkHandle,
    WriterConfig, WriterStats,
};
