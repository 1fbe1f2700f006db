//! Buffered writer for the Nagios external command file

use async_trait::async_trait;
use serde::Serialize;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::sync::{Semaphore, broadcast, mpsc};
use tracing::{debug, info, warn};

/// Default number of commands buffered before callers are held back
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Largest queue capacity supported
pub const MAX_QUEUE_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Default pause after a failed open or write
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Default external command file of a Nagios installation
pub const DEFAULT_EXTERNAL_COMMANDS_FILE: &str = "/usr/local/nagios/var/rw/nagios.cmd";

/// Writer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Maximum number of queued commands
    pub capacity: usize,
    /// Reject commands when the queue is full instead of waiting for room
    pub non_blocking: bool,
    /// Pause after a failed open or write
    pub retry_interval: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            non_blocking: false,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

/// Errors handing a command to the writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EnqueueError {
    #[error("command queue is full")]
    QueueFull,

    #[error("command writer is closed")]
    Closed,
}

/// Accepts commands for later delivery
#[async_trait]
pub trait CommandQueue: Send + Sync {
    /// Queue one command line, without trailing newline
    async fn enqueue(&self, command: String) -> Result<(), EnqueueError>;
}

/// Destination commands are written to
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Human readable name, for logs
    fn describe(&self) -> String;

    async fn open(&self) -> io::Result<Box<dyn SinkHandle>>;
}

/// An open sink
#[async_trait]
pub trait SinkHandle: Send {
    /// Write `line` followed by a newline and flush
    async fn write_line(&mut self, line: &str) -> io::Result<()>;
}

/// Sink appending to a file or named pipe
///
/// The file is never created; Nagios creates the pipe when external
/// commands are enabled. A pipe is opened without blocking, so opening it
/// fails while Nagios is not reading.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for FileSink {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn open(&self) -> io::Result<Box<dyn SinkHandle>> {
        let metadata = tokio::fs::metadata(&self.path).await?;
        let writer: Box<dyn AsyncWrite + Send + Unpin> = if metadata.file_type().is_fifo() {
            // ENXIO when the pipe has no reader
            Box::new(pipe::OpenOptions::new().open_sender(&self.path)?)
        } else {
            let file = tokio::fs::OpenOptions::new()
                .append(true)
                .open(&self.path)
                .await?;
            Box::new(file)
        };
        Ok(Box::new(FileHandle { writer }))
    }
}

struct FileHandle {
    writer: Box<dyn AsyncWrite + Send + Unpin>,
}

#[async_trait]
impl SinkHandle for FileHandle {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        self.writer.write_all(buf.as_bytes()).await?;
        self.writer.flush().await
    }
}

#[derive(Debug, Default)]
struct Counters {
    written: AtomicU64,
    write_failures: AtomicU64,
    open_failures: AtomicU64,
}

/// Writer counters, for metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WriterStats {
    pub queued: usize,
    pub capacity: usize,
    pub written: u64,
    pub write_failures: u64,
    pub open_failures: u64,
}

/// Queues commands for a [`DeliveryTask`]
///
/// Cloning is cheap; all clones feed the same queue.
#[derive(Debug, Clone)]
pub struct CommandWriter {
    tx: mpsc::Sender<String>,
    non_blocking: bool,
    counters: Arc<Counters>,
}

impl CommandWriter {
    /// Create a writer and the task that delivers its commands to `sink`
    ///
    /// Nothing is written until [`DeliveryTask::run`] is polled. The
    /// capacity is clamped to what a tokio channel supports.
    pub fn new<S: Sink>(config: WriterConfig, sink: S) -> (Self, DeliveryTask<S>) {
        let (tx, rx) = mpsc::channel(config.capacity.clamp(1, MAX_QUEUE_CAPACITY));
        let counters = Arc::new(Counters::default());

        let task = DeliveryTask {
            rx,
            requeue: tx.downgrade(),
            sink,
            retry_interval: config.retry_interval,
            counters: Arc::clone(&counters),
        };
        let writer = Self {
            tx,
            non_blocking: config.non_blocking,
            counters,
        };
        (writer, task)
    }

    pub async fn enqueue(&self, command: String) -> Result<(), EnqueueError> {
        if self.non_blocking {
            self.tx.try_send(command).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => EnqueueError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
            })
        } else {
            self.tx
                .send(command)
                .await
                .map_err(|_| EnqueueError::Closed)
        }
    }

    pub fn stats(&self) -> WriterStats {
        let capacity = self.tx.max_capacity();
        WriterStats {
            queued: capacity - self.tx.capacity(),
            capacity,
            written: self.counters.written.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
            open_failures: self.counters.open_failures.load(Ordering::Relaxed),
        }
    }
}

#[async_trait]
impl CommandQueue for CommandWriter {
    async fn enqueue(&self, command: String) -> Result<(), EnqueueError> {
        CommandWriter::enqueue(self, command).await
    }
}

/// Drains the queue of a [`CommandWriter`] into its sink
///
/// Created together with the writer; there is exactly one per queue.
pub struct DeliveryTask<S> {
    rx: mpsc::Receiver<String>,
    requeue: mpsc::WeakSender<String>,
    sink: S,
    retry_interval: Duration,
    counters: Arc<Counters>,
}

impl<S: Sink> DeliveryTask<S> {
    /// Deliver commands until `shutdown` fires or every writer is dropped
    ///
    /// The sink is opened lazily and reopened after a failure. A command
    /// whose write fails goes back to the tail of the queue, so it may be
    /// delivered after commands queued later.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let sink = self.sink.describe();
        info!(sink = %sink, "Command delivery started");

        let mut handle: Option<Box<dyn SinkHandle>> = None;
        loop {
            if handle.is_none() {
                if self.rx.is_closed() && self.rx.is_empty() {
                    debug!("Command queue closed");
                    break;
                }
                let opened = tokio::select! {
                    _ = shutdown.recv() => break,
                    opened = self.sink.open() => opened,
                };
                match opened {
                    Ok(opened) => {
                        debug!(sink = %sink, "Opened command sink");
                        handle = Some(opened);
                    }
                    Err(e) => {
                        self.counters.open_failures.fetch_add(1, Ordering::Relaxed);
                        warn!(
                            sink = %sink,
                            error = %e,
                            retry_in_ms = self.retry_interval.as_millis() as u64,
                            "Unable to open command sink, retrying"
                        );
                        if self.backoff(&mut shutdown).await {
                            break;
                        }
                        continue;
                    }
                }
            }
            let Some(current) = handle.as_mut() else {
                continue;
            };

            let command = tokio::select! {
                _ = shutdown.recv() => break,
                command = self.rx.recv() => match command {
                    Some(command) => command,
                    None => {
                        debug!("Command queue closed");
                        break;
                    }
                },
            };

            let written = tokio::select! {
                _ = shutdown.recv() => break,
                written = current.write_line(&command) => written,
            };
            match written {
                Ok(()) => {
                    self.counters.written.fetch_add(1, Ordering::Relaxed);
                    debug!(sink = %sink, command = %command, "Wrote command");
                }
                Err(e) => {
                    self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        sink = %sink,
                        error = %e,
                        retry_in_ms = self.retry_interval.as_millis() as u64,
                        "Failed to write command, requeueing"
                    );
                    handle = None;
                    self.requeue(command);
                    if self.backoff(&mut shutdown).await {
                        break;
                    }
                }
            }
        }

        info!(sink = %sink, "Command delivery stopped");
    }

    /// Put a command back at the tail of the queue
    ///
    /// Sent from a separate task: the queue may be full, and only this loop
    /// makes room in it.
    fn requeue(&self, command: String) {
        let Some(tx) = self.requeue.upgrade() else {
            warn!(command = %command, "Command queue closed, dropping command");
            return;
        };
        tokio::spawn(async move {
            if let Err(e) = tx.send(command).await {
                warn!(command = %e.0, "Command queue closed, dropping command");
            }
        });
    }

    /// Sleep for the retry interval; true if shutdown fired meanwhile
    async fn backoff(&self, shutdown: &mut broadcast::Receiver<()>) -> bool {
        tokio::select! {
            _ = shutdown.recv() => true,
            _ = tokio::time::sleep(self.retry_interval) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nagapi_testkit::mock::MockCommandLog;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Sink failing a number of opens and writes before it starts working
    struct FlakySink {
        log: Arc<MockCommandLog>,
        failing_opens: AtomicUsize,
        failing_writes: Arc<AtomicUsize>,
    }

    impl FlakySink {
        fn new(log: Arc<MockCommandLog>, failing_opens: usize, failing_writes: usize) -> Self {
            Self {
                log,
                failing_opens: AtomicUsize::new(failing_opens),
                failing_writes: Arc::new(AtomicUsize::new(failing_writes)),
            }
        }
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    #[async_trait]
    impl Sink for FlakySink {
        fn describe(&self) -> String {
            "flaky".to_string()
        }

        async fn open(&self) -> io::Result<Box<dyn SinkHandle>> {
            self.log.record_open().await;
            if take_one(&self.failing_opens) {
                return Err(io::Error::new(io::ErrorKind::NotFound, "no reader"));
            }
            Ok(Box::new(FlakyHandle {
                log: Arc::clone(&self.log),
                failing_writes: Arc::clone(&self.failing_writes),
            }))
        }
    }

    struct FlakyHandle {
        log: Arc<MockCommandLog>,
        failing_writes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SinkHandle for FlakyHandle {
        async fn write_line(&mut self, line: &str) -> io::Result<()> {
            if take_one(&self.failing_writes) {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away"));
            }
            self.log.record_line(format!("{}\n", line)).await;
            Ok(())
        }
    }

    fn fast_config() -> WriterConfig {
        WriterConfig {
            retry_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    async fn wait_for_lines(log: &MockCommandLog, count: usize) -> Vec<String> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let lines = log.lines().await;
            if lines.len() >= count {
                return lines;
            }
            assert!(Instant::now() < deadline, "only {} lines delivered", lines.len());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[test]
    fn test_writer_config_default() {
        let config = WriterConfig::default();
        assert_eq!(config.capacity, 1000);
        assert!(!config.non_blocking);
        assert_eq!(config.retry_interval, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_non_blocking_queue_full() {
        let config = WriterConfig {
            capacity: 2,
            non_blocking: true,
            ..Default::default()
        };
        let (writer, _task) = CommandWriter::new(config, FileSink::new("/nonexistent"));

        writer.enqueue("one".to_string()).await.unwrap();
        writer.enqueue("two".to_string()).await.unwrap();
        assert_eq!(
            writer.enqueue("three".to_string()).await,
            Err(EnqueueError::QueueFull)
        );

        let stats = writer.stats();
        assert_eq!(stats.queued, 2);
        assert_eq!(stats.capacity, 2);
    }

    #[tokio::test]
    async fn test_blocking_enqueue_waits_for_room() {
        let log = MockCommandLog::new();
        let config = WriterConfig {
            capacity: 1,
            ..fast_config()
        };
        let (writer, task) = CommandWriter::new(config, FlakySink::new(Arc::clone(&log), 0, 0));

        writer.enqueue("first".to_string()).await.unwrap();
        let blocked =
            tokio::time::timeout(Duration::from_millis(50), writer.enqueue("second".to_string()))
                .await;
        assert!(blocked.is_err());

        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(task.run(shutdown_rx));

        writer.enqueue("second".to_string()).await.unwrap();
        let lines = wait_for_lines(&log, 2).await;
        assert_eq!(lines, vec!["first\n", "second\n"]);
    }

    #[tokio::test]
    async fn test_enqueue_after_task_dropped() {
        let (writer, task) = CommandWriter::new(WriterConfig::default(), FileSink::new("/nonexistent"));
        drop(task);

        assert_eq!(
            writer.enqueue("cmd".to_string()).await,
            Err(EnqueueError::Closed)
        );
    }

    #[tokio::test]
    async fn test_retries_open_until_sink_available() {
        let log = MockCommandLog::new();
        let (writer, task) = CommandWriter::new(fast_config(), FlakySink::new(Arc::clone(&log), 2, 0));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(task.run(shutdown_rx));

        writer.enqueue("[1] PROCESS_SERVICE_CHECK_RESULT;h;s;0;ok".to_string()).await.unwrap();

        let lines = wait_for_lines(&log, 1).await;
        assert_eq!(lines, vec!["[1] PROCESS_SERVICE_CHECK_RESULT;h;s;0;ok\n"]);
        assert_eq!(log.opens().await, 3);

        let stats = writer.stats();
        assert_eq!(stats.open_failures, 2);
        assert_eq!(stats.written, 1);
        assert_eq!(stats.queued, 0);
    }

    #[tokio::test]
    async fn test_failed_write_is_requeued_and_delivered_once() {
        let log = MockCommandLog::new();
        let (writer, task) = CommandWriter::new(fast_config(), FlakySink::new(Arc::clone(&log), 0, 1));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);

        writer.enqueue("a".to_string()).await.unwrap();
        writer.enqueue("b".to_string()).await.unwrap();
        tokio::spawn(task.run(shutdown_rx));

        let mut lines = wait_for_lines(&log, 2).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(log.lines().await.len(), 2);

        lines.sort();
        assert_eq!(lines, vec!["a\n", "b\n"]);
        // the sink is reopened after the failed write
        assert_eq!(log.opens().await, 2);

        let stats = writer.stats();
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.written, 2);
    }

    #[tokio::test]
    async fn test_shutdown_stops_delivery() {
        let log = MockCommandLog::new();
        let (writer, task) =
            CommandWriter::new(fast_config(), FlakySink::new(Arc::clone(&log), usize::MAX, 0));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(task.run(shutdown_rx));

        writer.enqueue("never".to_string()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(log.lines().await.is_empty());
        assert_eq!(
            writer.enqueue("late".to_string()).await,
            Err(EnqueueError::Closed)
        );
    }

    #[tokio::test]
    async fn test_delivery_ends_when_writers_dropped() {
        let log = MockCommandLog::new();
        let (writer, task) = CommandWriter::new(fast_config(), FlakySink::new(Arc::clone(&log), 0, 0));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(task.run(shutdown_rx));

        writer.enqueue("last".to_string()).await.unwrap();
        drop(writer);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.lines().await, vec!["last\n"]);
    }

    #[tokio::test]
    async fn test_delivery_ends_when_writers_dropped_while_sink_unavailable() {
        let log = MockCommandLog::new();
        let (writer, task) =
            CommandWriter::new(fast_config(), FlakySink::new(Arc::clone(&log), usize::MAX, 0));
        let (_shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(task.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(writer);

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(log.lines().await.is_empty());
    }

    #[test]
    fn test_capacity_is_clamped() {
        let config = WriterConfig {
            capacity: usize::MAX,
            ..Default::default()
        };
        let (writer, _task) = CommandWriter::new(config, FileSink::new("/nonexistent"));
        assert_eq!(writer.stats().capacity, MAX_QUEUE_CAPACITY);
    }

    fn make_fifo(dir: &Path) -> PathBuf {
        let path = dir.join("nagios.cmd");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    #[tokio::test]
    async fn test_fifo_without_reader_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(make_fifo(dir.path()));

        let opened = tokio::time::timeout(Duration::from_secs(1), sink.open())
            .await
            .unwrap();
        assert!(opened.is_err());
    }

    #[tokio::test]
    async fn test_fifo_with_reader_receives_lines() {
        use tokio::io::AsyncReadExt;

        let dir = tempfile::tempdir().unwrap();
        let path = make_fifo(dir.path());
        let mut reader = pipe::OpenOptions::new().open_receiver(&path).unwrap();

        let sink = FileSink::new(&path);
        let mut handle = sink.open().await.unwrap();
        handle.write_line("[1] PROCESS_SERVICE_CHECK_RESULT;h;s;0;ok").await.unwrap();

        let expected = "[1] PROCESS_SERVICE_CHECK_RESULT;h;s;0;ok\n";
        let mut buf = vec![0u8; expected.len()];
        tokio::time::timeout(Duration::from_secs(5), reader.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), expected);
    }

    #[test]
    fn test_shutdown_with_unread_fifo_releases_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_fifo(dir.path());

        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let (writer, task) = CommandWriter::new(fast_config(), FileSink::new(&path));
            let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
            let handle = tokio::spawn(task.run(shutdown_rx));

            writer.enqueue("x".to_string()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(writer.stats().open_failures > 0);

            shutdown_tx.send(()).unwrap();
            tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .unwrap()
                .unwrap();
        });

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            drop(rt);
            let _ = done_tx.send(());
        });
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_file_sink_appends() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "existing\n").unwrap();

        let sink = FileSink::new(tmp.path());
        let mut handle = sink.open().await.unwrap();
        handle.write_line("one").await.unwrap();
        handle.write_line("two").await.unwrap();

        let contents = std::fs::read_to_string(tmp.path()).unwrap();
        assert_eq!(contents, "existing\none\ntwo\n");
    }

    #[tokio::test]
    async fn test_file_sink_does_not_create() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("nagios.cmd"));

        assert!(sink.open().await.is_err());
        assert!(!dir.path().join("nagios.cmd").exists());
    }
}
