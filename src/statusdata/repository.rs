//! Periodically reloaded status repository

use parking_lot::RwLock;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::index::{LookupError, ServiceIndex};
use crate::xdata::{DecodeError, Decoder, DecoderOptions, ServiceStatus, Status};

/// Default status file location of a Nagios installation
pub const DEFAULT_STATUS_FILE: &str = "/var/log/nagios/status.dat";

/// Default interval between background reloads
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Errors loading the status file
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("unable to open status file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to decode status file {}: {source}", path.display())]
    Decode { path: PathBuf, source: DecodeError },
}

/// Options for loading the status file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryOptions {
    pub decoder: DecoderOptions,
}

/// Repository counters, for metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RepositoryStats {
    pub hosts: usize,
    pub services: usize,
    pub loads: u64,
    pub load_failures: u64,
    /// Unix time of the last successful load
    pub last_load: u64,
}

/// Service status records read from a Nagios status file
///
/// The index is rebuilt from scratch on every load and swapped in whole, so
/// readers see either the previous or the new contents. A failed reload
/// keeps the previous index.
#[derive(Debug)]
pub struct Repository {
    path: PathBuf,
    options: RepositoryOptions,
    index: RwLock<Arc<ServiceIndex>>,
    loads: AtomicU64,
    load_failures: AtomicU64,
    last_load: AtomicU64,
}

impl Repository {
    /// Open the status file and load it; a failing first load is an error
    pub fn open(path: impl Into<PathBuf>, options: RepositoryOptions) -> Result<Self, RepositoryError> {
        let repo = Self {
            path: path.into(),
            options,
            index: RwLock::new(Arc::new(ServiceIndex::default())),
            loads: AtomicU64::new(0),
            load_failures: AtomicU64::new(0),
            last_load: AtomicU64::new(0),
        };
        repo.load()?;
        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the status file and replace the index
    pub fn load(&self) -> Result<(), RepositoryError> {
        let started = Instant::now();

        let status = match self.read_status() {
            Ok(status) => status,
            Err(e) => {
                self.load_failures.fetch_add(1, Ordering::Relaxed);
                warn!(path = %self.path.display(), error = %e, "Failed to load status file");
                return Err(e);
            }
        };

        let index = ServiceIndex::from_services(status.service_status);
        let hosts = index.host_count();
        let services = index.service_count();

        *self.index.write() = Arc::new(index);

        self.loads.fetch_add(1, Ordering::Relaxed);
        self.last_load.store(unix_now(), Ordering::Relaxed);

        info!(
            path = %self.path.display(),
            hosts,
            services,
            duration = ?started.elapsed(),
            "Loaded status file"
        );
        Ok(())
    }

    fn read_status(&self) -> Result<Status, RepositoryError> {
        let file = File::open(&self.path).map_err(|source| RepositoryError::Open {
            path: self.path.clone(),
            source,
        })?;

        Decoder::with_options(BufReader::new(file), self.options.decoder)
            .decode()
            .map_err(|source| RepositoryError::Decode {
                path: self.path.clone(),
                source,
            })
    }

    /// Find the status of a service
    pub fn lookup(&self, host: &str, service: &str) -> Result<Arc<ServiceStatus>, LookupError> {
        self.index.read().lookup(host, service)
    }

    /// The current index, for answering several lookups consistently
    pub fn snapshot(&self) -> Arc<ServiceIndex> {
        Arc::clone(&self.index.read())
    }

    pub fn stats(&self) -> RepositoryStats {
        let index = self.snapshot();
        RepositoryStats {
            hosts: index.host_count(),
            services: index.service_count(),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            last_load: self.last_load.load(Ordering::Relaxed),
        }
    }

    /// Reload the status file every `period` until `shutdown` fires
    ///
    /// Loads run on the blocking pool. A failed reload is logged by
    /// [`Repository::load`] and the previous index stays in place.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        period: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        let repo = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately and the file was loaded on open
            ticker.tick().await;

            info!(path = %repo.path.display(), interval = ?period, "Status refresh started");

            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        debug!("Status refresh stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        let repo = Arc::clone(&repo);
                        if let Err(e) = tokio::task::spawn_blocking(move || repo.load()).await {
                            warn!(error = %e, "Status reload task failed");
                        }
                    }
                }
            }
        })
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdata::ServiceState;
    use nagapi_testkit::mock::{MockService, MockStatusFile, create_test_status};
    use tempfile::NamedTempFile;

    fn status_file(file: &MockStatusFile) -> NamedTempFile {
        let tmp = NamedTempFile::new().unwrap();
        file.write_to(tmp.path()).unwrap();
        tmp
    }

    #[test]
    fn test_open_and_lookup() {
        let file = MockStatusFile::new()
            .with_service(
                MockService::new("web-1", "HTTP")
                    .with_state(2)
                    .with_output("CRITICAL - connection refused"),
            )
            .with_service(MockService::new("web-1", "SSH"));
        let tmp = status_file(&file);

        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();

        let http = repo.lookup("web-1", "HTTP").unwrap();
        assert_eq!(http.current_state, ServiceState::Critical);
        assert_eq!(http.plugin_output, "CRITICAL - connection refused");

        let stats = repo.stats();
        assert_eq!(stats.hosts, 1);
        assert_eq!(stats.services, 2);
        assert_eq!(stats.loads, 1);
        assert!(stats.last_load > 0);
    }

    #[test]
    fn test_lookup_misses() {
        let tmp = status_file(&create_test_status(2, 2));
        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();

        assert!(matches!(
            repo.lookup("host-9", "service-0"),
            Err(LookupError::UnknownHost(_))
        ));
        assert!(matches!(
            repo.lookup("host-1", "service-9"),
            Err(LookupError::UnknownService { .. })
        ));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::open(dir.path().join("status.dat"), RepositoryOptions::default())
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Open { .. }));
    }

    #[test]
    fn test_open_invalid_file_fails() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "servicestatus {\n\tcurrent_state=9\n\t}\n").unwrap();

        let err = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap_err();
        assert!(matches!(err, RepositoryError::Decode { .. }));
    }

    #[test]
    fn test_lenient_options_are_applied() {
        let tmp = NamedTempFile::new().unwrap();
        std::fs::write(
            tmp.path(),
            "servicestatus {\n\thost_name=a\n\tservice_description=b\n\tcurrent_state=9\n\t}\n",
        )
        .unwrap();

        let options = RepositoryOptions {
            decoder: DecoderOptions {
                ignore_invalid_types: true,
                ..Default::default()
            },
        };
        let repo = Repository::open(tmp.path(), options).unwrap();
        assert_eq!(repo.lookup("a", "b").unwrap().current_state, ServiceState::Ok);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let tmp = status_file(&create_test_status(3, 4));
        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();

        let before = repo.snapshot();
        repo.load().unwrap();
        let after = repo.snapshot();

        assert_eq!(*before, *after);
        assert_eq!(after.service_count(), 12);
        assert_eq!(repo.stats().loads, 2);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let tmp = status_file(&create_test_status(1, 1));
        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();
        assert!(repo.lookup("host-0", "service-0").is_ok());

        MockStatusFile::new()
            .with_service(MockService::new("host-0", "service-1"))
            .write_to(tmp.path())
            .unwrap();
        repo.load().unwrap();

        assert!(matches!(
            repo.lookup("host-0", "service-0"),
            Err(LookupError::UnknownService { .. })
        ));
        assert!(repo.lookup("host-0", "service-1").is_ok());
    }

    #[test]
    fn test_failed_reload_keeps_last_known_good() {
        let tmp = status_file(&create_test_status(2, 3));
        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();
        let before = repo.snapshot();

        std::fs::write(tmp.path(), "servicestatus {\n\thost_name=host-0\n").unwrap();
        assert!(matches!(repo.load(), Err(RepositoryError::Decode { .. })));

        assert_eq!(*repo.snapshot(), *before);
        assert!(repo.lookup("host-1", "service-2").is_ok());

        let stats = repo.stats();
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.load_failures, 1);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let tmp = status_file(&create_test_status(1, 2));
        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();
        let snapshot = repo.snapshot();

        create_test_status(0, 0).write_to(tmp.path()).unwrap();
        repo.load().unwrap();

        assert_eq!(snapshot.service_count(), 2);
        assert!(repo.snapshot().is_empty());
    }

    #[test]
    fn test_concurrent_reads_during_reload() {
        const HOSTS: usize = 10;

        fn generation(prefix: &str, per_host: usize) -> MockStatusFile {
            let mut file = MockStatusFile::new();
            for h in 0..HOSTS {
                for s in 0..per_host {
                    file.add_service(MockService::new(
                        &format!("host-{}", h),
                        &format!("svc-{}-{}", prefix, s),
                    ));
                }
            }
            file
        }

        // Every reader must see one whole generation, never a mix
        fn check_snapshot(index: &ServiceIndex) {
            let count = |prefix: &str, per_host: usize| {
                (0..HOSTS)
                    .flat_map(|h| (0..per_host).map(move |s| (h, s)))
                    .filter(|(h, s)| {
                        index
                            .lookup(&format!("host-{}", h), &format!("svc-{}-{}", prefix, s))
                            .is_ok()
                    })
                    .count()
            };
            let a = count("a", 5);
            let b = count("b", 3);
            assert!(
                (a == HOSTS * 5 && b == 0) || (a == 0 && b == HOSTS * 3),
                "mixed index: {} a services, {} b services",
                a,
                b
            );
            assert!(index.service_count() == HOSTS * 5 || index.service_count() == HOSTS * 3);
        }

        let gen_a = generation("a", 5);
        let gen_b = generation("b", 3);
        let tmp = status_file(&gen_a);
        let repo = Repository::open(tmp.path(), RepositoryOptions::default()).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..40 {
                    let next = if i % 2 == 0 { &gen_b } else { &gen_a };
                    next.write_to(repo.path()).unwrap();
                    repo.load().unwrap();
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..200 {
                        check_snapshot(&repo.snapshot());
                    }
                });
            }
        });

        assert_eq!(repo.stats().loads, 41);
    }

    #[tokio::test]
    async fn test_refresh_loop_reloads_and_stops() {
        let tmp = status_file(&create_test_status(1, 1));
        let repo = Arc::new(Repository::open(tmp.path(), RepositoryOptions::default()).unwrap());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = repo.spawn_refresh(Duration::from_millis(20), shutdown_rx);

        create_test_status(2, 1).write_to(tmp.path()).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while repo.lookup("host-1", "service-0").is_err() {
            assert!(Instant::now() < deadline, "reload did not happen");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_loop_survives_bad_reload() {
        let tmp = status_file(&create_test_status(1, 1));
        let repo = Arc::new(Repository::open(tmp.path(), RepositoryOptions::default()).unwrap());

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = repo.spawn_refresh(Duration::from_millis(10), shutdown_rx);

        std::fs::write(tmp.path(), "garbage\n").unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while repo.stats().load_failures == 0 {
            assert!(Instant::now() < deadline, "reload was not attempted");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(repo.lookup("host-0", "service-0").is_ok());

        shutdown_tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
