//! Collection scheduler: one bounded-concurrency round across the inventory.
//!
//! Every device is resolved before the first attempt is admitted. Each
//! attempt holds one admission slot for its whole duration and races its
//! collector against the device timeout. Losing the race drops the
//! collector's future, which tears down whatever session it had open.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use log::{error, info};
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{Instant, timeout};

use crate::device::{Defaults, Device, DeviceAccess};
use crate::driver::Collector;
use crate::error::{ConfigError, DriverError, Error, Result};
use crate::status::StatusRegistry;
use crate::store::ConfigStore;

/// Status message for an attempt whose collector panicked.
pub const CRASHED: &str = "collector crashed";

/// Default number of attempts in flight.
pub const DEFAULT_CONCURRENCY: usize = 30;

/// Counts for one finished round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    /// Devices attempted.
    pub attempted: usize,

    /// Devices collected and saved.
    pub succeeded: usize,

    /// Devices that failed, timeouts excluded.
    pub failed: usize,

    /// Devices that hit their timeout.
    pub timed_out: usize,

    /// Wall time of the round.
    pub elapsed: Duration,
}

impl fmt::Display for RoundSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} devices attempted, {} succeeded, {} failed, {} timed out in {:.1?}",
            self.attempted, self.succeeded, self.failed, self.timed_out, self.elapsed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Runs collection rounds and records their outcomes.
pub struct Scheduler<C: Collector> {
    collector: Arc<C>,
    registry: Arc<StatusRegistry>,
    store: Arc<dyn ConfigStore>,
    defaults: Defaults,
    concurrency: usize,
}

impl<C: Collector> Scheduler<C> {
    /// Create a scheduler with the default concurrency.
    pub fn new(
        collector: C,
        registry: Arc<StatusRegistry>,
        store: Arc<dyn ConfigStore>,
        defaults: Defaults,
    ) -> Self {
        Self {
            collector: Arc::new(collector),
            registry,
            store,
            defaults,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Set how many attempts may be in flight at once (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The registry outcomes are recorded in.
    pub fn registry(&self) -> &Arc<StatusRegistry> {
        &self.registry
    }

    /// Run one round over `inventory`.
    ///
    /// Per-device failures are recorded and never end the round. A
    /// configuration or storage error is returned as soon as it is seen;
    /// attempts still in flight are aborted.
    pub async fn run_round(&self, inventory: &[DeviceAccess]) -> Result<RoundSummary> {
        let start = Instant::now();
        let devices = inventory
            .iter()
            .map(|access| access.resolve(&self.defaults))
            .collect::<std::result::Result<Vec<_>, ConfigError>>()?;

        let slots = Arc::new(Semaphore::new(self.concurrency));
        let mut attempts = JoinSet::new();
        let mut summary = RoundSummary {
            attempted: devices.len(),
            ..RoundSummary::default()
        };

        for device in devices {
            while let Some(joined) = attempts.try_join_next() {
                tally(&mut summary, joined)?;
            }

            // The semaphore is never closed.
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            let collector = Arc::clone(&self.collector);
            let registry = Arc::clone(&self.registry);
            let store = Arc::clone(&self.store);
            attempts.spawn(async move {
                let outcome = attempt(collector.as_ref(), &registry, store.as_ref(), device).await;
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = attempts.join_next().await {
            tally(&mut summary, joined)?;
        }

        summary.elapsed = start.elapsed();
        info!("Round finished: {}", summary);
        Ok(summary)
    }
}

fn tally(
    summary: &mut RoundSummary,
    joined: std::result::Result<Result<Outcome>, JoinError>,
) -> Result<()> {
    match joined {
        Ok(Ok(Outcome::Succeeded)) => summary.succeeded += 1,
        Ok(Ok(Outcome::Failed)) => summary.failed += 1,
        Ok(Ok(Outcome::TimedOut)) => summary.timed_out += 1,
        Ok(Err(e)) => return Err(e),
        Err(e) => {
            error!("collection task failed: {}", e);
            summary.failed += 1;
        }
    }
    Ok(())
}

/// One device attempt. Only fatal errors are returned.
async fn attempt<C: Collector>(
    collector: &C,
    registry: &StatusRegistry,
    store: &dyn ConfigStore,
    device: Device,
) -> Result<Outcome> {
    let host = device.hostname.as_str();
    info!("Starting collector for {} via {}", host, device.method);

    let run = AssertUnwindSafe(collector.collect(&device)).catch_unwind();
    let failure = match timeout(device.timeout, run).await {
        Ok(Ok(Ok(collection))) => match collection.config_text() {
            Some(config) => {
                store.save(host, config)?;
                registry.record_success(host);
                info!(
                    "Success collecting from {} ({} bytes in {:.1?})",
                    host,
                    config.len(),
                    collection.elapsed
                );
                return Ok(Outcome::Succeeded);
            }
            None => Error::from(DriverError::MissingOutput {
                host: host.to_string(),
            }),
        },
        Ok(Ok(Err(e))) if e.is_fatal() => return Err(e),
        Ok(Ok(Err(e))) => e,
        Ok(Err(_)) => {
            error!("{}: {}", host, CRASHED);
            registry.record_failure(host, CRASHED);
            return Ok(Outcome::Failed);
        }
        Err(_) => {
            let e = DriverError::Timeout {
                host: host.to_string(),
                timeout: device.timeout,
            };
            error!("{}", e);
            registry.record_failure(host, e.to_string());
            return Ok(Outcome::TimedOut);
        }
    };

    let message = failure.to_string();
    error!("{}", log_line(host, &message));
    registry.record_failure(host, message);
    Ok(Outcome::Failed)
}

/// Prefix `message` with the host unless it already names it.
fn log_line(host: &str, message: &str) -> String {
    if message.contains(host) {
        message.to_string()
    } else {
        format!("{}: {}", host, message)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::driver::{Collection, MethodDispatch};
    use crate::error::StorageError;
    use crate::platform::DialectRegistry;

    /// Collector whose behaviour is picked by hostname prefix.
    #[derive(Default)]
    struct Fake {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Collector for Fake {
        async fn collect(&self, device: &Device) -> Result<Collection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let host = device.hostname.as_str();
            let result = if host.starts_with("hang") {
                std::future::pending().await
            } else if host.starts_with("panic") {
                panic!("parser exploded on {host}");
            } else if host.starts_with("badpass") {
                Err(DriverError::BadPassword {
                    host: host.to_string(),
                }
                .into())
            } else if host.starts_with("empty") {
                Ok(Collection::default())
            } else {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(Collection::config(
                    format!("hostname {host}\n"),
                    Duration::from_millis(100),
                ))
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<HashMap<String, String>>,
    }

    impl ConfigStore for MemoryStore {
        fn save(&self, hostname: &str, text: &str) -> std::result::Result<(), StorageError> {
            self.saved
                .lock()
                .unwrap()
                .insert(hostname.to_string(), text.to_string());
            Ok(())
        }
    }

    struct BrokenStore;

    impl ConfigStore for BrokenStore {
        fn save(&self, hostname: &str, _text: &str) -> std::result::Result<(), StorageError> {
            Err(StorageError::Write {
                host: hostname.to_string(),
                path: format!("/readonly/{hostname}").into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            })
        }
    }

    fn defaults() -> Defaults {
        Defaults {
            user: Some("backup".into()),
            pass: Some("secret".into()),
            method: Some("cisco".into()),
            ..Defaults::default()
        }
    }

    fn inventory(hosts: &[&str]) -> Vec<DeviceAccess> {
        hosts
            .iter()
            .map(|host| DeviceAccess::new(*host).with_config("timeout", "5"))
            .collect()
    }

    fn scheduler(store: Arc<dyn ConfigStore>) -> Scheduler<Fake> {
        Scheduler::new(
            Fake::default(),
            Arc::new(StatusRegistry::new()),
            store,
            defaults(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bound() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = scheduler(store.clone()).with_concurrency(3);
        let hosts: Vec<String> = (0..10).map(|i| format!("sw{i}")).collect();
        let hosts: Vec<&str> = hosts.iter().map(String::as_str).collect();

        let summary = scheduler.run_round(&inventory(&hosts)).await.unwrap();

        assert_eq!(summary.attempted, 10);
        assert_eq!(summary.succeeded, 10);
        assert!(scheduler.collector.peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(scheduler.collector.calls.load(Ordering::SeqCst), 10);
        assert_eq!(store.saved.lock().unwrap().len(), 10);
        for host in hosts {
            assert!(scheduler.registry().get(host).unwrap().is_success());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_recorded() {
        let scheduler = scheduler(Arc::new(MemoryStore::default()));
        let start = Instant::now();

        let summary = scheduler
            .run_round(&inventory(&["hang1", "core1"]))
            .await
            .unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(5));
        assert!(elapsed < Duration::from_millis(5_100), "{elapsed:?}");
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(
            scheduler.registry().get("hang1").unwrap().message,
            "Timeout collecting from hang1 after 5 seconds"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_password_keeps_last_success() {
        let scheduler = scheduler(Arc::new(MemoryStore::default()));
        let earlier = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        scheduler.registry().record_success_at("badpass1", earlier);

        let summary = scheduler.run_round(&inventory(&["badpass1"])).await.unwrap();

        assert_eq!(summary.failed, 1);
        let status = scheduler.registry().get("badpass1").unwrap();
        assert_eq!(status.message, "badpass1: Bad login password.");
        assert_eq!(status.last_success, Some(earlier));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_config_output() {
        let store = Arc::new(MemoryStore::default());
        let scheduler = scheduler(store.clone());

        scheduler.run_round(&inventory(&["empty1"])).await.unwrap();

        assert_eq!(
            scheduler.registry().get("empty1").unwrap().message,
            "empty1: config missing from collection results"
        );
        assert!(store.saved.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_is_fatal() {
        let scheduler = scheduler(Arc::new(BrokenStore));

        let err = scheduler.run_round(&inventory(&["core1"])).await.unwrap_err();

        assert!(err.is_fatal());
        assert!(matches!(err, Error::Storage(_)));
        assert!(!scheduler.registry().get("core1").is_some_and(|s| s.is_success()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_default_aborts_before_any_attempt() {
        let scheduler = Scheduler::new(
            Fake::default(),
            Arc::new(StatusRegistry::new()),
            Arc::new(MemoryStore::default()),
            Defaults {
                pass: None,
                ..defaults()
            },
        );

        let err = scheduler
            .run_round(&[
                DeviceAccess::new("core1").with_config("pass", "x"),
                DeviceAccess::new("core2"),
            ])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(ConfigError::MissingDefault { .. })));
        assert_eq!(scheduler.collector.calls.load(Ordering::SeqCst), 0);
        assert!(scheduler.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panic_is_isolated() {
        let scheduler = scheduler(Arc::new(MemoryStore::default()));

        let summary = scheduler
            .run_round(&inventory(&["panic1", "core1", "core2"]))
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(scheduler.registry().get("panic1").unwrap().message, CRASHED);
    }

    #[test]
    fn test_log_line_names_host_once() {
        assert_eq!(
            log_line("core1", "core1: Bad login password."),
            "core1: Bad login password."
        );
        assert_eq!(
            log_line("core1", "session closed while waiting for \"assword:\""),
            "core1: session closed while waiting for \"assword:\""
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timed_out_script_is_interrupted() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("interrupted");
        let script = dir.path().join("pull.sh");
        std::fs::write(
            &script,
            "trap 'echo int > \"$1\"; exit 1' INT\nwhile :; do sleep 0.1; done\n",
        )
        .unwrap();

        let scheduler = Scheduler::new(
            MethodDispatch::new(DialectRegistry::with_builtins(), dir.path()),
            Arc::new(StatusRegistry::new()),
            Arc::new(MemoryStore::default()),
            defaults(),
        );
        let fw = DeviceAccess::new("fw1")
            .with_method("external")
            .with_config("timeout", "1")
            .with_config("script", format!("/bin/sh {} {}", script.display(), marker.display()));

        let summary = scheduler.run_round(&[fw]).await.unwrap();

        assert_eq!(summary.timed_out, 1);
        assert_eq!(
            scheduler.registry().get("fw1").unwrap().message,
            "Timeout collecting from fw1 after 1 seconds"
        );
        let mut interrupted = false;
        for _ in 0..50 {
            if marker.exists() {
                interrupted = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(interrupted, "script never saw SIGINT");
    }

    #[test]
    fn test_summary_line() {
        let summary = RoundSummary {
            attempted: 4,
            succeeded: 2,
            failed: 1,
            timed_out: 1,
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            summary.to_string(),
            "4 devices attempted, 2 succeeded, 1 failed, 1 timed out in 1.5s"
        );
    }
}
