use super::stats::SpoolStats;
use super::store::{remove_with_retries, BatchStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub expired: usize,
    pub failed: usize,
}

/// Deletes batches older than the retention limit, straight from disk.
///
/// The index is never touched: ids of swept batches are dropped lazily by
/// the loader when their files turn out to be missing.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    store: Arc<BatchStore>,
    stats: Arc<SpoolStats>,
    interval: Duration,
    retention: Duration,
}

impl ExpirySweeper {
    pub(crate) fn new(
        store: Arc<BatchStore>,
        stats: Arc<SpoolStats>,
        interval: Duration,
        retention: Duration,
    ) -> Self {
        Self {
            store,
            stats,
            interval,
            retention,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Run one pass against the current wall clock.
    pub fn sweep_once(&self) -> SweepReport {
        self.sweep_at(Utc::now())
    }

    /// Run one pass as if the current time were `now`.
    ///
    /// Covers orphaned `.tmp` files too, which only exist after a crash
    /// mid-write and would otherwise never be cleaned up.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let entries = match self.store.scan_entries() {
            Ok(entries) => entries,
            Err(e) => {
                error!(error = %e, "Failed to scan spool directory for expired batches");
                return report;
            }
        };

        let retention_ms = i64::try_from(self.retention.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now.timestamp_millis().saturating_sub(retention_ms);

        for entry in entries {
            report.scanned += 1;
            if entry.id.created_millis() >= cutoff {
                continue;
            }

            match remove_with_retries(&entry.path) {
                Ok(true) => {
                    debug!(batch_id = %entry.id, durable = entry.durable, "Expired batch deleted");
                    report.expired += 1;
                }
                // Acked or swept concurrently.
                Ok(false) => {}
                Err(e) => {
                    warn!(batch_id = %entry.id, error = %e, "Failed to delete expired batch");
                    self.stats.record_delete_failure();
                    report.failed += 1;
                }
            }
        }

        self.stats.record_expired(report.expired as u64);
        if report.expired > 0 || report.failed > 0 {
            info!(
                scanned = report.scanned,
                expired = report.expired,
                failed = report.failed,
                "Spool sweep complete"
            );
        }
        report
    }

    /// Run `sweep_once` every `interval` until `shutdown` fires. The first
    /// pass happens one interval after start.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.interval;
            let mut interval = tokio::time::interval_at(start, self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                let sweeper = self.clone();
                if let Err(e) = tokio::task::spawn_blocking(move || sweeper.sweep_once()).await {
                    error!(error = %e, "Spool sweep task panicked");
                }
            }
            debug!("Spool sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::batch_id::BatchId;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    fn sweeper(dir: &TempDir, retention: Duration) -> (ExpirySweeper, Arc<BatchStore>) {
        let store = Arc::new(BatchStore::open(dir.path()).unwrap());
        let sweeper = ExpirySweeper::new(
            Arc::clone(&store),
            Arc::new(SpoolStats::default()),
            Duration::from_secs(60),
            retention,
        );
        (sweeper, store)
    }

    fn plant(dir: &TempDir, created: DateTime<Utc>, durable: bool) -> BatchId {
        let id = BatchId::at(created);
        let name = if durable {
            id.durable_file_name()
        } else {
            id.temporary_file_name()
        };
        fs::write(dir.path().join(name), b"payload").unwrap();
        id
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let dir = TempDir::new().unwrap();
        let (sweeper, store) = sweeper(&dir, Duration::from_secs(3600));
        let now = Utc.with_ymd_and_hms(2026, 1, 28, 12, 0, 0).unwrap();

        plant(&dir, now - chrono::Duration::hours(3), true);
        plant(&dir, now - chrono::Duration::hours(2), true);
        let fresh = plant(&dir, now - chrono::Duration::minutes(10), true);

        let report = sweeper.sweep_at(now);
        assert_eq!(report.scanned, 3);
        assert_eq!(report.expired, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(store.list_durable().unwrap(), vec![fresh]);
    }

    #[test]
    fn test_sweep_removes_orphaned_temporary_files() {
        let dir = TempDir::new().unwrap();
        let (sweeper, store) = sweeper(&dir, Duration::from_secs(60));
        let now = Utc.with_ymd_and_hms(2026, 1, 28, 12, 0, 0).unwrap();

        plant(&dir, now - chrono::Duration::hours(1), false);

        assert_eq!(sweeper.sweep_at(now).expired, 1);
        assert!(store.scan_entries().unwrap().is_empty());
    }

    #[test]
    fn test_sweep_leaves_foreign_files_alone() {
        let dir = TempDir::new().unwrap();
        let (sweeper, _store) = sweeper(&dir, Duration::from_secs(1));
        fs::write(dir.path().join("0000000000000-keep.trn"), b"x").unwrap();

        let report = sweeper.sweep_at(Utc::now());
        assert_eq!(report.scanned, 0);
        assert!(dir.path().join("0000000000000-keep.trn").exists());
    }

    #[tokio::test]
    async fn test_scheduled_sweep_runs_until_cancelled() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(BatchStore::open(dir.path()).unwrap());
        let sweeper = ExpirySweeper::new(
            Arc::clone(&store),
            Arc::new(SpoolStats::default()),
            Duration::from_millis(50),
            Duration::from_millis(100),
        );

        store.create(b"one").unwrap();
        store.create(b"two").unwrap();

        let shutdown = CancellationToken::new();
        let handle = sweeper.spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(store.list_durable().unwrap().is_empty());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
