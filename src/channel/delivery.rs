use super::sender::BatchSender;
use crate::config::types::DrainConfig;
use crate::op_logger::OperationLogger;
use crate::spool::{LoadedBatch, Spool};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// What happened to a payload handed to [`DeliveryChannel::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the collector.
    Sent,
    /// Collector unavailable; the payload is safe in the spool.
    Spooled,
    /// Collector unavailable and the spool refused it (full or failing).
    Dropped,
}

impl Delivery {
    /// `true` unless the payload was lost.
    pub fn is_retained(self) -> bool {
        !matches!(self, Delivery::Dropped)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Sends telemetry to the collector and falls back to the spool.
///
/// Live sends and the drain loop share one spool; the spool itself handles
/// the concurrency, the channel only moves its blocking calls off the async
/// workers.
pub struct DeliveryChannel {
    sender: Arc<dyn BatchSender>,
    spool: Arc<Spool>,
    drain: DrainConfig,
    send_log: OperationLogger,
    retry_log: OperationLogger,
}

impl DeliveryChannel {
    pub fn new(sender: Arc<dyn BatchSender>, spool: Arc<Spool>, drain: DrainConfig) -> Self {
        Self {
            sender,
            spool,
            drain,
            send_log: OperationLogger::new("Sending telemetry to the collector"),
            retry_log: OperationLogger::new("Retrying spooled telemetry"),
        }
    }

    pub fn spool(&self) -> &Arc<Spool> {
        &self.spool
    }

    /// Attempt a live send, spooling the payload if it fails.
    pub async fn send(&self, payload: Vec<u8>) -> Delivery {
        match self.sender.send(&payload).await {
            Ok(()) => {
                self.send_log.record_success();
                Delivery::Sent
            }
            Err(e) => {
                self.send_log.record_failure(format_args!(
                    "{} (telemetry will be stored to disk)",
                    e
                ));
                self.spool_payload(payload).await
            }
        }
    }

    async fn spool_payload(&self, payload: Vec<u8>) -> Delivery {
        let spool = Arc::clone(&self.spool);
        let bytes = payload.len();
        match tokio::task::spawn_blocking(move || spool.write(&payload)).await {
            Ok(Ok(true)) => Delivery::Spooled,
            // The writer already logs capacity rejections.
            Ok(Ok(false)) => Delivery::Dropped,
            Ok(Err(e)) => {
                error!(error = %e, bytes, "Failed to spool telemetry, dropping it");
                Delivery::Dropped
            }
            Err(e) => {
                error!(error = %e, bytes, "Spool write task failed, dropping telemetry");
                Delivery::Dropped
            }
        }
    }

    async fn load_next(&self) -> Option<LoadedBatch> {
        let spool = Arc::clone(&self.spool);
        match tokio::task::spawn_blocking(move || spool.load_next()).await {
            Ok(Ok(batch)) => batch,
            Ok(Err(e)) => {
                error!(error = %e, "Failed to load spooled batch");
                None
            }
            Err(e) => {
                error!(error = %e, "Spool load task failed");
                None
            }
        }
    }

    /// Retry spooled batches, oldest first.
    ///
    /// Stops when the spool is empty, after `max_batches_per_pass` attempts,
    /// or at the first failed send: a collector that just refused one batch
    /// will most likely refuse the next one too.
    pub async fn drain_once(&self) -> DrainReport {
        let mut report = DrainReport::default();

        while report.attempted < self.drain.max_batches_per_pass {
            let Some(batch) = self.load_next().await else {
                break;
            };
            report.attempted += 1;

            let delivered = match self.sender.send(&batch.payload).await {
                Ok(()) => {
                    self.retry_log.record_success();
                    report.delivered += 1;
                    true
                }
                Err(e) => {
                    self.retry_log.record_failure(&e);
                    report.failed += 1;
                    false
                }
            };

            let spool = Arc::clone(&self.spool);
            let handle = batch.handle;
            match tokio::task::spawn_blocking(move || spool.acknowledge(handle, delivered)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!(error = %e, "Failed to settle spooled batch"),
                Err(e) => error!(error = %e, "Spool acknowledge task failed"),
            }

            if !delivered {
                break;
            }
        }

        if report.attempted > 0 {
            debug!(
                attempted = report.attempted,
                delivered = report.delivered,
                failed = report.failed,
                remaining = self.spool.len(),
                "Drain pass complete"
            );
        }
        report
    }

    /// Run `drain_once` every `drain.interval` until `shutdown` fires.
    pub fn spawn_drain_loop(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_ms = self.drain.interval.as_millis() as u64,
                max_batches_per_pass = self.drain.max_batches_per_pass,
                backlog = self.spool.len(),
                "Starting spool drain loop"
            );

            let mut interval = tokio::time::interval(self.drain.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {}
                }

                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = self.drain_once() => {}
                }
            }
            info!(backlog = self.spool.len(), "Spool drain loop stopped");
        })
    }
}
