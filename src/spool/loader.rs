use super::batch_id::BatchId;
use super::error::Result;
use super::index::SpoolIndex;
use super::stats::SpoolStats;
use super::store::BatchStore;
use crate::op_logger::OperationLogger;
use std::sync::Arc;
use tracing::debug;

/// A batch checked out of the spool for one delivery attempt.
#[derive(Debug)]
pub struct LoadedBatch {
    pub payload: Vec<u8>,
    pub handle: BatchHandle,
}

/// Opaque reference to a checked-out batch.
///
/// Settle it with [`SpoolLoader::acknowledge`]. A handle dropped without
/// being acknowledged counts as a failed attempt and goes back into the queue.
#[derive(Debug)]
pub struct BatchHandle {
    id: BatchId,
    settled: bool,
    index: Arc<SpoolIndex>,
    stats: Arc<SpoolStats>,
}

impl BatchHandle {
    pub fn id(&self) -> &BatchId {
        &self.id
    }

    fn settle(mut self) -> BatchId {
        self.settled = true;
        self.id.clone()
    }
}

impl Drop for BatchHandle {
    fn drop(&mut self) {
        if !self.settled {
            debug!(batch_id = %self.id, "Unacknowledged batch returned to spool");
            self.stats.record_requeued();
            self.index.requeue(self.id.clone());
        }
    }
}

/// Read side of the spool.
#[derive(Debug, Clone)]
pub struct SpoolLoader {
    store: Arc<BatchStore>,
    index: Arc<SpoolIndex>,
    stats: Arc<SpoolStats>,
    load_log: Arc<OperationLogger>,
    delete_log: Arc<OperationLogger>,
}

impl SpoolLoader {
    pub(crate) fn new(store: Arc<BatchStore>, index: Arc<SpoolIndex>, stats: Arc<SpoolStats>) -> Self {
        Self {
            store,
            index,
            stats,
            load_log: Arc::new(OperationLogger::new("Loading telemetry from disk")),
            delete_log: Arc::new(OperationLogger::new("Deleting delivered telemetry")),
        }
    }

    /// Check out the oldest queued batch.
    ///
    /// Batches whose files have disappeared (expired, or deleted by an earlier
    /// acknowledgement) are skipped, so `Ok(None)` always means the queue is
    /// empty. On a read error the id is put back at the end of the queue.
    pub fn load_next(&self) -> Result<Option<LoadedBatch>> {
        while let Some(id) = self.index.pop_oldest() {
            match self.store.read(&id) {
                Ok(Some(payload)) => {
                    self.stats.record_loaded();
                    self.load_log.record_success();
                    return Ok(Some(LoadedBatch {
                        payload,
                        handle: BatchHandle {
                            id,
                            settled: false,
                            index: Arc::clone(&self.index),
                            stats: Arc::clone(&self.stats),
                        },
                    }));
                }
                Ok(None) => {
                    debug!(batch_id = %id, "Spooled batch vanished before load, skipping");
                    self.index.release();
                    self.stats.record_vanished();
                }
                Err(e) => {
                    self.index.requeue(id);
                    self.stats.record_read_failure();
                    self.load_log.record_failure(&e);
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    /// Settle a checked-out batch.
    ///
    /// `success == true` deletes the batch; otherwise it is queued again
    /// behind everything currently waiting. If the delete fails the id is
    /// requeued too, so the file keeps its capacity slot until a later
    /// acknowledgement (or the sweeper) removes it.
    pub fn acknowledge(&self, handle: BatchHandle, success: bool) -> Result<()> {
        let id = handle.settle();

        if !success {
            debug!(batch_id = %id, "Delivery failed, requeueing batch");
            self.stats.record_requeued();
            self.index.requeue(id);
            return Ok(());
        }

        match self.store.delete(&id) {
            Ok(existed) => {
                if !existed {
                    debug!(batch_id = %id, "Delivered batch was already removed");
                }
                self.index.release();
                self.stats.record_delivered();
                self.delete_log.record_success();
                Ok(())
            }
            Err(e) => {
                self.index.requeue(id);
                self.stats.record_delete_failure();
                self.delete_log.record_failure(&e);
                Err(e)
            }
        }
    }
}
