use super::error::Result;
use super::index::SpoolIndex;
use super::stats::SpoolStats;
use super::store::BatchStore;
use crate::op_logger::OperationLogger;
use std::sync::Arc;
use tracing::debug;

/// Write side of the spool: persists payloads and enforces the capacity bound.
#[derive(Debug, Clone)]
pub struct SpoolWriter {
    store: Arc<BatchStore>,
    index: Arc<SpoolIndex>,
    stats: Arc<SpoolStats>,
    capacity: usize,
    capacity_log: Arc<OperationLogger>,
    write_log: Arc<OperationLogger>,
}

impl SpoolWriter {
    pub(crate) fn new(
        store: Arc<BatchStore>,
        index: Arc<SpoolIndex>,
        stats: Arc<SpoolStats>,
        capacity: usize,
    ) -> Self {
        Self {
            store,
            index,
            stats,
            capacity,
            capacity_log: Arc::new(OperationLogger::new("Spooling telemetry (capacity)")),
            write_log: Arc::new(OperationLogger::new("Writing telemetry to disk")),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Persist `payload` as a new durable batch.
    ///
    /// `Ok(false)` means the spool is full and nothing was written. On `Err`
    /// no batch was created either.
    pub fn write(&self, payload: &[u8]) -> Result<bool> {
        if !self.index.try_reserve(self.capacity) {
            self.stats.record_rejected();
            self.capacity_log.record_failure(format_args!(
                "spool holds {} batches, dropping {} bytes",
                self.capacity,
                payload.len()
            ));
            return Ok(false);
        }

        match self.store.create(payload) {
            Ok(id) => {
                debug!(batch_id = %id, "Batch spooled");
                self.index.commit_reserved(id);
                self.stats.record_written();
                self.capacity_log.record_success();
                self.write_log.record_success();
                Ok(true)
            }
            Err(e) => {
                self.index.cancel_reserved();
                self.stats.record_write_failure();
                self.write_log.record_failure(&e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn writer(dir: &TempDir, capacity: usize) -> (SpoolWriter, Arc<SpoolIndex>, Arc<BatchStore>) {
        let store = Arc::new(BatchStore::open(dir.path()).unwrap());
        let index = Arc::new(SpoolIndex::new());
        let stats = Arc::new(SpoolStats::default());
        let writer = SpoolWriter::new(Arc::clone(&store), Arc::clone(&index), stats, capacity);
        (writer, index, store)
    }

    #[test]
    fn test_write_registers_batch() {
        let dir = TempDir::new().unwrap();
        let (writer, index, store) = writer(&dir, 10);

        assert!(writer.write(b"hello world").unwrap());
        assert_eq!(index.len(), 1);

        let id = index.oldest().unwrap();
        assert_eq!(store.read(&id).unwrap().as_deref(), Some(&b"hello world"[..]));
    }

    #[test]
    fn test_write_at_capacity_has_no_effect() {
        let dir = TempDir::new().unwrap();
        let (writer, index, store) = writer(&dir, 2);

        assert!(writer.write(b"a").unwrap());
        assert!(writer.write(b"b").unwrap());
        assert!(!writer.write(b"c").unwrap());

        assert_eq!(index.len(), 2);
        assert_eq!(store.list_durable().unwrap().len(), 2);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let dir = TempDir::new().unwrap();
        let (writer, index, _store) = writer(&dir, 0);

        assert!(!writer.write(b"a").unwrap());
        assert!(index.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_write_releases_reservation() {
        let dir = TempDir::new().unwrap();
        let (writer, index, store) = writer(&dir, 1);

        // Pull the directory out from under the store.
        std::fs::remove_dir_all(store.root()).unwrap();

        assert!(writer.write(b"a").is_err());
        assert_eq!(index.occupied(), 0);

        std::fs::create_dir_all(store.root()).unwrap();
        assert!(writer.write(b"a").unwrap());
    }
}
