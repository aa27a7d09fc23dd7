pub mod batch_id;
pub mod error;
pub mod index;
pub mod loader;
pub mod stats;
pub mod store;
pub mod sweeper;
pub mod writer;

pub use batch_id::BatchId;
pub use error::{Result, SpoolError};
pub use index::SpoolIndex;
pub use loader::{BatchHandle, LoadedBatch, SpoolLoader};
pub use stats::{SpoolStats, SpoolStatsSnapshot};
pub use store::BatchStore;
pub use sweeper::{ExpirySweeper, SweepReport};
pub use writer::SpoolWriter;

use crate::config::types::SpoolConfig;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Durable spool for batches that could not be delivered, bound to one root
/// directory.
///
/// Made of a [`BatchStore`] (one file per batch) and a [`SpoolIndex`]
/// (in-memory FIFO of the ids on disk). The index is rebuilt from a directory
/// scan on every open, so durability lives entirely in the files.
///
/// The writer refuses new batches once the spool accounts for `capacity`
/// batches (queued, checked out, or mid-write). The sweeper deletes expired
/// files independently of the index.
#[derive(Debug)]
pub struct Spool {
    store: Arc<BatchStore>,
    index: Arc<SpoolIndex>,
    stats: Arc<SpoolStats>,
    writer: SpoolWriter,
    loader: SpoolLoader,
    sweeper: ExpirySweeper,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpoolStatus {
    pub path: String,
    pub queued: usize,
    pub occupied: usize,
    pub capacity: usize,
    pub oldest_batch: Option<DateTime<Utc>>,
    pub newest_batch: Option<DateTime<Utc>>,
    pub stats: SpoolStatsSnapshot,
}

impl Spool {
    /// Open the spool, recovering every durable batch left by earlier runs.
    /// The root directory is created if needed.
    pub fn open(config: &SpoolConfig) -> Result<Self> {
        Self::with_store(BatchStore::open(&config.path)?, config)
    }

    /// Like [`open`](Self::open), but fails instead of creating a missing root.
    pub fn open_existing(config: &SpoolConfig) -> Result<Self> {
        Self::with_store(BatchStore::open_existing(&config.path)?, config)
    }

    fn with_store(store: BatchStore, config: &SpoolConfig) -> Result<Self> {
        let store = Arc::new(store);

        let recovered = store.list_durable()?;
        let index = Arc::new(SpoolIndex::new());
        if !recovered.is_empty() {
            info!(
                path = %store.root().display(),
                batches = recovered.len(),
                "Recovered spooled batches from disk"
            );
        }
        index.load_from(recovered);

        let stats = Arc::new(SpoolStats::default());
        let writer = SpoolWriter::new(
            Arc::clone(&store),
            Arc::clone(&index),
            Arc::clone(&stats),
            config.capacity,
        );
        let loader = SpoolLoader::new(Arc::clone(&store), Arc::clone(&index), Arc::clone(&stats));
        let sweeper = ExpirySweeper::new(
            Arc::clone(&store),
            Arc::clone(&stats),
            Duration::from_secs(config.sweep_interval_seconds),
            Duration::from_secs(config.retention_seconds),
        );

        Ok(Self {
            store,
            index,
            stats,
            writer,
            loader,
            sweeper,
        })
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn writer(&self) -> &SpoolWriter {
        &self.writer
    }

    pub fn loader(&self) -> &SpoolLoader {
        &self.loader
    }

    pub fn sweeper(&self) -> ExpirySweeper {
        self.sweeper.clone()
    }

    pub fn write(&self, payload: &[u8]) -> Result<bool> {
        self.writer.write(payload)
    }

    pub fn load_next(&self) -> Result<Option<LoadedBatch>> {
        self.loader.load_next()
    }

    pub fn acknowledge(&self, handle: BatchHandle, success: bool) -> Result<()> {
        self.loader.acknowledge(handle, success)
    }

    /// Number of batches waiting in the queue.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.writer.capacity()
    }

    pub fn stats(&self) -> SpoolStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn status(&self) -> SpoolStatus {
        SpoolStatus {
            path: self.root().display().to_string(),
            queued: self.index.len(),
            occupied: self.index.occupied(),
            capacity: self.capacity(),
            oldest_batch: self.index.oldest().map(|id| id.created_at()),
            newest_batch: self.index.newest().map(|id| id.created_at()),
            stats: self.stats.snapshot(),
        }
    }
}
