use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifetime counters for one spool instance.
#[derive(Debug, Default)]
pub struct SpoolStats {
    written: AtomicU64,
    rejected_at_capacity: AtomicU64,
    write_failures: AtomicU64,
    loaded: AtomicU64,
    vanished: AtomicU64,
    read_failures: AtomicU64,
    delivered: AtomicU64,
    requeued: AtomicU64,
    expired: AtomicU64,
    delete_failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpoolStatsSnapshot {
    pub written: u64,
    pub rejected_at_capacity: u64,
    pub write_failures: u64,
    pub loaded: u64,
    pub vanished: u64,
    pub read_failures: u64,
    pub delivered: u64,
    pub requeued: u64,
    pub expired: u64,
    pub delete_failures: u64,
}

macro_rules! counters {
    ($($name:ident => $field:ident),* $(,)?) => {
        $(
            pub(crate) fn $name(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl SpoolStats {
    counters! {
        record_written => written,
        record_rejected => rejected_at_capacity,
        record_write_failure => write_failures,
        record_loaded => loaded,
        record_vanished => vanished,
        record_read_failure => read_failures,
        record_delivered => delivered,
        record_requeued => requeued,
        record_delete_failure => delete_failures,
    }

    pub(crate) fn record_expired(&self, count: u64) {
        self.expired.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SpoolStatsSnapshot {
        SpoolStatsSnapshot {
            written: self.written.load(Ordering::Relaxed),
            rejected_at_capacity: self.rejected_at_capacity.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            loaded: self.loaded.load(Ordering::Relaxed),
            vanished: self.vanished.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            requeued: self.requeued.load(Ordering::Relaxed),
            expired: self.expired.load(Ordering::Relaxed),
            delete_failures: self.delete_failures.load(Ordering::Relaxed),
        }
    }
}
