use super::batch_id::BatchId;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// In-memory FIFO of durable batch ids.
///
/// The lock is only ever held for queue manipulation, never across disk I/O.
/// Besides the queued ids it counts two kinds of batches that exist (or are
/// about to exist) on disk without being queued:
///
/// - `reserved`: writes that passed the capacity check and are still in flight
/// - `leased`: ids handed out by `pop_oldest` and not yet settled
///
/// Both count against the capacity bound so concurrent writers and requeues
/// can never push the durable batch count over it.
#[derive(Debug, Default)]
pub struct SpoolIndex {
    state: Mutex<IndexState>,
}

#[derive(Debug, Default)]
struct IndexState {
    queue: VecDeque<BatchId>,
    reserved: usize,
    leased: usize,
}

impl IndexState {
    fn occupied(&self) -> usize {
        self.queue.len() + self.reserved + self.leased
    }
}

impl SpoolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, IndexState> {
        // The state is plain counters and a queue; a panic elsewhere cannot
        // leave it half-updated, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Seed the queue from a startup scan. Ids must already be oldest-first.
    pub fn load_from(&self, ids: impl IntoIterator<Item = BatchId>) {
        let mut state = self.lock();
        state.queue.extend(ids);
    }

    pub fn push_newest(&self, id: BatchId) {
        self.lock().queue.push_back(id);
    }

    /// Take the oldest id. It stays counted against capacity until
    /// [`requeue`](Self::requeue) or [`release`](Self::release) is called.
    pub fn pop_oldest(&self) -> Option<BatchId> {
        let mut state = self.lock();
        let id = state.queue.pop_front()?;
        state.leased += 1;
        Some(id)
    }

    /// Return a leased id to the back of the queue.
    pub fn requeue(&self, id: BatchId) {
        let mut state = self.lock();
        state.leased = state.leased.saturating_sub(1);
        state.queue.push_back(id);
    }

    /// Forget a leased id whose batch no longer exists.
    pub fn release(&self) {
        let mut state = self.lock();
        state.leased = state.leased.saturating_sub(1);
    }

    /// Claim one slot for a write if the bound allows it.
    pub fn try_reserve(&self, capacity: usize) -> bool {
        let mut state = self.lock();
        if state.occupied() >= capacity {
            return false;
        }
        state.reserved += 1;
        true
    }

    /// Turn a reservation into a queued id.
    pub fn commit_reserved(&self, id: BatchId) {
        let mut state = self.lock();
        state.reserved = state.reserved.saturating_sub(1);
        state.queue.push_back(id);
    }

    pub fn cancel_reserved(&self) {
        let mut state = self.lock();
        state.reserved = state.reserved.saturating_sub(1);
    }

    /// Number of queued ids.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queued plus leased plus reserved: every batch the spool is accountable for.
    pub fn occupied(&self) -> usize {
        self.lock().occupied()
    }

    /// Queued id with the earliest creation time. Requeued ids sit at the
    /// back of the queue, so this is not necessarily the next one popped.
    pub fn oldest(&self) -> Option<BatchId> {
        self.lock().queue.iter().min().cloned()
    }

    /// Queued id with the latest creation time.
    pub fn newest(&self) -> Option<BatchId> {
        self.lock().queue.iter().max().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Arc;
    use std::thread;

    fn ids(n: usize) -> Vec<BatchId> {
        let base = Utc.with_ymd_and_hms(2026, 1, 28, 10, 0, 0).unwrap();
        (0..n)
            .map(|i| BatchId::at(base + Duration::seconds(i as i64)))
            .collect()
    }

    #[test]
    fn test_pop_order_is_fifo() {
        let index = SpoolIndex::new();
        let ids = ids(3);
        for id in &ids {
            index.push_newest(id.clone());
        }

        assert_eq!(index.pop_oldest(), Some(ids[0].clone()));
        assert_eq!(index.pop_oldest(), Some(ids[1].clone()));
        assert_eq!(index.pop_oldest(), Some(ids[2].clone()));
        assert_eq!(index.pop_oldest(), None);
    }

    #[test]
    fn test_requeue_moves_to_back() {
        let index = SpoolIndex::new();
        let ids = ids(3);
        index.load_from(ids.clone());

        let first = index.pop_oldest().unwrap();
        index.requeue(first.clone());

        assert_eq!(index.len(), 3);
        assert_eq!(index.pop_oldest(), Some(ids[1].clone()));
        assert_eq!(index.pop_oldest(), Some(ids[2].clone()));
        assert_eq!(index.pop_oldest(), Some(first));
    }

    #[test]
    fn test_oldest_and_newest_ignore_queue_position() {
        let index = SpoolIndex::new();
        let ids = ids(3);
        index.load_from(ids.clone());

        let first = index.pop_oldest().unwrap();
        index.requeue(first);

        assert_eq!(index.oldest(), Some(ids[0].clone()));
        assert_eq!(index.newest(), Some(ids[2].clone()));
    }

    #[test]
    fn test_leased_ids_count_against_capacity() {
        let index = SpoolIndex::new();
        index.load_from(ids(2));

        let leased = index.pop_oldest().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.occupied(), 2);
        assert!(!index.try_reserve(2));

        index.requeue(leased);
        assert_eq!(index.len(), 2);
        assert!(!index.try_reserve(2));

        index.pop_oldest().unwrap();
        index.release();
        assert_eq!(index.occupied(), 1);
        assert!(index.try_reserve(2));
    }

    #[test]
    fn test_reservation_lifecycle() {
        let index = SpoolIndex::new();
        assert!(index.try_reserve(1));
        assert!(!index.try_reserve(1));

        index.cancel_reserved();
        assert!(index.try_reserve(1));

        let id = ids(1).remove(0);
        index.commit_reserved(id.clone());
        assert_eq!(index.len(), 1);
        assert_eq!(index.occupied(), 1);
        assert_eq!(index.oldest(), Some(id));
    }

    #[test]
    fn test_concurrent_push_pop_loses_nothing() {
        let index = Arc::new(SpoolIndex::new());
        let per_thread = 250;

        let producers: Vec<_> = (0..4)
            .map(|_| {
                let index = Arc::clone(&index);
                thread::spawn(move || {
                    for _ in 0..per_thread {
                        index.push_newest(BatchId::generate());
                    }
                })
            })
            .collect();

        let consumer = {
            let index = Arc::clone(&index);
            thread::spawn(move || {
                let mut popped = 0;
                for _ in 0..per_thread {
                    if index.pop_oldest().is_some() {
                        index.release();
                        popped += 1;
                    }
                }
                popped
            })
        };

        for handle in producers {
            handle.join().unwrap();
        }
        let popped = consumer.join().unwrap();

        assert_eq!(index.len() + popped, 4 * per_thread);
        assert_eq!(index.occupied(), index.len());
    }
}
