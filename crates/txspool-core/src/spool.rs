//! Fixed-capacity shared buffer of committed transaction ids
//!
//! One [`SharedSpool`] instance sits between every producer (the commit
//! path) and the single drain task. All buffer access goes through one
//! mutex; producer critical sections are O(1) pushes and the drain critical
//! section is a single bulk copy, so neither side can stall the other for
//! long. The buffer is allocated once at construction and never grows,
//! which keeps the allocator out of the commit path entirely.

use crate::observe;
use crate::types::TxId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Outcome of a producer append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendResult {
    /// The id was buffered and will reach the commit log on a later drain.
    Accepted,
    /// The spool was full; the id was dropped and counted. The caller's
    /// commit is unaffected.
    Overflow,
}

impl AppendResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AppendResult::Accepted)
    }
}

/// An owned batch of ids removed from the spool by one drain.
///
/// Ids appear in the order they were appended. Once returned, the batch is
/// the caller's sole copy; the spool retains nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainedBatch {
    ids: Vec<TxId>,
}

impl DrainedBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in append order, oldest first.
    pub fn ids(&self) -> &[TxId] {
        &self.ids
    }

    /// Newest id in the batch.
    pub fn last(&self) -> Option<TxId> {
        self.ids.last().copied()
    }

    pub fn into_ids(self) -> Vec<TxId> {
        self.ids
    }
}

/// Point-in-time snapshot of spool occupancy and counters.
#[derive(Debug, Clone)]
pub struct SpoolStats {
    /// Fixed capacity the spool was created with.
    pub capacity: usize,
    /// Ids currently buffered.
    pub occupancy: usize,
    /// Ids accepted since creation.
    pub accepted_total: u64,
    /// Ids dropped due to a full spool since creation.
    pub overflow_total: u64,
    /// Ids handed to the drain task since creation.
    pub drained_ids_total: u64,
    /// Drains that returned a batch since creation.
    pub drains_total: u64,
    /// Most recently observed id, if any (overflowed ids included).
    pub last_observed: Option<TxId>,
}

/// Fixed-capacity buffer of commit ids shared by producers and the drain
/// task.
///
/// All methods take `&self`; wrap the spool in an `Arc` and clone the
/// handle freely. Producers call [`try_append`](Self::try_append), the
/// drain task calls [`drain_if_due`](Self::drain_if_due), and everything
/// else is observation.
pub struct SharedSpool {
    capacity: usize,
    buffer: Mutex<Vec<TxId>>,
    accepted: AtomicU64,
    overflowed: AtomicU64,
    drained_ids: AtomicU64,
    drains: AtomicU64,
    // last_observed is only meaningful once observed_any is set
    last_observed: AtomicU64,
    observed_any: AtomicBool,
}

impl SharedSpool {
    /// Create a spool holding at most `capacity` ids.
    ///
    /// The full capacity is reserved up front; appends never reallocate.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "spool capacity must be positive");
        Self {
            capacity,
            buffer: Mutex::new(Vec::with_capacity(capacity)),
            accepted: AtomicU64::new(0),
            overflowed: AtomicU64::new(0),
            drained_ids: AtomicU64::new(0),
            drains: AtomicU64::new(0),
            last_observed: AtomicU64::new(0),
            observed_any: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of ids currently buffered.
    pub fn len(&self) -> usize {
        self.buffer.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffer one committed id.
    ///
    /// Constant time, no allocation, no I/O. When the spool is full the id
    /// is dropped and [`AppendResult::Overflow`] is returned; overflow is a
    /// defined lossy outcome, not an error, and the caller must not treat
    /// it as one.
    pub fn try_append(&self, id: TxId) -> AppendResult {
        // Every observed id updates last_observed, including ones the
        // buffer rejects below. The Release store pairs with the Acquire
        // load in last_observed so a reader that sees the flag also sees
        // a real id, never the pre-init zero.
        self.last_observed.store(id, Ordering::Relaxed);
        self.observed_any.store(true, Ordering::Release);

        let accepted = {
            let mut buffer = self.buffer.lock();
            if buffer.len() < self.capacity {
                buffer.push(id);
                true
            } else {
                false
            }
        };

        if accepted {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            observe::record_append(true);
            AppendResult::Accepted
        } else {
            self.overflowed.fetch_add(1, Ordering::Relaxed);
            observe::record_append(false);
            AppendResult::Overflow
        }
    }

    /// Remove and return everything buffered, if occupancy exceeds
    /// `threshold`.
    ///
    /// Returns `None` when the count is at or below the threshold; a
    /// returned batch is never empty. The check and the removal happen
    /// under one lock hold, so concurrent appends either land in this
    /// batch or in the next one, never both, and no id is lost in between.
    ///
    /// A `threshold` of zero drains any non-empty spool; the shutdown
    /// sweep uses this to flush stragglers.
    pub fn drain_if_due(&self, threshold: usize) -> Option<DrainedBatch> {
        let ids = {
            let mut buffer = self.buffer.lock();
            if buffer.len() <= threshold {
                return None;
            }
            // Clone sizes the new vec to len; clear keeps the reserved
            // capacity so producers still never reallocate.
            let ids = buffer.clone();
            buffer.clear();
            ids
        };

        self.drained_ids.fetch_add(ids.len() as u64, Ordering::Relaxed);
        self.drains.fetch_add(1, Ordering::Relaxed);
        Some(DrainedBatch { ids })
    }

    /// Most recently observed commit id, counting overflowed ids.
    ///
    /// Best effort under concurrency: with racing producers this is *a*
    /// recent id, not necessarily the globally newest.
    pub fn last_observed(&self) -> Option<TxId> {
        if self.observed_any.load(Ordering::Acquire) {
            Some(self.last_observed.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    /// Snapshot counters and occupancy.
    pub fn stats(&self) -> SpoolStats {
        SpoolStats {
            capacity: self.capacity,
            occupancy: self.len(),
            accepted_total: self.accepted.load(Ordering::Relaxed),
            overflow_total: self.overflowed.load(Ordering::Relaxed),
            drained_ids_total: self.drained_ids.load(Ordering::Relaxed),
            drains_total: self.drains.load(Ordering::Relaxed),
            last_observed: self.last_observed(),
        }
    }
}

impl std::fmt::Debug for SharedSpool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedSpool")
            .field("capacity", &self.capacity)
            .field("occupancy", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_append_then_drain_preserves_order() {
        let spool = SharedSpool::with_capacity(16);
        for id in [100u64, 101, 102, 103] {
            assert_eq!(spool.try_append(id), AppendResult::Accepted);
        }

        let batch = spool.drain_if_due(0).expect("spool is non-empty");
        assert_eq!(batch.ids(), &[100, 101, 102, 103]);
        assert_eq!(batch.last(), Some(103));
        assert!(spool.is_empty());
    }

    #[test]
    fn test_drain_below_threshold_returns_none() {
        let spool = SharedSpool::with_capacity(16);
        for id in 0..3u64 {
            spool.try_append(id);
        }

        // Occupancy equal to the threshold is not enough.
        assert!(spool.drain_if_due(3).is_none());
        assert_eq!(spool.len(), 3);

        spool.try_append(3);
        let batch = spool.drain_if_due(3).expect("occupancy exceeds threshold");
        assert_eq!(batch.len(), 4);
    }

    #[test]
    fn test_drain_empty_spool_returns_none() {
        let spool = SharedSpool::with_capacity(4);
        assert!(spool.drain_if_due(0).is_none());
    }

    #[test]
    fn test_overflow_drops_id_and_counts() {
        let spool = SharedSpool::with_capacity(2);
        assert_eq!(spool.try_append(1), AppendResult::Accepted);
        assert_eq!(spool.try_append(2), AppendResult::Accepted);
        assert_eq!(spool.try_append(3), AppendResult::Overflow);
        assert_eq!(spool.try_append(4), AppendResult::Overflow);

        let stats = spool.stats();
        assert_eq!(stats.accepted_total, 2);
        assert_eq!(stats.overflow_total, 2);
        assert_eq!(stats.occupancy, 2);

        // Buffered contents are untouched by the rejected appends.
        let batch = spool.drain_if_due(0).unwrap();
        assert_eq!(batch.ids(), &[1, 2]);
    }

    #[test]
    fn test_append_accepts_again_after_drain() {
        let spool = SharedSpool::with_capacity(2);
        spool.try_append(1);
        spool.try_append(2);
        assert_eq!(spool.try_append(3), AppendResult::Overflow);

        spool.drain_if_due(0).unwrap();
        assert_eq!(spool.try_append(4), AppendResult::Accepted);
        assert_eq!(spool.drain_if_due(0).unwrap().ids(), &[4]);
    }

    #[test]
    fn test_drained_ids_never_duplicated() {
        let spool = SharedSpool::with_capacity(64);
        for id in 0..10u64 {
            spool.try_append(id);
        }
        let first = spool.drain_if_due(0).unwrap();
        assert!(spool.drain_if_due(0).is_none());

        for id in 10..20u64 {
            spool.try_append(id);
        }
        let second = spool.drain_if_due(0).unwrap();

        let mut seen: Vec<TxId> = first.ids().to_vec();
        seen.extend_from_slice(second.ids());
        let mut deduped = seen.clone();
        deduped.dedup();
        assert_eq!(seen, deduped);
        assert_eq!(seen, (0..20u64).collect::<Vec<_>>());
    }

    #[test]
    fn test_last_observed_includes_overflowed() {
        let spool = SharedSpool::with_capacity(1);
        assert_eq!(spool.last_observed(), None);

        spool.try_append(7);
        assert_eq!(spool.last_observed(), Some(7));

        // Rejected, but still the most recently observed commit.
        assert_eq!(spool.try_append(8), AppendResult::Overflow);
        assert_eq!(spool.last_observed(), Some(8));
    }

    #[test]
    fn test_last_observed_is_always_a_real_id() {
        // A reader racing the very first appends sees either nothing or an
        // id a producer actually observed, never the zero the atomic
        // started from.
        let spool = Arc::new(SharedSpool::with_capacity(64));
        let total = 2000u64;
        let barrier = Arc::new(Barrier::new(2));

        let writer = {
            let spool = spool.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for id in 1..=total {
                    spool.try_append(id);
                }
            })
        };

        let reader = {
            let spool = spool.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                loop {
                    match spool.last_observed() {
                        None => {}
                        Some(id) => {
                            assert!((1..=total).contains(&id), "fabricated id {id}");
                            if id == total {
                                break;
                            }
                        }
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
    }

    #[test]
    fn test_stats_track_drains() {
        let spool = SharedSpool::with_capacity(8);
        for id in 0..5u64 {
            spool.try_append(id);
        }
        spool.drain_if_due(2).unwrap();
        spool.try_append(5);
        spool.drain_if_due(0).unwrap();

        let stats = spool.stats();
        assert_eq!(stats.drains_total, 2);
        assert_eq!(stats.drained_ids_total, 6);
        assert_eq!(stats.occupancy, 0);
    }

    #[test]
    fn test_concurrent_appends_none_lost() {
        let spool = Arc::new(SharedSpool::with_capacity(4096));
        let num_threads = 8;
        let per_thread = 100u64;
        let barrier = Arc::new(Barrier::new(num_threads));

        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let spool = spool.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for i in 0..per_thread {
                        let id = (t as u64) * 1000 + i;
                        assert_eq!(spool.try_append(id), AppendResult::Accepted);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let batch = spool.drain_if_due(0).unwrap();
        assert_eq!(batch.len(), num_threads * per_thread as usize);

        // Per-producer order survives interleaving.
        for t in 0..num_threads as u64 {
            let mine: Vec<TxId> = batch
                .ids()
                .iter()
                .copied()
                .filter(|id| id / 1000 == t)
                .collect();
            let expected: Vec<TxId> = (0..per_thread).map(|i| t * 1000 + i).collect();
            assert_eq!(mine, expected);
        }
    }

    #[test]
    fn test_concurrent_append_and_drain() {
        let spool = Arc::new(SharedSpool::with_capacity(128));
        let total = 2000u64;

        let producer = {
            let spool = spool.clone();
            thread::spawn(move || {
                let mut accepted = 0u64;
                for id in 0..total {
                    if spool.try_append(id).is_accepted() {
                        accepted += 1;
                    }
                    if id % 64 == 0 {
                        thread::yield_now();
                    }
                }
                accepted
            })
        };

        let consumer = {
            let spool = spool.clone();
            thread::spawn(move || {
                let mut drained: Vec<TxId> = Vec::new();
                loop {
                    if let Some(batch) = spool.drain_if_due(16) {
                        drained.extend_from_slice(batch.ids());
                    }
                    let stats = spool.stats();
                    if stats.accepted_total + stats.overflow_total >= total {
                        // Producer is done; sweep whatever is left.
                        if let Some(batch) = spool.drain_if_due(0) {
                            drained.extend_from_slice(batch.ids());
                        }
                        break;
                    }
                    thread::yield_now();
                }
                drained
            })
        };

        let accepted = producer.join().unwrap();
        let drained = consumer.join().unwrap();

        // Every accepted id shows up exactly once, in order.
        assert_eq!(drained.len() as u64, accepted);
        let mut sorted = drained.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), drained.len());
        assert!(drained.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_threshold_crossing_drains_everything_buffered() {
        let spool = SharedSpool::with_capacity(5);
        for id in [101u64, 102, 103] {
            assert_eq!(spool.try_append(id), AppendResult::Accepted);
        }
        // Sitting exactly at the threshold, nothing is due yet.
        assert!(spool.drain_if_due(3).is_none());

        spool.try_append(104);
        let batch = spool.drain_if_due(3).expect("occupancy exceeds threshold");
        assert_eq!(batch.ids(), &[101, 102, 103, 104]);

        // The drain freed the whole buffer, not just the overshoot.
        assert_eq!(spool.try_append(105), AppendResult::Accepted);
        assert_eq!(spool.len(), 1);
    }

    #[test]
    fn test_tiny_capacity_alternating() {
        let spool = SharedSpool::with_capacity(2);
        spool.try_append(1);
        spool.try_append(2);
        assert_eq!(spool.drain_if_due(1).unwrap().ids(), &[1, 2]);
        spool.try_append(3);
        assert!(spool.drain_if_due(1).is_none());
        spool.try_append(4);
        assert_eq!(spool.drain_if_due(1).unwrap().ids(), &[3, 4]);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity_panics() {
        SharedSpool::with_capacity(0);
    }
}
