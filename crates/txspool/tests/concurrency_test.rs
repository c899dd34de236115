//! Multi-producer safety tests against a live drain task
//!
//! Commit paths are synchronous, so producers run on plain threads while
//! the drain task runs on the tokio runtime, the same mix a real host
//! produces.

use std::collections::HashSet;
use std::sync::Barrier;
use std::thread;
use txspool::prelude::*;
use txspool::FileCommitLogIter;

fn read_ids(path: &std::path::Path) -> Vec<TxId> {
    FileCommitLogIter::open(path)
        .unwrap()
        .collect::<Result<Vec<_>>>()
        .unwrap()
}

// Encode the producer in the high bits so per-producer order is checkable
// after the streams interleave.
fn tagged(producer: usize, seq: u64) -> TxId {
    ((producer as u64) << 32) | seq
}

/// Every accepted id reaches the log exactly once and each producer's ids
/// appear in its own commit order, with producers and the drain task all
/// running concurrently.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_accepted_id_lost_or_duplicated() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("commit.log");
    let spooler = Spooler::open(
        SpoolerConfig::default()
            .with_log_path(&log_path)
            .with_capacity(4096)
            .with_drain_threshold(32)
            .with_poll_interval_ms(2),
    )
    .unwrap();
    let drain = spooler.spawn_drainer();

    let num_threads = 8;
    let per_thread = 500u64;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let producer = spooler.producer();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut accepted = Vec::new();
                for seq in 0..per_thread {
                    let id = tagged(t, seq);
                    if producer.observe_commit(id).is_accepted() {
                        accepted.push(id);
                    }
                }
                accepted
            })
        })
        .collect();

    let accepted_per_thread: Vec<Vec<TxId>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    spooler.shutdown();
    drain.await.unwrap().unwrap();

    // Capacity exceeds the total volume, so nothing overflowed.
    let total: usize = accepted_per_thread.iter().map(|v| v.len()).sum();
    assert_eq!(total, num_threads * per_thread as usize);

    let ids = read_ids(&log_path);
    assert_eq!(ids.len(), total);

    let mut seen = HashSet::new();
    for id in &ids {
        assert!(seen.insert(*id), "id {id} written more than once");
    }

    for (t, accepted) in accepted_per_thread.iter().enumerate() {
        let mine: Vec<TxId> = ids
            .iter()
            .copied()
            .filter(|id| (id >> 32) == t as u64)
            .collect();
        assert_eq!(&mine, accepted, "producer {t} order broken");
    }
}

/// Under sustained overload the spool sheds ids but never corrupts: the
/// log holds exactly the accepted ids, and accepted plus overflowed
/// accounts for every observe_commit call.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overflow_sheds_but_never_corrupts() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("commit.log");
    let spooler = Spooler::open(
        SpoolerConfig::default()
            .with_log_path(&log_path)
            .with_capacity(64)
            .with_drain_threshold(8)
            .with_poll_interval_ms(1),
    )
    .unwrap();
    let drain = spooler.spawn_drainer();

    let num_threads = 2;
    let per_thread = 2000u64;
    let barrier = Arc::new(Barrier::new(num_threads));

    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let producer = spooler.producer();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut accepted = Vec::new();
                for seq in 0..per_thread {
                    let id = tagged(t, seq);
                    if producer.observe_commit(id).is_accepted() {
                        accepted.push(id);
                    }
                }
                accepted
            })
        })
        .collect();

    let accepted_per_thread: Vec<Vec<TxId>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    spooler.shutdown();
    drain.await.unwrap().unwrap();

    let status = spooler.status().unwrap();
    assert_eq!(
        status.spool.accepted_total + status.spool.overflow_total,
        (num_threads as u64) * per_thread
    );

    let ids = read_ids(&log_path);
    let accepted_all: HashSet<TxId> = accepted_per_thread.iter().flatten().copied().collect();
    assert_eq!(ids.len(), accepted_all.len());
    for id in &ids {
        assert!(accepted_all.contains(id), "id {id} in log but never accepted");
    }

    // Per-producer order still holds for whatever survived.
    for (t, accepted) in accepted_per_thread.iter().enumerate() {
        let mine: Vec<TxId> = ids
            .iter()
            .copied()
            .filter(|id| (id >> 32) == t as u64)
            .collect();
        assert_eq!(&mine, accepted, "producer {t} order broken");
    }
}
