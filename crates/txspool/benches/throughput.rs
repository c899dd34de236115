use std::sync::Barrier;
use std::thread;
use std::time::Instant;
use txspool::prelude::*;

fn main() {
    println!("=== txspool Performance Benchmark ===\n");

    let temp_dir = tempfile::tempdir().unwrap();

    // Benchmark 1: Uncontended append throughput
    println!("1. Single-Producer Append Performance");
    let spool = SharedSpool::with_capacity(1_000_000);
    let count = 1_000_000u64;
    let start = Instant::now();
    for id in 0..count {
        spool.try_append(id);
    }
    let duration = start.elapsed();
    let aps = count as f64 / duration.as_secs_f64();
    println!("   {} appends in {:?}", count, duration);
    println!("   {:.2} appends/sec\n", aps);

    // Benchmark 2: Contended appends across threads
    println!("2. Multi-Producer Append Performance");
    let spool = Arc::new(SharedSpool::with_capacity(4_000_000));
    let num_threads = 4;
    let per_thread = 500_000u64;
    let barrier = Arc::new(Barrier::new(num_threads));
    let start = Instant::now();
    let handles: Vec<_> = (0..num_threads)
        .map(|t| {
            let spool = Arc::clone(&spool);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..per_thread {
                    spool.try_append((t as u64) << 32 | i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    let duration = start.elapsed();
    let total = num_threads as u64 * per_thread;
    let aps = total as f64 / duration.as_secs_f64();
    println!(
        "   {} appends across {} threads in {:?}",
        total, num_threads, duration
    );
    println!("   {:.2} appends/sec\n", aps);

    // Benchmark 3: Drain-and-write cycles through the whole pipeline
    println!("3. Drain Cycle Performance");
    let spooler = Spooler::open(
        SpoolerConfig::default()
            .with_log_path(temp_dir.path().join("bench-commit.log"))
            .with_capacity(8_192)
            .with_drain_threshold(1_000),
    )
    .unwrap();
    let producer = spooler.producer();
    let drainer = spooler.drainer();
    let cycles = 200u64;
    let batch = 2_000u64;
    let start = Instant::now();
    for c in 0..cycles {
        for i in 0..batch {
            producer.observe_commit(c * batch + i);
        }
        drainer.run_once().unwrap();
    }
    let duration = start.elapsed();
    let total = cycles * batch;
    let ips = total as f64 / duration.as_secs_f64();
    println!(
        "   {} ids ({} cycles of {}) in {:?}",
        total, cycles, batch, duration
    );
    println!("   {:.2} ids/sec to disk\n", ips);

    // Benchmark 4: Commit-path latency while a drain is in flight
    println!("4. Append Latency Under Draining");
    let spooler = Spooler::open(
        SpoolerConfig::default()
            .with_log_path(temp_dir.path().join("bench-latency.log"))
            .with_capacity(100_000)
            .with_drain_threshold(5_000),
    )
    .unwrap();
    let producer = spooler.producer();
    let drainer = spooler.drainer();
    let count = 200_000u64;
    let mut worst = std::time::Duration::ZERO;
    let start = Instant::now();
    for id in 0..count {
        let t0 = Instant::now();
        producer.observe_commit(id);
        worst = worst.max(t0.elapsed());
        if id % 10_000 == 0 {
            drainer.run_once().unwrap();
        }
    }
    drainer.drain_remaining().unwrap();
    let duration = start.elapsed();
    println!("   {} appends interleaved with drains in {:?}", count, duration);
    println!("   worst single append: {:?}\n", worst);

    println!("=== Benchmark Complete ===");
}
