//! Optional metrics instrumentation for txspool
//!
//! When the `observe` feature is enabled, hot-path events emit counters and
//! histograms through the [`metrics`] facade; the embedding application
//! installs a recorder (e.g. `metrics-exporter-prometheus`) to collect
//! them. Without the feature every function here compiles to a no-op, so
//! call sites never need to be conditional.

/// Record the outcome of a producer append.
///
/// - `txspool.append.accepted_total`: ids buffered
/// - `txspool.append.overflow_total`: ids dropped because the spool was full
#[inline]
pub fn record_append(accepted: bool) {
    #[cfg(feature = "observe")]
    {
        if accepted {
            metrics::counter!("txspool.append.accepted_total").increment(1);
        } else {
            metrics::counter!("txspool.append.overflow_total").increment(1);
        }
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = accepted;
    }
}

/// Record a completed drain cycle.
///
/// - `txspool.drain.batches_total`: batches written and flushed
/// - `txspool.drain.ids_total`: ids written across all batches
/// - `txspool.drain.duration_seconds`: wall time per cycle
#[inline]
pub fn record_drain(duration: std::time::Duration, ids_written: u64) {
    #[cfg(feature = "observe")]
    {
        metrics::counter!("txspool.drain.batches_total").increment(1);
        metrics::counter!("txspool.drain.ids_total").increment(ids_written);
        metrics::histogram!("txspool.drain.duration_seconds").record(duration.as_secs_f64());
    }
    #[cfg(not(feature = "observe"))]
    {
        let _ = (duration, ids_written);
    }
}

/// Record a commit-log write failure.
///
/// - `txspool.sink.failures_total`
#[inline]
pub fn record_sink_failure() {
    #[cfg(feature = "observe")]
    metrics::counter!("txspool.sink.failures_total").increment(1);
}

/// Record a commit-log rotation.
///
/// - `txspool.log.rotations_total`
#[inline]
pub fn record_rotation() {
    #[cfg(feature = "observe")]
    metrics::counter!("txspool.log.rotations_total").increment(1);
}
