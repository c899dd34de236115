//! The background task that moves spooled ids into the commit log

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use txspool_core::commit_log::CommitLog;
use txspool_core::config::{DrainerConfig, SinkErrorPolicy};
use txspool_core::error::{Result, SpoolError};
use txspool_core::observe;
use txspool_core::signal::ControlSignals;
use txspool_core::spool::{DrainedBatch, SharedSpool};
use txspool_core::types::TxId;

/// Outcome of a single drain cycle.
#[derive(Debug, Clone)]
pub struct DrainStats {
    /// Ids written and flushed this cycle.
    pub ids_written: usize,
    /// Newest id written this cycle.
    pub last_id: Option<TxId>,
    /// Wall time the cycle took.
    pub duration: Duration,
}

impl DrainStats {
    fn empty() -> Self {
        Self {
            ids_written: 0,
            last_id: None,
            duration: Duration::from_secs(0),
        }
    }
}

/// Counters maintained by the drain task across cycles.
#[derive(Debug, Default)]
pub struct DrainerMetrics {
    batches_written: AtomicU64,
    ids_written: AtomicU64,
    sink_failures: AtomicU64,
    consecutive_sink_failures: AtomicU64,
    last_failure: Mutex<Option<(DateTime<Utc>, String)>>,
}

impl DrainerMetrics {
    fn record_batch(&self, ids: u64) {
        self.batches_written.fetch_add(1, Ordering::Relaxed);
        self.ids_written.fetch_add(ids, Ordering::Relaxed);
        self.consecutive_sink_failures.store(0, Ordering::Relaxed);
    }

    fn record_sink_failure(&self, error: &SpoolError) {
        self.sink_failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_sink_failures.fetch_add(1, Ordering::Relaxed);
        *self.last_failure.lock() = Some((Utc::now(), error.to_string()));
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> DrainerStatus {
        let last_failure = self.last_failure.lock().clone();
        let (last_failure_at, last_failure_error) = match last_failure {
            Some((at, error)) => (Some(at), Some(error)),
            None => (None, None),
        };
        DrainerStatus {
            batches_written: self.batches_written.load(Ordering::Relaxed),
            ids_written: self.ids_written.load(Ordering::Relaxed),
            sink_failures: self.sink_failures.load(Ordering::Relaxed),
            consecutive_sink_failures: self.consecutive_sink_failures.load(Ordering::Relaxed),
            last_failure_at,
            last_failure_error,
        }
    }
}

/// Operator-facing view of the drain task.
#[derive(Debug, Clone)]
pub struct DrainerStatus {
    pub batches_written: u64,
    pub ids_written: u64,
    pub sink_failures: u64,
    pub consecutive_sink_failures: u64,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_failure_error: Option<String>,
}

// A batch the sink rejected. It is retained here, never put back into the
// spool, so append order in the log is preserved across retries.
struct PendingWrite {
    batch: DrainedBatch,
    attempts: usize,
}

/// The single background consumer of a [`SharedSpool`].
///
/// Cheap to clone (all state is behind `Arc`s): clone one onto a task for
/// [`run_continuous`](Self::run_continuous) and keep the original for
/// status queries. Clones share one run slot: while a runner is active,
/// another [`run_once`](Self::run_once), [`drain_remaining`](Self::drain_remaining)
/// or runner loop is rejected with [`SpoolError::InvalidState`] instead of
/// racing it for batches or the retained write.
pub struct Drainer<L: CommitLog> {
    spool: Arc<SharedSpool>,
    sink: Arc<L>,
    config: DrainerConfig,
    signals: Arc<ControlSignals>,
    wake: Option<Arc<Notify>>,
    metrics: Arc<DrainerMetrics>,
    pending: Arc<Mutex<Option<PendingWrite>>>,
    running: Arc<AtomicBool>,
}

impl<L: CommitLog> Clone for Drainer<L> {
    fn clone(&self) -> Self {
        Self {
            spool: self.spool.clone(),
            sink: self.sink.clone(),
            config: self.config.clone(),
            signals: self.signals.clone(),
            wake: self.wake.clone(),
            metrics: self.metrics.clone(),
            pending: self.pending.clone(),
            running: self.running.clone(),
        }
    }
}

// Holds the run slot. Dropping releases it, panics and cancelled
// futures included.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<L: CommitLog> Drainer<L> {
    pub fn new(
        spool: Arc<SharedSpool>,
        sink: Arc<L>,
        config: DrainerConfig,
        signals: Arc<ControlSignals>,
    ) -> Self {
        Self {
            spool,
            sink,
            config,
            signals,
            wake: None,
            metrics: Arc::new(DrainerMetrics::default()),
            pending: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach the notify producers fire after buffering an id. Without it
    /// the task is purely poll-driven.
    pub fn with_wake(mut self, wake: Arc<Notify>) -> Self {
        self.wake = Some(wake);
        self
    }

    pub fn metrics(&self) -> Arc<DrainerMetrics> {
        self.metrics.clone()
    }

    pub fn status(&self) -> DrainerStatus {
        self.metrics.snapshot()
    }

    /// Run one cycle: write the retained batch if there is one, otherwise
    /// drain the spool if occupancy exceeds the threshold, then flush.
    ///
    /// Returns empty stats when there was nothing to do, and
    /// [`SpoolError::InvalidState`] when another runner holds the drainer.
    /// On a sink error the batch is retained for the next cycle and the
    /// error is returned; the failing sink discards what it staged (the
    /// [`CommitLog`] contract), so the replay cannot double-write, and no
    /// ids are lost unless the error policy later drops them.
    pub fn run_once(&self) -> Result<DrainStats> {
        let _guard = self.try_begin()?;
        self.cycle()
    }

    // One runner at a time may take batches or touch the retained write.
    fn try_begin(&self) -> Result<RunGuard<'_>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SpoolError::InvalidState(
                "drain task already running".to_string(),
            ));
        }
        Ok(RunGuard(&self.running))
    }

    fn cycle(&self) -> Result<DrainStats> {
        let start = Instant::now();

        let (batch, prior_attempts) = {
            let mut pending = self.pending.lock();
            match pending.take() {
                Some(retained) => (retained.batch, retained.attempts),
                None => match self.spool.drain_if_due(self.config.drain_threshold) {
                    Some(batch) => (batch, 0),
                    None => return Ok(DrainStats::empty()),
                },
            }
        };

        match self.write_batch(&batch) {
            Ok(()) => {
                let stats = DrainStats {
                    ids_written: batch.len(),
                    last_id: batch.last(),
                    duration: start.elapsed(),
                };
                self.metrics.record_batch(batch.len() as u64);
                observe::record_drain(stats.duration, batch.len() as u64);
                Ok(stats)
            }
            Err(e) => {
                self.metrics.record_sink_failure(&e);
                observe::record_sink_failure();
                *self.pending.lock() = Some(PendingWrite {
                    batch,
                    attempts: prior_attempts + 1,
                });
                Err(e)
            }
        }
    }

    /// Threshold-ignoring sweep used at shutdown: write the retained batch
    /// and anything still buffered, then flush and fsync.
    ///
    /// Shares the run slot with [`run_once`](Self::run_once) and the
    /// runner loops.
    pub fn drain_remaining(&self) -> Result<DrainStats> {
        let _guard = self.try_begin()?;
        self.sweep()
    }

    fn sweep(&self) -> Result<DrainStats> {
        let start = Instant::now();
        let mut ids_written = 0usize;
        let mut last_id = None;

        let retained = self.pending.lock().take();
        if let Some(retained) = retained {
            match self.write_batch(&retained.batch) {
                Ok(()) => {
                    ids_written += retained.batch.len();
                    last_id = retained.batch.last();
                    self.metrics.record_batch(retained.batch.len() as u64);
                }
                Err(e) => {
                    self.metrics.record_sink_failure(&e);
                    observe::record_sink_failure();
                    *self.pending.lock() = Some(PendingWrite {
                        batch: retained.batch,
                        attempts: retained.attempts + 1,
                    });
                    return Err(e);
                }
            }
        }

        if let Some(batch) = self.spool.drain_if_due(0) {
            match self.write_batch(&batch) {
                Ok(()) => {
                    ids_written += batch.len();
                    last_id = batch.last();
                    self.metrics.record_batch(batch.len() as u64);
                }
                Err(e) => {
                    self.metrics.record_sink_failure(&e);
                    observe::record_sink_failure();
                    *self.pending.lock() = Some(PendingWrite { batch, attempts: 1 });
                    return Err(e);
                }
            }
        }

        self.sink.sync()?;
        Ok(DrainStats {
            ids_written,
            last_id,
            duration: start.elapsed(),
        })
    }

    /// Run until shutdown is requested.
    ///
    /// Sleeps on the wake notify when idle, with the poll interval as a
    /// fallback, so batches go out promptly once the threshold is crossed
    /// without a busy loop. Sink errors are resolved per the configured
    /// [`SinkErrorPolicy`]; a halt returns the error after the task state
    /// has been recorded in the metrics.
    pub async fn run_continuous(&self) -> Result<()> {
        let _guard = self.try_begin()?;
        tracing::info!(
            threshold = self.config.drain_threshold,
            poll_interval_ms = self.config.poll_interval_ms,
            "drain task started"
        );

        loop {
            if self.signals.shutdown_requested() {
                break;
            }
            if self.signals.take_reload() {
                // Parity with the host's reload signal; the running config
                // is fixed for the life of the task.
                tracing::warn!("reload signal observed; configuration is static");
            }

            match self.cycle() {
                Ok(stats) if stats.ids_written == 0 => self.idle_wait().await,
                Ok(stats) => {
                    tracing::debug!(
                        ids = stats.ids_written,
                        last_id = ?stats.last_id,
                        took = ?stats.duration,
                        "drained batch"
                    );
                }
                Err(e) => {
                    if let Some(delay) = self.resolve_sink_error(e)? {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        if self.config.final_drain_on_shutdown {
            let stats = self.sweep()?;
            if stats.ids_written > 0 {
                tracing::info!(ids = stats.ids_written, "final drain complete");
            }
        }

        tracing::info!("drain task stopped");
        Ok(())
    }

    /// Blocking variant of [`run_continuous`](Self::run_continuous) for
    /// hosts without an async runtime. Purely poll-driven, so shutdown
    /// latency is bounded by `poll_interval_ms`.
    pub fn run_blocking(&self) -> Result<()> {
        let _guard = self.try_begin()?;
        tracing::info!(
            threshold = self.config.drain_threshold,
            poll_interval_ms = self.config.poll_interval_ms,
            "drain task started (blocking)"
        );

        let interval = Duration::from_millis(self.config.poll_interval_ms);
        loop {
            if self.signals.shutdown_requested() {
                break;
            }
            if self.signals.take_reload() {
                tracing::warn!("reload signal observed; configuration is static");
            }

            match self.cycle() {
                Ok(stats) if stats.ids_written == 0 => std::thread::sleep(interval),
                Ok(stats) => {
                    tracing::debug!(
                        ids = stats.ids_written,
                        last_id = ?stats.last_id,
                        took = ?stats.duration,
                        "drained batch"
                    );
                }
                Err(e) => {
                    if let Some(delay) = self.resolve_sink_error(e)? {
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        if self.config.final_drain_on_shutdown {
            let stats = self.sweep()?;
            if stats.ids_written > 0 {
                tracing::info!(ids = stats.ids_written, "final drain complete");
            }
        }

        tracing::info!("drain task stopped");
        Ok(())
    }

    fn write_batch(&self, batch: &DrainedBatch) -> Result<()> {
        self.sink.append_batch(batch.ids())?;
        self.sink.flush()
    }

    // Decide what a sink failure means under the configured policy.
    // Ok(Some(delay)): sleep, then keep going. Ok(None): keep going now.
    // Err: halt the task with the error.
    fn resolve_sink_error(&self, error: SpoolError) -> Result<Option<Duration>> {
        match self.config.error_policy {
            SinkErrorPolicy::FailFast => {
                tracing::error!(error = %error, "sink write failed; halting drain task");
                Err(error)
            }
            SinkErrorPolicy::RetryWithBackoff {
                max_retries,
                initial_delay_ms,
            } => {
                let attempts = self.pending_attempts();
                if attempts > max_retries {
                    tracing::error!(
                        error = %error,
                        attempts,
                        "sink write failed; retries exhausted, halting drain task"
                    );
                    return Err(error);
                }
                let delay = backoff_delay(initial_delay_ms, attempts);
                tracing::warn!(
                    error = %error,
                    attempt = attempts,
                    retry_in = ?delay,
                    "sink write failed; batch retained for retry"
                );
                Ok(Some(delay))
            }
            SinkErrorPolicy::LogAndDrop => {
                let dropped = self.drop_pending();
                tracing::error!(
                    error = %error,
                    dropped_ids = dropped,
                    "sink write failed; batch dropped"
                );
                Ok(None)
            }
        }
    }

    fn pending_attempts(&self) -> usize {
        self.pending.lock().as_ref().map(|p| p.attempts).unwrap_or(0)
    }

    fn drop_pending(&self) -> usize {
        self.pending.lock().take().map(|p| p.batch.len()).unwrap_or(0)
    }

    async fn idle_wait(&self) {
        let interval = Duration::from_millis(self.config.poll_interval_ms);
        match &self.wake {
            Some(notify) => {
                tokio::select! {
                    _ = notify.notified() => {}
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            None => tokio::time::sleep(interval).await,
        }
    }
}

// Exponential: initial, 2x, 4x, ... capped at 2^10 times the initial.
fn backoff_delay(initial_delay_ms: u64, attempt: usize) -> Duration {
    let exp = attempt.saturating_sub(1).min(10) as u32;
    Duration::from_millis(initial_delay_ms.saturating_mul(1u64 << exp))
}
