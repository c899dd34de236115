//! Unified spooling service
//!
//! Bundles the shared spool, the file commit log and the drain task behind
//! one owner, wired in dependency order: producers feed the spool, the
//! drain task moves batches into the log. The service only assembles and
//! observes; the hot paths live in the component crates.

use crate::producer::CommitProducer;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use txspool_core::commit_log::{CommitLog, CommitLogStats};
use txspool_core::config::{DrainerConfig, SpoolConfig};
use txspool_core::error::Result;
use txspool_core::signal::ControlSignals;
use txspool_core::spool::{SharedSpool, SpoolStats};
use txspool_core::types::TxId;
use txspool_drainer::{Drainer, DrainerStatus};
use txspool_file_log::{FileCommitLog, FileCommitLogConfig};

/// Aggregate configuration for [`Spooler::open`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolerConfig {
    /// Shared spool settings
    #[serde(default)]
    pub spool: SpoolConfig,

    /// Drain task settings
    #[serde(default)]
    pub drainer: DrainerConfig,

    /// Path the commit log appends to
    #[serde(default = "default_log_path")]
    pub log_path: PathBuf,

    /// Write buffer size for the commit log
    #[serde(default = "default_write_buffer_size")]
    pub write_buffer_size: usize,
}

fn default_log_path() -> PathBuf {
    FileCommitLogConfig::default().path
}

fn default_write_buffer_size() -> usize {
    FileCommitLogConfig::default().write_buffer_size
}

impl Default for SpoolerConfig {
    fn default() -> Self {
        Self {
            spool: SpoolConfig::default(),
            drainer: DrainerConfig::default(),
            log_path: default_log_path(),
            write_buffer_size: default_write_buffer_size(),
        }
    }
}

impl SpoolerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = path.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.spool.capacity = capacity;
        self
    }

    pub fn with_drain_threshold(mut self, threshold: usize) -> Self {
        self.drainer.drain_threshold = threshold;
        self
    }

    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.drainer.poll_interval_ms = millis;
        self
    }

    pub fn with_error_policy(mut self, policy: txspool_core::config::SinkErrorPolicy) -> Self {
        self.drainer.error_policy = policy;
        self
    }

    /// Check all cross-component invariants.
    pub fn validate(&self) -> Result<()> {
        self.spool.validate()?;
        self.drainer.validate_against(self.spool.capacity)?;
        Ok(())
    }
}

/// Combined status snapshot across the spool, drain task and log sink.
#[derive(Debug, Clone)]
pub struct SpoolerStatus {
    pub spool: SpoolStats,
    pub drainer: DrainerStatus,
    pub log: CommitLogStats,
}

/// Handle for signalling the spooler from other tasks or signal handlers.
///
/// Does nothing beyond flag stores and a wakeup, so it is safe to call
/// from anywhere, any number of times.
#[derive(Clone)]
pub struct ShutdownHandle {
    signals: Arc<ControlSignals>,
    wake: Arc<Notify>,
}

impl ShutdownHandle {
    /// Request cooperative shutdown and wake a waiting drain task.
    pub fn shutdown(&self) {
        self.signals.request_shutdown();
        self.wake.notify_waiters();
    }

    /// Request a reload observation (what SIGHUP maps to).
    pub fn reload(&self) {
        self.signals.request_reload();
        self.wake.notify_waiters();
    }
}

/// Unified spooling service
pub struct Spooler {
    spool: Arc<SharedSpool>,
    log: Arc<FileCommitLog>,
    drainer: Drainer<FileCommitLog>,
    signals: Arc<ControlSignals>,
    wake: Arc<Notify>,
}

impl Spooler {
    /// Validate the configuration, open the commit log and assemble the
    /// subsystem. Nothing runs until a drain task is spawned.
    pub fn open(config: SpoolerConfig) -> Result<Self> {
        config.validate()?;

        let log_config = FileCommitLogConfig::new(&config.log_path)
            .with_write_buffer_size(config.write_buffer_size);
        let log = Arc::new(FileCommitLog::open(log_config)?);
        let spool = Arc::new(SharedSpool::with_capacity(config.spool.capacity));
        let signals = Arc::new(ControlSignals::new());
        let wake = Arc::new(Notify::new());

        let drainer = Drainer::new(
            spool.clone(),
            log.clone(),
            config.drainer.clone(),
            signals.clone(),
        )
        .with_wake(wake.clone());

        tracing::info!(
            capacity = config.spool.capacity,
            threshold = config.drainer.drain_threshold,
            path = %config.log_path.display(),
            "spooler opened"
        );

        Ok(Self {
            spool,
            log,
            drainer,
            signals,
            wake,
        })
    }

    /// Handle for commit paths. Cheap to clone, one per producer context.
    pub fn producer(&self) -> CommitProducer {
        CommitProducer::new(self.spool.clone(), self.wake.clone())
    }

    /// The drain task, for driving manually with `run_once` or running on
    /// a runtime of the caller's choosing.
    ///
    /// Clones share one run slot: driving a clone while a spawned loop is
    /// active is rejected with an error rather than interleaved.
    pub fn drainer(&self) -> Drainer<FileCommitLog> {
        self.drainer.clone()
    }

    /// Spawn the drain loop on the current tokio runtime.
    pub fn spawn_drainer(&self) -> JoinHandle<Result<()>> {
        let drainer = self.drainer.clone();
        tokio::spawn(async move { drainer.run_continuous().await })
    }

    /// The shared spool, for hosts embedding their own drain loop.
    pub fn spool(&self) -> &Arc<SharedSpool> {
        &self.spool
    }

    /// The commit log sink.
    pub fn log(&self) -> &Arc<FileCommitLog> {
        &self.log
    }

    /// Close and reopen the commit log at its current path. Returns the
    /// path that was appended to before the rotation.
    pub fn rotate_log(&self) -> Result<PathBuf> {
        self.log.rotate(None)
    }

    /// Switch the commit log to a new path. Returns the old path.
    pub fn rotate_log_to(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        self.log.rotate(Some(path.as_ref()))
    }

    /// Most recently observed commit id, overflowed ids included. Best
    /// effort under concurrency.
    pub fn last_id(&self) -> Option<TxId> {
        self.spool.last_observed()
    }

    /// Combined status across all components.
    pub fn status(&self) -> Result<SpoolerStatus> {
        Ok(SpoolerStatus {
            spool: self.spool.stats(),
            drainer: self.drainer.status(),
            log: self.log.stats()?,
        })
    }

    /// Handle for signalling shutdown or reload from elsewhere.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            signals: self.signals.clone(),
            wake: self.wake.clone(),
        }
    }

    /// Request cooperative shutdown: the drain task finishes its current
    /// cycle, runs the final sweep if configured, and exits.
    pub fn shutdown(&self) {
        self.shutdown_handle().shutdown();
    }

    /// The underlying control flags, for custom signal wiring.
    pub fn signals(&self) -> &Arc<ControlSignals> {
        &self.signals
    }

    /// Map process signals onto this spooler: SIGTERM requests shutdown,
    /// SIGHUP requests a reload observation. Must be called from within a
    /// tokio runtime.
    #[cfg(unix)]
    pub fn install_signal_handlers(&self) -> Result<JoinHandle<()>> {
        crate::signal::install_signal_handlers(self.shutdown_handle())
    }
}
