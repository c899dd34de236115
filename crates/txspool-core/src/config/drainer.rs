//! Drain task configuration

use crate::error::{Result, SpoolError};
use serde::{Deserialize, Serialize};

/// What the drain task does when the commit log rejects a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SinkErrorPolicy {
    /// Halt the drain task and surface the error (default). Producers keep
    /// running and the spool keeps absorbing ids until it overflows, so a
    /// broken sink is loud in the counters rather than silent.
    FailFast,
    /// Retry the failed batch with exponential backoff. The batch stays
    /// with the drain task (never re-queued into the spool) and nothing is
    /// written past it, so order is preserved. After `max_retries` failed
    /// retries the task halts with the error.
    RetryWithBackoff {
        max_retries: usize,
        initial_delay_ms: u64,
    },
    /// Log the failure, drop the batch, keep draining. Explicitly lossy.
    LogAndDrop,
}

impl Default for SinkErrorPolicy {
    fn default() -> Self {
        SinkErrorPolicy::FailFast
    }
}

/// Configuration for the drain task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrainerConfig {
    /// Occupancy the spool must exceed before a drain fires
    ///
    /// A strict threshold: `occupancy == drain_threshold` does not drain.
    /// Must be below the spool capacity or nothing would ever drain.
    /// Default: 100
    #[serde(default = "default_drain_threshold")]
    pub drain_threshold: usize,

    /// Fallback poll interval while idle, in milliseconds
    ///
    /// Producers wake the drain task directly; the poll only bounds the
    /// latency of missed wakeups and of shutdown in the blocking runner.
    /// Default: 10
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How sink write failures are handled
    #[serde(default)]
    pub error_policy: SinkErrorPolicy,

    /// Write out whatever is still buffered when shutting down
    /// Default: true
    #[serde(default = "default_final_drain")]
    pub final_drain_on_shutdown: bool,
}

fn default_drain_threshold() -> usize {
    100
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_final_drain() -> bool {
    true
}

impl Default for DrainerConfig {
    fn default() -> Self {
        Self {
            drain_threshold: default_drain_threshold(),
            poll_interval_ms: default_poll_interval_ms(),
            error_policy: SinkErrorPolicy::default(),
            final_drain_on_shutdown: default_final_drain(),
        }
    }
}

impl DrainerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_drain_threshold(mut self, threshold: usize) -> Self {
        self.drain_threshold = threshold;
        self
    }

    pub fn with_poll_interval_ms(mut self, millis: u64) -> Self {
        self.poll_interval_ms = millis;
        self
    }

    pub fn with_error_policy(mut self, policy: SinkErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_final_drain_on_shutdown(mut self, enabled: bool) -> Self {
        self.final_drain_on_shutdown = enabled;
        self
    }

    /// Check invariants against the spool this drain task will serve.
    pub fn validate_against(&self, spool_capacity: usize) -> Result<()> {
        if self.drain_threshold >= spool_capacity {
            return Err(SpoolError::Config(format!(
                "drain_threshold {} must be below spool capacity {}",
                self.drain_threshold, spool_capacity
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(SpoolError::Config(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
