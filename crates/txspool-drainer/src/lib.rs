//! Drain task: the single consumer of the shared spool
//!
//! Watches spool occupancy and, once it exceeds the configured threshold,
//! moves the whole buffer to the commit log as one batch and flushes it
//! before the next cycle begins.
//!
//! Key features:
//! - Push wakeups from producers with a poll-interval fallback
//! - Cooperative shutdown observed at cycle boundaries, with an optional
//!   final sweep of whatever is still buffered
//! - Configurable sink-failure handling with order-preserving retry
//! - Status counters for operators

pub mod drainer;

pub use drainer::{DrainStats, Drainer, DrainerMetrics, DrainerStatus};
