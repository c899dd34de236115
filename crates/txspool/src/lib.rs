//! txspool: commit-identifier spooling for transactional hosts
//!
//! Captures the id emitted as each transaction commits, buffers ids in a
//! fixed-capacity shared spool, and drains them in ordered batches to an
//! append-only commit log from a single background task. The commit path
//! never does I/O, never allocates, and never fails: a full spool drops
//! the id and counts the drop.
//!
//! # Quick Start
//!
//! ```no_run
//! use txspool::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let spooler = Spooler::open(SpoolerConfig::default().with_log_path("./commits.log"))?;
//! let producer = spooler.producer();
//! let drain = spooler.spawn_drainer();
//!
//! // Commit path: one call per committed transaction.
//! producer.observe_commit(42);
//!
//! spooler.shutdown();
//! drain.await.expect("drain task panicked")?;
//! # Ok(())
//! # }
//! ```

pub mod prelude;
pub mod producer;
pub mod signal;
pub mod spooler;

// Re-export core types
pub use txspool_core::commit_log::{CommitLog, CommitLogStats};
pub use txspool_core::config::{DrainerConfig, SinkErrorPolicy, SpoolConfig};
pub use txspool_core::error::{Result, SpoolError};
pub use txspool_core::signal::ControlSignals;
pub use txspool_core::spool::{AppendResult, DrainedBatch, SharedSpool, SpoolStats};
pub use txspool_core::types::TxId;

// Re-export implementations
pub use txspool_drainer::{DrainStats, Drainer, DrainerMetrics, DrainerStatus};
pub use txspool_file_log::{FileCommitLog, FileCommitLogConfig, FileCommitLogIter};

// Main types from this crate
pub use producer::CommitProducer;
pub use spooler::{ShutdownHandle, Spooler, SpoolerConfig, SpoolerStatus};
