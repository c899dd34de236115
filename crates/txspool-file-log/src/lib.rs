//! File-backed commit log implementation
//!
//! Appends drained commit ids to a plain text file with buffered
//! sequential writes: one decimal id per line, in commit order, no header
//! and no index. The format is deliberately boring so that `grep`, `tail`
//! and downstream ingest jobs can consume it without a library.
//!
//! Features:
//! - Batch appends under a single writer-lock hold
//! - Explicit flush and fsync control for the drain cycle contract
//! - Operator-driven rotation, in place or to a new path
//! - Read-back iteration for tooling and tests

mod store;

pub use store::{FileCommitLog, FileCommitLogConfig, FileCommitLogIter};
