//! Commit log trait and related types
//!
//! The commit log is the durable destination for drained batches. It is
//! deliberately narrow: append a batch, control buffering, rotate, report
//! stats. The file-backed implementation lives in `txspool-file-log`;
//! tests substitute in-memory sinks.

use crate::error::Result;
use crate::types::TxId;
use std::path::{Path, PathBuf};

/// Append-only sink for drained commit ids.
///
/// Implementations are shared between the drain task and the control
/// surface (rotation, status), so every method takes `&self` and must be
/// internally synchronized.
pub trait CommitLog: Send + Sync {
    /// Append a batch of ids as consecutive records, preserving order.
    ///
    /// The batch must be written as one unit with respect to [`rotate`]:
    /// a rotation may land between batches, never inside one.
    ///
    /// Records are staged until [`flush`] makes them durable. A failed
    /// append or flush must discard everything staged since the last
    /// durable record, so a caller that retained the batch can append it
    /// again without any record landing twice.
    ///
    /// [`rotate`]: Self::rotate
    /// [`flush`]: Self::flush
    fn append_batch(&self, ids: &[TxId]) -> Result<()>;

    /// Make the staged records durable.
    ///
    /// On failure the staged records are discarded, per the
    /// [`append_batch`](Self::append_batch) contract.
    fn flush(&self) -> Result<()>;

    /// Flush, then force the records to stable storage.
    fn sync(&self) -> Result<()>;

    /// Close the current destination and start a fresh one.
    ///
    /// With `new_path` set, subsequent appends go to that path. With
    /// `None`, the current path is reopened in place, which is the handoff
    /// an external log shipper wants after moving the old file aside.
    /// Returns the path that was being appended to before the rotation.
    fn rotate(&self, new_path: Option<&Path>) -> Result<PathBuf>;

    /// Counters and sizes for the status surface.
    fn stats(&self) -> Result<CommitLogStats>;
}

/// Statistics reported by a commit log sink.
#[derive(Debug, Clone)]
pub struct CommitLogStats {
    /// Records made durable since the sink was opened.
    pub records_written: u64,
    /// Rotations performed since the sink was opened.
    pub rotations: u64,
    /// Path currently being appended to.
    pub path: PathBuf,
    /// Bytes on disk at the current path.
    pub file_bytes: u64,
}
