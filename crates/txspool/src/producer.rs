//! Producer-side bridge from commit paths into the shared spool

use std::sync::Arc;
use tokio::sync::Notify;
use txspool_core::spool::{AppendResult, SharedSpool};
use txspool_core::types::TxId;

/// Handle invoked synchronously inside each committing transaction.
///
/// One call per commit. The call never blocks on I/O, never allocates and
/// never returns an error: when the spool is full the id is dropped,
/// counted, and the commit proceeds untouched. Clone freely; one handle
/// per producer context is the expected shape.
#[derive(Clone)]
pub struct CommitProducer {
    spool: Arc<SharedSpool>,
    wake: Arc<Notify>,
}

impl CommitProducer {
    pub fn new(spool: Arc<SharedSpool>, wake: Arc<Notify>) -> Self {
        Self { spool, wake }
    }

    /// Record one committed transaction's id.
    ///
    /// On acceptance the drain task is woken so a threshold crossing is
    /// noticed promptly. The returned [`AppendResult`] is informational;
    /// callers on the commit path typically ignore it.
    pub fn observe_commit(&self, id: TxId) -> AppendResult {
        let result = self.spool.try_append(id);
        match result {
            AppendResult::Accepted => {
                self.wake.notify_waiters();
            }
            AppendResult::Overflow => {
                tracing::warn!(tx_id = id, "spool full; commit id dropped");
            }
        }
        result
    }

    /// The spool this producer feeds.
    pub fn spool(&self) -> &Arc<SharedSpool> {
        &self.spool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_commit_buffers_id() {
        let spool = Arc::new(SharedSpool::with_capacity(8));
        let producer = CommitProducer::new(spool.clone(), Arc::new(Notify::new()));

        assert!(producer.observe_commit(17).is_accepted());
        assert_eq!(spool.len(), 1);
        assert_eq!(spool.last_observed(), Some(17));
    }

    #[test]
    fn test_overflow_is_quiet_on_the_commit_path() {
        let spool = Arc::new(SharedSpool::with_capacity(1));
        let producer = CommitProducer::new(spool.clone(), Arc::new(Notify::new()));

        assert_eq!(producer.observe_commit(1), AppendResult::Accepted);
        // No panic, no error; just a counted drop.
        assert_eq!(producer.observe_commit(2), AppendResult::Overflow);
        assert_eq!(spool.stats().overflow_total, 1);
    }
}
