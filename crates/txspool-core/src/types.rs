//! Fundamental types shared across txspool crates

/// Transaction identifier assigned by the host at commit time.
///
/// Opaque to txspool: ids are buffered, drained, and written exactly as
/// observed. Hosts that allocate ids monotonically get an ordered log for
/// free, but nothing here depends on that.
pub type TxId = u64;
