//! Cooperative shutdown and reload flags
//!
//! Process signal handlers must stay trivial, so the handler side of this
//! type is nothing but an atomic store; the drain task polls the flags at
//! its loop boundaries. Cancellation therefore never interrupts an
//! in-flight drain cycle, it only prevents the next one.

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared cancellation and reload state.
///
/// Wrap in an `Arc`, hand one clone to whatever receives signals and one
/// to the drain task. All methods are async-signal-safe in spirit: no
/// locks, no allocation.
#[derive(Debug, Default)]
pub struct ControlSignals {
    shutdown: AtomicBool,
    reload: AtomicBool,
}

impl ControlSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative shutdown. Idempotent; never un-requested.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Request a reload observation (SIGHUP parity).
    pub fn request_reload(&self) {
        self.reload.store(true, Ordering::SeqCst);
    }

    /// Consume a pending reload request. Returns `true` at most once per
    /// request.
    pub fn take_reload(&self) -> bool {
        self.reload.swap(false, Ordering::SeqCst)
    }
}
