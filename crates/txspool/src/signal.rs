//! Unix signal wiring for the spooler
//!
//! Maps SIGTERM to cooperative shutdown and SIGHUP to a reload
//! observation. The handlers do nothing beyond setting a flag and waking
//! the drain task; the task itself acts on the flags at its next loop
//! boundary.

#[cfg(unix)]
use crate::spooler::ShutdownHandle;
#[cfg(unix)]
use tokio::task::JoinHandle;
#[cfg(unix)]
use txspool_core::error::Result;

/// Listen for SIGTERM and SIGHUP and forward them to the spooler.
///
/// Returns the listener task; it exits after forwarding a SIGTERM. Must be
/// called from within a tokio runtime.
#[cfg(unix)]
pub fn install_signal_handlers(handle: ShutdownHandle) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("SIGTERM received; requesting shutdown");
                    handle.shutdown();
                    break;
                }
                _ = sighup.recv() => {
                    tracing::info!("SIGHUP received; requesting reload");
                    handle.reload();
                }
            }
        }
    }))
}
