//! Core types and traits for the txspool commit-id spooling subsystem
//!
//! This crate defines the pieces every other txspool crate builds on:
//! - **Shared spool**: a fixed-capacity, mutex-guarded buffer of commit ids
//!   written by many producers and emptied by a single drain task
//! - **Commit log trait**: the append-only sink drained batches are written to
//! - **Control signals**: cooperative shutdown/reload flags safe to set from
//!   signal handlers
//! - **Configuration**: spool and drain-task settings with serde defaults
//!
//! Key properties:
//! - Producers never perform I/O and never allocate while appending
//! - A drain atomically removes everything buffered, preserving commit order
//! - Overflow is a counted, observable outcome, never a panic or an error on
//!   the commit path

pub mod commit_log;
pub mod config;
pub mod error;
pub mod observe;
pub mod signal;
pub mod spool;
pub mod types;

pub use commit_log::{CommitLog, CommitLogStats};
pub use config::{DrainerConfig, SinkErrorPolicy, SpoolConfig};
pub use error::{Result, SpoolError};
pub use signal::ControlSignals;
pub use spool::{AppendResult, DrainedBatch, SharedSpool, SpoolStats};
pub use types::TxId;
