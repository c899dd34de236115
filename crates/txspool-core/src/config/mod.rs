//! Configuration types for the spool and the drain task

pub mod drainer;
pub mod spool;

pub use drainer::{DrainerConfig, SinkErrorPolicy};
pub use spool::SpoolConfig;
