//! txspool Prelude
//!
//! Import this to get all commonly used types and traits:
//!
//! ```
//! use txspool::prelude::*;
//! ```

// Core types
pub use crate::{AppendResult, DrainedBatch, Result, SpoolError, TxId};

// Configs
pub use crate::{DrainerConfig, SinkErrorPolicy, SpoolConfig, SpoolerConfig};

// Traits
pub use crate::{CommitLog, CommitLogStats};

// Implementations
pub use crate::{Drainer, FileCommitLog, FileCommitLogConfig, SharedSpool};

// Service surface
pub use crate::{CommitProducer, ShutdownHandle, Spooler, SpoolerStatus};

// Stats and signals
pub use crate::{ControlSignals, DrainStats, DrainerStatus, SpoolStats};

// Re-export common external deps
pub use anyhow;
pub use serde::{Deserialize, Serialize};
pub use std::sync::Arc;
pub use tracing;
