//! Shared spool configuration

use crate::error::{Result, SpoolError};
use serde::{Deserialize, Serialize};

/// Configuration for the shared spool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpoolConfig {
    /// Maximum number of ids buffered between drains
    ///
    /// Memory is reserved up front; once full, further ids are dropped
    /// until the next drain. Default: 1024
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    1024
}

impl Default for SpoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl SpoolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Check invariants local to the spool.
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(SpoolError::Config(
                "spool capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
