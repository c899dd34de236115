//! Error types for txspool operations

use std::io;
use thiserror::Error;

/// Errors that can occur during spool and commit-log operations
#[derive(Error, Debug)]
pub enum SpoolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Record decode error: {0}")]
    Decode(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for txspool operations
pub type Result<T> = std::result::Result<T, SpoolError>;
