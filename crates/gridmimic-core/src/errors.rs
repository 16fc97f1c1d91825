//! Error types for the gridmimic harness core
//!
//! Failures in this crate fall into two buckets: conditions the command
//! interpreter reports locally and recovers from (operating while
//! disconnected, a login attempted in the wrong state), and genuine faults
//! from the underlying session client. Encounter-log sink failures are never
//! represented here at all; the log swallows them by contract.

use thiserror::Error;

use crate::types::SessionState;

/// Harness-core error types
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("not connected")]
    NotConnected,

    #[error("session state is {actual}, operation requires {required}")]
    InvalidState {
        required: SessionState,
        actual: SessionState,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("session client error: {0}")]
    Client(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for harness-core operations
pub type Result<T> = std::result::Result<T, HarnessError>;

impl HarnessError {
    /// True for conditions the interpreter handles with a local diagnostic
    /// instead of escalating.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            HarnessError::NotConnected | HarnessError::InvalidState { .. }
        )
    }
}
