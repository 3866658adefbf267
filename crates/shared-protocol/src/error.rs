//! Error types for the protocol

use thiserror::Error;

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid capture file name: {0}")]
    InvalidFileName(String),

    #[error("Timer duration out of range: {0} (expected {min}..={max})", min = crate::MIN_TIMER_SECONDS, max = crate::MAX_TIMER_SECONDS)]
    TimerOutOfRange(u32),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition {
        from: crate::SessionState,
        to: crate::SessionState,
    },
}

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
