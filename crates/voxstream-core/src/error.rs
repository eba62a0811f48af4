//! Error types for VoxStream Core

use thiserror::Error;

/// The shared error taxonomy observed by callers.
///
/// The more specific crate errors (`AudioError`, `TransportError`,
/// `SessionError`) convert into this enum at the API boundary.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Policy violation: {0}")]
    Policy(String),

    #[error("Rate limit exceeded{}", retry_after_secs.map(|s| format!(": retry after {}s", s)).unwrap_or_default())]
    RateLimitExceeded { retry_after_secs: Option<u64> },

    #[error("Operation canceled")]
    Canceled,

    #[error("Session is closed")]
    SessionClosed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when no amount of retrying can recover the operation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::Authentication(_)
                | Error::Policy(_)
                | Error::SessionClosed
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
