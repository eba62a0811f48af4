//! Transport error kinds and retryability classification

use std::time::Duration;
use thiserror::Error;

/// WebSocket close codes the classifier cares about.
pub mod close_code {
    pub const NORMAL: u16 = 1000;
    pub const GOING_AWAY: u16 = 1001;
    pub const UNSUPPORTED_DATA: u16 = 1003;
    pub const ABNORMAL: u16 = 1006;
    pub const POLICY_VIOLATION: u16 = 1008;
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("dial failed: {0}")]
    Dial(String),

    #[error("dial timed out after {0:?}")]
    DialTimeout(Duration),

    #[error("handshake rejected with HTTP status {status}")]
    Handshake { status: u16 },

    #[error("handshake rejected credentials with HTTP status {status}")]
    Unauthorized { status: u16 },

    #[error("rate limited{}", retry_after_secs.map(|s| format!(": retry after {}s", s)).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("no message within read deadline of {0:?}")]
    ReadTimeout(Duration),

    #[error("connection closed by peer{}", code.map(|c| format!(" with code {}", c)).unwrap_or_default())]
    Closed { code: Option<u16>, reason: String },

    /// A single malformed frame; the connection itself is still healthy.
    #[error("malformed frame: {0}")]
    Frame(serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("operation canceled")]
    Canceled,

    #[error("transport already closed")]
    AlreadyClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether reconnecting may recover from this failure.
    ///
    /// A local read deadline is deliberately not retryable: it is a
    /// liveness signal, not a close.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Closed { code: Some(code), .. } => {
                !matches!(*code, close_code::POLICY_VIOLATION | close_code::UNSUPPORTED_DATA)
            }
            TransportError::Closed { code: None, .. } => true,
            TransportError::Io(_) | TransportError::WebSocket(_) => true,
            TransportError::Dial(_) | TransportError::DialTimeout(_) => true,
            TransportError::Handshake { status } => *status >= 500,
            TransportError::Unauthorized { .. } => false,
            TransportError::RateLimited { .. } => true,
            TransportError::ReadTimeout(_) => false,
            TransportError::Frame(_) => false,
            TransportError::Serialization(_) => false,
            TransportError::Canceled => false,
            TransportError::AlreadyClosed => false,
        }
    }
}

impl From<TransportError> for voxstream_core::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Unauthorized { .. } => {
                voxstream_core::Error::Authentication(err.to_string())
            }
            TransportError::RateLimited { retry_after_secs } => {
                voxstream_core::Error::RateLimitExceeded { retry_after_secs }
            }
            TransportError::Closed {
                code: Some(close_code::POLICY_VIOLATION),
                ..
            } => voxstream_core::Error::Policy(err.to_string()),
            TransportError::Frame(inner) => {
                voxstream_core::Error::Protocol(inner.to_string())
            }
            TransportError::Serialization(inner) => voxstream_core::Error::Serialization(inner),
            TransportError::Canceled => voxstream_core::Error::Canceled,
            TransportError::AlreadyClosed => voxstream_core::Error::SessionClosed,
            TransportError::Io(inner) => voxstream_core::Error::Io(inner),
            other => voxstream_core::Error::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
