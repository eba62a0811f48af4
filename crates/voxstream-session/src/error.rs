//! Session error kinds

use std::time::Duration;
use thiserror::Error;
use voxstream_audio::AudioError;
use voxstream_transport::TransportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    SessionClosed,

    #[error("timed out waiting for setup acknowledgement after {0:?}")]
    SetupTimeout(Duration),

    #[error("reconnect failed after {attempts} attempts: {last}")]
    ReconnectExhausted { attempts: u32, last: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("operation canceled")]
    Canceled,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<SessionError> for voxstream_core::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::SessionClosed => voxstream_core::Error::SessionClosed,
            SessionError::Canceled => voxstream_core::Error::Canceled,
            SessionError::Protocol(msg) => voxstream_core::Error::Protocol(msg),
            SessionError::Transport(inner) => inner.into(),
            SessionError::Audio(inner) => inner.into(),
            SessionError::Serialization(inner) => voxstream_core::Error::Serialization(inner),
            other => voxstream_core::Error::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
