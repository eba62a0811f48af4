//! Error types for the audio codec

use thiserror::Error;
use voxstream_core::MediaType;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio payload is empty")]
    EmptyAudio,

    #[error("audio payload of {len} bytes is not aligned to {bytes_per_sample}-byte samples")]
    Misaligned { len: usize, bytes_per_sample: usize },

    #[error("unsupported media type {0:?}: only audio is implemented")]
    UnsupportedMediaType(MediaType),

    #[error("unsupported sample rate {0} Hz: the service requires 16000")]
    UnsupportedSampleRate(u32),

    #[error("unsupported channel count {0}: the service requires mono")]
    UnsupportedChannels(u16),

    #[error("unsupported bit depth {0}: the service requires 16")]
    UnsupportedBitDepth(u16),

    #[error("unsupported encoding {0:?}: the service requires \"pcm_linear16\"")]
    UnsupportedEncoding(String),

    #[error("invalid chunk size {0} bytes: must be sample-aligned and within {min}..={max}", min = crate::codec::MIN_CHUNK_SIZE, max = crate::codec::MAX_CHUNK_SIZE)]
    InvalidChunkSize(usize),

    #[error("invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("audio chunking canceled")]
    Canceled,

    #[error("audio source error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AudioError> for voxstream_core::Error {
    fn from(err: AudioError) -> Self {
        match err {
            AudioError::InvalidBase64(_) => voxstream_core::Error::Protocol(err.to_string()),
            AudioError::Canceled => voxstream_core::Error::Canceled,
            AudioError::Io(err) => voxstream_core::Error::Io(err),
            other => voxstream_core::Error::Configuration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AudioError>;
