//! Media input types shared between the codec and the session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata keys attached to every chunk emitted by the codec.
pub mod metadata {
    pub const FORMAT: &str = "format";
    pub const SAMPLE_RATE: &str = "sample_rate";
    pub const CHANNELS: &str = "channels";
    pub const BIT_DEPTH: &str = "bit_depth";
}

/// Kind of media carried on a streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Audio,
    /// Reserved; the codec rejects it.
    Video,
}

/// Caller-declared media parameters. Immutable once a session is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamingMediaConfig {
    pub media_type: MediaType,

    /// Chunk size in bytes handed to the codec's framer.
    pub chunk_size: usize,

    /// Sample rate in Hz.
    pub sample_rate: u32,

    pub channels: u16,

    pub bit_depth: u16,

    /// Encoding name, e.g. "pcm_linear16".
    pub encoding: String,
}

impl StreamingMediaConfig {
    /// The only configuration the Live service accepts: 100 ms chunks of
    /// 16 kHz mono 16-bit little-endian PCM.
    pub fn pcm_linear16() -> Self {
        Self {
            media_type: MediaType::Audio,
            chunk_size: 3_200,
            sample_rate: 16_000,
            channels: 1,
            bit_depth: 16,
            encoding: "pcm_linear16".to_string(),
        }
    }

    /// Override the chunk size in bytes.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn bytes_per_sample(&self) -> usize {
        (self.bit_depth / 8) as usize
    }
}

impl Default for StreamingMediaConfig {
    fn default() -> Self {
        Self::pcm_linear16()
    }
}

/// An opaque segment of the input media stream.
///
/// Created by the codec, consumed by the session. The producer owns the
/// chunk until it is sent; after transmission it is no longer referenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaChunk {
    pub payload: Vec<u8>,

    /// Monotonically increasing within one chunking call, starting at zero.
    pub sequence: u64,

    /// Set on exactly one chunk of a bounded input: the final one.
    pub is_last: bool,

    pub captured_at: Option<DateTime<Utc>>,

    /// Carries at minimum `format`, `sample_rate`, `channels`, `bit_depth`.
    pub metadata: HashMap<String, String>,
}

impl MediaChunk {
    pub fn new(payload: Vec<u8>, sequence: u64) -> Self {
        Self {
            payload,
            sequence,
            is_last: false,
            captured_at: None,
            metadata: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_service_format() {
        let config = StreamingMediaConfig::default();
        assert_eq!(config.media_type, MediaType::Audio);
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.channels, 1);
        assert_eq!(config.bit_depth, 16);
        assert_eq!(config.encoding, "pcm_linear16");
        assert_eq!(config.chunk_size, 3_200);
        assert_eq!(config.bytes_per_sample(), 2);
    }

    #[test]
    fn chunk_size_override() {
        let config = StreamingMediaConfig::pcm_linear16().with_chunk_size(640);
        assert_eq!(config.chunk_size, 640);
        assert_eq!(config.sample_rate, 16_000);
    }
}
