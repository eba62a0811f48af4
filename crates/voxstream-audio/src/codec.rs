//! Format validation, transport encoding, and fixed-size chunking

use crate::error::AudioError;
use base64::prelude::*;
use chrono::Utc;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use voxstream_core::media::{metadata, MediaChunk, MediaType, StreamingMediaConfig};

/// The only sample rate the Live service accepts, in Hz.
pub const SAMPLE_RATE: u32 = 16_000;
/// Mono only.
pub const CHANNELS: u16 = 1;
/// Signed 16-bit little-endian samples.
pub const BIT_DEPTH: u16 = 16;
pub const BYTES_PER_SAMPLE: usize = (BIT_DEPTH / 8) as usize;
pub const ENCODING: &str = "pcm_linear16";
/// MIME type used on the wire for realtime input and inline output audio.
pub const MIME_TYPE: &str = "audio/pcm";

/// 100 ms of audio: `SAMPLE_RATE * 0.1 * BYTES_PER_SAMPLE`.
pub const DEFAULT_CHUNK_SIZE: usize = 3_200;
/// 10 ms of audio.
pub const MIN_CHUNK_SIZE: usize = 160;
/// ~1 s of audio.
pub const MAX_CHUNK_SIZE: usize = 32_000;

/// Validate a caller-declared media configuration against the service
/// constraints, failing fast with a specific error per violation.
pub fn validate(config: &StreamingMediaConfig) -> Result<(), AudioError> {
    if config.media_type != MediaType::Audio {
        return Err(AudioError::UnsupportedMediaType(config.media_type));
    }
    if config.encoding != ENCODING {
        return Err(AudioError::UnsupportedEncoding(config.encoding.clone()));
    }
    if config.sample_rate != SAMPLE_RATE {
        return Err(AudioError::UnsupportedSampleRate(config.sample_rate));
    }
    if config.channels != CHANNELS {
        return Err(AudioError::UnsupportedChannels(config.channels));
    }
    if config.bit_depth != BIT_DEPTH {
        return Err(AudioError::UnsupportedBitDepth(config.bit_depth));
    }
    validate_chunk_size(config.chunk_size)
}

fn validate_chunk_size(chunk_size: usize) -> Result<(), AudioError> {
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size)
        || chunk_size % BYTES_PER_SAMPLE != 0
    {
        return Err(AudioError::InvalidChunkSize(chunk_size));
    }
    Ok(())
}

/// Base64-encode raw PCM bytes for JSON transport (standard alphabet,
/// padded).
pub fn encode(payload: &[u8]) -> Result<String, AudioError> {
    if payload.is_empty() {
        return Err(AudioError::EmptyAudio);
    }
    ensure_aligned(payload.len())?;
    Ok(BASE64_STANDARD.encode(payload))
}

/// Inverse of [`encode`].
pub fn decode(payload: &str) -> Result<Vec<u8>, AudioError> {
    if payload.is_empty() {
        return Err(AudioError::EmptyAudio);
    }
    let bytes = BASE64_STANDARD.decode(payload)?;
    ensure_aligned(bytes.len())?;
    Ok(bytes)
}

pub(crate) fn ensure_aligned(len: usize) -> Result<(), AudioError> {
    if len % BYTES_PER_SAMPLE != 0 {
        return Err(AudioError::Misaligned {
            len,
            bytes_per_sample: BYTES_PER_SAMPLE,
        });
    }
    Ok(())
}

/// Frame raw PCM bytes into fixed-duration chunks of `chunk_size` bytes.
///
/// The last chunk may be shorter but must still be sample-aligned; it bears
/// `is_last`. Sequence numbers start at zero and are contiguous within this
/// call. Cancellation is honored between chunks.
pub fn chunk(
    payload: &[u8],
    chunk_size: usize,
    cancel: &CancellationToken,
) -> Result<Vec<MediaChunk>, AudioError> {
    if payload.is_empty() {
        return Err(AudioError::EmptyAudio);
    }
    ensure_aligned(payload.len())?;
    validate_chunk_size(chunk_size)?;

    let mut chunks = Vec::with_capacity(payload.len().div_ceil(chunk_size));
    for (sequence, piece) in payload.chunks(chunk_size).enumerate() {
        if cancel.is_cancelled() {
            return Err(AudioError::Canceled);
        }
        let sequence = sequence as u64;
        let is_last = (sequence as usize + 1) * chunk_size >= payload.len();
        chunks.push(build_chunk(piece.to_vec(), sequence, is_last));
    }

    tracing::debug!(
        total_bytes = payload.len(),
        chunk_size,
        chunks = chunks.len(),
        "chunked audio payload"
    );
    Ok(chunks)
}

pub(crate) fn build_chunk(payload: Vec<u8>, sequence: u64, is_last: bool) -> MediaChunk {
    MediaChunk {
        payload,
        sequence,
        is_last,
        captured_at: Some(Utc::now()),
        metadata: chunk_metadata(),
    }
}

fn chunk_metadata() -> HashMap<String, String> {
    HashMap::from([
        (metadata::FORMAT.to_string(), ENCODING.to_string()),
        (metadata::SAMPLE_RATE.to_string(), SAMPLE_RATE.to_string()),
        (metadata::CHANNELS.to_string(), CHANNELS.to_string()),
        (metadata::BIT_DEPTH.to_string(), BIT_DEPTH.to_string()),
    ])
}

/// Playback duration of a chunk of `chunk_size` bytes, in milliseconds.
pub fn chunk_duration_ms(chunk_size: usize) -> f64 {
    chunk_size as f64 / BYTES_PER_SAMPLE as f64 / SAMPLE_RATE as f64 * 1000.0
}
