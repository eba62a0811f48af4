//! VoxStream PCM Audio Codec
//!
//! Validation, framing, and transport encoding for the one media format the
//! Live service accepts: 16 kHz mono 16-bit little-endian PCM.
//!
//! - [`codec`]: format validation, base64 transport encoding, fixed-size
//!   chunking from an in-memory buffer
//! - [`reader`]: lazy single-producer chunking from any async byte source
//! - [`samples`]: int16/byte conversion and deterministic signal generators
//! - [`error`]: codec error kinds

pub mod codec;
pub mod error;
pub mod reader;
pub mod samples;

// Re-exports
pub use codec::{
    chunk, chunk_duration_ms, decode, encode, validate, BIT_DEPTH, BYTES_PER_SAMPLE, CHANNELS,
    DEFAULT_CHUNK_SIZE, ENCODING, MAX_CHUNK_SIZE, MIME_TYPE, MIN_CHUNK_SIZE, SAMPLE_RATE,
};
pub use error::{AudioError, Result};
pub use reader::stream_from_reader;
pub use samples::{bytes_to_int16, int16_to_bytes, silence, sine_wave};
