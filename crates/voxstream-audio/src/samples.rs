//! Sample/byte conversion and deterministic signal generators

use crate::codec::{ensure_aligned, BYTES_PER_SAMPLE, SAMPLE_RATE};
use crate::error::AudioError;
use std::time::Duration;

/// Convert signed 16-bit samples to a little-endian byte stream.
pub fn int16_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Convert a little-endian byte stream back to signed 16-bit samples.
pub fn bytes_to_int16(bytes: &[u8]) -> Result<Vec<i16>, AudioError> {
    ensure_aligned(bytes.len())?;
    Ok(bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

/// Generate a sine wave at the service sample rate, for deterministic
/// tests. Amplitude is clamped to `[0, 1]` of full scale.
pub fn sine_wave(frequency_hz: f64, duration: Duration, amplitude: f64) -> Vec<i16> {
    let amplitude = amplitude.clamp(0.0, 1.0);
    let sample_count = (duration.as_secs_f64() * SAMPLE_RATE as f64) as usize;

    (0..sample_count)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE as f64;
            let value = amplitude * (2.0 * std::f64::consts::PI * frequency_hz * t).sin();
            (value * i16::MAX as f64) as i16
        })
        .collect()
}

/// Zero-PCM bytes covering `duration` at the service format. Backs the
/// trailing flush that trips server-side turn detection.
pub fn silence(duration: Duration) -> Vec<u8> {
    let sample_count = (duration.as_secs_f64() * SAMPLE_RATE as f64) as usize;
    vec![0u8; sample_count * BYTES_PER_SAMPLE]
}
