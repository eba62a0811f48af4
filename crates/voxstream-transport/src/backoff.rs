//! Reconnect delay schedule

use std::time::Duration;

const BASE_MS: u64 = 250;
const CAP_MS: u64 = 4_000;

/// Exponential backoff: 250 ms, 500 ms, 1 s, 2 s, capped at 4 s.
pub fn backoff_delay(attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.min(16));
    Duration::from_millis(BASE_MS.saturating_mul(factor).min(CAP_MS))
}
