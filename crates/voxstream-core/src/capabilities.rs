//! Read-only streaming capability record

use serde::{Deserialize, Serialize};

/// What the streaming facade supports, for capability discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamingCapabilities {
    pub encodings: Vec<String>,
    pub sample_rates: Vec<u32>,
    pub channels: Vec<u16>,
    pub bit_depths: Vec<u16>,
    pub bidirectional: bool,
    /// Smallest accepted chunk, in bytes.
    pub min_chunk_size: usize,
    /// Largest accepted chunk, in bytes.
    pub max_chunk_size: usize,
}
