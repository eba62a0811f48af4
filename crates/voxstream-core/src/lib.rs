//! VoxStream Core Types
//!
//! This crate provides the fundamental types shared across the VoxStream
//! streaming session engine:
//!
//! - [`media`]: media chunks and caller-declared media configuration
//! - [`setup`]: per-session configuration retained for reconnect replay
//! - [`output`]: typed records delivered on a session's output stream
//! - [`tool`]: tool-call and tool-response payloads
//! - [`cost`]: token usage and cost computation
//! - [`capabilities`]: the read-only streaming capability record
//! - [`error`]: the shared error taxonomy

pub mod capabilities;
pub mod cost;
pub mod error;
pub mod media;
pub mod output;
pub mod setup;
pub mod tool;

// Re-exports
pub use capabilities::StreamingCapabilities;
pub use cost::{CostInfo, PricingRates, UsageCounts};
pub use error::{Error, Result};
pub use media::{MediaChunk, MediaType, StreamingMediaConfig};
pub use output::{FinishReason, MediaDelta, ModelDelta, OutputRecord};
pub use setup::{Modality, SessionSetup, ToolDeclaration};
pub use tool::{ToolCall, ToolResponse};
