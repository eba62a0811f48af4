//! VoxStream Streaming Facade
//!
//! The caller-facing entry point: validates the declared media
//! configuration against the codec's constraints, assembles the session
//! setup from caller metadata, and constructs live sessions.
//!
//! - [`client`]: the [`LiveClient`] facade and [`SessionRequest`]
//! - [`metadata`]: extraction of modalities and the VAD override from
//!   caller metadata

pub mod client;
pub mod metadata;

// Re-exports
pub use client::{LiveClient, SessionRequest, LIVE_URL};
pub use voxstream_core::{Error, Result};
pub use voxstream_session::{OutputStream, Session, SessionOptions, SessionState};
