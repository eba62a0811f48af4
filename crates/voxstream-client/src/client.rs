//! The streaming capability facade

use crate::metadata;
use std::time::Duration;
use tracing::{debug, instrument};
use voxstream_core::{
    PricingRates, SessionSetup, StreamingCapabilities, StreamingMediaConfig, ToolDeclaration,
};
use voxstream_session::{Session, SessionOptions};
use voxstream_transport::TransportConfig;

/// The Live service endpoint. Fixed per service; overridable for tests.
pub const LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent";

/// Everything a caller declares to start one session.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub model: String,
    pub system_instruction: String,
    pub media: StreamingMediaConfig,
    pub tools: Vec<ToolDeclaration>,
    pub pricing: Option<PricingRates>,
    /// Free-form caller metadata; `response_modalities` and `vad_disabled`
    /// are recognized.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SessionRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: String::new(),
            media: StreamingMediaConfig::pcm_linear16(),
            tools: Vec::new(),
            pricing: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = text.into();
        self
    }

    pub fn with_media(mut self, media: StreamingMediaConfig) -> Self {
        self.media = media;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingRates) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_metadata(
        mut self,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Client facade for the Live service.
#[derive(Debug, Clone)]
pub struct LiveClient {
    api_key: String,
    url: String,
    options: SessionOptions,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl LiveClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            url: LIVE_URL.to_string(),
            options: SessionOptions::default(),
            connect_timeout: None,
            read_timeout: None,
        }
    }

    /// Point at a different endpoint (test servers).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// What this facade supports.
    pub fn capabilities() -> StreamingCapabilities {
        StreamingCapabilities {
            encodings: vec![voxstream_audio::ENCODING.to_string()],
            sample_rates: vec![voxstream_audio::SAMPLE_RATE],
            channels: vec![voxstream_audio::CHANNELS],
            bit_depths: vec![voxstream_audio::BIT_DEPTH],
            bidirectional: true,
            min_chunk_size: voxstream_audio::MIN_CHUNK_SIZE,
            max_chunk_size: voxstream_audio::MAX_CHUNK_SIZE,
        }
    }

    /// Validate the request and establish a live session.
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn start(&self, request: SessionRequest) -> voxstream_core::Result<Session> {
        voxstream_audio::validate(&request.media)?;

        let modalities = metadata::response_modalities(&request.metadata);
        let vad_disabled = metadata::vad_disabled(&request.metadata);
        debug!(?modalities, vad_disabled, "starting live session");

        let mut setup = SessionSetup::new(request.model)
            .with_system_instruction(request.system_instruction)
            .with_response_modalities(modalities)
            .with_tools(request.tools)
            .with_vad_disabled(vad_disabled);
        if let Some(pricing) = request.pricing {
            setup = setup.with_pricing(pricing);
        }

        let mut config = TransportConfig::new(&self.url, &self.api_key);
        if let Some(timeout) = self.connect_timeout {
            config = config.with_connect_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            config = config.with_read_timeout(timeout);
        }

        let session = Session::connect(config, setup, self.options.clone()).await?;
        Ok(session)
    }
}
