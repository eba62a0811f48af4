//! Per-session configuration captured at creation
//!
//! A [`SessionSetup`] is assembled once by the facade and retained verbatim
//! for the lifetime of the session so the setup envelope can be replayed
//! byte-identically on reconnection.

use crate::cost::PricingRates;
use serde::{Deserialize, Serialize};

/// A channel of model output.
///
/// The service rejects requesting both simultaneously in some versions;
/// callers must pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Text,
    Audio,
}

impl Modality {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Modality::Text => "TEXT",
            Modality::Audio => "AUDIO",
        }
    }

    /// Case-insensitive parse of a wire modality string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "TEXT" => Some(Modality::Text),
            "AUDIO" => Some(Modality::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// A tool the model may request during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    /// JSON-Schema description of the tool's arguments.
    pub parameters: serde_json::Value,
}

impl ToolDeclaration {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Persistent per-session configuration. Never mutated after the session
/// finishes configuring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSetup {
    /// Model identifier, e.g. "models/gemini-2.0-flash-live-001".
    pub model: String,

    /// System instruction text; may be empty.
    pub system_instruction: String,

    pub response_modalities: Vec<Modality>,

    pub tools: Vec<ToolDeclaration>,

    /// Only recognized VAD override. All other tuning is left to server
    /// defaults; forwarded when and only when true.
    pub vad_disabled: bool,

    /// Optional per-1K-token rates for cost computation.
    pub pricing: Option<PricingRates>,
}

impl SessionSetup {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: String::new(),
            response_modalities: vec![Modality::Text],
            tools: Vec::new(),
            vad_disabled: false,
            pricing: None,
        }
    }

    pub fn with_system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = text.into();
        self
    }

    pub fn with_response_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = modalities;
        self
    }

    pub fn with_tool(mut self, tool: ToolDeclaration) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_vad_disabled(mut self, disabled: bool) -> Self {
        self.vad_disabled = disabled;
        self
    }

    pub fn with_pricing(mut self, pricing: PricingRates) -> Self {
        self.pricing = Some(pricing);
        self
    }
}
