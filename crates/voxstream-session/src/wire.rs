//! Wire envelope and frame types
//!
//! Outbound envelopes are what the client writes; inbound frames are what
//! the service sends back. Field order in the structs matches the shapes
//! the service documents, so serialized envelopes read the same way.

use serde::{Deserialize, Serialize};
use voxstream_core::{SessionSetup, UsageCounts};

// Outbound envelopes

/// The first message on every (re)connected transport.
#[derive(Debug, Clone, Serialize)]
pub struct SetupEnvelope {
    pub setup: SetupPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct SetupPayload {
    pub model: String,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDeclarations>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input_config: Option<RealtimeInputConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Part {
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDeclarations {
    pub function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInputConfig {
    pub automatic_activity_detection: AutomaticActivityDetection,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutomaticActivityDetection {
    pub disabled: bool,
}

impl SetupEnvelope {
    /// Assemble the setup payload once; the session stores the serialized
    /// form and replays it verbatim on reconnect.
    pub fn from_setup(setup: &SessionSetup) -> Self {
        let system_instruction = if setup.system_instruction.is_empty() {
            None
        } else {
            Some(Content {
                parts: vec![Part {
                    text: setup.system_instruction.clone(),
                }],
            })
        };

        let tools = if setup.tools.is_empty() {
            None
        } else {
            Some(vec![ToolDeclarations {
                function_declarations: setup
                    .tools
                    .iter()
                    .map(|tool| FunctionDeclaration {
                        name: tool.name.clone(),
                        description: tool.description.clone(),
                        parameters: tool.parameters.clone(),
                    })
                    .collect(),
            }])
        };

        // Forwarded when and only when the caller asked for it; everything
        // else about activity detection stays on server defaults.
        let realtime_input_config = setup.vad_disabled.then_some(RealtimeInputConfig {
            automatic_activity_detection: AutomaticActivityDetection { disabled: true },
        });

        Self {
            setup: SetupPayload {
                model: setup.model.clone(),
                generation_config: GenerationConfig {
                    response_modalities: setup
                        .response_modalities
                        .iter()
                        .map(|m| m.as_wire_str().to_string())
                        .collect(),
                },
                system_instruction,
                tools,
                realtime_input_config,
            },
        }
    }
}

/// Media chunks without a turn boundary.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInputEnvelope {
    pub realtime_input: RealtimeInput,
}

#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaBlob>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: String,
}

impl RealtimeInputEnvelope {
    pub fn audio(data: String) -> Self {
        Self {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaBlob {
                    mime_type: voxstream_audio::MIME_TYPE.to_string(),
                    data,
                }],
            },
        }
    }
}

/// Text input or a bare turn-boundary signal.
#[derive(Debug, Clone, Serialize)]
pub struct ClientContentEnvelope {
    pub client_content: ClientContent,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turns: Option<Vec<Turn>>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<Part>,
}

impl ClientContentEnvelope {
    pub fn user_text(text: impl Into<String>, turn_complete: bool) -> Self {
        Self {
            client_content: ClientContent {
                turns: Some(vec![Turn {
                    role: "user".to_string(),
                    parts: vec![Part { text: text.into() }],
                }]),
                turn_complete,
            },
        }
    }

    pub fn turn_complete() -> Self {
        Self {
            client_content: ClientContent {
                turns: None,
                turn_complete: true,
            },
        }
    }
}

/// Results for tool calls the model requested.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponseEnvelope {
    #[serde(rename = "toolResponse")]
    pub tool_response: ToolResponsePayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResponsePayload {
    #[serde(rename = "functionResponses")]
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub response: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<bool>,
}

impl ToolResponseEnvelope {
    pub fn from_responses(responses: &[voxstream_core::ToolResponse]) -> Self {
        Self {
            tool_response: ToolResponsePayload {
                function_responses: responses
                    .iter()
                    .map(|r| FunctionResponse {
                        id: r.id.clone(),
                        name: r.name.clone(),
                        response: r.response_value(),
                        error: r.error.then_some(true),
                    })
                    .collect(),
            },
        }
    }
}

// Inbound frames

/// One frame from the service. Top-level keys are mutually exclusive in
/// the common case, but `usageMetadata` may accompany any of them. Unknown
/// keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerFrame {
    pub setup_complete: Option<serde_json::Value>,
    pub server_content: Option<ServerContent>,
    pub tool_call: Option<ToolCallFrame>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub model_turn: Option<ModelTurn>,
    pub turn_complete: bool,
    pub interrupted: bool,
    pub input_transcription: Option<TranscriptionFrame>,
    pub output_transcription: Option<TranscriptionFrame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<ServerPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranscriptionFrame {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolCallFrame {
    pub function_calls: Vec<FunctionCallFrame>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FunctionCallFrame {
    pub id: String,
    pub name: String,
    pub args: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u64>,
    pub response_token_count: Option<u64>,
    pub candidates_token_count: Option<u64>,
    pub total_token_count: Option<u64>,
    pub cached_content_token_count: Option<u64>,
}

impl UsageMetadata {
    /// `responseTokenCount` wins over `candidatesTokenCount` when both
    /// appear.
    pub fn to_usage(&self) -> UsageCounts {
        let input_tokens = self.prompt_token_count.unwrap_or(0);
        let output_tokens = self
            .response_token_count
            .or(self.candidates_token_count)
            .unwrap_or(0);
        UsageCounts {
            input_tokens,
            output_tokens,
            cached_tokens: self.cached_content_token_count.unwrap_or(0),
            total_tokens: self
                .total_token_count
                .unwrap_or(input_tokens + output_tokens),
        }
    }
}
