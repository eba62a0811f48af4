//! Typed records delivered on a session's output stream

use crate::cost::CostInfo;
use crate::tool::ToolCall;
use serde::{Deserialize, Serialize};

/// Why a turn (or the session) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Complete,
    ToolCalls,
    Error,
    Canceled,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Complete => "complete",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::Error => "error",
            FinishReason::Canceled => "canceled",
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incremental model audio (or other inline media).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDelta {
    /// Base64 payload as received from the service.
    pub data: String,
    pub mime_type: String,
    pub channels: Option<u16>,
    pub sample_rate: Option<u32>,
}

/// The combined content record produced from one model-turn frame.
///
/// Text and media parts arriving in the same frame coalesce here; a
/// `turnComplete` carried by the same frame folds its finish reason (and
/// any usage cost) into this record rather than a separate terminal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDelta {
    /// Incremental text, when the frame carried any.
    pub text: Option<String>,

    /// Cumulative text content for the current turn.
    pub content: String,

    pub media: Vec<MediaDelta>,

    pub finish_reason: Option<FinishReason>,

    pub cost: Option<CostInfo>,
}

impl ModelDelta {
    /// True when the frame contributed neither text nor media.
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.media.is_empty() && self.finish_reason.is_none()
    }
}

/// A variant record delivered on the session's output stream, in frame
/// arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputRecord {
    /// Incremental model text and/or media.
    Delta(ModelDelta),

    /// Server-side transcript of the caller's audio.
    InputTranscription { text: String, turn_complete: bool },

    /// Server-side transcript of the model's spoken output (delta form).
    OutputTranscription { text: String, turn_complete: bool },

    /// The model is requesting tool execution.
    ToolCalls {
        calls: Vec<ToolCall>,
        finish_reason: FinishReason,
    },

    /// The model's in-progress turn was pre-empted by new caller input.
    Interrupted,

    /// End of turn or end of session.
    Terminal {
        finish_reason: FinishReason,
        cost: Option<CostInfo>,
    },

    /// Usage metadata without accompanying text or media.
    Cost(CostInfo),
}

impl OutputRecord {
    /// The finish reason this record carries, folded or terminal.
    pub fn finish_reason(&self) -> Option<FinishReason> {
        match self {
            OutputRecord::Delta(delta) => delta.finish_reason,
            OutputRecord::ToolCalls { finish_reason, .. } => Some(*finish_reason),
            OutputRecord::Terminal { finish_reason, .. } => Some(*finish_reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_reason_wire_strings() {
        assert_eq!(FinishReason::Complete.as_str(), "complete");
        assert_eq!(FinishReason::ToolCalls.as_str(), "tool_calls");
        assert_eq!(FinishReason::Error.as_str(), "error");
        assert_eq!(FinishReason::Canceled.as_str(), "canceled");
    }

    #[test]
    fn folded_finish_reason_is_visible() {
        let record = OutputRecord::Delta(ModelDelta {
            text: Some("done.".into()),
            content: "all done.".into(),
            finish_reason: Some(FinishReason::Complete),
            ..ModelDelta::default()
        });
        assert_eq!(record.finish_reason(), Some(FinishReason::Complete));

        let record = OutputRecord::Interrupted;
        assert_eq!(record.finish_reason(), None);
    }
}
