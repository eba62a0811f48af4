//! Response demultiplexer
//!
//! Converts each inbound frame into zero or more typed output records.
//! The demultiplexer owns the cumulative text buffer for the current turn;
//! only the receive loop drives it, so no synchronization is needed.

use crate::error::SessionError;
use crate::wire::ServerFrame;
use tracing::trace;
use voxstream_core::{
    CostInfo, FinishReason, MediaDelta, ModelDelta, OutputRecord, PricingRates, ToolCall,
};

#[derive(Debug, Default)]
pub struct DemuxOutcome {
    /// Records to deliver, in frame order.
    pub records: Vec<OutputRecord>,
    /// A `setupComplete` was present; consumed by the state machine, never
    /// forwarded.
    pub setup_complete: bool,
}

#[derive(Debug)]
pub struct Demultiplexer {
    content: String,
    pricing: Option<PricingRates>,
}

impl Demultiplexer {
    pub fn new(pricing: Option<PricingRates>) -> Self {
        Self {
            content: String::new(),
            pricing,
        }
    }

    /// Cumulative model text for the turn in progress.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Fan one frame out into output records.
    ///
    /// A `turnComplete` arriving with model-turn parts folds into the same
    /// record; usage metadata folds into the record that ends the turn and
    /// is otherwise emitted as a standalone cost record.
    pub fn demux(&mut self, frame: ServerFrame) -> Result<DemuxOutcome, SessionError> {
        let mut outcome = DemuxOutcome::default();
        let mut cost = frame
            .usage_metadata
            .as_ref()
            .map(|usage| CostInfo::from_usage(&usage.to_usage(), self.pricing.as_ref()));

        if frame.setup_complete.is_some() {
            outcome.setup_complete = true;
        }

        if let Some(tool_call) = frame.tool_call {
            let mut calls = Vec::with_capacity(tool_call.function_calls.len());
            for call in tool_call.function_calls {
                let args = serde_json::to_string(&call.args).map_err(|err| {
                    SessionError::Protocol(format!(
                        "tool call args for {:?} failed to re-serialize: {}",
                        call.name, err
                    ))
                })?;
                calls.push(ToolCall::new(call.id, call.name, args));
            }
            if !calls.is_empty() {
                trace!(calls = calls.len(), "tool calls requested");
                outcome.records.push(OutputRecord::ToolCalls {
                    calls,
                    finish_reason: FinishReason::ToolCalls,
                });
            }
        }

        if let Some(server_content) = frame.server_content {
            let turn_complete = server_content.turn_complete;

            if server_content.interrupted {
                trace!("model turn interrupted");
                self.content.clear();
                outcome.records.push(OutputRecord::Interrupted);
            }

            if let Some(transcription) = server_content.input_transcription {
                outcome.records.push(OutputRecord::InputTranscription {
                    text: transcription.text,
                    turn_complete,
                });
            }

            if let Some(transcription) = server_content.output_transcription {
                outcome.records.push(OutputRecord::OutputTranscription {
                    text: transcription.text,
                    turn_complete,
                });
            }

            match server_content.model_turn {
                Some(model_turn) => {
                    let mut delta = ModelDelta::default();
                    let mut text = String::new();

                    for part in model_turn.parts {
                        if let Some(part_text) = part.text
                            && !part_text.is_empty()
                        {
                            text.push_str(&part_text);
                        }
                        if let Some(inline) = part.inline_data {
                            let is_audio = inline.mime_type.starts_with("audio/");
                            delta.media.push(MediaDelta {
                                data: inline.data,
                                mime_type: inline.mime_type,
                                channels: is_audio.then_some(voxstream_audio::CHANNELS),
                                sample_rate: is_audio.then_some(voxstream_audio::SAMPLE_RATE),
                            });
                        }
                    }

                    if !text.is_empty() {
                        self.content.push_str(&text);
                        delta.text = Some(text);
                    }
                    delta.content = self.content.clone();

                    if turn_complete {
                        delta.finish_reason = Some(FinishReason::Complete);
                        delta.cost = cost.take();
                        self.content.clear();
                    }

                    if !delta.is_empty() {
                        outcome.records.push(OutputRecord::Delta(delta));
                    }
                }
                None => {
                    if turn_complete {
                        self.content.clear();
                        outcome.records.push(OutputRecord::Terminal {
                            finish_reason: FinishReason::Complete,
                            cost: cost.take(),
                        });
                    }
                }
            }
        }

        // Usage that no record absorbed
        if let Some(cost) = cost.take() {
            outcome.records.push(OutputRecord::Cost(cost));
        }

        Ok(outcome)
    }
}
