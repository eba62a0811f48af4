//! Tool-call and tool-response payloads

use serde::{Deserialize, Serialize};

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Arguments re-serialized to a canonical JSON string.
    pub args: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args: args.into(),
        }
    }
}

/// The caller's answer to a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResponse {
    /// Id of the originating tool call.
    pub id: String,
    pub name: Option<String>,
    /// Raw result string; forwarded as-is when it parses as a JSON object.
    pub result: String,
    /// Set when the caller's tool execution failed.
    pub error: bool,
}

impl ToolResponse {
    pub fn ok(id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            result: result.into(),
            error: false,
        }
    }

    pub fn failed(id: impl Into<String>, result: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            result: result.into(),
            error: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Wire form of the result: a JSON object passes through untouched,
    /// anything else is wrapped as `{"result": <string>}`.
    pub fn response_value(&self) -> serde_json::Value {
        match serde_json::from_str::<serde_json::Value>(&self.result) {
            Ok(value @ serde_json::Value::Object(_)) => value,
            _ => serde_json::json!({ "result": self.result }),
        }
    }
}
