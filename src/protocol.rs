use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One conversation turn. Content stays opaque to the gateway core; tools
/// may inspect it and the pipeline replaces the whole array with the latest
/// tool prompt.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    pub content: Value,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Value::String(content.into()),
        }
    }

    /// Text of the message, if the content is plain text.
    pub fn text(&self) -> Option<&str> {
        self.content.as_str()
    }
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// Gateway-level tool directive, in the OpenAI tool-call shape.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolCall {
    #[serde(rename = "type", default = "default_tool_type")]
    pub kind: String,
    pub function: ToolFunction,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolFunction {
    pub name: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Chat completion request. Only the fields the gateway acts on are typed;
/// everything else (temperature, max_tokens, ...) rides along in `other`
/// and reaches the upstream untouched.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolCall>>,

    #[serde(flatten)]
    pub other: Value,
}

/// What a tool returns: the rewritten prompt plus any auxiliary fields the
/// tool wants surfaced in the response metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolOutput {
    pub prompt: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolOutput {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            extra: Map::new(),
        }
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}
