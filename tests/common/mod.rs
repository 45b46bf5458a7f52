// Shared helpers for the integration tests
#![allow(dead_code)]

pub mod mock_upstream;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use toolgate::config::{GatewayConfig, ModelConfig, ModelKind};
use toolgate::protocol::ToolOutput;
use toolgate::tools::{ToolContext, ToolError, ToolProvider};

/// Gateway config with two language models (one keyed, one open) and an
/// embeddings model, all pointed at the mock upstream.
pub fn test_config(upstream_base: &str, api_keys: Vec<String>) -> GatewayConfig {
    GatewayConfig {
        host: "127.0.0.1".to_string(),
        port: 8080,
        api_keys,
        models: vec![
            ModelConfig {
                name: "mock-llm".to_string(),
                base_url: format!("{}/", upstream_base),
                api_key: "upstream-key".to_string(),
                kind: ModelKind::LanguageModel,
            },
            ModelConfig {
                name: "mock-llm-open".to_string(),
                base_url: format!("{}/", upstream_base),
                api_key: String::new(),
                kind: ModelKind::LanguageModel,
            },
            ModelConfig {
                name: "mock-embed".to_string(),
                base_url: format!("{}/", upstream_base),
                api_key: String::new(),
                kind: ModelKind::Embeddings,
            },
        ],
        upstream_timeout_secs: 20,
        max_payload_size: 4 * 1024 * 1024,
        log_dir: None,
        log_level: "info".to_string(),
        json_logs: false,
        request_id_headers: None,
    }
}

/// Params observed by a [`RecordingTool`], shared with the test body.
pub type SeenParams = Arc<Mutex<Vec<Map<String, Value>>>>;

/// Tool that records the parameters it was called with and rewrites the
/// conversation to a fixed prompt.
pub struct RecordingTool {
    prompt: String,
    seen: SeenParams,
}

impl RecordingTool {
    pub fn new(prompt: &str) -> (Self, SeenParams) {
        let seen: SeenParams = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                prompt: prompt.to_string(),
                seen: seen.clone(),
            },
            seen,
        )
    }
}

#[async_trait]
impl ToolProvider for RecordingTool {
    async fn get_prompt(
        &self,
        _ctx: &ToolContext<'_>,
        params: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        self.seen
            .lock()
            .expect("params mutex poisoned")
            .push(params.clone());
        Ok(ToolOutput::new(self.prompt.clone()))
    }
}

/// Tool that always fails with the given message.
pub struct FailingTool {
    pub message: String,
}

#[async_trait]
impl ToolProvider for FailingTool {
    async fn get_prompt(
        &self,
        _ctx: &ToolContext<'_>,
        _params: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        Err(ToolError::Failed(self.message.clone()))
    }
}

/// Tool that attaches extra fields to its metadata entry.
pub struct AnnotatingTool;

#[async_trait]
impl ToolProvider for AnnotatingTool {
    async fn get_prompt(
        &self,
        _ctx: &ToolContext<'_>,
        _params: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::new("annotated prompt")
            .with_extra("sources", json!(["alpha.txt", "beta.txt"])))
    }
}
