pub mod template;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::ToolOutput;
use crate::registry::ModelRegistry;

/// Why a tool invocation failed. Surfaced to the client as a 400 with the
/// message attached.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: &'static str, reason: String },

    #[error("{0}")]
    Failed(String),
}

/// Shared collaborators a tool may use while building its prompt.
pub struct ToolContext<'a> {
    pub models: &'a ModelRegistry,
    /// Opaque caller identity, also injected into the tool's parameters.
    pub user: &'a str,
}

/// A named request-rewriting step. The pipeline hands each tool the full
/// request serialized as a parameter object (overlaid with the tool call's
/// own parameters and the caller's user id) and replaces the conversation
/// with whatever prompt comes back.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn get_prompt(
        &self,
        ctx: &ToolContext<'_>,
        params: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError>;
}

/// Explicit name -> provider table, built at startup. Adding a tool means
/// registering it here; there is no runtime discovery.
pub struct ToolRegistry {
    providers: HashMap<String, Arc<dyn ToolProvider>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Registry with the tools this crate ships.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(template::TOOL_NAME, Arc::new(template::PromptTemplate));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn ToolProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
