use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("Invalid value for field '{field}': {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required field: {field}")]
    MissingRequired { field: String },

    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    FileParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// What an upstream endpoint serves. Only language models accept chat
/// completions; embeddings models exist so tools can resolve them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ModelKind {
    #[serde(rename = "text-generation")]
    LanguageModel,
    #[serde(rename = "text-embeddings")]
    Embeddings,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::LanguageModel => "text-generation",
            ModelKind::Embeddings => "text-embeddings",
        }
    }
}

fn default_model_kind() -> ModelKind {
    ModelKind::LanguageModel
}

/// One upstream model entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Public name clients request
    pub name: String,

    /// Upstream API base URL; must end with '/'
    pub base_url: String,

    /// API key sent to the upstream as a bearer token
    #[serde(default)]
    pub api_key: String,

    /// What the upstream serves (default: text-generation)
    #[serde(rename = "type", default = "default_model_kind")]
    pub kind: ModelKind,
}

/// Gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayConfig {
    /// Host address to bind (default: 127.0.0.1)
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (default: 8080)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Keys clients may authenticate with; empty disables authentication
    #[serde(default)]
    pub api_keys: Vec<String>,

    /// Upstream models served by this gateway
    #[serde(default)]
    pub models: Vec<ModelConfig>,

    /// Per-operation timeout for upstream requests in seconds (default: 20)
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Maximum inbound payload size in bytes (default: 4MB)
    #[serde(default = "default_max_payload_size")]
    pub max_payload_size: usize,

    /// Directory to store log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Log level (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit logs as JSON (default: false)
    #[serde(default)]
    pub json_logs: bool,

    /// Inbound headers checked for a request ID, in order
    #[serde(default)]
    pub request_id_headers: Option<Vec<String>>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upstream_timeout_secs() -> u64 {
    20
}

fn default_max_payload_size() -> usize {
    4 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_keys: Vec::new(),
            models: Vec::new(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            max_payload_size: default_max_payload_size(),
            log_dir: None,
            log_level: default_log_level(),
            json_logs: false,
            request_id_headers: None,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::FileParse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }

        if self.models.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "models".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name.is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: "models[].name".to_string(),
                });
            }
            if !seen.insert(model.name.as_str()) {
                return Err(ConfigError::ValidationFailed {
                    reason: format!("duplicate model name '{}'", model.name),
                });
            }
            if !model.base_url.starts_with("http://") && !model.base_url.starts_with("https://") {
                return Err(ConfigError::InvalidValue {
                    field: "models[].base_url".to_string(),
                    value: model.base_url.clone(),
                    reason: "must start with http:// or https://".to_string(),
                });
            }
            // Upstream paths are appended directly to the base URL.
            if !model.base_url.ends_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: "models[].base_url".to_string(),
                    value: model.base_url.clone(),
                    reason: "must end with '/'".to_string(),
                });
            }
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ConfigError::InvalidValue {
                    field: "log_level".to_string(),
                    value: other.to_string(),
                    reason: "expected one of trace, debug, info, warn, error".to_string(),
                });
            }
        }

        if self.max_payload_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_payload_size".to_string(),
                value: "0".to_string(),
                reason: "payload limit must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
