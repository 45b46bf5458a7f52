use serde_json::{Value, json};
use std::collections::HashMap;

use crate::config::{ModelConfig, ModelKind};

/// A configured upstream endpoint, resolved once per request before the
/// tool pipeline runs.
#[derive(Debug, Clone)]
pub struct UpstreamModel {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub kind: ModelKind,
}

impl UpstreamModel {
    pub fn is_language_model(&self) -> bool {
        self.kind == ModelKind::LanguageModel
    }

    pub fn chat_completions_url(&self) -> String {
        format!("{}chat/completions", self.base_url)
    }
}

/// Name -> upstream table, built from config at startup and read-only
/// afterwards. Listing order follows the config file.
pub struct ModelRegistry {
    models: Vec<UpstreamModel>,
    index: HashMap<String, usize>,
}

impl ModelRegistry {
    pub fn from_config(configs: &[ModelConfig]) -> Self {
        let mut models = Vec::with_capacity(configs.len());
        let mut index = HashMap::with_capacity(configs.len());
        for config in configs {
            index.insert(config.name.clone(), models.len());
            models.push(UpstreamModel {
                name: config.name.clone(),
                base_url: config.base_url.clone(),
                api_key: config.api_key.clone(),
                kind: config.kind,
            });
        }
        Self { models, index }
    }

    pub fn get(&self, name: &str) -> Option<&UpstreamModel> {
        self.index.get(name).map(|&i| &self.models[i])
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// OpenAI-style model listing.
    pub fn list(&self) -> Value {
        let data: Vec<Value> = self
            .models
            .iter()
            .map(|m| {
                json!({
                    "id": m.name,
                    "object": "model",
                    "owned_by": "toolgate",
                    "type": m.kind.as_str(),
                })
            })
            .collect();
        json!({"object": "list", "data": data})
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModelRegistry {
        ModelRegistry::from_config(&[
            ModelConfig {
                name: "llama".to_string(),
                base_url: "http://127.0.0.1:9000/v1/".to_string(),
                api_key: "up-key".to_string(),
                kind: ModelKind::LanguageModel,
            },
            ModelConfig {
                name: "embed".to_string(),
                base_url: "http://127.0.0.1:9001/v1/".to_string(),
                api_key: String::new(),
                kind: ModelKind::Embeddings,
            },
        ])
    }

    #[test]
    fn test_lookup() {
        let registry = registry();
        assert_eq!(registry.len(), 2);
        let llama = registry.get("llama").unwrap();
        assert!(llama.is_language_model());
        assert_eq!(
            llama.chat_completions_url(),
            "http://127.0.0.1:9000/v1/chat/completions"
        );
        assert!(!registry.get("embed").unwrap().is_language_model());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_list_preserves_config_order() {
        let listing = registry().list();
        assert_eq!(listing["object"], "list");
        let data = listing["data"].as_array().unwrap();
        assert_eq!(data[0]["id"], "llama");
        assert_eq!(data[0]["type"], "text-generation");
        assert_eq!(data[1]["id"], "embed");
        assert_eq!(data[1]["type"], "text-embeddings");
    }
}
