use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{ToolContext, ToolError, ToolProvider};
use crate::protocol::ToolOutput;

pub const TOOL_NAME: &str = "prompt_template";

/// Placeholder the template must carry for the current prompt.
const PROMPT_PLACEHOLDER: &str = "%(prompt)s";

const DEFAULT_TEMPLATE: &str = "%(prompt)s";

/// Rewrites the latest message through a caller-supplied template.
///
/// Parameters:
/// - `template` (optional): text containing `%(prompt)s`, replaced with the
///   last message's content. Defaults to the identity template.
pub struct PromptTemplate;

impl PromptTemplate {
    fn last_prompt(params: &Map<String, Value>) -> Result<&str, ToolError> {
        let messages = params
            .get("messages")
            .and_then(|v| v.as_array())
            .ok_or(ToolError::MissingParameter("messages"))?;
        let last = messages.last().ok_or_else(|| {
            ToolError::Failed("conversation has no messages to rewrite".to_string())
        })?;
        last.get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameter {
                param: "messages",
                reason: "last message content is not text".to_string(),
            })
    }
}

#[async_trait]
impl ToolProvider for PromptTemplate {
    async fn get_prompt(
        &self,
        _ctx: &ToolContext<'_>,
        params: &Map<String, Value>,
    ) -> Result<ToolOutput, ToolError> {
        let template = match params.get("template") {
            Some(Value::String(t)) => t.as_str(),
            Some(_) => {
                return Err(ToolError::InvalidParameter {
                    param: "template",
                    reason: "must be a string".to_string(),
                });
            }
            None => DEFAULT_TEMPLATE,
        };

        if !template.contains(PROMPT_PLACEHOLDER) {
            return Err(ToolError::InvalidParameter {
                param: "template",
                reason: format!("must contain the {} placeholder", PROMPT_PLACEHOLDER),
            });
        }

        let prompt = Self::last_prompt(params)?;
        Ok(ToolOutput::new(template.replace(PROMPT_PLACEHOLDER, prompt)))
    }
}
