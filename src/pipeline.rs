use serde_json::{Map, Value};
use tracing::debug;

use crate::error::GatewayError;
use crate::protocol::{ChatRequest, Message, ToolCall};
use crate::tools::{ToolContext, ToolRegistry};

/// Result of running the tool pipeline: the rewritten request plus one
/// metadata entry per executed tool, in invocation order.
#[derive(Debug)]
pub struct PipelineOutput {
    pub request: ChatRequest,
    pub metadata: Vec<Value>,
}

/// Run the declared tools in order, threading each tool's prompt back into
/// the conversation. Tools see the request as it stands when they run, so
/// the second tool operates on the first tool's rewrite. The tool directive
/// itself never reaches the upstream.
pub async fn run(
    registry: &ToolRegistry,
    ctx: &ToolContext<'_>,
    mut request: ChatRequest,
) -> Result<PipelineOutput, GatewayError> {
    let calls = request.tools.clone().unwrap_or_default();

    // Resolve every declared name before anything executes. A typo in the
    // third tool must not leave the first two already run.
    let mut providers = Vec::with_capacity(calls.len());
    for call in &calls {
        let provider = registry
            .get(&call.function.name)
            .ok_or_else(|| GatewayError::ToolNotFound(call.function.name.clone()))?;
        providers.push(provider);
    }

    let mut metadata = Vec::with_capacity(calls.len());
    for (call, provider) in calls.iter().zip(providers) {
        let name = &call.function.name;
        let params = build_params(&request, call, ctx.user)?;
        debug!(tool = %name, "invoking tool");

        let output = provider.get_prompt(ctx, &params).await.map_err(|e| {
            GatewayError::ToolExecutionFailed {
                name: name.clone(),
                message: e.to_string(),
            }
        })?;

        let mut entry = Map::new();
        entry.insert(
            name.clone(),
            serde_json::to_value(&output).map_err(|e| GatewayError::Internal(e.to_string()))?,
        );
        metadata.push(Value::Object(entry));

        request.messages = vec![Message::user(output.prompt)];
    }

    request.tools = None;
    Ok(PipelineOutput { request, metadata })
}

/// Parameter object a tool sees: the current request fields, overlaid with
/// the call's declared parameters (parameters win), with the caller
/// identity inserted last (it wins over both).
fn build_params(
    request: &ChatRequest,
    call: &ToolCall,
    user: &str,
) -> Result<Map<String, Value>, GatewayError> {
    let mut params = match serde_json::to_value(request) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(e) => return Err(GatewayError::Internal(e.to_string())),
    };
    for (key, value) in &call.function.parameters {
        params.insert(key.clone(), value.clone());
    }
    params.insert("user".to_string(), Value::String(user.to_string()));
    Ok(params)
}
