use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use actix_web::http::header::CONTENT_TYPE;
use bytes::Bytes;
use futures_util::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::error::GatewayError;
use crate::protocol::ChatRequest;
use crate::registry::UpstreamModel;
use crate::stream::rewrite_first_event;

/// Shared upstream client. Connect and read are bounded per operation
/// rather than per request, so long-lived streams outlive the timeout as
/// long as bytes keep arriving.
pub fn build_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .pool_idle_timeout(Some(Duration::from_secs(50)))
        .connect_timeout(Duration::from_secs(timeout_secs))
        .read_timeout(Duration::from_secs(timeout_secs))
        .build()
}

async fn post_upstream(
    client: &reqwest::Client,
    model: &UpstreamModel,
    request: &ChatRequest,
) -> Result<reqwest::Response, GatewayError> {
    let url = model.chat_completions_url();
    debug!(url = %url, "forwarding request upstream");
    let mut builder = client.post(&url).json(request);
    if !model.api_key.is_empty() {
        builder = builder.bearer_auth(&model.api_key);
    }
    builder
        .send()
        .await
        .map_err(|e| GatewayError::UpstreamConnect(e.to_string()))
}

/// Read the upstream error body so the caller can hand it back verbatim.
async fn upstream_error(res: reqwest::Response) -> GatewayError {
    let status = res.status().as_u16();
    let body = res.bytes().await.unwrap_or_else(|_| Bytes::new());
    GatewayError::Upstream { status, body }
}

fn gateway_status(status: u16) -> Result<StatusCode, GatewayError> {
    StatusCode::from_u16(status)
        .map_err(|e| GatewayError::Internal(format!("invalid upstream status: {}", e)))
}

/// Buffered path: decode the whole upstream response, attach metadata, hand
/// it back as one JSON document.
pub async fn send_buffered(
    client: &reqwest::Client,
    model: &UpstreamModel,
    request: &ChatRequest,
    metadata: Vec<Value>,
) -> Result<HttpResponse, GatewayError> {
    let res = post_upstream(client, model, request).await?;
    if !res.status().is_success() {
        return Err(upstream_error(res).await);
    }

    let status = res.status().as_u16();
    let body = res
        .bytes()
        .await
        .map_err(|e| GatewayError::UpstreamConnect(e.to_string()))?;
    let mut data: Value = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::Internal(format!("upstream sent invalid JSON: {}", e)))?;
    if let Some(map) = data.as_object_mut() {
        map.insert("metadata".to_string(), Value::Array(metadata));
    }

    Ok(HttpResponse::build(gateway_status(status)?).json(data))
}

/// Streaming path: commit the upstream status, then hand the byte stream
/// through the first-event rewriter. Upstream failures detected before any
/// byte is forwarded still fail the whole request.
pub async fn send_streaming(
    client: &reqwest::Client,
    model: &UpstreamModel,
    request: &ChatRequest,
    metadata: Vec<Value>,
) -> Result<HttpResponse, GatewayError> {
    let res = post_upstream(client, model, request).await?;
    if !res.status().is_success() {
        return Err(upstream_error(res).await);
    }

    let status = res.status().as_u16();
    let upstream = Box::pin(
        res.bytes_stream()
            .map(|r| r.map_err(actix_web::error::ErrorBadGateway)),
    );

    Ok(HttpResponse::build(gateway_status(status)?)
        .insert_header((CONTENT_TYPE, "text/event-stream"))
        .streaming(rewrite_first_event(upstream, metadata)))
}
