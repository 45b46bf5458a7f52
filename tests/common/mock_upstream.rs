use axum::{
    Router,
    extract::{Json, State},
    http::{HeaderMap, StatusCode},
    response::sse::{Event, Sse},
    response::{IntoResponse, Response},
    routing::post,
};
use futures_util::stream;
use serde_json::{Value, json};
use std::convert::Infallible;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// Behavior knobs for the mock upstream provider.
#[derive(Clone)]
pub struct MockUpstreamConfig {
    pub port: u16,
    pub response_delay_ms: u64,
    /// Respond with this status and a fixed error body instead of a
    /// completion.
    pub fail_status: Option<u16>,
}

impl Default for MockUpstreamConfig {
    fn default() -> Self {
        Self {
            port: 0,
            response_delay_ms: 0,
            fail_status: None,
        }
    }
}

/// Fixed non-streaming completion the mock returns.
pub fn mock_completion() -> Value {
    json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "message": {
                "role": "assistant",
                "content": "This is a mock chat response."
            },
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "total_tokens": 15
        }
    })
}

/// The two streaming chunks the mock emits before `[DONE]`.
pub fn mock_stream_chunks() -> (Value, Value) {
    let first = json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1700000000,
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "delta": {"role": "assistant", "content": "Hello"},
            "finish_reason": null
        }]
    });
    let second = json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion.chunk",
        "created": 1700000000,
        "model": "mock-model",
        "choices": [{
            "index": 0,
            "delta": {"content": " world"},
            "finish_reason": "stop"
        }]
    });
    (first, second)
}

/// Error body returned when `fail_status` is set.
pub fn mock_error_body() -> Value {
    json!({
        "error": {
            "message": "Rate limit exceeded",
            "type": "too_many_requests",
            "code": "rate_limited"
        }
    })
}

struct MockUpstreamState {
    config: MockUpstreamConfig,
    hits: AtomicUsize,
    requests: RwLock<Vec<Value>>,
    auth_headers: RwLock<Vec<Option<String>>>,
}

/// Mock upstream model server for gateway tests. Records every request
/// body it receives so tests can assert on what actually went upstream.
pub struct MockUpstream {
    state: Arc<MockUpstreamState>,
    shutdown_handle: Option<tokio::task::JoinHandle<()>>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockUpstream {
    pub fn new(config: MockUpstreamConfig) -> Self {
        Self {
            state: Arc::new(MockUpstreamState {
                config,
                hits: AtomicUsize::new(0),
                requests: RwLock::new(Vec::new()),
                auth_headers: RwLock::new(Vec::new()),
            }),
            shutdown_handle: None,
            shutdown_tx: None,
        }
    }

    /// Start the server and return its base URL (no trailing slash).
    pub async fn start(&mut self) -> std::io::Result<String> {
        let listener =
            tokio::net::TcpListener::bind(("127.0.0.1", self.state.config.port)).await?;
        let addr = listener.local_addr()?;

        let app = Router::new()
            .route("/chat/completions", post(chat_completions_handler))
            .with_state(self.state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        self.shutdown_tx = Some(shutdown_tx);

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = server.await {
                eprintln!("Mock upstream error: {}", e);
            }
        });
        self.shutdown_handle = Some(handle);

        Ok(format!("http://{}", addr))
    }

    /// Number of chat completion requests the mock has served.
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Request bodies received so far, oldest first.
    pub async fn received(&self) -> Vec<Value> {
        self.state.requests.read().await.clone()
    }

    /// Authorization header values received so far, oldest first.
    pub async fn auth_headers(&self) -> Vec<Option<String>> {
        self.state.auth_headers.read().await.clone()
    }

    pub async fn stop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        if let Some(handle) = self.shutdown_handle.take() {
            let _ = tokio::time::timeout(tokio::time::Duration::from_secs(5), handle).await;
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

async fn chat_completions_handler(
    State(state): State<Arc<MockUpstreamState>>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.write().await.push(payload.clone());
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    state.auth_headers.write().await.push(auth);

    if let Some(status) = state.config.fail_status {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return (status, Json(mock_error_body())).into_response();
    }

    if state.config.response_delay_ms > 0 {
        tokio::time::sleep(tokio::time::Duration::from_millis(
            state.config.response_delay_ms,
        ))
        .await;
    }

    let is_stream = payload
        .get("stream")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    if is_stream {
        let (first, second) = mock_stream_chunks();
        let events = vec![
            Ok::<_, Infallible>(Event::default().data(first.to_string())),
            Ok(Event::default().data(second.to_string())),
            Ok(Event::default().data("[DONE]")),
        ];
        Sse::new(stream::iter(events)).into_response()
    } else {
        Json(mock_completion()).into_response()
    }
}
