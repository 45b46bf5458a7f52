use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use bytes::Bytes;
use serde_json::{Value, json};

/// Everything that can go wrong between accepting a request and handing
/// back a response. Upstream failures keep the upstream's own status and
/// body; all other variants render an OpenAI-style error object.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    #[error("Model '{0}' is not a language model")]
    ModelTypeMismatch(String),

    #[error("Tool '{0}' not found")]
    ToolNotFound(String),

    #[error("Tool '{name}' failed: {message}")]
    ToolExecutionFailed { name: String, message: String },

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Upstream returned status {status}")]
    Upstream { status: u16, body: Bytes },

    #[error("Upstream request failed: {0}")]
    UpstreamConnect(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ModelTypeMismatch(_) => StatusCode::BAD_REQUEST,
            GatewayError::ToolNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ToolExecutionFailed { .. } => StatusCode::BAD_REQUEST,
            GatewayError::InvalidApiKey => StatusCode::FORBIDDEN,
            GatewayError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            GatewayError::UpstreamConnect(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::ModelNotFound(_) => "model_not_found",
            GatewayError::ModelTypeMismatch(_) => "model_not_language",
            GatewayError::ToolNotFound(_) => "tool_not_found",
            GatewayError::ToolExecutionFailed { .. } => "tool_error",
            GatewayError::InvalidApiKey => "invalid_api_key",
            GatewayError::Upstream { .. } => "upstream_error",
            GatewayError::UpstreamConnect(_) => "upstream_unreachable",
            GatewayError::Internal(_) => "internal_error",
        }
    }
}

/// OpenAI-style error body.
pub fn error_body(status: StatusCode, code: &str, message: impl Into<String>) -> Value {
    json!({
        "error": {
            "message": message.into(),
            "type": status_type(status),
            "code": code,
        }
    })
}

fn status_type(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::REQUEST_TIMEOUT => "request_timeout",
        StatusCode::PAYLOAD_TOO_LARGE => "payload_too_large",
        StatusCode::UNPROCESSABLE_ENTITY => "unprocessable_entity",
        StatusCode::TOO_MANY_REQUESTS => "too_many_requests",
        StatusCode::INTERNAL_SERVER_ERROR => "internal_server_error",
        StatusCode::NOT_IMPLEMENTED => "not_implemented",
        StatusCode::BAD_GATEWAY => "bad_gateway",
        StatusCode::SERVICE_UNAVAILABLE => "service_unavailable",
        StatusCode::GATEWAY_TIMEOUT => "gateway_timeout",
        _ => "unknown_status_code",
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        self.status()
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            // The upstream already produced an error document; hand it back
            // with its original status instead of re-wrapping it.
            GatewayError::Upstream { body, .. } => HttpResponse::build(self.status())
                .content_type("application/json")
                .body(body.clone()),
            _ => HttpResponse::build(self.status())
                .json(error_body(self.status(), self.code(), self.to_string())),
        }
    }
}
