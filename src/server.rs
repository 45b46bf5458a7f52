use actix_web::{
    App, Error, HttpRequest, HttpResponse, HttpServer, error, get, post, web,
};
use futures_util::StreamExt;
use tracing::{error, info};

use crate::auth::AuthValidator;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, error_body};
use crate::forward;
use crate::middleware::{RequestIdMiddleware, get_request_id};
use crate::pipeline;
use crate::protocol::ChatRequest;
use crate::registry::ModelRegistry;
use crate::tools::{ToolContext, ToolRegistry};

/// Shared, read-only state behind every handler.
pub struct AppState {
    pub models: ModelRegistry,
    pub tools: ToolRegistry,
    pub auth: AuthValidator,
    pub client: reqwest::Client,
}

impl AppState {
    pub fn new(config: &GatewayConfig) -> anyhow::Result<Self> {
        let client = forward::build_client(config.upstream_timeout_secs)?;
        Ok(Self {
            models: ModelRegistry::from_config(&config.models),
            tools: ToolRegistry::builtin(),
            auth: AuthValidator::new(config.api_keys.clone()),
            client,
        })
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }
}

#[get("/health")]
pub async fn health(_req: HttpRequest) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/v1/models")]
pub async fn v1_models(
    req: HttpRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.auth.check(&req)?;
    Ok(HttpResponse::Ok().json(data.models.list()))
}

async fn handle_chat_completions(
    req: HttpRequest,
    request: ChatRequest,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let user = data.auth.check(&req)?;
    let request_id = get_request_id(&req);

    // The upstream target is fixed here, before any tool runs; later
    // rewrites of the model field do not retarget the forward.
    let model = data
        .models
        .get(&request.model)
        .ok_or_else(|| GatewayError::ModelNotFound(request.model.clone()))?;
    if !model.is_language_model() {
        return Err(GatewayError::ModelTypeMismatch(request.model.clone()).into());
    }

    info!(
        request_id = %request_id,
        model = %request.model,
        stream = request.stream,
        tools = request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
        "chat completion request"
    );

    let ctx = ToolContext {
        models: &data.models,
        user: &user,
    };
    let out = pipeline::run(&data.tools, &ctx, request).await?;

    let response = if out.request.stream {
        forward::send_streaming(&data.client, model, &out.request, out.metadata).await?
    } else {
        forward::send_buffered(&data.client, model, &out.request, out.metadata).await?
    };
    Ok(response)
}

#[post("/v1/chat/completions")]
pub async fn v1_chat_completions(
    req: HttpRequest,
    request: web::Json<ChatRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    handle_chat_completions(req, request.into_inner(), data).await
}

#[post("/chat/completions")]
pub async fn chat_completions(
    req: HttpRequest,
    request: web::Json<ChatRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    handle_chat_completions(req, request.into_inner(), data).await
}

/// Default handler for unmatched routes.
async fn sink_handler(_req: HttpRequest, mut payload: web::Payload) -> Result<HttpResponse, Error> {
    // Drain the payload so the connection can be reused.
    while let Some(chunk) = payload.next().await {
        if chunk.is_err() {
            break;
        }
    }
    Ok(HttpResponse::NotFound().finish())
}

fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> Error {
    error!("JSON payload error: {:?}", err);
    let (status, message) = match &err {
        error::JsonPayloadError::OverflowKnownLength { length, limit } => (
            actix_web::http::StatusCode::PAYLOAD_TOO_LARGE,
            format!("Payload too large: {} bytes exceeds limit of {} bytes", length, limit),
        ),
        error::JsonPayloadError::Overflow { limit } => (
            actix_web::http::StatusCode::PAYLOAD_TOO_LARGE,
            format!("Payload exceeds limit of {} bytes", limit),
        ),
        other => (
            actix_web::http::StatusCode::BAD_REQUEST,
            format!("Invalid JSON payload: {}", other),
        ),
    };
    let body = error_body(status, "invalid_request", message);
    error::InternalError::from_response(
        err,
        HttpResponse::build(status).json(body),
    )
    .into()
}

pub async fn startup(config: GatewayConfig) -> anyhow::Result<()> {
    let app_state = web::Data::new(AppState::new(&config)?);

    let request_id_headers = config
        .request_id_headers
        .clone()
        .unwrap_or_else(|| vec!["x-request-id".to_string()]);

    info!("Starting toolgate on {}:{}", config.host, config.port);
    info!(
        "Serving {} model(s), {} tool(s)",
        app_state.models.len(),
        app_state.tools.len()
    );
    if app_state.auth.enabled() {
        info!("API key authentication enabled");
    } else {
        info!("API key authentication disabled");
    }

    let max_payload_size = config.max_payload_size;
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(RequestIdMiddleware::new(request_id_headers.clone()))
            .app_data(app_state.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(max_payload_size)
                    .error_handler(json_error_handler),
            )
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .service(health)
            .service(v1_models)
            .service(v1_chat_completions)
            .service(chat_completions)
            .default_service(web::route().to(sink_handler))
    })
    .bind((config.host.clone(), config.port))?
    .run()
    .await?;

    Ok(())
}
