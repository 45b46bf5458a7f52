use actix_web::{
    Error, HttpMessage, HttpRequest,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

const ID_CHARS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate an OpenAI-style request ID for the endpoint.
fn generate_request_id(path: &str) -> String {
    let prefix = if path.contains("/chat/completions") {
        "chatcmpl-"
    } else {
        "req-"
    };

    let random_part: String = (0..24)
        .map(|_| {
            ID_CHARS
                .chars()
                .nth(rand::random::<u32>() as usize % ID_CHARS.len())
                .unwrap_or('0')
        })
        .collect();

    format!("{}{}", prefix, random_part)
}

/// Request ID stashed by the middleware, or a fresh one if the request
/// never passed through it.
pub fn get_request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<String>()
        .cloned()
        .unwrap_or_else(|| generate_request_id(req.path()))
}

/// Injects a request ID into request extensions, honoring configured
/// inbound headers before generating one.
pub struct RequestIdMiddleware {
    headers: Vec<String>,
}

impl RequestIdMiddleware {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdMiddlewareService {
            service,
            headers: self.headers.clone(),
        }))
    }
}

pub struct RequestIdMiddlewareService<S> {
    service: S,
    headers: Vec<String>,
}

impl<S, B> Service<ServiceRequest> for RequestIdMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let mut request_id = None;

        for header_name in &self.headers {
            if let Some(header_value) = req.headers().get(header_name) {
                if let Ok(value) = header_value.to_str() {
                    request_id = Some(value.to_string());
                    break;
                }
            }
        }

        let request_id = request_id.unwrap_or_else(|| generate_request_id(req.path()));
        req.extensions_mut().insert(request_id);

        let fut = self.service.call(req);
        Box::pin(async move { fut.await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_request_id_prefixes() {
        let id = generate_request_id("/v1/chat/completions");
        assert!(id.starts_with("chatcmpl-"));
        assert_eq!(id.len(), "chatcmpl-".len() + 24);

        let id = generate_request_id("/v1/models");
        assert!(id.starts_with("req-"));
    }

    #[test]
    fn test_request_ids_are_random() {
        let a = generate_request_id("/v1/chat/completions");
        let b = generate_request_id("/v1/chat/completions");
        assert_ne!(a, b);
    }
}
