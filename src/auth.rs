use actix_web::HttpRequest;
use actix_web::http::header;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use sha2::{Digest, Sha256};

use crate::error::GatewayError;

/// User identity when authentication is disabled.
pub const NO_AUTH_USER: &str = "no-auth";

/// Derive a short opaque user id from an API key: sha256, url-safe base64,
/// alphanumerics only, first 16 chars, lowercased. Stable across restarts
/// and never reversible to the key.
pub fn encode_user_id(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let encoded = URL_SAFE.encode(digest);
    encoded
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(16)
        .collect::<String>()
        .to_lowercase()
}

/// Bearer-key check shared by all authenticated endpoints.
pub struct AuthValidator {
    keys: Vec<String>,
}

impl AuthValidator {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }

    pub fn enabled(&self) -> bool {
        !self.keys.is_empty()
    }

    /// Returns the caller's opaque user id, or a 403 error.
    pub fn check(&self, req: &HttpRequest) -> Result<String, GatewayError> {
        if !self.enabled() {
            return Ok(NO_AUTH_USER.to_string());
        }

        let header = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(GatewayError::InvalidApiKey)?;
        let key = header
            .strip_prefix("Bearer ")
            .ok_or(GatewayError::InvalidApiKey)?;

        if self.keys.iter().any(|k| k == key) {
            Ok(encode_user_id(key))
        } else {
            Err(GatewayError::InvalidApiKey)
        }
    }
}
