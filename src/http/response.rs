//! Outbound response description.
//!
//! # Responsibilities
//! - Relay a backend response minus connection-management headers
//! - Build the JSON error envelopes for backend errors and local failures
//! - Render into an axum response, keeping the backend's reason phrase
//!
//! # Design Decisions
//! - Bodies are fully buffered; the reply is one chunk
//! - The shim re-frames every response, so `Connection` and
//!   `Transfer-Encoding` from the backend are never relayed

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use hyper::ext::ReasonPhrase;

use crate::http::headers::is_connection_managed;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Status, reason, headers and buffered body returned to the client.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub status: StatusCode,
    pub reason: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ForwardedResponse {
    /// Pass a backend response through, dropping `Connection` and
    /// `Transfer-Encoding`.
    pub fn relay(status: StatusCode, reason: String, backend_headers: &HeaderMap, body: Bytes) -> Self {
        let mut headers = HeaderMap::with_capacity(backend_headers.len());
        for (name, value) in backend_headers {
            if !is_connection_managed(name.as_str()) {
                headers.append(name.clone(), value.clone());
            }
        }
        Self {
            status,
            reason,
            headers,
            body,
        }
    }

    /// Backend answered with an error status: keep the status line, replace
    /// the body with `{"error": "<reason>"}`.
    pub fn backend_error(status: StatusCode, reason: String) -> Self {
        let body = error_body(&reason);
        Self::json(status, reason, body)
    }

    /// Local or transport failure: 500 with the error text.
    pub fn internal_error(message: &str) -> Self {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        Self::json(status, reason, error_body(&format!("Internal Server Error: {message}")))
    }

    fn json(status: StatusCode, reason: String, body: Bytes) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Self {
            status,
            reason,
            headers,
            body,
        }
    }

    /// `"404 Not Found"`.
    pub fn status_line(&self) -> String {
        if self.reason.is_empty() {
            self.status.as_u16().to_string()
        } else {
            format!("{} {}", self.status.as_u16(), self.reason)
        }
    }
}

impl IntoResponse for ForwardedResponse {
    fn into_response(self) -> axum::response::Response {
        let custom_reason = !self.reason.is_empty()
            && self.status.canonical_reason() != Some(self.reason.as_str());
        let phrase = if custom_reason {
            ReasonPhrase::try_from(self.reason.as_bytes()).ok()
        } else {
            None
        };

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        if let Some(phrase) = phrase {
            response.extensions_mut().insert(phrase);
        }
        response
    }
}

/// `{"error": "<message>"}` with the message JSON-escaped.
pub fn error_body(message: &str) -> Bytes {
    let escaped = serde_json::Value::String(message.to_string()).to_string();
    Bytes::from(format!("{{\"error\": {escaped}}}"))
}
