//! Request forwarding to the backend.
//!
//! # Responsibilities
//! - Build the loopback URL from the inbound path and query
//! - Translate `HTTP_*` variables back into request headers
//! - Attach the declared body for POST/PUT/PATCH
//! - Bound the whole round trip with one timeout
//! - Map the outcome onto a relayed response or a JSON error envelope
//!
//! # Design Decisions
//! - No retries, no pooling: every request opens its own connection
//! - Status >= 400 from the backend is an error outcome, not a failure
//! - Any failure collapses to a 500 carrying the error text

use std::error::Error as StdError;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::uri::InvalidUri;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::ext::ReasonPhrase;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;

use crate::config::ForwarderConfig;
use crate::http::headers::{encode_latin1, is_connection_managed};
use crate::http::request::{InboundRequest, CONTENT_TYPE_VAR};
use crate::http::response::ForwardedResponse;

/// Error type for one forwarding attempt.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("invalid backend url {url:?}")]
    Url {
        url: String,
        #[source]
        source: InvalidUri,
    },

    #[error("invalid header {0:?}")]
    Header(String),

    #[error("failed to build backend request")]
    Request(#[from] axum::http::Error),

    #[error("backend request failed")]
    Transport(#[from] hyper_util::client::legacy::Error),

    #[error("failed to read backend response")]
    Response(#[from] hyper::Error),

    #[error("backend did not respond within {0:?}")]
    Timeout(Duration),
}

impl ForwardError {
    /// The error followed by each of its sources, joined with `": "`.
    pub fn chain(&self) -> String {
        let mut text = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

/// Where the backend listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    host: String,
    port: u16,
}

impl BackendTarget {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `http://<host>:<port><path>[?<query>]`, path and query untouched.
    pub fn url_for(&self, path: &str, query: &str) -> String {
        let mut url = format!("http://{}:{}{}", self.host, self.port, path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

/// What the backend sent back, fully buffered.
#[derive(Debug)]
struct BackendReply {
    status: StatusCode,
    reason: String,
    headers: HeaderMap,
    body: Bytes,
}

/// Relays inbound requests to the backend over loopback HTTP.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Full<Bytes>>,
    target: BackendTarget,
    timeout: Duration,
    forward_content_headers: bool,
    preserve_error_body: bool,
}

impl Forwarder {
    pub fn new(config: &ForwarderConfig, port: u16) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(0)
            .http1_title_case_headers(true)
            .build(HttpConnector::new());

        Self {
            client,
            target: BackendTarget::new(config.host.clone(), port),
            timeout: config.timeout(),
            forward_content_headers: config.forward_content_headers,
            preserve_error_body: config.preserve_error_body,
        }
    }

    pub fn target(&self) -> &BackendTarget {
        &self.target
    }

    /// Forward one request and always produce a response.
    pub async fn forward(&self, request: InboundRequest) -> ForwardedResponse {
        match self.exchange(request).await {
            Ok(reply) if reply.status.as_u16() >= 400 => self.error_reply(reply),
            Ok(reply) => ForwardedResponse::relay(reply.status, reply.reason, &reply.headers, reply.body),
            Err(e) => {
                let message = e.chain();
                tracing::error!(error = %message, "Forwarding failed");
                ForwardedResponse::internal_error(&message)
            }
        }
    }

    fn error_reply(&self, reply: BackendReply) -> ForwardedResponse {
        tracing::debug!(status = reply.status.as_u16(), reason = %reply.reason, "Backend returned an error status");
        if !self.preserve_error_body {
            return ForwardedResponse::backend_error(reply.status, reply.reason);
        }

        let mut headers = HeaderMap::new();
        if let Some(content_type) = reply.headers.get(header::CONTENT_TYPE) {
            headers.insert(header::CONTENT_TYPE, content_type.clone());
        }
        ForwardedResponse {
            status: reply.status,
            reason: reply.reason,
            headers,
            body: reply.body,
        }
    }

    async fn exchange(&self, mut request: InboundRequest) -> Result<BackendReply, ForwardError> {
        let url = self.target.url_for(request.path(), request.query());
        let uri: Uri = url
            .parse()
            .map_err(|source| ForwardError::Url { url: url.clone(), source })?;
        let headers = self.outbound_headers(&request)?;

        let body = match request.read_body().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(error = %e, "Forwarding without request body");
                None
            }
        };

        let mut outbound = Request::builder()
            .method(request.method().clone())
            .uri(uri)
            .body(Full::new(body.unwrap_or_default()))?;
        *outbound.headers_mut() = headers;

        tracing::debug!(url = %url, "Forwarding to backend");

        let round_trip = async {
            let response = self.client.request(outbound).await?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await?.to_bytes();
            let reason = reason_phrase(parts.status, parts.extensions.get::<ReasonPhrase>());
            Ok::<_, ForwardError>(BackendReply {
                status: parts.status,
                reason,
                headers: parts.headers,
                body,
            })
        };

        tokio::time::timeout(self.timeout, round_trip)
            .await
            .map_err(|_| ForwardError::Timeout(self.timeout))?
    }

    fn outbound_headers(&self, request: &InboundRequest) -> Result<HeaderMap, ForwardError> {
        let mut headers = HeaderMap::new();
        for (name, value) in request.forwarded_headers() {
            if is_connection_managed(&name) {
                continue;
            }
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ForwardError::Header(name.clone()))?;
            let header_value = encode_latin1(value)
                .and_then(|bytes| HeaderValue::from_bytes(&bytes).ok())
                .ok_or(ForwardError::Header(name))?;
            headers.insert(header_name, header_value);
        }

        if self.forward_content_headers {
            if let Some(content_type) = request.var(CONTENT_TYPE_VAR) {
                let value = encode_latin1(content_type)
                    .and_then(|bytes| HeaderValue::from_bytes(&bytes).ok())
                    .ok_or_else(|| ForwardError::Header(header::CONTENT_TYPE.to_string()))?;
                headers.insert(header::CONTENT_TYPE, value);
            }
        }

        Ok(headers)
    }
}

/// The phrase the backend sent, falling back to the canonical one.
fn reason_phrase(status: StatusCode, sent: Option<&ReasonPhrase>) -> String {
    sent.and_then(|phrase| std::str::from_utf8(phrase.as_bytes()).ok())
        .or_else(|| status.canonical_reason())
        .unwrap_or_default()
        .to_string()
}
