//! Inbound request description.
//!
//! # Responsibilities
//! - Generate a request ID (UUID v4) when the client sent none
//! - Translate a wire request into the CGI-style description the forwarder
//!   consumes: method, raw path, raw query, variables, body stream
//! - Read the declared request body for body-bearing methods
//!
//! # Design Decisions
//! - Path and query are kept exactly as received
//! - `Content-Type`/`Content-Length` are exposed as `CONTENT_TYPE` and
//!   `CONTENT_LENGTH`, every other header as `HTTP_<NAME>`
//! - Header values are decoded as latin-1, so non-UTF-8 bytes are kept
//! - Body read failures are returned, never swallowed here

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request};
use http_body_util::BodyExt;
use thiserror::Error;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::http::headers::{decode_latin1, header_for_variable, variable_for_header};

pub const X_REQUEST_ID: &str = "x-request-id";
pub const CONTENT_TYPE_VAR: &str = "CONTENT_TYPE";
pub const CONTENT_LENGTH_VAR: &str = "CONTENT_LENGTH";

/// Methods whose body is forwarded.
const BODY_METHODS: [Method; 3] = [Method::POST, Method::PUT, Method::PATCH];

/// Cap on the up-front allocation for a declared body.
const INITIAL_BODY_CAPACITY: usize = 64 * 1024;

/// Assigns `x-request-id: <uuid v4>` to requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdGenerator;

impl MakeRequestId for RequestIdGenerator {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Why a request body could not be read.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("invalid content length {0:?}")]
    InvalidLength(String),

    #[error("failed to read request body")]
    Read(#[source] axum::Error),
}

/// One inbound request, as handed to the forwarder.
#[derive(Debug)]
pub struct InboundRequest {
    method: Method,
    path: String,
    query: String,
    environ: BTreeMap<String, String>,
    body: Body,
}

impl InboundRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: String::new(),
            environ: BTreeMap::new(),
            body: Body::empty(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environ.insert(key.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Describe a wire request the way a CGI host would.
    pub fn from_http(request: Request<Body>) -> Self {
        let (parts, body) = request.into_parts();
        let mut environ = BTreeMap::new();

        for (name, value) in parts.headers.iter() {
            let key = if name == header::CONTENT_TYPE {
                CONTENT_TYPE_VAR.to_string()
            } else if name == header::CONTENT_LENGTH {
                CONTENT_LENGTH_VAR.to_string()
            } else {
                variable_for_header(name)
            };
            let value = decode_latin1(value.as_bytes());

            match environ.entry(key) {
                Entry::Occupied(mut existing) => {
                    let joined: &mut String = existing.get_mut();
                    joined.push(',');
                    joined.push_str(&value);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
            }
        }

        Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query: parts.uri.query().unwrap_or_default().to_string(),
            environ,
            body,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn var(&self, key: &str) -> Option<&str> {
        self.environ.get(key).map(String::as_str)
    }

    /// Every `HTTP_*` variable as a `(Header-Name, value)` pair.
    pub fn forwarded_headers(&self) -> impl Iterator<Item = (String, &str)> + '_ {
        self.environ
            .iter()
            .filter_map(|(key, value)| header_for_variable(key).map(|name| (name, value.as_str())))
    }

    pub fn carries_body(&self) -> bool {
        BODY_METHODS.contains(&self.method)
    }

    /// Read up to `CONTENT_LENGTH` bytes for POST/PUT/PATCH.
    ///
    /// Other methods, a zero or missing length, and an empty stream all
    /// yield `Ok(None)`. The body stream is consumed either way.
    pub async fn read_body(&mut self) -> Result<Option<Bytes>, BodyError> {
        if !self.carries_body() {
            return Ok(None);
        }

        let declared = match self.var(CONTENT_LENGTH_VAR).map(str::trim) {
            None | Some("") => 0,
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| BodyError::InvalidLength(raw.to_string()))?,
        };
        if declared == 0 {
            return Ok(None);
        }

        let limit = usize::try_from(declared).unwrap_or(usize::MAX);
        let mut body = std::mem::take(&mut self.body);
        let mut buf = Vec::with_capacity(limit.min(INITIAL_BODY_CAPACITY));

        while buf.len() < limit {
            let Some(frame) = body.frame().await else {
                break;
            };
            let frame = frame.map_err(BodyError::Read)?;
            if let Ok(data) = frame.into_data() {
                let take = (limit - buf.len()).min(data.len());
                buf.extend_from_slice(&data[..take]);
            }
        }

        Ok((!buf.is_empty()).then(|| Bytes::from(buf)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    #[test]
    fn keeps_path_and_query_verbatim() {
        let request = wire(Method::GET, "/api/items%2F7?q=a%20b&x=1")
            .body(Body::empty())
            .unwrap();
        let inbound = InboundRequest::from_http(request);

        assert_eq!(inbound.path(), "/api/items%2F7");
        assert_eq!(inbound.query(), "q=a%20b&x=1");
    }

    #[test]
    fn exposes_headers_as_cgi_variables() {
        let request = wire(Method::POST, "/")
            .header("x-custom-id", "42")
            .header("content-type", "application/json")
            .header("content-length", "2")
            .header("accept", "text/html")
            .header("accept", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let inbound = InboundRequest::from_http(request);

        assert_eq!(inbound.var("HTTP_X_CUSTOM_ID"), Some("42"));
        assert_eq!(inbound.var("CONTENT_TYPE"), Some("application/json"));
        assert_eq!(inbound.var("CONTENT_LENGTH"), Some("2"));
        assert_eq!(inbound.var("HTTP_CONTENT_TYPE"), None);
        assert_eq!(inbound.var("HTTP_ACCEPT"), Some("text/html,application/json"));
    }

    #[test]
    fn non_utf8_header_value_decodes_as_latin1() {
        let request = wire(Method::GET, "/")
            .header("x-name", HeaderValue::from_bytes(b"caf\xE9").unwrap())
            .body(Body::empty())
            .unwrap();
        let inbound = InboundRequest::from_http(request);

        assert_eq!(inbound.var("HTTP_X_NAME"), Some("caf\u{e9}"));
    }

    #[test]
    fn forwarded_headers_skip_content_variables() {
        let inbound = InboundRequest::new(Method::GET, "/")
            .with_var("HTTP_X_CUSTOM_ID", "abc")
            .with_var("CONTENT_TYPE", "text/plain")
            .with_var("CONTENT_LENGTH", "3");

        let headers: Vec<_> = inbound.forwarded_headers().collect();
        assert_eq!(headers, vec![("X-Custom-Id".to_string(), "abc")]);
    }

    #[tokio::test]
    async fn reads_exactly_declared_length() {
        let mut inbound = InboundRequest::new(Method::POST, "/")
            .with_var(CONTENT_LENGTH_VAR, "5")
            .with_body("hello world");

        let body = inbound.read_body().await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"hello"[..]));
    }

    #[tokio::test]
    async fn bodyless_methods_read_nothing() {
        let mut inbound = InboundRequest::new(Method::GET, "/")
            .with_var(CONTENT_LENGTH_VAR, "5")
            .with_body("hello");

        assert_eq!(inbound.read_body().await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_length_means_no_body() {
        let mut inbound = InboundRequest::new(Method::PUT, "/").with_body("ignored");
        assert_eq!(inbound.read_body().await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_length_is_an_error() {
        let mut inbound = InboundRequest::new(Method::PATCH, "/")
            .with_var(CONTENT_LENGTH_VAR, "ten")
            .with_body("0123456789");

        let err = inbound.read_body().await.unwrap_err();
        assert!(matches!(err, BodyError::InvalidLength(ref raw) if raw == "ten"));
    }

    #[tokio::test]
    async fn short_stream_yields_what_arrived() {
        let mut inbound = InboundRequest::new(Method::POST, "/")
            .with_var(CONTENT_LENGTH_VAR, "100")
            .with_body("abc");

        let body = inbound.read_body().await.unwrap();
        assert_eq!(body.as_deref(), Some(&b"abc"[..]));
    }

    #[test]
    fn generated_request_ids_are_uuids() {
        let request = Request::new(());
        let id = RequestIdGenerator.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(Uuid::parse_str(text).is_ok());
    }
}
