//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (CGI-style description: HTTP_* variables, raw path/query)
//!     → forwarder.rs (loopback request to the backend, one bounded wait)
//!     → response.rs (relay or JSON error envelope, reason phrase kept)
//!     → Send to client
//! ```

pub mod forwarder;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use forwarder::{BackendTarget, ForwardError, Forwarder};
pub use request::{BodyError, InboundRequest, RequestIdGenerator, X_REQUEST_ID};
pub use response::ForwardedResponse;
pub use server::HttpServer;
