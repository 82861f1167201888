//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the catch-all forwarding handler
//! - Wire up middleware (request ID, tracing)
//! - Describe each request CGI-style and hand it to the forwarder
//! - Serve until the shutdown broadcast fires

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderName,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::backend::Backend;
use crate::config::ShimConfig;
use crate::http::forwarder::Forwarder;
use crate::http::request::{InboundRequest, RequestIdGenerator, X_REQUEST_ID};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub forwarder: Arc<Forwarder>,
}

/// HTTP entry point of the shim.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server forwarding to `backend`.
    pub fn new(config: &ShimConfig, backend: &dyn Backend) -> Self {
        let forwarder = Forwarder::new(&config.forwarder, backend.port());
        tracing::debug!(
            target_port = forwarder.target().port(),
            timeout_secs = config.forwarder.timeout_secs,
            "Forwarder configured"
        );

        let state = AppState {
            forwarder: Arc::new(forwarder),
        };
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id.clone(), RequestIdGenerator))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }))
            .layer(PropagateRequestIdLayer::new(request_id));

        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Forward every request, whatever its method or path.
async fn forward_handler(State(state): State<AppState>, request: Request) -> Response {
    let inbound = InboundRequest::from_http(request);
    let method = inbound.method().clone();
    let path = inbound.path().to_string();

    let reply = state.forwarder.forward(inbound).await;
    tracing::debug!(
        method = %method,
        path = %path,
        status = %reply.status_line(),
        "Request forwarded"
    );
    reply.into_response()
}
