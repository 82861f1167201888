//! Minimal backend for trying the shim locally.
//!
//! Reads the port and mode the supervisor injects, then serves a few routes:
//! `/` (greeting), `/status`, `/echo` (request headers as JSON) and
//! `/missing` (a 404 with its own JSON body).
//!
//! ```text
//! cargo build --example demo_backend
//! backend-shim --config demos/shim.toml
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde_json::{json, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let port: u16 = std::env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8000);
    let mode = std::env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string());

    let app = Router::new()
        .route("/", get(|| async { "Hello from the demo backend" }))
        .route("/status", get(move || async move { format!("ok ({mode})") }))
        .route("/echo", any(echo))
        .route(
            "/missing",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({ "msg": "gone" }))) }),
        );

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Demo backend listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn echo(headers: HeaderMap, body: String) -> Json<Value> {
    let headers: BTreeMap<String, String> = headers
        .iter()
        .map(|(name, value)| (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
        .collect();
    Json(json!({ "headers": headers, "body": body }))
}
