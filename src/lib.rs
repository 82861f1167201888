//! Reverse-proxy shim with a supervised backend process.

pub mod backend;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use backend::{Backend, Supervisor};
pub use config::ShimConfig;
pub use http::{Forwarder, HttpServer};
pub use lifecycle::Shutdown;
