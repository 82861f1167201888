//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! shim (targets backend_shim, tower_http)
//! backend stdout/stderr (target backend)
//!     → logging.rs (EnvFilter + fmt layer)
//!     → stdout
//! ```
//!
//! # Design Decisions
//! - Structured fields (request_id, pid, status) rather than formatted text
//! - Request ID flows from the client, or is generated, through every span

pub mod logging;
