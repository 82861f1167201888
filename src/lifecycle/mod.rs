//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Init logging → Start backend → Bind listener → Serve
//!
//! Shutdown (shutdown.rs + signals.rs):
//!     SIGTERM/SIGINT → broadcast → server drains → backend process group stopped
//! ```
//!
//! # Design Decisions
//! - Backend start failure is logged, not fatal
//! - The backend is stopped after the server has drained, or when binding
//!   the listener fails, always through `stop_backend` on the blocking pool
//! - Dropping the supervisor also stops the backend as a last resort

pub mod shutdown;
pub mod signals;

pub use shutdown::{stop_backend, Shutdown};
pub use signals::wait_for_signal;
