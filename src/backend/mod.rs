//! Backend process subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     BackendConfig → env.rs (copy current env + mode/port overrides)
//!     → supervisor.rs (spawn as process group leader in project root)
//!     → stdout/stderr drained into the log
//!
//! Shutdown (server stopped, or Supervisor dropped):
//!     SIGTERM to process group → reap within grace → SIGKILL if needed
//! ```
//!
//! # Design Decisions
//! - One supervisor object, created at startup and passed around explicitly
//! - Launch failure is returned to the caller, which keeps serving without
//!   a backend; requests then fail on the transport path
//! - The request path only depends on the `Backend` trait

pub mod env;
pub mod supervisor;

pub use env::BackendEnv;
pub use supervisor::{Supervisor, SupervisorError};

/// What the request path needs from a running backend.
pub trait Backend: Send + Sync + 'static {
    /// Loopback port the backend serves HTTP on.
    fn port(&self) -> u16;

    /// Tear the backend down. Must be idempotent.
    fn stop(&self);
}
