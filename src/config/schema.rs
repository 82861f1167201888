//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the shim.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the shim.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShimConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The supervised backend process.
    pub backend: BackendConfig,

    /// Request forwarding behaviour.
    pub forwarder: ForwarderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend process configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Working directory the backend is launched in.
    pub project_root: PathBuf,

    /// Interpreter or executable to launch.
    pub program: String,

    /// Fixed arguments, usually the entry script.
    pub args: Vec<String>,

    /// Loopback port the backend listens on.
    pub port: u16,

    /// Name of the operating-mode variable.
    pub mode_var: String,

    /// Value injected for the operating-mode variable.
    pub mode: String,

    /// Name of the listening-port variable.
    pub port_var: String,

    /// Extra variables injected into the backend environment.
    pub env: BTreeMap<String, String>,

    /// Pipe stdout/stderr into the shim log instead of inheriting them.
    pub capture_output: bool,

    /// Seconds to wait after SIGTERM before killing the process group.
    pub stop_grace_secs: u64,
}

impl BackendConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("."),
            program: "node".to_string(),
            args: vec!["server/index.js".to_string()],
            port: 8000,
            mode_var: "NODE_ENV".to_string(),
            mode: "production".to_string(),
            port_var: "PORT".to_string(),
            env: BTreeMap::new(),
            capture_output: true,
            stop_grace_secs: 5,
        }
    }
}

/// Forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwarderConfig {
    /// Host name used in the backend URL.
    pub host: String,

    /// Upper bound on one full backend round trip, in seconds.
    pub timeout_secs: u64,

    /// Also forward `Content-Type` to the backend.
    ///
    /// Off by default: the host environment exposes it outside the `HTTP_`
    /// variables and the plain forwarding rule drops it.
    pub forward_content_headers: bool,

    /// Pass the backend's own body through on 4xx/5xx instead of the JSON
    /// error envelope.
    pub preserve_error_body: bool,
}

impl ForwarderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            timeout_secs: 30,
            forward_content_headers: false,
            preserve_error_body: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
