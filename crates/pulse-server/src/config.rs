//! Server configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the pulse server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Period between broadcaster ticks, in milliseconds.
    pub broadcast_interval_ms: u64,
    /// Path serving the event-session endpoint.
    pub events_path: String,
    /// Path serving the raw echo endpoint.
    pub echo_path: String,
    /// Per-connection outbound queue capacity.
    pub max_send_queue: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            broadcast_interval_ms: 600_000, // 10 minutes
            events_path: "/events".into(),
            echo_path: "/ws".into(),
            max_send_queue: 256,
        }
    }
}
