//! Read-only status projections for the HTTP endpoints.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Identity tag reported by every endpoint.
pub const SERVICE_NAME: &str = "pulse-server";

/// Body returned by `/health` and `/status`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub timestamp: String,
    pub service: String,
    pub connected_clients: usize,
    pub counter: u64,
}

fn snapshot(status: &str, connected_clients: usize, counter: u64) -> StatusResponse {
    StatusResponse {
        status: status.into(),
        timestamp: Utc::now().to_rfc3339(),
        service: SERVICE_NAME.into(),
        connected_clients,
        counter,
    }
}

/// `/health` projection.
pub fn health(connected_clients: usize, counter: u64) -> StatusResponse {
    snapshot("healthy", connected_clients, counter)
}

/// `/status` projection.
pub fn status(connected_clients: usize, counter: u64) -> StatusResponse {
    snapshot("running", connected_clients, counter)
}
