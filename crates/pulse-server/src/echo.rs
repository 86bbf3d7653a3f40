//! Raw duplex echo endpoint.
//!
//! Fully independent of the session hub: its own registry, its own
//! lifecycle, no interaction with the broadcast scheduler.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use pulse_core::events::EchoReply;
use pulse_core::ids::ConnectionId;

use crate::status::SERVICE_NAME;

/// Greeting text frame sent once per accepted echo connection.
const GREETING: &str = "Welcome to WebSocket endpoint!";

/// Registry of live echo connections.
///
/// Each entry's sender is the only write path to its socket, so an id
/// present here is writable until it is removed.
pub struct EchoRegistry {
    clients: DashMap<ConnectionId, mpsc::Sender<String>>,
    max_send_queue: usize,
}

impl EchoRegistry {
    pub fn new(max_send_queue: usize) -> Self {
        Self {
            clients: DashMap::new(),
            max_send_queue,
        }
    }

    /// Register a new connection and return its id + writer receiver.
    pub fn register(&self) -> (ConnectionId, mpsc::Receiver<String>) {
        let id = ConnectionId::new();
        let (tx, rx) = mpsc::channel(self.max_send_queue);
        self.clients.insert(id.clone(), tx);
        (id, rx)
    }

    /// Remove a connection. Removing an unknown id is a no-op.
    pub fn unregister(&self, id: &ConnectionId) {
        let _ = self.clients.remove(id);
    }

    /// Queue a text frame for one connection's writer task.
    pub fn send_to(&self, id: &ConnectionId, frame: String) -> bool {
        match self.clients.get(id) {
            Some(tx) => tx.try_send(frame).is_ok(),
            None => false,
        }
    }

    /// Number of live echo connections.
    pub fn count(&self) -> usize {
        self.clients.len()
    }
}

/// Drive one echo connection from accept to close.
///
/// Sends the greeting, then echoes every inbound text frame wrapped in
/// an [`EchoReply`]. The registry entry is removed on every exit path:
/// client close, transport error, or writer failure.
pub async fn run_echo_session(socket: WebSocket, registry: Arc<EchoRegistry>) {
    let (id, mut rx) = registry.register();
    info!(client_id = %id, total = registry.count(), "echo client connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Writer: forward queued frames to the socket.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    if !registry.send_to(&id, GREETING.to_string()) {
        warn!(client_id = %id, "failed to queue greeting");
    }

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let reply = EchoReply {
                    message: format!("Echo: {}", text.as_str()),
                    timestamp: Utc::now().to_rfc3339(),
                    service: SERVICE_NAME.to_string(),
                };
                match serde_json::to_string(&reply) {
                    Ok(json) => {
                        if !registry.send_to(&id, json) {
                            warn!(client_id = %id, "failed to queue echo reply");
                        }
                    }
                    Err(e) => {
                        warn!(client_id = %id, error = %e, "failed to serialize echo reply");
                    }
                }
            }
            Ok(Message::Close(_)) => {
                info!(client_id = %id, "echo client closed");
                break;
            }
            // Ping/Pong are answered by axum; binary frames are ignored.
            Ok(_) => {}
            Err(e) => {
                warn!(client_id = %id, error = %e, "echo transport error");
                break;
            }
        }
    }

    registry.unregister(&id);
    writer.abort();
    info!(client_id = %id, total = registry.count(), "echo client removed");
}
