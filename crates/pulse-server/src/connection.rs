//! Per-client connection state for the session protocol.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use pulse_core::events::ServerEvent;
use pulse_core::ids::ConnectionId;

/// A connected session-protocol client.
pub struct SessionClient {
    /// Unique connection ID minted at accept time.
    pub id: ConnectionId,
    /// Send channel to the client's socket writer task.
    tx: mpsc::Sender<String>,
    /// When this connection was established.
    connected_at: Instant,
    /// Count of frames dropped due to a full or closed channel.
    dropped_frames: AtomicU64,
}

impl SessionClient {
    pub fn new(id: ConnectionId, tx: mpsc::Sender<String>) -> Self {
        Self {
            id,
            tx,
            connected_at: Instant::now(),
            dropped_frames: AtomicU64::new(0),
        }
    }

    /// Queue a text frame for the writer task.
    ///
    /// Returns `false` if the channel is full or closed, and increments
    /// the dropped frame counter. Never blocks, so one slow peer cannot
    /// stall a broadcast to the others.
    pub fn send(&self, frame: String) -> bool {
        if self.tx.try_send(frame).is_ok() {
            true
        } else {
            let _ = self.dropped_frames.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Serialize an event and queue it.
    pub fn send_event(&self, event: &ServerEvent) -> bool {
        match event.to_json() {
            Ok(json) => self.send(json),
            Err(_) => false,
        }
    }

    /// Total frames dropped for this connection.
    pub fn drop_count(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}
