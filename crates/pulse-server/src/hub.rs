//! Session registry and the shared broadcast scheduler.
//!
//! The registry and the scheduler slot live behind one mutex, so
//! concurrent connects and disconnects are serialized and the scheduler
//! can never be double-started or left with a dangling handle.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use pulse_core::events::ServerEvent;
use pulse_core::ids::ConnectionId;

use crate::connection::SessionClient;

/// Announcement broadcast to every session when the scheduler starts.
const TASK_STARTED: &str = "Background task started";

struct TickerTask {
    handle: JoinHandle<()>,
    token: CancellationToken,
}

#[derive(Default)]
struct HubState {
    sessions: HashMap<ConnectionId, Arc<SessionClient>>,
    ticker: Option<TickerTask>,
}

struct HubInner {
    state: Mutex<HubState>,
    /// Ticks emitted since process start. Never reset.
    counter: AtomicU64,
}

/// Shared state for the session protocol: the connection registry plus
/// the single cancellable ticker that pushes counter updates.
pub struct SessionHub {
    inner: Arc<HubInner>,
    interval: Duration,
}

impl SessionHub {
    pub fn new(interval: Duration) -> Self {
        Self {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState::default()),
                counter: AtomicU64::new(0),
            }),
            interval,
        }
    }

    /// Register a client: welcome it, then start the scheduler if idle.
    ///
    /// The directed welcome is queued before any start announcement; the
    /// announcement goes to every session, the new one included, and is
    /// only sent when the scheduler actually starts.
    pub async fn connect(&self, client: Arc<SessionClient>) {
        let mut state = self.inner.state.lock().await;
        state.sessions.insert(client.id.clone(), client.clone());
        info!(client_id = %client.id, total = state.sessions.len(), "session client connected");

        let welcome = ServerEvent::Message {
            data: format!("Welcome to the server - {}", client.id),
        };
        if !client.send_event(&welcome) {
            warn!(client_id = %client.id, "failed to queue welcome");
        }

        let running = state
            .ticker
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished());
        if !running {
            let started = ServerEvent::Message {
                data: TASK_STARTED.into(),
            };
            for session in state.sessions.values() {
                if !session.send_event(&started) {
                    warn!(client_id = %session.id, "failed to queue start announcement");
                }
            }
            let token = CancellationToken::new();
            let handle = tokio::spawn(run_ticker(
                Arc::clone(&self.inner),
                self.interval,
                token.clone(),
            ));
            state.ticker = Some(TickerTask { handle, token });
            info!("broadcast scheduler started");
        }
    }

    /// Remove a client and, if the scheduler is live, stop it.
    ///
    /// Any disconnect while the scheduler runs stops broadcasting for
    /// every remaining session; the next connect restarts it. Removing
    /// an id that is not registered leaves the registry untouched.
    pub async fn disconnect(&self, id: &ConnectionId) {
        let mut state = self.inner.state.lock().await;
        if state.sessions.remove(id).is_some() {
            info!(client_id = %id, total = state.sessions.len(), "session client disconnected");
        }
        if let Some(ticker) = state.ticker.take() {
            if !ticker.handle.is_finished() {
                ticker.token.cancel();
                info!("broadcast scheduler stopped");
            }
        }
    }

    /// Number of registered session clients.
    pub async fn count(&self) -> usize {
        self.inner.state.lock().await.sessions.len()
    }

    /// Current value of the shared tick counter.
    pub fn counter(&self) -> u64 {
        self.inner.counter.load(Ordering::Relaxed)
    }

    /// Whether a ticker task is currently live.
    pub async fn is_broadcasting(&self) -> bool {
        self.inner
            .state
            .lock()
            .await
            .ticker
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }
}

async fn run_ticker(inner: Arc<HubInner>, period: Duration, token: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    // interval fires immediately; consume that tick so the first
    // emission happens one full period after start
    ticker.tick().await;
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => broadcast_update(&inner).await,
        }
    }
    debug!("broadcast scheduler cancelled");
}

/// Emit one `update` frame to every session, then increment the counter.
async fn broadcast_update(inner: &HubInner) {
    let recipients: Vec<Arc<SessionClient>> = {
        let state = inner.state.lock().await;
        state.sessions.values().cloned().collect()
    };
    let counter = inner.counter.load(Ordering::Relaxed);
    let event = ServerEvent::Update {
        counter,
        timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    debug!(counter, recipients = recipients.len(), "broadcast update");
    for client in &recipients {
        if !client.send_event(&event) {
            warn!(client_id = %client.id, "failed to send update, skipping");
        }
    }
    let _ = inner.counter.fetch_add(1, Ordering::Relaxed);
}
