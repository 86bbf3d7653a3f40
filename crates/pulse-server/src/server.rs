//! Axum router and server bootstrap.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use pulse_core::events::ClientEvent;
use pulse_core::ids::ConnectionId;

use crate::config::ServerConfig;
use crate::connection::SessionClient;
use crate::echo::{self, EchoRegistry};
use crate::hub::SessionHub;
use crate::status::{self, StatusResponse};

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SessionHub>,
    pub echo: Arc<EchoRegistry>,
    pub max_send_queue: usize,
}

/// Build the Axum router with all routes.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route(&config.events_path, get(events_handler))
        .route(&config.echo_path, get(echo_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle that keeps it alive.
pub async fn start(config: ServerConfig) -> Result<ServerHandle, std::io::Error> {
    let hub = Arc::new(SessionHub::new(Duration::from_millis(
        config.broadcast_interval_ms,
    )));
    let echo = Arc::new(EchoRegistry::new(config.max_send_queue));

    let state = AppState {
        hub: Arc::clone(&hub),
        echo: Arc::clone(&echo),
        max_send_queue: config.max_send_queue,
    };
    let router = build_router(state, &config);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    info!(port = local_addr.port(), "pulse server started");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        hub,
        echo,
        _server: server,
    })
}

/// Handle returned by `start()`. Keeps the accept loop alive and
/// exposes the registries for read-only inspection.
pub struct ServerHandle {
    pub port: u16,
    pub hub: Arc<SessionHub>,
    pub echo: Arc<EchoRegistry>,
    _server: tokio::task::JoinHandle<()>,
}

/// Session-protocol WebSocket upgrade.
async fn events_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

/// Echo WebSocket upgrade.
async fn echo_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| echo::run_echo_session(socket, state.echo))
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(status::health(state.hub.count().await, state.hub.counter()))
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(status::status(state.hub.count().await, state.hub.counter()))
}

/// Drive one session-protocol connection from upgrade to disconnect.
///
/// Inbound frames are parsed as [`ClientEvent`] and dispatched through a
/// `match`; malformed frames are logged and dropped without touching the
/// connection. The hub is notified on every exit path.
async fn run_session(socket: WebSocket, state: AppState) {
    let id = ConnectionId::new();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(state.max_send_queue);
    let client = Arc::new(SessionClient::new(id.clone(), tx));

    // Writer: forward queued events to the socket.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    state.hub.connect(Arc::clone(&client)).await;

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(ClientEvent::TestMessage { .. }) => {
                    debug!(client_id = %id, "test message received");
                }
                Err(e) => {
                    warn!(client_id = %id, error = %e, "malformed inbound event dropped");
                }
            },
            Ok(Message::Close(_)) => {
                info!(client_id = %id, "client sent close frame");
                break;
            }
            // Ping/Pong are answered by axum; binary frames are ignored.
            Ok(_) => {}
            Err(e) => {
                warn!(client_id = %id, error = %e, "session transport error");
                break;
            }
        }
    }

    state.hub.disconnect(&id).await;
    writer.abort();
    info!(client_id = %id, connected_for = ?client.age(), "session closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_state() -> AppState {
        AppState {
            hub: Arc::new(SessionHub::new(Duration::from_secs(600))),
            echo: Arc::new(EchoRegistry::new(32)),
            max_send_queue: 32,
        }
    }

    fn make_router() -> Router {
        build_router(make_state(), &ServerConfig::default())
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let code = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        let parsed = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
        (code, parsed)
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let (code, body) = get_json(make_router(), "/health").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "pulse-server");
        assert_eq!(body["connected_clients"], 0);
        assert_eq!(body["counter"], 0);
    }

    #[tokio::test]
    async fn status_endpoint_returns_running() {
        let (code, body) = get_json(make_router(), "/status").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(body["status"], "running");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let req = Request::builder()
            .uri("/nonexistent")
            .body(Body::empty())
            .unwrap();
        let resp = make_router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_routes_reject_plain_get() {
        // Without an Upgrade header the WS endpoints refuse the request.
        for path in ["/events", "/ws"] {
            let req = Request::builder().uri(path).body(Body::empty()).unwrap();
            let resp = make_router().oneshot(req).await.unwrap();
            assert_ne!(resp.status(), StatusCode::OK, "path {path}");
        }
    }

    #[tokio::test]
    async fn router_honors_configured_paths() {
        let config = ServerConfig {
            events_path: "/socket".into(),
            echo_path: "/raw".into(),
            ..ServerConfig::default()
        };
        let app = build_router(make_state(), &config);

        let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = Request::builder().uri("/socket").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_ne!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn server_binds_auto_assigned_port() {
        let handle = start(ServerConfig::default()).await.unwrap();
        assert!(handle.port > 0);
        assert_eq!(handle.hub.count().await, 0);
        assert_eq!(handle.echo.count(), 0);
    }
}
