//! # pulse-server
//!
//! Axum HTTP + `WebSocket` server for the pulse push service.
//!
//! - Event-session endpoint: welcome + announcement frames, broadcast
//!   fan-out of counter updates from one shared cancellable scheduler
//! - Raw echo endpoint with its own independent registry
//! - `/health` and `/status`: read-only projections of live state

pub mod config;
pub mod connection;
pub mod echo;
pub mod hub;
pub mod server;
pub mod status;

pub use config::ServerConfig;
pub use server::{build_router, start, AppState, ServerHandle};
