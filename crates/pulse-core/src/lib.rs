//! Core wire types shared by the pulse server: connection identifiers
//! and the JSON event frames exchanged with clients.

pub mod events;
pub mod ids;

pub use events::{ClientEvent, EchoReply, ServerEvent};
pub use ids::ConnectionId;
