//! WebSocket layer: handshake, framing and per-connection tasks.
//!
//! The endpoint at `/ws` attaches each connection to its project room in
//! the collaboration hub.

pub mod connection;
pub mod handler;
pub mod messages;

pub use connection::{ConnectionSettings, SessionState};
pub use handler::ws_handler;
