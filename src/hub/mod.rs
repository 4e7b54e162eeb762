//! Collaboration hub: room-scoped fan-out of typed events.
//!
//! ```text
//!  reader tasks ──register──┐
//!  reader tasks ──broadcast─┼──▶ EventLoop ──▶ RoomDirectory ──try_send──▶ writer tasks
//!  reader tasks ─unregister─┘        ▲
//!  HTTP handlers ─system event───────┘
//! ```
//!
//! All membership changes and fan-outs go through one event loop fed by
//! three bounded channels. Each session has a bounded outbound queue read
//! by exactly one writer; a session whose queue is full is evicted.

mod command;
pub mod directory;
mod event_loop;
pub mod handle;
mod room;
pub mod session;

pub use directory::RoomDirectory;
pub use handle::{Hub, HubHandle};
pub use session::{AttachedSession, Occupant, SessionInfo, SessionInit};

/// Hub tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HubConfig {
    /// Capacity of each of the register, unregister and broadcast channels.
    pub channel_capacity: usize,
    /// Bound of every session's outbound queue.
    pub outbound_queue: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
            outbound_queue: 256,
        }
    }
}
