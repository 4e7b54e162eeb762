//! Domain layer: identifiers, user identity, and collaboration events.
//!
//! These value types are shared by the collaboration hub, the WebSocket
//! transport, and the repository service.

pub mod collab_event;
pub mod identity;
pub mod project_id;

pub use collab_event::{CollabEvent, EventType, UnknownEventType};
pub use identity::{SYSTEM_USER_ID, SYSTEM_USERNAME, UnknownStatus, UserIdentity, UserStatus};
pub use project_id::{ProjectId, SessionId};
