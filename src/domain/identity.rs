//! User identity and presence status attached to collaboration sessions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// User id reserved for events injected by the hub itself.
pub const SYSTEM_USER_ID: i64 = 0;

/// Display name reserved for events injected by the hub itself.
pub const SYSTEM_USERNAME: &str = "system";

/// Authoritative origin fields stamped on every outbound event.
///
/// Recorded once at handshake time; anything a client puts in the
/// corresponding frame fields is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Platform user id.
    pub user_id: i64,
    /// Display name.
    pub username: String,
    /// Avatar URL, possibly empty.
    #[serde(default)]
    pub avatar: String,
}

impl UserIdentity {
    /// Creates an identity.
    #[must_use]
    pub fn new(user_id: i64, username: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
            avatar: avatar.into(),
        }
    }

    /// The identity used for hub-injected events.
    #[must_use]
    pub fn system() -> Self {
        Self::new(SYSTEM_USER_ID, SYSTEM_USERNAME, "")
    }

    /// Returns `true` if this is the system identity.
    #[must_use]
    pub fn is_system(&self) -> bool {
        self.user_id == SYSTEM_USER_ID && self.username == SYSTEM_USERNAME
    }
}

/// Presence status of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    /// Connected and active.
    #[default]
    Online,
    /// Connected but idle.
    Away,
    /// Connected, do not disturb.
    Busy,
    /// Disconnected.
    Offline,
}

impl UserStatus {
    /// Returns the wire name of this status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string is not one of the known values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for UserStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Self::Online),
            "away" => Ok(Self::Away),
            "busy" => Ok(Self::Busy),
            "offline" => Ok(Self::Offline),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
