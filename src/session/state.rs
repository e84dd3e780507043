//! Session lifecycle states

use serde::Serialize;

/// What an active call is doing right now
///
/// Speaking and listening are mutually exclusive; `Connected` covers the
/// moment in between (right after connect, or before the first turn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    Connected,
    /// The assistant is talking
    Speaking,
    /// The assistant finished talking and waits for the user
    Listening,
}

/// Lifecycle of one voice session
///
/// `Idle` also covers connecting: nothing changes until the capability
/// confirms with `call-start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", content = "activity", rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Active(Activity),
    /// Call finished; reverts to `Idle` after the reset delay
    Ended,
}

impl SessionState {
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active(_))
    }

    #[must_use]
    pub const fn is_speaking(self) -> bool {
        matches!(self, Self::Active(Activity::Speaking))
    }

    #[must_use]
    pub const fn is_listening(self) -> bool {
        matches!(self, Self::Active(Activity::Listening))
    }

    /// Human-readable status line
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active(Activity::Speaking) => "Assistant speaking...",
            Self::Active(Activity::Listening) => "Listening...",
            Self::Active(Activity::Connected) => "Connected",
            Self::Idle | Self::Ended => "Disconnected",
        }
    }
}
