//! Events emitted by the voice session capability

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// Who said a transcript line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "assistant", alias = "bot")]
    Agent,
}

impl Role {
    /// Provider role name; `None` for roles with no transcript meaning
    #[must_use]
    pub fn from_wire(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Self::User),
            "agent" | "assistant" | "bot" => Some(Self::Agent),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `message` event
///
/// Transcripts from roles other than user and agent (`system`, `tool`)
/// decode as [`ProviderMessage::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", from = "WireMessage")]
pub enum ProviderMessage {
    /// A recognized or spoken utterance
    #[serde(rename = "transcript")]
    Transcript { role: Role, transcript: String },
    /// Any other message type (function calls, status updates, ...)
    #[serde(other)]
    Other,
}

/// `message` payload as sent, before role filtering
#[derive(Deserialize)]
#[serde(tag = "type")]
enum WireMessage {
    #[serde(rename = "transcript")]
    Transcript { role: String, transcript: String },
    #[serde(other)]
    Other,
}

impl From<WireMessage> for ProviderMessage {
    fn from(message: WireMessage) -> Self {
        match message {
            WireMessage::Transcript { role, transcript } => match Role::from_wire(&role) {
                Some(role) => Self::Transcript { role, transcript },
                None => Self::Other,
            },
            WireMessage::Other => Self::Other,
        }
    }
}

/// Event kinds the session reacts to
const KINDS: [&str; 6] = [
    "call-start",
    "call-end",
    "speech-start",
    "speech-end",
    "message",
    "error",
];

/// One event from the session capability, in wire form
///
/// ```json
/// {"event": "call-start"}
/// {"event": "message", "message": {"type": "transcript", "role": "user", "transcript": "hi"}}
/// {"event": "error", "error": "microphone unavailable"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SessionEvent {
    CallStart,
    CallEnd,
    SpeechStart,
    SpeechEnd,
    Message { message: ProviderMessage },
    Error {
        #[serde(default)]
        error: Value,
    },
}

impl SessionEvent {
    /// Transcript message event
    #[must_use]
    pub fn transcript(role: Role, text: impl Into<String>) -> Self {
        Self::Message {
            message: ProviderMessage::Transcript {
                role,
                transcript: text.into(),
            },
        }
    }

    /// Error event carrying a plain message
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: Value::String(message.into()),
        }
    }

    /// Decode a raw frame from the capability
    ///
    /// Frames of other kinds (`volume-level`, `call-start-progress`, ...)
    /// are not session events and decode as `None`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Session` if the frame has no event kind, or claims
    /// one of the session kinds but its payload does not decode
    pub fn from_json(frame: &Value) -> Result<Option<Self>> {
        let kind = frame
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Session("event frame without an event kind".to_string()))?;

        if !KINDS.contains(&kind) {
            return Ok(None);
        }

        Self::deserialize(frame)
            .map(Some)
            .map_err(|e| Error::Session(format!("undecodable {kind} event: {e}")))
    }

    /// Encode as a raw frame
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Wire name, for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CallStart => "call-start",
            Self::CallEnd => "call-end",
            Self::SpeechStart => "speech-start",
            Self::SpeechEnd => "speech-end",
            Self::Message { .. } => "message",
            Self::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_lifecycle_events() {
        assert_eq!(
            SessionEvent::from_json(&json!({ "event": "call-start" })).unwrap(),
            Some(SessionEvent::CallStart)
        );
        assert_eq!(
            SessionEvent::from_json(&json!({ "event": "speech-end" })).unwrap(),
            Some(SessionEvent::SpeechEnd)
        );
    }

    #[test]
    fn assistant_role_maps_to_agent() {
        let event = SessionEvent::from_json(&json!({
            "event": "message",
            "message": { "type": "transcript", "role": "assistant", "transcript": "Hola" }
        }))
        .unwrap();
        assert_eq!(event, Some(SessionEvent::transcript(Role::Agent, "Hola")));
    }

    #[test]
    fn unknown_message_types_decode_as_other() {
        let event = SessionEvent::from_json(&json!({
            "event": "message",
            "message": { "type": "function-call", "functionCall": {} }
        }))
        .unwrap();
        assert_eq!(
            event,
            Some(SessionEvent::Message {
                message: ProviderMessage::Other
            })
        );
    }

    #[test]
    fn error_payload_is_optional() {
        let event = SessionEvent::from_json(&json!({ "event": "error" })).unwrap();
        assert_eq!(event, Some(SessionEvent::Error { error: Value::Null }));
    }

    #[test]
    fn other_event_kinds_are_not_session_events() {
        let frame = json!({ "event": "volume-level", "volume": 0.4 });
        assert_eq!(SessionEvent::from_json(&frame).unwrap(), None);
        let frame = json!({ "event": "call-start-progress", "stage": "dialing" });
        assert_eq!(SessionEvent::from_json(&frame).unwrap(), None);
    }

    #[test]
    fn system_transcripts_decode_as_other() {
        let event = SessionEvent::from_json(&json!({
            "event": "message",
            "message": { "type": "transcript", "role": "system", "transcript": "You are..." }
        }))
        .unwrap();
        assert_eq!(
            event,
            Some(SessionEvent::Message {
                message: ProviderMessage::Other
            })
        );
    }

    #[test]
    fn malformed_known_event_is_a_session_error() {
        let frame = json!({ "event": "message", "message": { "type": "transcript" } });
        let err = SessionEvent::from_json(&frame).unwrap_err();
        assert!(matches!(err, Error::Session(_)));
    }

    #[test]
    fn frame_without_kind_is_a_session_error() {
        assert!(SessionEvent::from_json(&json!({ "volume": 0.4 })).is_err());
        assert!(SessionEvent::from_json(&json!("call-start")).is_err());
    }

    #[test]
    fn encodes_to_wire_form() {
        assert_eq!(
            SessionEvent::transcript(Role::User, "hi").to_json(),
            json!({
                "event": "message",
                "message": { "type": "transcript", "role": "user", "transcript": "hi" }
            })
        );
    }
}
