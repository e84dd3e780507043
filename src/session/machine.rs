//! Pure session state machine
//!
//! No I/O and no clocks: the caller passes timestamps in and acts on the
//! returned [`Transition`]. The async orchestrator owns the timers.

use serde::Serialize;
use uuid::Uuid;

use super::event::{ProviderMessage, SessionEvent};
use super::state::{Activity, SessionState};
use super::transcript::{Transcript, TranscriptEntry};

/// Shown when the capability reports an error event
pub const CONNECTION_ERROR: &str = "Error connecting to voice assistant. Please try again.";

/// Shown when the capability could not be constructed
pub const INIT_ERROR: &str = "Failed to initialize voice assistant.";

/// Shown when the capability rejects a start request
pub const START_ERROR: &str = "Failed to start voice call. Please check your permissions.";

/// What the caller must do after an event was applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed
    Ignored,
    /// State or transcript changed
    Updated,
    /// A new session began; any pending auto-reset must be cancelled
    Started,
    /// The session ended; schedule the auto-reset
    Ended,
}

/// Outcome of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartDecision {
    /// Ask the capability to open a session
    Proceed,
    /// A session is already live
    AlreadyActive,
    /// No capability handle exists
    Unavailable,
}

/// Read-only view handed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// Identifier of the live session, assigned on `call-start`
    pub session_id: Option<Uuid>,
    pub state: SessionState,
    pub transcript: Vec<TranscriptEntry>,
    /// Latest error, visible until the next `call-start`
    pub error: Option<String>,
    /// Whether a capability handle exists
    pub ready: bool,
}

impl SessionSnapshot {
    /// Status line for the current state
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.state.label()
    }
}

/// State of one voice session
#[derive(Debug)]
pub struct SessionMachine {
    session_id: Option<Uuid>,
    state: SessionState,
    transcript: Transcript,
    error: Option<String>,
    ready: bool,
}

impl SessionMachine {
    /// Machine backed by a working capability
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_id: None,
            state: SessionState::Idle,
            transcript: Transcript::default(),
            error: None,
            ready: true,
        }
    }

    /// Machine whose capability failed to initialize; start requests no-op
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            ready: false,
            error: Some(INIT_ERROR.to_string()),
            ..Self::new()
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.transcript.entries()
    }

    /// Decide whether a user start request should reach the capability
    ///
    /// Starting from `Ended` supersedes the pending reset: the previous
    /// transcript is dropped right away, before the capability answers. A
    /// start it then rejects leaves the session `Idle`, not `Ended`.
    pub fn begin_start(&mut self) -> StartDecision {
        if !self.ready {
            return StartDecision::Unavailable;
        }
        match self.state {
            SessionState::Active(_) => StartDecision::AlreadyActive,
            SessionState::Ended => {
                self.reset();
                StartDecision::Proceed
            }
            SessionState::Idle => StartDecision::Proceed,
        }
    }

    /// Apply one capability event
    pub fn apply(&mut self, event: &SessionEvent, now_ms: i64) -> Transition {
        match event {
            SessionEvent::CallStart => {
                self.session_id = Some(Uuid::new_v4());
                self.state = SessionState::Active(Activity::Connected);
                self.transcript.clear();
                self.error = None;
                Transition::Started
            }
            SessionEvent::SpeechStart => self.set_activity(Activity::Speaking),
            SessionEvent::SpeechEnd => self.set_activity(Activity::Listening),
            SessionEvent::Message { message } => {
                let ProviderMessage::Transcript { role, transcript } = message else {
                    return Transition::Ignored;
                };
                if !self.state.is_active() {
                    return Transition::Ignored;
                }
                if self.transcript.record(*role, transcript, now_ms) {
                    Transition::Updated
                } else {
                    Transition::Ignored
                }
            }
            SessionEvent::CallEnd => {
                self.state = SessionState::Ended;
                self.transcript.forget_seen();
                Transition::Ended
            }
            SessionEvent::Error { .. } => {
                self.record_error(CONNECTION_ERROR);
                Transition::Updated
            }
        }
    }

    /// Revert to `Idle`, dropping the transcript and session identity
    pub fn reset(&mut self) {
        self.session_id = None;
        self.state = SessionState::Idle;
        self.transcript.clear();
    }

    /// Record the latest error message
    pub fn record_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            state: self.state,
            transcript: self.transcript.entries().to_vec(),
            error: self.error.clone(),
            ready: self.ready,
        }
    }

    fn set_activity(&mut self, activity: Activity) -> Transition {
        if !self.state.is_active() {
            return Transition::Ignored;
        }
        self.state = SessionState::Active(activity);
        Transition::Updated
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new()
    }
}
