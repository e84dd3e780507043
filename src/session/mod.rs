//! Live voice session
//!
//! The capability (a provider SDK) reports lifecycle and transcript events.
//! [`SessionMachine`] folds them into a [`SessionSnapshot`] and
//! [`SessionOrchestrator`] drives the machine from an async task.

mod client;
mod event;
mod machine;
mod orchestrator;
mod replay;
mod state;
mod transcript;

pub use client::{EventReceiver, VoiceClient};
pub use event::{ProviderMessage, Role, SessionEvent};
pub use machine::{
    CONNECTION_ERROR, INIT_ERROR, START_ERROR, SessionMachine, SessionSnapshot, StartDecision,
    Transition,
};
pub use orchestrator::{SessionHandle, SessionOrchestrator};
pub use replay::ReplayClient;
pub use state::{Activity, SessionState};
pub use transcript::{Transcript, TranscriptEntry};
