//! Dialwave - outbound calling and live voice sessions for a hosted voice agent
//!
//! This library provides the core functionality behind the Dialwave server:
//! - Outbound call and campaign validation with phone number normalization
//! - A thin HTTP surface over the voice platform's call-creation API
//! - A live voice session state machine driven by provider events
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────┐      ┌───────────────────────────┐
//! │        HTTP (api)         │      │     Voice session UI      │
//! │  outbound-call / campaign │      │  snapshots via watch      │
//! └─────────────┬─────────────┘      └─────────────┬─────────────┘
//!               │                                  │
//! ┌─────────────▼─────────────┐      ┌─────────────▼─────────────┐
//! │  outbound + phone         │      │  session orchestrator     │
//! │  validate, normalize      │      │  state machine + timer    │
//! └─────────────┬─────────────┘      └─────────────┬─────────────┘
//!               │                                  │
//! ┌─────────────▼─────────────┐      ┌─────────────▼─────────────┐
//! │  CallProvider (Vapi)      │      │  VoiceClient (SDK/replay) │
//! └───────────────────────────┘      └───────────────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod dialpad;
pub mod error;
pub mod outbound;
pub mod phone;
pub mod providers;
pub mod session;

pub use config::Config;
pub use dialpad::{DialPad, SubmitError};
pub use error::{Error, Result};
pub use outbound::{
    CallRequest, CampaignRequest, Customer, OutboundCall, OutboundCampaign, OutboundCustomer,
    ValidationErrors, validate_call, validate_campaign,
};
pub use phone::{NormalizedNumber, normalize, sanitize_input};
pub use providers::{CallCreated, CallProvider, CampaignCreated, VapiClient};
pub use session::{
    ReplayClient, SessionEvent, SessionHandle, SessionOrchestrator, SessionSnapshot, SessionState,
    VoiceClient,
};
