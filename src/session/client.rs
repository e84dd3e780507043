//! Voice session capability seam

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::Result;

/// Raw event frames from the capability, in emission order
///
/// Unbounded so a burst of frames is never dropped; lifecycle frames such as
/// `call-end` must always reach the orchestrator.
pub type EventReceiver = mpsc::UnboundedReceiver<Value>;

/// Real-time voice session capability (browser SDK, native SDK, test double)
///
/// `start` and `stop` only acknowledge the request. Lifecycle changes are
/// reported later as frames on the [`subscribe`](VoiceClient::subscribe)
/// stream, and the orchestrator only trusts those.
#[async_trait]
pub trait VoiceClient: Send + Sync {
    /// Ask the provider to open a session with the given assistant
    async fn start(&self, assistant_id: &str) -> Result<()>;

    /// Ask the provider to close the current session
    async fn stop(&self) -> Result<()>;

    /// Subscribe to event frames
    fn subscribe(&self) -> EventReceiver;
}
