//! Scripted voice client
//!
//! Replays a fixed event sequence each time a session is started. Used by
//! tests and by the `dialwave replay` command to exercise the orchestrator
//! without a real provider.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::client::{EventReceiver, VoiceClient};
use super::event::SessionEvent;
use crate::{Error, Result};

/// Voice client that emits pre-recorded frames
#[derive(Debug)]
pub struct ReplayClient {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<Value>>>,
    /// One script per `start`, consumed front to back
    scripts: Mutex<VecDeque<Vec<Value>>>,
    fail_start: bool,
    fail_stop: bool,
    end_on_stop: bool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl ReplayClient {
    /// Client replaying `script` on the first start
    #[must_use]
    pub fn new(script: Vec<SessionEvent>) -> Self {
        Self::with_sessions(vec![script])
    }

    /// Client replaying one script per successive start
    #[must_use]
    pub fn with_sessions(sessions: Vec<Vec<SessionEvent>>) -> Self {
        let scripts = sessions
            .into_iter()
            .map(|events| events.iter().map(SessionEvent::to_json).collect())
            .collect();
        Self::from_frames(scripts)
    }

    /// Client replaying raw frames, which may include undecodable ones
    #[must_use]
    pub fn from_frames(scripts: VecDeque<Vec<Value>>) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            scripts: Mutex::new(scripts),
            fail_start: false,
            fail_stop: false,
            end_on_stop: false,
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        }
    }

    /// Parse a JSON-lines script; blank lines and `#` comments are skipped
    ///
    /// # Errors
    ///
    /// Returns error if a line is not valid JSON
    pub fn from_jsonl(script: &str) -> Result<Self> {
        let frames = script
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(serde_json::from_str::<Value>)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        Ok(Self::from_frames(VecDeque::from([frames])))
    }

    /// Reject every start request
    #[must_use]
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Reject every stop request
    #[must_use]
    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    /// Emit `call-end` when a stop request succeeds
    #[must_use]
    pub fn ending_on_stop(mut self) -> Self {
        self.end_on_stop = true;
        self
    }

    /// Push an event outside any script
    pub fn emit(&self, event: &SessionEvent) {
        self.emit_frame(event.to_json());
    }

    /// Push a raw frame outside any script
    pub fn emit_frame(&self, frame: Value) {
        let Ok(mut subscribers) = self.subscribers.lock() else {
            return;
        };
        subscribers.retain(|tx| tx.send(frame.clone()).is_ok());
        if subscribers.is_empty() {
            tracing::debug!("replay frame dropped, no subscribers");
        }
    }

    /// Number of start requests received
    #[must_use]
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of stop requests received
    #[must_use]
    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    fn next_script(&self) -> Vec<Value> {
        self.scripts
            .lock()
            .map(|mut scripts| scripts.pop_front().unwrap_or_default())
            .unwrap_or_default()
    }
}

#[async_trait]
impl VoiceClient for ReplayClient {
    async fn start(&self, assistant_id: &str) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(Error::Session("start rejected: permission denied".to_string()));
        }

        let script = self.next_script();
        tracing::debug!(assistant_id, frames = script.len(), "replaying session script");
        for frame in script {
            self.emit_frame(frame);
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(Error::Session("stop rejected".to_string()));
        }
        if self.end_on_stop {
            self.emit(&SessionEvent::CallEnd);
        }
        Ok(())
    }

    fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }
}
