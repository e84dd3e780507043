//! Async driver for one voice session
//!
//! A single task owns the [`SessionMachine`] and multiplexes three inputs:
//! event frames from the capability, user commands, and the one optional
//! auto-reset timer. Consumers read snapshots through a `watch` channel and
//! never touch the machine directly.

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep};

use super::client::{EventReceiver, VoiceClient};
use super::event::SessionEvent;
use super::machine::{SessionMachine, SessionSnapshot, START_ERROR, StartDecision, Transition};
use crate::config::SessionConfig;
use crate::{Error, Result};

const COMMAND_CAPACITY: usize = 32;

enum Command {
    Start,
    End,
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running session loop
///
/// Dropping every handle closes the loop, which asks the capability to stop.
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Request a new session
    ///
    /// The request is fire-and-forget: the state only changes once the
    /// capability reports `call-start`.
    ///
    /// # Errors
    ///
    /// Returns error if the session loop has stopped
    pub async fn start(&self) -> Result<()> {
        self.send(Command::Start).await
    }

    /// Request the live session to close
    ///
    /// # Errors
    ///
    /// Returns error if the session loop has stopped
    pub async fn end(&self) -> Result<()> {
        self.send(Command::End).await
    }

    /// Current snapshot
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch snapshots as they change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Stop the capability and wait for the loop to exit
    ///
    /// # Errors
    ///
    /// Returns error if the loop already stopped or panicked
    pub async fn shutdown(self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.send(Command::Shutdown(ack)).await?;
        done.await
            .map_err(|_| Error::Session("session loop exited before shutdown".to_string()))?;
        self.task
            .await
            .map_err(|e| Error::Session(format!("session loop failed: {e}")))
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| Error::Session("session loop is not running".to_string()))
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("Start"),
            Self::End => f.write_str("End"),
            Self::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

/// Spawns session loops
pub struct SessionOrchestrator;

impl SessionOrchestrator {
    /// Spawn a session loop for `assistant_id`
    ///
    /// `client` is the result of constructing the capability. On `Err` the
    /// loop still runs, but reports an initialization error and ignores
    /// start requests.
    #[must_use]
    pub fn spawn(
        client: Result<Arc<dyn VoiceClient>>,
        assistant_id: impl Into<String>,
        config: &SessionConfig,
    ) -> SessionHandle {
        let (client, machine) = match client {
            Ok(client) => (Some(client), SessionMachine::new()),
            Err(e) => {
                tracing::error!(error = %e, "failed to initialize voice client");
                (None, SessionMachine::unavailable())
            }
        };

        let events = client.as_ref().map(|c| c.subscribe());
        let (snapshot_tx, snapshots) = watch::channel(machine.snapshot());
        let (commands, command_rx) = mpsc::channel(COMMAND_CAPACITY);

        let session = SessionLoop {
            client,
            assistant_id: assistant_id.into(),
            machine,
            reset_delay: config.reset_delay,
            reset: None,
            snapshots: snapshot_tx,
        };

        let task = tokio::spawn(session.run(command_rx, events));

        SessionHandle {
            commands,
            snapshots,
            task,
        }
    }
}

struct SessionLoop {
    client: Option<Arc<dyn VoiceClient>>,
    assistant_id: String,
    machine: SessionMachine,
    reset_delay: Duration,
    /// Pending `Ended -> Idle` reset; at most one exists
    reset: Option<Pin<Box<Sleep>>>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionLoop {
    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut events: Option<EventReceiver>,
    ) {
        tracing::debug!(assistant_id = %self.assistant_id, "session loop started");

        loop {
            tokio::select! {
                biased;

                frame = next_frame(&mut events) => match frame {
                    Some(frame) => self.on_frame(&frame),
                    None => {
                        tracing::warn!("voice client event stream closed");
                        events = None;
                    }
                },
                () = wait_reset(&mut self.reset) => self.on_reset(),
                command = commands.recv() => match command {
                    Some(Command::Start) => self.start().await,
                    Some(Command::End) => self.end().await,
                    Some(Command::Shutdown(ack)) => {
                        self.close().await;
                        let _ = ack.send(());
                        break;
                    }
                    None => {
                        self.close().await;
                        break;
                    }
                },
            }

            self.publish();
        }

        tracing::debug!("session loop stopped");
    }

    async fn start(&mut self) {
        let Some(client) = self.client.clone() else {
            tracing::debug!("start ignored, no voice client");
            return;
        };

        match self.machine.begin_start() {
            StartDecision::Proceed => {}
            StartDecision::AlreadyActive => {
                tracing::debug!("start ignored, session already active");
                return;
            }
            StartDecision::Unavailable => {
                tracing::debug!("start ignored, voice client unavailable");
                return;
            }
        }

        // Supersede an `Ended` session still waiting for its reset
        self.reset = None;
        self.publish();

        tracing::info!(assistant_id = %self.assistant_id, "starting voice session");
        if let Err(e) = client.start(&self.assistant_id).await {
            tracing::warn!(error = %e, "failed to start voice session");
            self.machine.record_error(START_ERROR);
        }
    }

    async fn end(&mut self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        if !self.machine.state().is_active() {
            tracing::debug!(state = ?self.machine.state(), "end ignored, no active session");
            return;
        }

        tracing::info!(session_id = ?self.machine.session_id(), "ending voice session");
        if let Err(e) = client.stop().await {
            tracing::warn!(error = %e, "failed to end voice session");
        }
    }

    /// Unconditional cleanup so no provider session is left open
    async fn close(&mut self) {
        self.reset = None;
        let Some(client) = self.client.take() else {
            return;
        };
        if let Err(e) = client.stop().await {
            tracing::debug!(error = %e, "voice client stop during shutdown failed");
        }
    }

    fn on_frame(&mut self, frame: &Value) {
        match SessionEvent::from_json(frame) {
            Ok(Some(event)) => self.on_event(&event),
            Ok(None) => {
                tracing::trace!(kind = ?frame.get("event"), "ignoring non-session frame");
            }
            Err(e) => {
                tracing::warn!(error = %e, "degrading undecodable event to error");
                self.on_event(&SessionEvent::error(e.to_string()));
            }
        }
    }

    fn on_event(&mut self, event: &SessionEvent) {
        let now = chrono::Utc::now().timestamp_millis();
        let transition = self.machine.apply(event, now);
        tracing::debug!(event = event.name(), ?transition, "session event");

        match transition {
            Transition::Started => {
                self.reset = None;
                tracing::info!(session_id = ?self.machine.session_id(), "voice session started");
            }
            Transition::Ended => {
                self.reset = Some(Box::pin(sleep(self.reset_delay)));
                tracing::info!(session_id = ?self.machine.session_id(), "voice session ended");
            }
            Transition::Updated => {
                if let SessionEvent::Error { error } = event {
                    tracing::warn!(%error, "voice client reported an error");
                }
            }
            Transition::Ignored => {}
        }
    }

    fn on_reset(&mut self) {
        self.reset = None;
        self.machine.reset();
        tracing::debug!("ended session reset to idle");
    }

    fn publish(&self) {
        let snapshot = self.machine.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

async fn next_frame(events: &mut Option<EventReceiver>) -> Option<Value> {
    match events {
        Some(rx) => rx.recv().await,
        None => pending().await,
    }
}

async fn wait_reset(reset: &mut Option<Pin<Box<Sleep>>>) {
    match reset {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::event::Role;
    use crate::session::replay::ReplayClient;
    use crate::session::state::{Activity, SessionState};

    fn config() -> SessionConfig {
        SessionConfig {
            reset_delay: Duration::from_secs(3),
        }
    }

    fn spawn_with(client: &Arc<ReplayClient>) -> SessionHandle {
        let dyn_client: Arc<dyn VoiceClient> = client.clone();
        SessionOrchestrator::spawn(Ok(dyn_client), "asst_1", &config())
    }

    async fn wait_for(
        handle: &SessionHandle,
        f: impl FnMut(&SessionSnapshot) -> bool,
    ) -> SessionSnapshot {
        let mut rx = handle.subscribe();
        let snapshot = rx.wait_for(f).await.unwrap().clone();
        snapshot
    }

    #[tokio::test(start_paused = true)]
    async fn scripted_call_reaches_listening_with_transcript() {
        let client = Arc::new(ReplayClient::new(vec![
            SessionEvent::CallStart,
            SessionEvent::SpeechStart,
            SessionEvent::transcript(Role::Agent, "Hi, how can I help?"),
            SessionEvent::transcript(Role::Agent, "Hi, how can I help?"),
            SessionEvent::SpeechEnd,
            SessionEvent::transcript(Role::User, "Book a table"),
        ]));
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        let snapshot = wait_for(&handle, |s| s.transcript.len() == 2).await;

        assert_eq!(snapshot.state, SessionState::Active(Activity::Listening));
        assert_eq!(snapshot.transcript[0].text, "Hi, how can I help?");
        assert_eq!(snapshot.transcript[1].role, Role::User);
        assert!(snapshot.session_id.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn ended_session_resets_after_delay() {
        let client = Arc::new(ReplayClient::new(vec![
            SessionEvent::CallStart,
            SessionEvent::transcript(Role::User, "bye"),
            SessionEvent::CallEnd,
        ]));
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        let ended = wait_for(&handle, |s| s.state == SessionState::Ended).await;
        assert_eq!(ended.transcript.len(), 1);

        tokio::time::sleep(Duration::from_millis(2900)).await;
        assert_eq!(handle.snapshot().state, SessionState::Ended);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let idle = wait_for(&handle, |s| s.state == SessionState::Idle).await;
        assert!(idle.transcript.is_empty());
        assert!(idle.session_id.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_during_ended_supersedes_reset() {
        let client = Arc::new(ReplayClient::with_sessions(vec![
            vec![
                SessionEvent::CallStart,
                SessionEvent::transcript(Role::User, "first"),
                SessionEvent::CallEnd,
            ],
            vec![SessionEvent::CallStart],
        ]));
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        wait_for(&handle, |s| s.state == SessionState::Ended).await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.start().await.unwrap();
        let second = wait_for(&handle, |s| s.state.is_active()).await;
        assert!(second.transcript.is_empty());

        // The first session's reset must not fire into the second session
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(handle.snapshot().state.is_active());
        assert_eq!(client.start_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_start_records_error_without_state_change() {
        let client = Arc::new(ReplayClient::new(vec![SessionEvent::CallStart]).failing_start());
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        let snapshot = wait_for(&handle, |s| s.error.is_some()).await;
        assert_eq!(snapshot.error.as_deref(), Some(START_ERROR));
        assert_eq!(snapshot.state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_start_from_ended_lands_idle() {
        let client = Arc::new(ReplayClient::new(vec![]).failing_start());
        let handle = spawn_with(&client);

        client.emit(&SessionEvent::CallStart);
        client.emit(&SessionEvent::transcript(Role::Agent, "Goodbye"));
        client.emit(&SessionEvent::CallEnd);
        let ended = wait_for(&handle, |s| s.state == SessionState::Ended).await;
        assert_eq!(ended.transcript.len(), 1);

        handle.start().await.unwrap();
        let snapshot = wait_for(&handle, |s| s.error.is_some()).await;
        assert_eq!(snapshot.error.as_deref(), Some(START_ERROR));
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.transcript.is_empty());
        assert!(snapshot.session_id.is_none());

        // The superseded reset timer is gone as well
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(handle.snapshot().error.as_deref(), Some(START_ERROR));
    }

    #[tokio::test(start_paused = true)]
    async fn init_failure_leaves_loop_idle() {
        let handle = SessionOrchestrator::spawn(
            Err(Error::Config("missing public key".to_string())),
            "asst_1",
            &config(),
        );

        handle.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let snapshot = handle.snapshot();
        assert!(!snapshot.ready);
        assert_eq!(snapshot.state, SessionState::Idle);
        assert_eq!(
            snapshot.error.as_deref(),
            Some(crate::session::machine::INIT_ERROR)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn end_waits_for_call_end_event() {
        let client = Arc::new(ReplayClient::new(vec![SessionEvent::CallStart]).ending_on_stop());
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        wait_for(&handle, |s| s.state.is_active()).await;

        handle.end().await.unwrap();
        wait_for(&handle, |s| s.state == SessionState::Ended).await;
        assert_eq!(client.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_end_leaves_session_active() {
        let client = Arc::new(ReplayClient::new(vec![SessionEvent::CallStart]).failing_stop());
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        wait_for(&handle, |s| s.state.is_active()).await;

        handle.end().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(handle.snapshot().state.is_active());
        assert!(handle.snapshot().error.is_none());
        assert_eq!(client.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_session_frame_becomes_error() {
        let client = Arc::new(ReplayClient::new(vec![SessionEvent::CallStart]));
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        wait_for(&handle, |s| s.state.is_active()).await;

        client.emit_frame(serde_json::json!({
            "event": "message",
            "message": { "type": "transcript" }
        }));
        let snapshot = wait_for(&handle, |s| s.error.is_some()).await;
        assert!(snapshot.state.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn telemetry_frames_leave_session_untouched() {
        let client = Arc::new(ReplayClient::new(vec![
            SessionEvent::CallStart,
            SessionEvent::SpeechStart,
        ]));
        let handle = spawn_with(&client);

        handle.start().await.unwrap();
        let before = wait_for(&handle, |s| s.state.is_speaking()).await;

        client.emit_frame(serde_json::json!({ "event": "volume-level", "volume": 0.4 }));
        client.emit_frame(serde_json::json!({
            "event": "call-start-progress",
            "stage": "connected"
        }));
        client.emit_frame(serde_json::json!({
            "event": "message",
            "message": { "type": "transcript", "role": "system", "transcript": "You are a host" }
        }));
        client.emit(&SessionEvent::transcript(Role::User, "still here"));

        let after = wait_for(&handle, |s| s.transcript.len() == 1).await;
        assert!(after.error.is_none());
        assert_eq!(after.state, SessionState::Active(Activity::Speaking));
        assert_eq!(after.session_id, before.session_id);
        assert_eq!(after.transcript[0].text, "still here");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_always_stops_client() {
        let client = Arc::new(ReplayClient::new(vec![]));
        let handle = spawn_with(&client);

        handle.shutdown().await.unwrap();
        assert_eq!(client.stop_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_client() {
        let client = Arc::new(ReplayClient::new(vec![]));
        let handle = spawn_with(&client);
        drop(handle);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(client.stop_count(), 1);
    }
}
