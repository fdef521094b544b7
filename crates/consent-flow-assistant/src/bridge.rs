// consent-flow-assistant/src/bridge.rs
// ============================================================================
// Module: Assistant Bridge
// Description: Live assistant session that follows workflow snapshots.
// Purpose: Send form snapshots at checkpoints and tear down safely.
// Dependencies: consent-flow-core, tokio, tokio-util
// ============================================================================

//! ## Overview
//! [`AssistantBridge`] runs one realtime session as a tokio task. The task
//! fetches an ephemeral key, opens a channel through a
//! [`RealtimeConnector`], sends the current snapshot and opening
//! instructions once, then watches the snapshot channel and forwards a new
//! snapshot only when the version changes to a new non-zero value.
//!
//! The bridge only reads the snapshot channel; [`SnapshotPublisher`] is the
//! single writer and is registered with the workflow controller as a
//! [`SessionObserver`].
//!
//! [`AssistantBridge::stop`] is synchronous and never fails. It cancels the
//! task, sends a farewell when the channel is open, closes the channel and
//! stops the microphone. Each resource lives in an `Option` slot and missing
//! ones are skipped, so stopping before setup completes is safe. Failures to
//! connect degrade to [`AssistantStatus::Unavailable`] and never reach the
//! workflow.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::time::Duration;

use consent_flow_core::AssistantTokenSource;
use consent_flow_core::DocumentType;
use consent_flow_core::SessionObserver;
use consent_flow_core::WorkflowAuditSink;
use consent_flow_core::WorkflowSnapshot;
use consent_flow_core::runtime::AssistantAuditEvent;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::protocol::ClientEvent;
use crate::protocol::FAREWELL;
use crate::protocol::ServerEvent;
use crate::protocol::SnapshotReason;
use crate::protocol::instructions_for;
use crate::protocol::snapshot_message;
use crate::transport::ConnectRequest;
use crate::transport::MicrophoneTrack;
use crate::transport::RealtimeChannel;
use crate::transport::RealtimeConnector;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default realtime endpoint.
pub const DEFAULT_REALTIME_URL: &str = "https://api.openai.com/v1/realtime";

/// Default realtime model.
pub const DEFAULT_MODEL: &str = "gpt-realtime-mini";

/// Default assistant language.
pub const DEFAULT_LANG: &str = "en";

/// Role reported for messages produced by the assistant.
const ASSISTANT_ROLE: &str = "assistant";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Assistant session errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssistantError {
    /// Ephemeral key could not be obtained.
    #[error("assistant token unavailable: {0}")]
    Token(String),
    /// Realtime session could not be opened.
    #[error("assistant connection failed: {0}")]
    Connect(String),
    /// Setup exceeded the configured connect timeout.
    #[error("assistant connection timed out after {0} ms")]
    Timeout(u128),
    /// Data channel closed or rejected a message.
    #[error("assistant channel error: {0}")]
    Channel(String),
    /// A session is already running.
    #[error("assistant session already running")]
    AlreadyRunning,
    /// No tokio runtime is available to run the session.
    #[error("assistant requires a tokio runtime: {0}")]
    Runtime(String),
    /// A message could not be encoded.
    #[error("assistant protocol error: {0}")]
    Protocol(String),
}

// ============================================================================
// SECTION: Settings and Status
// ============================================================================

/// Assistant session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    /// Realtime endpoint.
    pub realtime_url: String,
    /// Realtime model.
    pub model: String,
    /// Language used to scope the ephemeral key.
    pub lang: String,
    /// Optional limit on key fetch plus connect.
    pub connect_timeout: Option<Duration>,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            realtime_url: DEFAULT_REALTIME_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            lang: DEFAULT_LANG.to_string(),
            connect_timeout: None,
        }
    }
}

/// Observable assistant status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssistantStatus {
    /// Not started.
    Idle,
    /// Fetching a key or opening the channel.
    Connecting,
    /// Channel open.
    Active,
    /// Session could not be opened or failed.
    Unavailable(String),
    /// Session ended.
    Stopped,
}

impl AssistantStatus {
    /// Returns the status label used in audit events.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Active => "active",
            Self::Unavailable(_) => "unavailable",
            Self::Stopped => "stopped",
        }
    }
}

// ============================================================================
// SECTION: Snapshot Publisher
// ============================================================================

/// Single writer of the snapshot watch channel.
pub struct SnapshotPublisher {
    /// Watch sender holding the latest snapshot.
    sender: watch::Sender<WorkflowSnapshot>,
}

impl SnapshotPublisher {
    /// Creates a publisher seeded with `initial` and its first receiver.
    #[must_use]
    pub fn new(initial: WorkflowSnapshot) -> (Arc<Self>, watch::Receiver<WorkflowSnapshot>) {
        let (sender, receiver) = watch::channel(initial);
        (
            Arc::new(Self {
                sender,
            }),
            receiver,
        )
    }

    /// Returns another receiver for the same channel.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowSnapshot> {
        self.sender.subscribe()
    }

    /// Returns a copy of the latest snapshot.
    #[must_use]
    pub fn latest(&self) -> WorkflowSnapshot {
        self.sender.borrow().clone()
    }
}

impl SessionObserver for SnapshotPublisher {
    fn session_changed(&self, snapshot: &WorkflowSnapshot) {
        self.sender.send_replace(snapshot.clone());
    }
}

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// State shared between the bridge handle and its task.
struct Shared {
    /// Current status.
    status: AssistantStatus,
    /// Last complete assistant message.
    last_message: Option<String>,
    /// Last error reported by the service or the transport.
    last_error: Option<String>,
    /// Version of the last snapshot sent.
    sent_version: Option<u64>,
    /// Outgoing channel slot, filled once the channel opens.
    outgoing: Option<mpsc::Sender<String>>,
    /// Microphone slot, filled once the channel opens.
    microphone: Option<Box<dyn MicrophoneTrack>>,
}

impl Shared {
    /// Returns fresh state for a new session.
    const fn new() -> Self {
        Self {
            status: AssistantStatus::Idle,
            last_message: None,
            last_error: None,
            sent_version: None,
            outgoing: None,
            microphone: None,
        }
    }
}

/// Locks the shared state, recovering it if a holder panicked.
fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Bridge
// ============================================================================

/// Handle to an optional live assistant session.
pub struct AssistantBridge {
    /// Session settings.
    settings: AssistantSettings,
    /// Ephemeral key source.
    tokens: Arc<dyn AssistantTokenSource>,
    /// Channel connector.
    connector: Arc<dyn RealtimeConnector>,
    /// Audit sink for status changes.
    audit: Arc<dyn WorkflowAuditSink>,
    /// State shared with the running task.
    shared: Arc<Mutex<Shared>>,
    /// Cancellation for the running task.
    cancel: CancellationToken,
    /// Running task, if started.
    task: Option<JoinHandle<()>>,
}

impl AssistantBridge {
    /// Creates an idle bridge.
    #[must_use]
    pub fn new(
        settings: AssistantSettings,
        tokens: Arc<dyn AssistantTokenSource>,
        connector: Arc<dyn RealtimeConnector>,
        audit: Arc<dyn WorkflowAuditSink>,
    ) -> Self {
        Self {
            settings,
            tokens,
            connector,
            audit,
            shared: Arc::new(Mutex::new(Shared::new())),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    /// Starts a session following `snapshots`.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError::AlreadyRunning`] when a session is live and
    /// [`AssistantError::Runtime`] outside a tokio runtime. Connection
    /// failures are reported through [`Self::status`] instead.
    pub fn start(&mut self, snapshots: watch::Receiver<WorkflowSnapshot>) -> Result<(), AssistantError> {
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return Err(AssistantError::AlreadyRunning);
        }
        let handle = Handle::try_current().map_err(|err| AssistantError::Runtime(err.to_string()))?;
        self.cancel = CancellationToken::new();
        *lock(&self.shared) = Shared::new();
        let session = Session {
            settings: self.settings.clone(),
            tokens: Arc::clone(&self.tokens),
            connector: Arc::clone(&self.connector),
            audit: Arc::clone(&self.audit),
            shared: Arc::clone(&self.shared),
            cancel: self.cancel.clone(),
        };
        session.set_status(AssistantStatus::Connecting, None);
        self.task = Some(handle.spawn(session.run(snapshots)));
        Ok(())
    }

    /// Stops the session. Safe to call at any time, any number of times.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        let (outgoing, microphone, previous, version) = {
            let mut shared = lock(&self.shared);
            let previous = shared.status.clone();
            if !matches!(previous, AssistantStatus::Idle) {
                shared.status = AssistantStatus::Stopped;
            }
            (shared.outgoing.take(), shared.microphone.take(), previous, shared.sent_version)
        };
        if let Some(outgoing) = outgoing {
            for event in ClientEvent::user_text(FAREWELL) {
                if let Ok(json) = event.to_json() {
                    let _ = outgoing.try_send(json);
                }
            }
        }
        if let Some(mut microphone) = microphone {
            microphone.stop();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        if !matches!(previous, AssistantStatus::Idle | AssistantStatus::Stopped) {
            self.audit.record_assistant(&AssistantAuditEvent::new(AssistantStatus::Stopped.as_str(), version, None));
        }
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> AssistantStatus {
        lock(&self.shared).status.clone()
    }

    /// Returns the last complete assistant message.
    #[must_use]
    pub fn last_message(&self) -> Option<String> {
        lock(&self.shared).last_message.clone()
    }

    /// Returns the last reported error.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        lock(&self.shared).last_error.clone()
    }

    /// Returns the version of the last snapshot sent.
    #[must_use]
    pub fn sent_version(&self) -> Option<u64> {
        lock(&self.shared).sent_version
    }

    /// Returns the session settings.
    #[must_use]
    pub const fn settings(&self) -> &AssistantSettings {
        &self.settings
    }
}

impl Drop for AssistantBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// SECTION: Session Task
// ============================================================================

/// Identity of the last checkpoint the task has seen.
///
/// A version-0 snapshot resets the mark, so the first commit after a start
/// over is sent even though its version repeats an earlier one. The selected
/// type is part of the mark because the watch channel may coalesce the reset
/// with the commit that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SentMark {
    /// Selected document type.
    selected_type: Option<DocumentType>,
    /// Snapshot version.
    version: u64,
}

impl SentMark {
    /// Returns the mark of `snapshot`.
    fn of(snapshot: &WorkflowSnapshot) -> Self {
        Self {
            selected_type: snapshot.selected_type.clone(),
            version: snapshot.snapshot_version,
        }
    }
}

/// Everything the session task owns.
struct Session {
    /// Session settings.
    settings: AssistantSettings,
    /// Ephemeral key source.
    tokens: Arc<dyn AssistantTokenSource>,
    /// Channel connector.
    connector: Arc<dyn RealtimeConnector>,
    /// Audit sink.
    audit: Arc<dyn WorkflowAuditSink>,
    /// State shared with the handle.
    shared: Arc<Mutex<Shared>>,
    /// Cancellation shared with the handle.
    cancel: CancellationToken,
}

impl Session {
    /// Runs the session until cancelled or the channel closes.
    async fn run(self, mut snapshots: watch::Receiver<WorkflowSnapshot>) {
        let opened = tokio::select! {
            () = self.cancel.cancelled() => return,
            opened = self.open() => opened,
        };
        let channel = match opened {
            Ok(channel) => channel,
            Err(err) => {
                self.fail(&err);
                return;
            }
        };
        let RealtimeChannel {
            outgoing,
            mut incoming,
            microphone,
        } = channel;
        if !self.install(&outgoing, microphone) {
            return;
        }
        let initial = snapshots.borrow_and_update().clone();
        if let Err(err) = self.send_initial(&outgoing, &initial).await {
            self.fail(&err);
            return;
        }
        let mut last_sent = SentMark::of(&initial);
        let mut watching = true;
        let mut pending = String::new();
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                changed = snapshots.changed(), if watching => {
                    if changed.is_err() {
                        watching = false;
                        continue;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    let mark = SentMark::of(&snapshot);
                    if snapshot.snapshot_version == 0 {
                        last_sent = mark;
                        continue;
                    }
                    if mark == last_sent {
                        continue;
                    }
                    last_sent = mark;
                    if let Err(err) = self.send_snapshot(&outgoing, &snapshot, SnapshotReason::StepCommitted).await {
                        self.fail(&err);
                        break;
                    }
                }
                message = incoming.recv() => {
                    let Some(text) = message else {
                        self.closed();
                        break;
                    };
                    self.handle(&text, &mut pending);
                }
            }
        }
    }

    /// Fetches a key and opens the channel, within the connect timeout.
    async fn open(&self) -> Result<RealtimeChannel, AssistantError> {
        let setup = async {
            let tokens = Arc::clone(&self.tokens);
            let lang = self.settings.lang.clone();
            let key = tokio::task::spawn_blocking(move || tokens.ephemeral_token(&lang))
                .await
                .map_err(|err| AssistantError::Token(err.to_string()))?
                .map_err(|err| AssistantError::Token(err.to_string()))?;
            self.connector
                .connect(ConnectRequest {
                    url: self.settings.realtime_url.clone(),
                    model: self.settings.model.clone(),
                    ephemeral_key: key,
                })
                .await
        };
        match self.settings.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, setup)
                .await
                .map_err(|_| AssistantError::Timeout(limit.as_millis()))?,
            None => setup.await,
        }
    }

    /// Stores channel resources for teardown; false when already cancelled.
    fn install(&self, outgoing: &mpsc::Sender<String>, microphone: Option<Box<dyn MicrophoneTrack>>) -> bool {
        let mut shared = lock(&self.shared);
        if self.cancel.is_cancelled() {
            drop(shared);
            if let Some(mut microphone) = microphone {
                microphone.stop();
            }
            return false;
        }
        shared.outgoing = Some(outgoing.clone());
        shared.microphone = microphone;
        shared.status = AssistantStatus::Active;
        drop(shared);
        self.audit.record_assistant(&AssistantAuditEvent::new(AssistantStatus::Active.as_str(), None, None));
        true
    }

    /// Sends the opening snapshot and instructions.
    async fn send_initial(
        &self,
        outgoing: &mpsc::Sender<String>,
        snapshot: &WorkflowSnapshot,
    ) -> Result<(), AssistantError> {
        self.send_snapshot(outgoing, snapshot, SnapshotReason::Initial).await?;
        send_text(outgoing, instructions_for(snapshot.step)).await
    }

    /// Sends one snapshot and records its version.
    async fn send_snapshot(
        &self,
        outgoing: &mpsc::Sender<String>,
        snapshot: &WorkflowSnapshot,
        reason: SnapshotReason,
    ) -> Result<(), AssistantError> {
        let text = snapshot_message(snapshot, reason).map_err(|err| AssistantError::Protocol(err.to_string()))?;
        send_text(outgoing, &text).await?;
        lock(&self.shared).sent_version = Some(snapshot.snapshot_version);
        self.audit.record_assistant(&AssistantAuditEvent::new(
            "snapshot_sent",
            Some(snapshot.snapshot_version),
            Some(reason.as_str().to_string()),
        ));
        Ok(())
    }

    /// Applies one incoming envelope.
    fn handle(&self, text: &str, pending: &mut String) {
        let Ok(event) = ServerEvent::parse(text) else {
            return;
        };
        match event {
            ServerEvent::ConversationItemCreated {
                item,
            } if item.role == ASSISTANT_ROLE => {
                if let Some(message) = item.text() {
                    lock(&self.shared).last_message = Some(message.to_string());
                }
            }
            ServerEvent::OutputTextDelta {
                delta,
            } => pending.push_str(&delta),
            ServerEvent::ResponseDone => {
                if !pending.is_empty() {
                    lock(&self.shared).last_message = Some(std::mem::take(pending));
                }
            }
            ServerEvent::AudioTranscriptDone {
                transcript,
            } if !transcript.is_empty() => {
                lock(&self.shared).last_message = Some(transcript);
            }
            ServerEvent::Error {
                error,
            } => {
                let message = error.message.unwrap_or_else(|| "assistant error".to_string());
                lock(&self.shared).last_error = Some(message.clone());
                self.audit.record_assistant(&AssistantAuditEvent::new("error", None, Some(message)));
            }
            _ => {}
        }
    }

    /// Sets the status unless the handle already stopped the session.
    fn set_status(&self, status: AssistantStatus, detail: Option<String>) {
        let version = {
            let mut shared = lock(&self.shared);
            if self.cancel.is_cancelled() {
                return;
            }
            shared.status = status.clone();
            shared.sent_version
        };
        self.audit.record_assistant(&AssistantAuditEvent::new(status.as_str(), version, detail));
    }

    /// Marks the session unavailable and releases its resources.
    fn fail(&self, err: &AssistantError) {
        let message = err.to_string();
        {
            let mut shared = lock(&self.shared);
            shared.last_error = Some(message.clone());
            shared.outgoing = None;
            if let Some(mut microphone) = shared.microphone.take() {
                microphone.stop();
            }
        }
        self.set_status(AssistantStatus::Unavailable(message.clone()), Some(message));
    }

    /// Marks the session stopped after the far side closed.
    fn closed(&self) {
        {
            let mut shared = lock(&self.shared);
            shared.outgoing = None;
            if let Some(mut microphone) = shared.microphone.take() {
                microphone.stop();
            }
        }
        self.set_status(AssistantStatus::Stopped, Some("channel closed".to_string()));
    }
}

/// Sends a user text message followed by a response request.
async fn send_text(outgoing: &mpsc::Sender<String>, text: &str) -> Result<(), AssistantError> {
    for event in ClientEvent::user_text(text) {
        let json = event.to_json().map_err(|err| AssistantError::Protocol(err.to_string()))?;
        outgoing.send(json).await.map_err(|_| AssistantError::Channel("data channel closed".to_string()))?;
    }
    Ok(())
}
