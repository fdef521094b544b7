// consent-flow-assistant/src/transport.rs
// ============================================================================
// Module: Realtime Transport
// Description: Connector seam for realtime sessions and an in-process channel
//              implementation.
// Purpose: Keep media and channel setup behind an async trait.
// Dependencies: async-trait, tokio
// ============================================================================

//! ## Overview
//! A [`RealtimeConnector`] turns an ephemeral key into an open
//! [`RealtimeChannel`]: a text sender, a text receiver, and an optional
//! microphone track. Closing is dropping the sender; the far end observes
//! the receiver ending. [`ChannelConnector`] wires both ends in-process so
//! the bridge can run without network media.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::bridge::AssistantError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Buffered messages per direction of an in-process channel.
const CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Parameters for opening a realtime session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Realtime endpoint.
    pub url: String,
    /// Model identifier.
    pub model: String,
    /// Ephemeral key authorizing the session.
    pub ephemeral_key: String,
}

/// Captured microphone input.
pub trait MicrophoneTrack: Send {
    /// Stops capturing. Must not block.
    fn stop(&mut self);
}

/// Open realtime data channel.
pub struct RealtimeChannel {
    /// Outgoing envelopes.
    pub outgoing: mpsc::Sender<String>,
    /// Incoming envelopes; ends when the far side closes.
    pub incoming: mpsc::Receiver<String>,
    /// Microphone feeding the session, if one was opened.
    pub microphone: Option<Box<dyn MicrophoneTrack>>,
}

/// Opens realtime sessions.
#[async_trait]
pub trait RealtimeConnector: Send + Sync {
    /// Connects and resolves once the data channel is open.
    ///
    /// # Errors
    ///
    /// Returns [`AssistantError`] when the session cannot be established.
    async fn connect(&self, request: ConnectRequest) -> Result<RealtimeChannel, AssistantError>;
}

// ============================================================================
// SECTION: In-Process Transport
// ============================================================================

/// Far end of an in-process channel, standing in for the realtime service.
pub struct RemoteEnd {
    /// Request that opened the channel.
    pub request: ConnectRequest,
    /// Envelopes sent by the bridge.
    pub received: mpsc::Receiver<String>,
    /// Sender for envelopes delivered to the bridge.
    pub reply: mpsc::Sender<String>,
    /// Whether the bridge stopped the microphone.
    pub microphone_stopped: Arc<AtomicBool>,
}

/// Microphone stand-in that records when it is stopped.
struct FlagMicrophone {
    /// Set once stopped.
    stopped: Arc<AtomicBool>,
}

impl MicrophoneTrack for FlagMicrophone {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Connector that wires the bridge to an in-process [`RemoteEnd`].
#[derive(Clone, Default)]
pub struct ChannelConnector {
    /// Remote ends awaiting pickup.
    remotes: Arc<Mutex<Vec<RemoteEnd>>>,
    /// Error returned instead of connecting, if set.
    failure: Option<String>,
}

impl ChannelConnector {
    /// Creates a connector that always connects.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a connector that always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            remotes: Arc::default(),
            failure: Some(message.into()),
        }
    }

    /// Takes the oldest remote end not yet picked up.
    #[must_use]
    pub fn take_remote(&self) -> Option<RemoteEnd> {
        let mut remotes = self.remotes.lock().ok()?;
        if remotes.is_empty() { None } else { Some(remotes.remove(0)) }
    }
}

#[async_trait]
impl RealtimeConnector for ChannelConnector {
    async fn connect(&self, request: ConnectRequest) -> Result<RealtimeChannel, AssistantError> {
        if let Some(message) = &self.failure {
            return Err(AssistantError::Connect(message.clone()));
        }
        let (outgoing, received) = mpsc::channel(CHANNEL_CAPACITY);
        let (reply, incoming) = mpsc::channel(CHANNEL_CAPACITY);
        let microphone_stopped = Arc::new(AtomicBool::new(false));
        let microphone = FlagMicrophone {
            stopped: Arc::clone(&microphone_stopped),
        };
        self.remotes
            .lock()
            .map_err(|_| AssistantError::Connect("connector mutex poisoned".to_string()))?
            .push(RemoteEnd {
                request,
                received,
                reply,
                microphone_stopped,
            });
        Ok(RealtimeChannel {
            outgoing,
            incoming,
            microphone: Some(Box::new(microphone)),
        })
    }
}
