// consent-flow-assistant/src/protocol.rs
// ============================================================================
// Module: Realtime Protocol
// Description: JSON envelopes exchanged over the realtime data channel.
// Purpose: Encode outgoing client events and decode incoming server events.
// Dependencies: consent-flow-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every envelope carries a `type` discriminator. The bridge sends
//! `conversation.item.create` followed by `response.create` for each text
//! message. Incoming event types the bridge does not handle decode to
//! [`ServerEvent::Unknown`] and are ignored.
//!
//! Form snapshots travel as a user text message that starts with
//! `FORM_SNAPSHOT:`, followed by a short header and the pretty-printed
//! snapshot JSON.

// ============================================================================
// SECTION: Imports
// ============================================================================

use consent_flow_core::DocumentType;
use consent_flow_core::FormData;
use consent_flow_core::StepName;
use consent_flow_core::WorkflowSnapshot;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Message Texts
// ============================================================================

/// Marker line opening every snapshot message.
pub const SNAPSHOT_MARKER: &str = "FORM_SNAPSHOT:";

/// Instructions sent when the session opens on the review or export screens.
pub const SUMMARY_INSTRUCTIONS: &str = "You are assisting the user with reviewing a contract that is already filled in \
                                        the form. First, give a short summary (3-6 bullet points) of the contract in \
                                        simple language. After that, wait for the user's questions. Keep every \
                                        response short.";

/// Instructions sent when the session opens anywhere else.
pub const BUILDER_INSTRUCTIONS: &str = "You are assisting the user while they fill a contract form. You will receive \
                                        FORM_SNAPSHOT messages after each step is completed. Use them to understand \
                                        the contract and answer questions, but do NOT run your own step-by-step \
                                        interview.";

/// Message sent when the user ends the session.
pub const FAREWELL: &str = "The user is ending the session now. Thank you for your help.";

/// Why a snapshot is being sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotReason {
    /// First snapshot after the channel opened.
    Initial,
    /// A checkpoint advanced the snapshot version.
    StepCommitted,
}

impl SnapshotReason {
    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::StepCommitted => "step-committed",
        }
    }
}

/// JSON body embedded in a snapshot message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotBody<'a> {
    /// Selected document type.
    form_type: Option<&'a DocumentType>,
    /// Current workflow step.
    step: StepName,
    /// Accumulated answers.
    form_data: &'a FormData,
    /// Why the snapshot is sent.
    reason: SnapshotReason,
}

/// Returns the opening instructions for a workflow step.
#[must_use]
pub const fn instructions_for(step: StepName) -> &'static str {
    match step {
        StepName::Review | StepName::Export => SUMMARY_INSTRUCTIONS,
        _ => BUILDER_INSTRUCTIONS,
    }
}

/// Formats a snapshot message.
///
/// # Errors
///
/// Returns [`serde_json::Error`] when the form data cannot be serialized.
pub fn snapshot_message(snapshot: &WorkflowSnapshot, reason: SnapshotReason) -> Result<String, serde_json::Error> {
    let body = SnapshotBody {
        form_type: snapshot.selected_type.as_ref(),
        step: snapshot.step,
        form_data: &snapshot.form_data,
        reason,
    };
    let json = serde_json::to_string_pretty(&body)?;
    let form_type = snapshot.selected_type.as_ref().map_or_else(|| "unknown".to_string(), ToString::to_string);
    Ok([
        SNAPSHOT_MARKER.to_string(),
        format!("Reason: {}", reason.as_str()),
        format!("Form type: {form_type}"),
        format!("Current step: {}", snapshot.step),
        "JSON:".to_string(),
        json,
    ]
    .join("\n"))
}

// ============================================================================
// SECTION: Client Events
// ============================================================================

/// Event sent to the realtime service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Adds an item to the conversation.
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// Item to add.
        item: ConversationItem,
    },
    /// Asks the model to respond.
    #[serde(rename = "response.create")]
    ResponseCreate,
}

impl ClientEvent {
    /// Returns the two events that deliver a user text message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> [Self; 2] {
        [
            Self::ConversationItemCreate {
                item: ConversationItem::user_text(text),
            },
            Self::ResponseCreate,
        ]
    }

    /// Encodes the event as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when encoding fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Conversation item carried by [`ClientEvent::ConversationItemCreate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationItem {
    /// Item kind, always `message`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Speaker role.
    pub role: &'static str,
    /// Content parts.
    pub content: Vec<InputText>,
}

impl ConversationItem {
    /// Creates a user message with one text part.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            kind: "message",
            role: "user",
            content: vec![InputText {
                kind: "input_text",
                text: text.into(),
            }],
        }
    }
}

/// Text content part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputText {
    /// Part kind, always `input_text`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Text body.
    pub text: String,
}

// ============================================================================
// SECTION: Server Events
// ============================================================================

/// Event received from the realtime service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// An item was added to the conversation.
    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {
        /// Added item.
        item: ServerItem,
    },
    /// Incremental response text.
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// Text fragment.
        #[serde(default)]
        delta: String,
    },
    /// Final transcript of a spoken response.
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        /// Full transcript.
        #[serde(default)]
        transcript: String,
    },
    /// A response finished.
    #[serde(rename = "response.done")]
    ResponseDone,
    /// The service reported an error.
    #[serde(rename = "error")]
    Error {
        /// Error details.
        #[serde(default)]
        error: ServerError,
    },
    /// Any event type the bridge does not handle.
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decodes an incoming envelope.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when the text is not a typed envelope.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Conversation item reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerItem {
    /// Speaker role.
    #[serde(default)]
    pub role: String,
    /// Content parts.
    #[serde(default)]
    pub content: Vec<ServerContent>,
}

impl ServerItem {
    /// Returns the first part's text or transcript, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        let part = self.content.first()?;
        part.text.as_deref().filter(|text| !text.is_empty()).or_else(|| part.transcript.as_deref())
    }
}

/// Content part reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerContent {
    /// Text content.
    pub text: Option<String>,
    /// Audio transcript.
    pub transcript: Option<String>,
}

/// Error details reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerError {
    /// Human-readable message.
    pub message: Option<String>,
}
