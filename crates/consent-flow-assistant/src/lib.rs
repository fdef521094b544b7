// consent-flow-assistant/src/lib.rs
// ============================================================================
// Module: Consent Flow Assistant Library
// Description: Optional realtime assistant that follows the form workflow.
// Purpose: Share form checkpoints with a voice assistant without coupling it
//          to the workflow.
// Dependencies: async-trait, consent-flow-core, serde, tokio, tokio-util
// ============================================================================

//! ## Overview
//! The workflow publishes snapshots through [`SnapshotPublisher`]; an
//! [`AssistantBridge`] reads them and relays checkpoints over a realtime
//! channel opened by a [`RealtimeConnector`]. The bridge never writes back
//! to the workflow.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod bridge;
pub mod protocol;
pub mod transport;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use bridge::AssistantBridge;
pub use bridge::AssistantError;
pub use bridge::AssistantSettings;
pub use bridge::AssistantStatus;
pub use bridge::SnapshotPublisher;
pub use protocol::ClientEvent;
pub use protocol::ServerEvent;
pub use protocol::SnapshotReason;
pub use transport::ChannelConnector;
pub use transport::ConnectRequest;
pub use transport::MicrophoneTrack;
pub use transport::RealtimeChannel;
pub use transport::RealtimeConnector;
pub use transport::RemoteEnd;
