// consent-flow-assistant/tests/common/mod.rs
// ============================================================================
// Module: Assistant Test Helpers
// Description: Token sources, connectors, and channel readers for bridge tests.
// Purpose: Drive the bridge against the in-process transport.
// Dependencies: async-trait, consent-flow-assistant, consent-flow-core, tokio
// ============================================================================

//! ## Overview
//! Builders for an [`AssistantBridge`] wired to a [`ChannelConnector`], plus
//! readers that decode what the bridge sent to the far end.

#![allow(dead_code, reason = "Helpers are shared across test crates that use different subsets.")]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use consent_flow_assistant::AssistantBridge;
use consent_flow_assistant::AssistantError;
use consent_flow_assistant::AssistantSettings;
use consent_flow_assistant::ChannelConnector;
use consent_flow_assistant::ConnectRequest;
use consent_flow_assistant::RealtimeChannel;
use consent_flow_assistant::RealtimeConnector;
use consent_flow_assistant::RemoteEnd;
use consent_flow_core::AssistantTokenSource;
use consent_flow_core::TokenError;
use consent_flow_core::runtime::MemoryAuditSink;

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(5);

/// Window in which no further message is expected.
pub const QUIET: Duration = Duration::from_millis(150);

/// Token source returning a fixed key or an authorization failure.
pub struct StaticTokens {
    /// Key to issue, or none to reject.
    key: Option<String>,
}

impl StaticTokens {
    pub fn issuing(key: &str) -> Arc<Self> {
        Arc::new(Self {
            key: Some(key.to_string()),
        })
    }

    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            key: None,
        })
    }
}

impl AssistantTokenSource for StaticTokens {
    fn ephemeral_token(&self, _lang: &str) -> Result<String, TokenError> {
        self.key.clone().ok_or(TokenError::Unauthorized)
    }
}

/// Connector whose connection never completes.
pub struct PendingConnector;

#[async_trait]
impl RealtimeConnector for PendingConnector {
    async fn connect(&self, _request: ConnectRequest) -> Result<RealtimeChannel, AssistantError> {
        std::future::pending().await
    }
}

/// Bridge under test with its connector and audit sink.
pub struct Harness {
    pub bridge: AssistantBridge,
    pub connector: ChannelConnector,
    pub audit: Arc<MemoryAuditSink>,
}

/// Builds a bridge over the in-process connector.
pub fn harness() -> Harness {
    harness_with(ChannelConnector::new(), AssistantSettings::default())
}

/// Builds a bridge over `connector` with `settings`.
pub fn harness_with(connector: ChannelConnector, settings: AssistantSettings) -> Harness {
    let audit = Arc::new(MemoryAuditSink::new());
    let bridge = AssistantBridge::new(settings, StaticTokens::issuing("ek_test"), Arc::new(connector.clone()), audit.clone());
    Harness {
        bridge,
        connector,
        audit,
    }
}

/// Waits for the bridge to open a channel and returns its far end.
pub async fn remote(connector: &ChannelConnector) -> RemoteEnd {
    tokio::time::timeout(WAIT, async {
        loop {
            if let Some(remote) = connector.take_remote() {
                return remote;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("bridge connected")
}

/// Polls `condition` until it holds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition reached");
}

/// Reads one user text message and its response request, returning the text.
pub async fn next_text(remote: &mut RemoteEnd) -> String {
    let item = next_envelope(remote).await;
    assert_eq!(item["type"], "conversation.item.create");
    assert_eq!(item["item"]["role"], "user");
    let response = next_envelope(remote).await;
    assert_eq!(response["type"], "response.create");
    item["item"]["content"][0]["text"].as_str().expect("text part").to_string()
}

/// Reads one envelope as JSON.
pub async fn next_envelope(remote: &mut RemoteEnd) -> serde_json::Value {
    let text = tokio::time::timeout(WAIT, remote.received.recv())
        .await
        .expect("message arrived")
        .expect("channel open");
    serde_json::from_str(&text).expect("json envelope")
}

/// Asserts nothing arrives within the quiet window.
pub async fn assert_quiet(remote: &mut RemoteEnd) {
    if let Ok(Some(text)) = tokio::time::timeout(QUIET, remote.received.recv()).await {
        panic!("unexpected message: {text}");
    }
}
