// consent-flow-core/src/interfaces/mod.rs
// ============================================================================
// Module: Consent Flow Interfaces
// Description: Backend-agnostic traits for rendering, persistence, and observers.
// Purpose: Define the seams the workflow controller calls across.
// Dependencies: crate::core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The controller never talks to a PDF library, an HTTP client, or a realtime
//! channel directly. It calls the traits declared here: a
//! [`DocumentRenderer`] for export, a [`DocumentStore`] for the per-user
//! dashboard, a [`SessionObserver`] for checkpoint notifications, and an
//! [`AssistantTokenSource`] for ephemeral assistant credentials.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use thiserror::Error;

use crate::core::AgreementText;
use crate::core::DocumentId;
use crate::core::DocumentType;
use crate::core::FormData;
use crate::core::SignaturePayload;
use crate::core::WorkflowSnapshot;

// ============================================================================
// SECTION: Document Payloads
// ============================================================================

/// Session content saved alongside a rendered document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPayload {
    /// Type the user selected.
    pub form_type: DocumentType,
    /// Title printed on the document.
    pub form_title: String,
    /// Accumulated answers.
    #[serde(default)]
    pub form_data: FormData,
    /// Captured signatures.
    #[serde(default)]
    pub signatures: Option<SignaturePayload>,
    /// Custom template markup for custom types.
    #[serde(default)]
    pub custom_agreement_content: Option<String>,
}

impl DocumentPayload {
    /// Resolves the agreement text for this payload.
    #[must_use]
    pub fn agreement(&self) -> AgreementText {
        AgreementText::resolve(&self.form_type, Some(&self.form_title), self.custom_agreement_content.as_deref())
    }

    /// Builds the render request for this payload.
    #[must_use]
    pub fn render_request(&self) -> RenderRequest {
        RenderRequest {
            document_type: self.form_type.clone(),
            agreement: self.agreement(),
            form_data: self.form_data.clone(),
            signatures: self.signatures.clone(),
        }
    }
}

// ============================================================================
// SECTION: Document Renderer
// ============================================================================

/// Input to a document renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest {
    /// Type the user selected.
    pub document_type: DocumentType,
    /// Title and agreement body.
    pub agreement: AgreementText,
    /// Accumulated answers.
    pub form_data: FormData,
    /// Captured signatures, if any.
    pub signatures: Option<SignaturePayload>,
}

/// Rendered document bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Encoded document.
    pub bytes: Vec<u8>,
    /// Media type of `bytes`.
    pub content_type: &'static str,
    /// Number of pages produced.
    pub page_count: usize,
    /// Placeholder lines drawn in place of undecodable images.
    pub placeholders: Vec<String>,
}

/// Document rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Document encoding failed.
    #[error("document encoding failed: {0}")]
    Encoding(String),
    /// Render input is unusable.
    #[error("invalid render input: {0}")]
    Invalid(String),
}

/// Renders a completed session into a paginated document.
pub trait DocumentRenderer {
    /// Renders the document.
    ///
    /// Undecodable embedded images must degrade to placeholder text rather
    /// than fail the render.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the document cannot be encoded.
    fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, RenderError>;
}

// ============================================================================
// SECTION: Document Store
// ============================================================================

/// Saved document listed on the user dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedDocument {
    /// Store-assigned identifier.
    #[serde(rename = "_id")]
    pub id: DocumentId,
    /// Document title.
    #[serde(default)]
    pub title: String,
    /// Creation timestamp as reported by the store.
    #[serde(default, rename = "createdAt")]
    pub created_at: Option<String>,
    /// Saved session content; absent when the stored payload is unreadable.
    #[serde(default, deserialize_with = "lenient_payload")]
    pub payload: Option<DocumentPayload>,
}

impl SavedDocument {
    /// Returns the download file name, `<title-with-dashes>-<id>.pdf`.
    #[must_use]
    pub fn download_file_name(&self) -> String {
        format!("{}-{}.pdf", dashed(&self.title), self.id)
    }
}

/// Upload of a rendered document.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadRequest {
    /// Document title.
    pub title: String,
    /// File name sent with the blob.
    pub file_name: String,
    /// Rendered bytes.
    pub bytes: Vec<u8>,
    /// Media type of `bytes`.
    pub content_type: &'static str,
    /// Session content saved alongside the blob.
    pub payload: DocumentPayload,
}

impl UploadRequest {
    /// Creates an upload for a rendered document.
    #[must_use]
    pub fn new(payload: DocumentPayload, document: RenderedDocument) -> Self {
        let title = payload.form_title.clone();
        Self {
            file_name: format!("{}.pdf", dashed(&title)),
            title,
            bytes: document.bytes,
            content_type: document.content_type,
            payload,
        }
    }
}

/// Document store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller is not signed in.
    #[error("document store requires a signed-in user")]
    Unauthorized,
    /// Document was not found.
    #[error("document not found: {0}")]
    NotFound(String),
    /// Transport or I/O failure.
    #[error("document store io error: {0}")]
    Io(String),
    /// Store returned unusable data.
    #[error("document store invalid data: {0}")]
    Invalid(String),
}

/// Per-user document persistence.
pub trait DocumentStore {
    /// Lists saved documents.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when listing fails.
    fn list(&self) -> Result<Vec<SavedDocument>, StoreError>;

    /// Uploads a rendered document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the upload fails.
    fn upload(&self, request: &UploadRequest) -> Result<SavedDocument, StoreError>;

    /// Deletes a saved document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when deletion fails.
    fn delete(&self, id: &DocumentId) -> Result<(), StoreError>;
}

// ============================================================================
// SECTION: Session Observer
// ============================================================================

/// Receives a snapshot after every session change.
///
/// Observers filter on `snapshot_version` to react only to checkpoints.
pub trait SessionObserver: Send + Sync {
    /// Called with the latest session snapshot.
    fn session_changed(&self, snapshot: &WorkflowSnapshot);
}

// ============================================================================
// SECTION: Assistant Credentials
// ============================================================================

/// Assistant credential errors.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Caller is not signed in.
    #[error("assistant token requires a signed-in user")]
    Unauthorized,
    /// Token request failed.
    #[error("assistant token request failed: {0}")]
    Request(String),
}

/// Issues short-lived credentials for the realtime assistant.
pub trait AssistantTokenSource: Send + Sync {
    /// Returns an ephemeral key scoped to `lang`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] when no key can be issued.
    fn ephemeral_token(&self, lang: &str) -> Result<String, TokenError>;
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Replaces whitespace runs with single dashes.
fn dashed(title: &str) -> String {
    title.split_whitespace().collect::<Vec<_>>().join("-")
}

/// Deserializes a payload, mapping unreadable content to `None`.
fn lenient_payload<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DocumentPayload>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| match value {
        serde_json::Value::String(text) => serde_json::from_str(&text).ok(),
        other => serde_json::from_value(other).ok(),
    }))
}
