// consent-flow-core/src/runtime/export.rs
// ============================================================================
// Module: Consent Flow Export
// Description: Owned export jobs that render and save a completed session.
// Purpose: Decouple rendering and persistence from later session edits.
// Dependencies: crate::{core, interfaces, runtime}, thiserror
// ============================================================================

//! ## Overview
//! An [`ExportJob`] is an owned copy of the session content taken when export
//! starts. Rendering and uploading work on that copy, so nothing the user does
//! afterwards can change an in-flight document. Failures are reported once
//! and never retried.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::DocumentType;
use crate::interfaces::DocumentPayload;
use crate::interfaces::DocumentRenderer;
use crate::interfaces::DocumentStore;
use crate::interfaces::RenderError;
use crate::interfaces::RenderedDocument;
use crate::interfaces::SavedDocument;
use crate::interfaces::StoreError;
use crate::interfaces::UploadRequest;
use crate::runtime::audit::ExportAuditEvent;
use crate::runtime::audit::ExportOutcome;
use crate::runtime::audit::WorkflowAuditSink;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Rendering failed.
    #[error(transparent)]
    Render(#[from] RenderError),
    /// Upload failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Saved record has no readable payload.
    #[error("saved document {0} has no readable payload")]
    MissingPayload(String),
}

// ============================================================================
// SECTION: Export Job
// ============================================================================

/// Owned export of a completed session.
pub struct ExportJob {
    /// Session content captured at export time.
    payload: DocumentPayload,
    /// Audit sink for export events.
    audit: Arc<dyn WorkflowAuditSink>,
}

impl ExportJob {
    /// Creates a job over a captured payload.
    #[must_use]
    pub fn new(payload: DocumentPayload, audit: Arc<dyn WorkflowAuditSink>) -> Self {
        Self {
            payload,
            audit,
        }
    }

    /// Returns the captured payload.
    #[must_use]
    pub const fn payload(&self) -> &DocumentPayload {
        &self.payload
    }

    /// Returns the local file name, `<title-with-dashes>.pdf`.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.payload.form_title.split_whitespace().collect::<Vec<_>>().join("-"))
    }

    /// Renders the document.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the renderer fails.
    pub fn render<R: DocumentRenderer + ?Sized>(&self, renderer: &R) -> Result<RenderedDocument, RenderError> {
        render_payload(&self.payload, renderer, self.audit.as_ref())
    }

    /// Renders the document and uploads it with its payload.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] when rendering or the upload fails.
    pub fn save<R, S>(&self, renderer: &R, store: &S) -> Result<SavedDocument, ExportError>
    where
        R: DocumentRenderer + ?Sized,
        S: DocumentStore + ?Sized,
    {
        let document = self.render(renderer)?;
        let request = UploadRequest::new(self.payload.clone(), document);
        match store.upload(&request) {
            Ok(saved) => {
                let mut event = ExportAuditEvent::new(self.payload.form_type.to_string(), ExportOutcome::Saved);
                event.bytes = Some(request.bytes.len());
                self.audit.record_export(&event);
                Ok(saved)
            }
            Err(err) => {
                record_failure(self.audit.as_ref(), &self.payload.form_type, &err.to_string());
                Err(err.into())
            }
        }
    }
}

/// Renders a previously saved document from its stored payload.
///
/// # Errors
///
/// Returns [`ExportError`] when the payload is unreadable or rendering fails.
pub fn render_saved<R: DocumentRenderer + ?Sized>(
    document: &SavedDocument,
    renderer: &R,
    audit: &dyn WorkflowAuditSink,
) -> Result<RenderedDocument, ExportError> {
    let payload = document.payload.as_ref().ok_or_else(|| ExportError::MissingPayload(document.id.to_string()))?;
    Ok(render_payload(payload, renderer, audit)?)
}

/// Renders a payload and records the outcome.
fn render_payload<R: DocumentRenderer + ?Sized>(
    payload: &DocumentPayload,
    renderer: &R,
    audit: &dyn WorkflowAuditSink,
) -> Result<RenderedDocument, RenderError> {
    match renderer.render(&payload.render_request()) {
        Ok(document) => {
            let mut event = ExportAuditEvent::new(payload.form_type.to_string(), ExportOutcome::Rendered);
            event.bytes = Some(document.bytes.len());
            event.page_count = Some(document.page_count);
            event.placeholders = document.placeholders.len();
            audit.record_export(&event);
            Ok(document)
        }
        Err(err) => {
            record_failure(audit, &payload.form_type, &err.to_string());
            Err(err)
        }
    }
}

/// Records a failed export.
fn record_failure(audit: &dyn WorkflowAuditSink, document_type: &DocumentType, message: &str) {
    let mut event = ExportAuditEvent::new(document_type.to_string(), ExportOutcome::Failed);
    event.error = Some(message.to_string());
    audit.record_export(&event);
}
