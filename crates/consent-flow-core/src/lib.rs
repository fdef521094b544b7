// consent-flow-core/src/lib.rs
// ============================================================================
// Module: Consent Flow Core Library
// Description: Public API surface for the Consent Flow core.
// Purpose: Expose core types, interfaces, and the workflow runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Consent Flow core drives a multi-step consent document session: pick a
//! document type, fill a wizard of steps, review, collect signatures, and
//! export. It renders nothing and stores nothing itself; rendering,
//! persistence, and assistant integration plug in through explicit
//! interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::AssistantTokenSource;
pub use interfaces::DocumentPayload;
pub use interfaces::DocumentRenderer;
pub use interfaces::DocumentStore;
pub use interfaces::RenderError;
pub use interfaces::RenderRequest;
pub use interfaces::RenderedDocument;
pub use interfaces::SavedDocument;
pub use interfaces::SessionObserver;
pub use interfaces::StoreError;
pub use interfaces::TokenError;
pub use interfaces::UploadRequest;
pub use runtime::AgreementState;
pub use runtime::ControllerConfig;
pub use runtime::ExportError;
pub use runtime::ExportJob;
pub use runtime::InMemoryDocumentStore;
pub use runtime::SigningPath;
pub use runtime::WorkflowAuditSink;
pub use runtime::WorkflowController;
pub use runtime::WorkflowError;
pub use runtime::WorkflowSession;
pub use runtime::WorkflowStage;
