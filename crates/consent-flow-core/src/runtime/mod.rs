// consent-flow-core/src/runtime/mod.rs
// ============================================================================
// Module: Consent Flow Runtime
// Description: Workflow controller, stage states, export jobs, and audit sinks.
// Purpose: Drive a consent session from type selection to a saved document.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the workflow controller and the per-stage state
//! it owns. Every surface (CLI, assistant bridge, tests) drives sessions
//! through the same controller so transition rules hold everywhere.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod audit;
pub mod builder;
pub mod controller;
pub mod export;
pub mod review;
pub mod session;
pub mod signing;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AssistantAuditEvent;
pub use audit::ExportAuditEvent;
pub use audit::ExportOutcome;
pub use audit::FileAuditSink;
pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use audit::TransitionOutcome;
pub use audit::WorkflowAuditEvent;
pub use audit::WorkflowAuditSink;
pub use builder::BuilderMove;
pub use builder::BuilderState;
pub use controller::ControllerConfig;
pub use controller::SigningPath;
pub use controller::WorkflowController;
pub use controller::WorkflowError;
pub use export::ExportError;
pub use export::ExportJob;
pub use export::render_saved;
pub use review::ReviewState;
pub use session::WorkflowSession;
pub use session::WorkflowStage;
pub use signing::AgreementState;
pub use signing::SignatureState;
pub use store::InMemoryDocumentStore;
