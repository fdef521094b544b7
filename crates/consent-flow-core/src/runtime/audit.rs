// consent-flow-core/src/runtime/audit.rs
// ============================================================================
// Module: Consent Flow Audit Logging
// Description: Structured events for workflow transitions, exports, and the assistant.
// Purpose: Emit JSON-line logs without hard dependencies on a logging stack.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Every applied or rejected workflow transition, every export attempt, and
//! every assistant status change produces one serializable event. Sinks write
//! events as JSON lines; deployments route them wherever they like by choosing
//! a sink.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::core::StepName;
use crate::core::unix_millis;

// ============================================================================
// SECTION: Event Types
// ============================================================================

/// Outcome of a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// Transition took effect.
    Applied,
    /// Transition was refused; the session is unchanged.
    Rejected,
}

/// Workflow transition event.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowAuditEvent {
    /// Event name.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Operation that requested the transition.
    pub trigger: &'static str,
    /// Stage before the transition.
    pub from: StepName,
    /// Stage after the transition.
    pub to: StepName,
    /// Whether the transition took effect.
    pub outcome: TransitionOutcome,
    /// Selected document type, if any.
    pub document_type: Option<String>,
    /// Snapshot version after the transition.
    pub snapshot_version: u64,
    /// Rejection reason.
    pub reason: Option<String>,
}

/// Inputs required to construct a workflow audit event.
pub struct WorkflowAuditEventParams {
    /// Operation that requested the transition.
    pub trigger: &'static str,
    /// Stage before the transition.
    pub from: StepName,
    /// Stage after the transition.
    pub to: StepName,
    /// Whether the transition took effect.
    pub outcome: TransitionOutcome,
    /// Selected document type, if any.
    pub document_type: Option<String>,
    /// Snapshot version after the transition.
    pub snapshot_version: u64,
    /// Rejection reason.
    pub reason: Option<String>,
}

impl WorkflowAuditEvent {
    /// Creates a new transition event with a consistent timestamp.
    #[must_use]
    pub fn new(params: WorkflowAuditEventParams) -> Self {
        Self {
            event: "workflow_transition",
            timestamp_ms: unix_millis(),
            trigger: params.trigger,
            from: params.from,
            to: params.to,
            outcome: params.outcome,
            document_type: params.document_type,
            snapshot_version: params.snapshot_version,
            reason: params.reason,
        }
    }
}

/// Export outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportOutcome {
    /// Document rendered locally.
    Rendered,
    /// Document uploaded to the store.
    Saved,
    /// Render or upload failed.
    Failed,
}

/// Export event.
#[derive(Debug, Clone, Serialize)]
pub struct ExportAuditEvent {
    /// Event name.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Exported document type.
    pub document_type: String,
    /// Export outcome.
    pub outcome: ExportOutcome,
    /// Encoded document size when rendered.
    pub bytes: Option<usize>,
    /// Page count when rendered.
    pub page_count: Option<usize>,
    /// Placeholder lines drawn for undecodable images.
    pub placeholders: usize,
    /// Failure message.
    pub error: Option<String>,
}

impl ExportAuditEvent {
    /// Creates a new export event with a consistent timestamp.
    #[must_use]
    pub fn new(document_type: String, outcome: ExportOutcome) -> Self {
        Self {
            event: "export",
            timestamp_ms: unix_millis(),
            document_type,
            outcome,
            bytes: None,
            page_count: None,
            placeholders: 0,
            error: None,
        }
    }
}

/// Assistant status event.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantAuditEvent {
    /// Event name.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Status label.
    pub status: &'static str,
    /// Snapshot version last sent, if any.
    pub snapshot_version: Option<u64>,
    /// Additional detail, such as a failure message.
    pub detail: Option<String>,
}

impl AssistantAuditEvent {
    /// Creates a new assistant event with a consistent timestamp.
    #[must_use]
    pub fn new(status: &'static str, snapshot_version: Option<u64>, detail: Option<String>) -> Self {
        Self {
            event: "assistant_status",
            timestamp_ms: unix_millis(),
            status,
            snapshot_version,
            detail,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for workflow events.
pub trait WorkflowAuditSink: Send + Sync {
    /// Record a transition event.
    fn record(&self, event: &WorkflowAuditEvent);

    /// Record an export event.
    fn record_export(&self, _event: &ExportAuditEvent) {}

    /// Record an assistant status event.
    fn record_assistant(&self, _event: &AssistantAuditEvent) {}
}

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl StderrAuditSink {
    /// Writes one serialized event.
    fn emit<T: Serialize>(event: &T) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

impl WorkflowAuditSink for StderrAuditSink {
    fn record(&self, event: &WorkflowAuditEvent) {
        Self::emit(event);
    }

    fn record_export(&self, event: &ExportAuditEvent) {
        Self::emit(event);
    }

    fn record_assistant(&self, event: &AssistantAuditEvent) {
        Self::emit(event);
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized event.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl WorkflowAuditSink for FileAuditSink {
    fn record(&self, event: &WorkflowAuditEvent) {
        self.emit(event);
    }

    fn record_export(&self, event: &ExportAuditEvent) {
        self.emit(event);
    }

    fn record_assistant(&self, event: &AssistantAuditEvent) {
        self.emit(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl WorkflowAuditSink for NoopAuditSink {
    fn record(&self, _event: &WorkflowAuditEvent) {}
}

/// Audit sink that keeps events in memory for inspection.
#[derive(Default)]
pub struct MemoryAuditSink {
    /// Serialized events in arrival order.
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded JSON lines.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    /// Stores one serialized event.
    fn emit<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut lines) = self.lines.lock()
        {
            lines.push(payload);
        }
    }
}

impl WorkflowAuditSink for MemoryAuditSink {
    fn record(&self, event: &WorkflowAuditEvent) {
        self.emit(event);
    }

    fn record_export(&self, event: &ExportAuditEvent) {
        self.emit(event);
    }

    fn record_assistant(&self, event: &AssistantAuditEvent) {
        self.emit(event);
    }
}
