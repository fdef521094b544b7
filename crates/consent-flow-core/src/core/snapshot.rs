// consent-flow-core/src/core/snapshot.rs
// ============================================================================
// Module: Consent Flow Snapshots
// Description: Read-only views of a workflow session for observers.
// Purpose: Publish session checkpoints without sharing mutable state.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`WorkflowSnapshot`] is an owned copy of the observable parts of a
//! session. `snapshot_version` increases on every committed step or stage
//! change and resets to zero on type selection and start over; observers use
//! it to distinguish checkpoints from in-progress edits.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::form_data::FormData;
use crate::core::identifiers::DocumentType;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Workflow stage name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepName {
    /// Type selection.
    Welcome,
    /// Form wizard.
    Builder,
    /// Review and edit.
    Review,
    /// Multi-signer capture.
    Agreement,
    /// Single-signer capture.
    Signature,
    /// Donation prompt.
    Donation,
    /// Export and save.
    Export,
}

impl StepName {
    /// Returns the stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Builder => "builder",
            Self::Review => "review",
            Self::Agreement => "agreement",
            Self::Signature => "signature",
            Self::Donation => "donation",
            Self::Export => "export",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable copy of a workflow session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    /// Type chosen by the user.
    pub selected_type: Option<DocumentType>,
    /// Type whose steps drive the builder.
    pub builder_type: Option<DocumentType>,
    /// Current stage.
    pub step: StepName,
    /// Builder step index while in the builder.
    pub builder_step: Option<usize>,
    /// Accumulated answers.
    pub form_data: FormData,
    /// Checkpoint counter.
    pub snapshot_version: u64,
}

impl WorkflowSnapshot {
    /// Returns the snapshot of a session that has not started.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            selected_type: None,
            builder_type: None,
            step: StepName::Welcome,
            builder_step: None,
            form_data: FormData::new(),
            snapshot_version: 0,
        }
    }
}

impl Default for WorkflowSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}
