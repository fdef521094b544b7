// consent-flow-core/src/runtime/session.rs
// ============================================================================
// Module: Consent Flow Session State
// Description: Workflow stages and the session record they belong to.
// Purpose: Model the workflow as a closed set of stages with per-stage data.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! [`WorkflowStage`] is a closed tagged union: each stage carries exactly the
//! data it needs, so states such as "signing without a document type" cannot
//! be expressed. [`WorkflowSession`] is owned by the controller and exposed
//! read-only.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::DocumentType;
use crate::core::FormData;
use crate::core::SignaturePayload;
use crate::core::StepName;
use crate::core::WorkflowSnapshot;
use crate::runtime::builder::BuilderState;
use crate::runtime::review::ReviewState;
use crate::runtime::signing::AgreementState;
use crate::runtime::signing::SignatureState;

// ============================================================================
// SECTION: Stages
// ============================================================================

/// Current workflow stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum WorkflowStage {
    /// Type selection.
    #[default]
    Welcome,
    /// Form wizard.
    Builder(BuilderState),
    /// Review and edit.
    Review(ReviewState),
    /// Multi-signer capture.
    Agreement(AgreementState),
    /// Single-signer capture.
    Signature(SignatureState),
    /// Donation prompt.
    Donation,
    /// Export and save.
    Export,
}

impl WorkflowStage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(&self) -> StepName {
        match self {
            Self::Welcome => StepName::Welcome,
            Self::Builder(_) => StepName::Builder,
            Self::Review(_) => StepName::Review,
            Self::Agreement(_) => StepName::Agreement,
            Self::Signature(_) => StepName::Signature,
            Self::Donation => StepName::Donation,
            Self::Export => StepName::Export,
        }
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Session record owned by the workflow controller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkflowSession {
    /// Current stage.
    pub(crate) stage: WorkflowStage,
    /// Type the user selected.
    pub(crate) selected_type: Option<DocumentType>,
    /// Type whose steps drive the builder.
    pub(crate) builder_type: Option<DocumentType>,
    /// Title override, such as a custom template name.
    pub(crate) form_title: Option<String>,
    /// Accumulated answers.
    pub(crate) form_data: FormData,
    /// Signatures attached at signing.
    pub(crate) signatures: Option<SignaturePayload>,
    /// Custom template markup for custom types.
    pub(crate) custom_agreement_content: Option<String>,
    /// Checkpoint counter.
    pub(crate) snapshot_version: u64,
}

impl WorkflowSession {
    /// Returns the current stage.
    #[must_use]
    pub const fn stage(&self) -> &WorkflowStage {
        &self.stage
    }

    /// Returns the type the user selected.
    #[must_use]
    pub const fn selected_type(&self) -> Option<&DocumentType> {
        self.selected_type.as_ref()
    }

    /// Returns the type whose steps drive the builder.
    #[must_use]
    pub const fn builder_type(&self) -> Option<&DocumentType> {
        self.builder_type.as_ref()
    }

    /// Returns the title override.
    #[must_use]
    pub fn form_title(&self) -> Option<&str> {
        self.form_title.as_deref()
    }

    /// Returns the accumulated answers.
    #[must_use]
    pub const fn form_data(&self) -> &FormData {
        &self.form_data
    }

    /// Returns the attached signatures.
    #[must_use]
    pub const fn signatures(&self) -> Option<&SignaturePayload> {
        self.signatures.as_ref()
    }

    /// Returns the custom template markup.
    #[must_use]
    pub fn custom_agreement_content(&self) -> Option<&str> {
        self.custom_agreement_content.as_deref()
    }

    /// Returns the checkpoint counter.
    #[must_use]
    pub const fn snapshot_version(&self) -> u64 {
        self.snapshot_version
    }

    /// Returns an observable copy of the session.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            selected_type: self.selected_type.clone(),
            builder_type: self.builder_type.clone(),
            step: self.stage.name(),
            builder_step: match &self.stage {
                WorkflowStage::Builder(builder) => Some(builder.step_index),
                _ => None,
            },
            form_data: self.form_data.clone(),
            snapshot_version: self.snapshot_version,
        }
    }
}
