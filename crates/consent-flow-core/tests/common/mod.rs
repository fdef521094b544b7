// consent-flow-core/tests/common/mod.rs
// ============================================================================
// Module: Workflow Test Helpers
// Description: Shared controller builders and session drivers for core tests.
// Purpose: Keep integration tests focused on behavior rather than setup.
// Dependencies: consent-flow-core
// ============================================================================

//! ## Overview
//! Helpers that drive a [`WorkflowController`] through common paths.

#![allow(dead_code, reason = "Shared helpers are used by a subset of test crates.")]

use std::sync::Arc;
use std::sync::Mutex;

use consent_flow_core::ControllerConfig;
use consent_flow_core::DocumentType;
use consent_flow_core::FieldInput;
use consent_flow_core::ParticipantAttribute;
use consent_flow_core::SessionObserver;
use consent_flow_core::SignatureImage;
use consent_flow_core::SigningDate;
use consent_flow_core::SigningPath;
use consent_flow_core::StepCatalog;
use consent_flow_core::WorkflowController;
use consent_flow_core::WorkflowSnapshot;

/// Fixed signing date used by tests.
pub fn fixed_date() -> SigningDate {
    "2026-03-14".parse().expect("valid date")
}

/// Controller over the built-in catalog on the multi-signer path.
pub fn controller() -> WorkflowController {
    WorkflowController::new(
        StepCatalog::builtin(),
        ControllerConfig {
            signing_path: SigningPath::Multi,
            signing_date: Some(fixed_date()),
        },
    )
}

/// Controller over the built-in catalog on the single-signer path.
pub fn single_signer_controller() -> WorkflowController {
    WorkflowController::new(
        StepCatalog::builtin(),
        ControllerConfig {
            signing_path: SigningPath::Single,
            signing_date: Some(fixed_date()),
        },
    )
}

/// A small image data URL accepted as a signature.
pub fn signature(tag: u8) -> SignatureImage {
    SignatureImage::from_png_bytes(vec![0x89, b'P', b'N', b'G', tag]).expect("signature")
}

/// Names the first `count` seeded participants.
pub fn name_participants(controller: &mut WorkflowController, names: &[(&str, &str)]) {
    for (index, (first, last)) in names.iter().enumerate() {
        controller
            .apply_field(
                "participants",
                FieldInput::Participant {
                    index,
                    attribute: ParticipantAttribute::FirstName,
                    value: (*first).to_string(),
                },
            )
            .expect("first name");
        controller
            .apply_field(
                "participants",
                FieldInput::Participant {
                    index,
                    attribute: ParticipantAttribute::LastName,
                    value: (*last).to_string(),
                },
            )
            .expect("last name");
    }
}

/// Presses Next until the controller leaves the builder.
pub fn finish_builder(controller: &mut WorkflowController) {
    let steps = controller.builder_steps().len();
    for _ in 0 .. steps {
        controller.next().expect("next");
    }
}

/// Selects a type, names two participants, and walks to review.
pub fn walk_to_review(controller: &mut WorkflowController, document_type: DocumentType) {
    controller.select_document_type(document_type, None).expect("select");
    name_participants(controller, &[("Ada", "Lovelace"), ("Alan", "Turing")]);
    finish_builder(controller);
}

/// Observer that records every snapshot it receives.
#[derive(Default)]
pub struct RecordingObserver {
    snapshots: Mutex<Vec<WorkflowSnapshot>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn versions(&self) -> Vec<u64> {
        self.snapshots.lock().expect("lock").iter().map(|snapshot| snapshot.snapshot_version).collect()
    }

    pub fn last(&self) -> Option<WorkflowSnapshot> {
        self.snapshots.lock().expect("lock").last().cloned()
    }
}

impl SessionObserver for RecordingObserver {
    fn session_changed(&self, snapshot: &WorkflowSnapshot) {
        self.snapshots.lock().expect("lock").push(snapshot.clone());
    }
}
