// consent-flow-core/tests/workflow_transitions.rs
// ============================================================================
// Module: Workflow Transition Tests
// Description: Stage machine, snapshot versioning, and guard coverage.
// Purpose: Ensure every transition applies in full or leaves the session unchanged.
// Dependencies: consent-flow-core
// ============================================================================

//! ## Overview
//! Drives the controller through whole sessions and checks stage order,
//! snapshot versions, type locking, and rejected transitions.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use common::RecordingObserver;
use common::controller;
use common::finish_builder;
use common::name_participants;
use common::signature;
use common::single_signer_controller;
use common::walk_to_review;
use consent_flow_core::AgreementState;
use consent_flow_core::CustomTemplate;
use consent_flow_core::DocumentType;
use consent_flow_core::FieldInput;
use consent_flow_core::FieldKind;
use consent_flow_core::Participant;
use consent_flow_core::SignaturePayload;
use consent_flow_core::SigningDate;
use consent_flow_core::StepName;
use consent_flow_core::WorkflowError;
use consent_flow_core::runtime::MemoryAuditSink;

// ============================================================================
// SECTION: Stage Order
// ============================================================================

/// Verifies a full multi-signer session visits every stage in order.
#[test]
fn full_session_visits_stages_in_order() {
    let mut controller = controller();
    assert_eq!(controller.step(), StepName::Welcome);

    controller.select_document_type(DocumentType::ContentRelease, None).unwrap();
    assert_eq!(controller.step(), StepName::Builder);
    name_participants(&mut controller, &[("Ada", "Lovelace"), ("Alan", "Turing")]);
    finish_builder(&mut controller);
    assert_eq!(controller.step(), StepName::Review);

    controller.proceed_to_signing().unwrap();
    assert_eq!(controller.step(), StepName::Agreement);
    for index in 0 .. 2 {
        controller.activate_signer(index).unwrap();
        controller.capture_signature(signature(u8::try_from(index).unwrap())).unwrap();
    }
    controller.complete_signing().unwrap();
    assert_eq!(controller.step(), StepName::Donation);

    controller.continue_to_export().unwrap();
    assert_eq!(controller.step(), StepName::Export);

    let job = controller.export_job().unwrap();
    assert_eq!(job.payload().form_title, "Content Release Form");
    assert_eq!(job.file_name(), "Content-Release-Form.pdf");
    assert_eq!(job.payload().signatures.as_ref().map(SignaturePayload::len), Some(2));
}

/// Verifies the single-signer path goes through the signature stage.
#[test]
fn single_signer_path_uses_signature_stage() {
    let mut controller = single_signer_controller();
    walk_to_review(&mut controller, DocumentType::Nda);
    controller.proceed_to_signing().unwrap();
    assert_eq!(controller.step(), StepName::Signature);

    assert_eq!(controller.complete_signing(), Err(WorkflowError::SignatureMissing));
    assert_eq!(controller.step(), StepName::Signature);

    assert_eq!(controller.capture_signature(signature(1)).unwrap(), 0);
    controller.complete_signing().unwrap();
    assert!(matches!(controller.session().signatures(), Some(SignaturePayload::Single { .. })));
}

/// Verifies start over resets from any stage.
#[test]
fn start_over_returns_to_welcome() {
    let mut controller = controller();
    walk_to_review(&mut controller, DocumentType::GeneralConsent);
    controller.start_over();

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.step, StepName::Welcome);
    assert_eq!(snapshot.selected_type, None);
    assert_eq!(snapshot.snapshot_version, 0);
    assert!(snapshot.form_data.is_empty());
}

/// Verifies stepping forward and back to the first step keeps every answer.
#[test]
fn stepping_back_keeps_form_data() {
    for document_type in DocumentType::BUILTIN {
        let mut controller = controller();
        controller.select_document_type(document_type.clone(), None).unwrap();
        name_participants(&mut controller, &[("Ada", "Lovelace")]);
        let steps = controller.builder_steps().len();
        for index in 0 .. steps - 1 {
            let text_field = controller
                .current_step()
                .unwrap()
                .fields
                .iter()
                .find(|field| matches!(field.kind, FieldKind::Text | FieldKind::Textarea))
                .map(|field| field.id.clone());
            if let Some(id) = text_field {
                controller.apply_field(&id, FieldInput::Text(format!("answer {index}"))).unwrap();
            }
            controller.next().unwrap();
        }
        let filled = controller.session().form_data().clone();
        for _ in 0 .. steps - 1 {
            controller.back().unwrap();
        }
        assert_eq!(controller.snapshot().builder_step, Some(0));
        assert_eq!(controller.session().form_data(), &filled, "{document_type}");
    }
}

/// Verifies start over from export matches a fresh controller.
#[test]
fn start_over_from_export_matches_fresh_session() {
    let mut controller = single_signer_controller();
    walk_to_review(&mut controller, DocumentType::Nda);
    controller.proceed_to_signing().unwrap();
    controller.capture_signature(signature(9)).unwrap();
    controller.complete_signing().unwrap();
    controller.continue_to_export().unwrap();

    controller.start_over();
    assert_eq!(controller.session(), single_signer_controller().session());
}

/// Verifies completing an unfilled content release is refused in place.
#[test]
fn empty_content_release_cannot_complete() {
    let mut controller = controller();
    controller.select_document_type(DocumentType::ContentRelease, None).unwrap();
    finish_builder(&mut controller);
    controller.proceed_to_signing().unwrap();
    let version = controller.snapshot().snapshot_version;

    assert!(controller.complete_signing().is_err());
    assert_eq!(controller.step(), StepName::Agreement);
    assert_eq!(controller.snapshot().snapshot_version, version);
}

// ============================================================================
// SECTION: Snapshot Versions
// ============================================================================

/// Verifies versions bump on checkpoints only.
#[test]
fn snapshot_version_counts_checkpoints() {
    let mut controller = controller();
    controller.select_document_type(DocumentType::ContentRelease, None).unwrap();
    assert_eq!(controller.snapshot().snapshot_version, 0);

    name_participants(&mut controller, &[("Ada", "Lovelace"), ("Alan", "Turing")]);
    assert_eq!(controller.snapshot().snapshot_version, 0);

    controller.next().unwrap();
    assert_eq!(controller.snapshot().snapshot_version, 1);
    controller.apply_field("eventName", FieldInput::Text("Launch".to_string())).unwrap();
    assert_eq!(controller.snapshot().snapshot_version, 1);

    controller.back().unwrap();
    assert_eq!(controller.snapshot().snapshot_version, 1);
    assert_eq!(controller.snapshot().builder_step, Some(0));

    for _ in 0 .. 4 {
        controller.next().unwrap();
    }
    assert_eq!(controller.step(), StepName::Review);
    assert_eq!(controller.snapshot().snapshot_version, 5);

    controller.proceed_to_signing().unwrap();
    assert_eq!(controller.snapshot().snapshot_version, 6);
}

/// Verifies observers receive the initial snapshot and every change.
#[test]
fn observers_see_every_change() {
    let mut controller = controller();
    let observer = RecordingObserver::new();
    controller.add_observer(observer.clone());

    controller.select_document_type(DocumentType::Nda, None).unwrap();
    controller.apply_field("effectiveDate", FieldInput::Text("2026-01-01".to_string())).unwrap();
    name_participants(&mut controller, &[("Ada", "Lovelace")]);
    controller.next().unwrap();

    let versions = observer.versions();
    assert_eq!(versions.first(), Some(&0));
    assert_eq!(versions.last(), Some(&1));
    assert!(versions.windows(2).all(|pair| pair[0] <= pair[1]));
    let last = observer.last().unwrap();
    assert_eq!(last.form_data.text("effectiveDate"), Some("2026-01-01"));
}

/// Verifies rejected operations do not notify observers.
#[test]
fn rejected_operations_do_not_notify() {
    let mut controller = controller();
    let observer = RecordingObserver::new();
    controller.add_observer(observer.clone());

    assert!(controller.next().is_err());
    assert!(controller.back().is_err());
    assert_eq!(observer.versions(), vec![0]);
}

// ============================================================================
// SECTION: Guards
// ============================================================================

/// Verifies the document type is fixed after selection.
#[test]
fn document_type_is_locked_after_selection() {
    let mut controller = controller();
    controller.select_document_type(DocumentType::Nda, None).unwrap();
    let before = controller.session().clone();

    let err = controller.select_document_type(DocumentType::ContentRelease, None).unwrap_err();
    assert_eq!(err, WorkflowError::DocumentTypeLocked);
    assert_eq!(controller.session(), &before);
}

/// Verifies operations outside their stage are rejected without effect.
#[test]
fn out_of_stage_operations_are_rejected() {
    let mut controller = controller();
    let before = controller.session().clone();

    assert!(matches!(controller.proceed_to_signing(), Err(WorkflowError::InvalidTransition { .. })));
    assert!(matches!(controller.complete_signing(), Err(WorkflowError::InvalidTransition { .. })));
    assert!(matches!(controller.continue_to_export(), Err(WorkflowError::InvalidTransition { .. })));
    assert!(matches!(controller.export_job(), Err(WorkflowError::InvalidTransition { .. })));
    assert!(matches!(controller.capture_signature(signature(0)), Err(WorkflowError::InvalidTransition { .. })));
    assert_eq!(controller.session(), &before);
}

/// Verifies the agreement text needs a selected type.
#[test]
fn agreement_text_requires_type() {
    let mut controller = controller();
    assert_eq!(controller.agreement_text().unwrap_err(), WorkflowError::MissingDocumentType);

    controller.select_document_type(DocumentType::Nda, None).unwrap();
    let text = controller.agreement_text().unwrap();
    assert_eq!(text.title, "Non-Disclosure Agreement");
    assert!(text.body.contains("NON-DISCLOSURE AGREEMENT"));
}

/// Verifies fields from another step are rejected in the builder.
#[test]
fn builder_rejects_fields_off_the_current_step() {
    let mut controller = controller();
    controller.select_document_type(DocumentType::ContentRelease, None).unwrap();
    let err = controller.apply_field("eventName", FieldInput::Text("Launch".to_string())).unwrap_err();
    assert_eq!(err, WorkflowError::UnknownField("eventName".to_string()));
}

/// Verifies review edits apply only on save.
#[test]
fn review_edits_commit_on_save() {
    let mut controller = controller();
    walk_to_review(&mut controller, DocumentType::ContentRelease);

    assert_eq!(
        controller.apply_field("eventName", FieldInput::Text("Gala".to_string())),
        Err(WorkflowError::NoReviewEdit)
    );
    controller.begin_review_edit().unwrap();
    controller.apply_field("eventName", FieldInput::Text("Gala".to_string())).unwrap();
    assert_eq!(controller.session().form_data().text("eventName"), None);
    assert_eq!(controller.proceed_to_signing(), Err(WorkflowError::ReviewEditPending));

    controller.save_review_edit().unwrap();
    assert_eq!(controller.session().form_data().text("eventName"), Some("Gala"));

    controller.begin_review_edit().unwrap();
    controller.apply_field("eventName", FieldInput::Text("Dropped".to_string())).unwrap();
    controller.cancel_review_edit().unwrap();
    assert_eq!(controller.session().form_data().text("eventName"), Some("Gala"));
    assert_eq!(controller.cancel_review_edit(), Err(WorkflowError::NoReviewEdit));
}

/// Verifies a participant with only a last name still has to sign, while a
/// nameless one does not.
#[test]
fn last_name_alone_makes_a_signer() {
    let mut first_only = Participant::with_role("Releasor");
    first_only.first_name = "Ada".to_string();
    let mut last_only = Participant::with_role("Releasee");
    last_only.last_name = "Turing".to_string();
    let nameless = Participant::with_role("Witness");
    let date: SigningDate = "2026-03-14".parse().unwrap();

    let state = AgreementState::new(DocumentType::ContentRelease, &[first_only, nameless, last_only], date);
    let roles: Vec<&str> = state.signers().iter().map(|signer| signer.role.as_str()).collect();
    assert_eq!(roles, vec!["Releasor", "Releasee"]);
}

// ============================================================================
// SECTION: Back Navigation
// ============================================================================

/// Verifies back from the first builder step starts over.
#[test]
fn back_from_first_builder_step_starts_over() {
    let mut controller = controller();
    controller.select_document_type(DocumentType::GeneralConsent, None).unwrap();
    controller.back().unwrap();
    assert_eq!(controller.step(), StepName::Welcome);
    assert_eq!(controller.session().selected_type(), None);
}

/// Verifies back from review returns to the last builder step and back from
/// signing returns to review.
#[test]
fn back_walks_the_stage_chain() {
    let mut controller = controller();
    walk_to_review(&mut controller, DocumentType::Nda);
    controller.proceed_to_signing().unwrap();

    controller.back().unwrap();
    assert_eq!(controller.step(), StepName::Review);
    controller.back().unwrap();
    assert_eq!(controller.snapshot().builder_step, Some(3));
}

/// Verifies back is refused once signing has completed.
#[test]
fn back_is_refused_after_signing() {
    let mut controller = single_signer_controller();
    walk_to_review(&mut controller, DocumentType::Nda);
    controller.proceed_to_signing().unwrap();
    controller.capture_signature(signature(3)).unwrap();
    controller.complete_signing().unwrap();
    assert!(matches!(controller.back(), Err(WorkflowError::InvalidTransition { .. })));
    assert_eq!(controller.step(), StepName::Donation);
}

// ============================================================================
// SECTION: Custom Types
// ============================================================================

/// Verifies custom types step through the fallback catalog entry with the
/// template as agreement text.
#[test]
fn custom_type_uses_fallback_steps_and_template_text() {
    let template = CustomTemplate::new(1_700_000_000_000, "Studio Rules", "<h1>Rules</h1><p>Be kind.</p>");
    let document_type = template.document_type();
    let mut controller = controller();
    controller.register_templates([template]);

    controller.select_document_type(document_type.clone(), None).unwrap();
    let session = controller.session();
    assert_eq!(session.selected_type(), Some(&document_type));
    assert_eq!(session.builder_type(), Some(&DocumentType::GeneralConsent));
    let roles: Vec<&str> = session.form_data().participants().iter().map(|p| p.role.as_str()).collect();
    assert_eq!(roles, vec!["Releasor", "Releasee"]);

    let text = controller.agreement_text().unwrap();
    assert_eq!(text.title, "Studio Rules");
    assert!(text.body.contains("Be kind."));
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Verifies applied and rejected transitions are audited.
#[test]
fn transitions_are_audited() {
    let audit = Arc::new(MemoryAuditSink::new());
    let mut controller = controller().with_audit_sink(audit.clone());
    controller.select_document_type(DocumentType::Nda, None).unwrap();
    let _ = controller.complete_signing();

    let lines = audit.lines();
    assert_eq!(lines.len(), 2);
    let applied: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(applied["event"], "workflow_transition");
    assert_eq!(applied["trigger"], "select_document_type");
    assert_eq!(applied["to"], "builder");
    assert_eq!(applied["outcome"], "applied");
    let rejected: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
    assert_eq!(rejected["outcome"], "rejected");
    assert!(rejected["reason"].as_str().unwrap().contains("complete_signing"));
}
