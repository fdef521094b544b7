// consent-flow-cli/src/answers.rs
// ============================================================================
// Module: Answers Walker
// Description: Drives a workflow controller from a prepared answers file.
// Purpose: Fill, sign, and reach export without an interactive form.
// Dependencies: consent-flow-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! An answers file names the document type, the participants, and a value
//! per field id. The walker replays them step by step through the same
//! controller operations an interactive form uses, so every guard (field
//! kinds, participant bounds, signature completeness) still applies.
//!
//! ```json
//! {
//!   "type": "nda",
//!   "participants": [{ "firstName": "Ada", "lastName": "Lovelace", "email": "", "role": "Disclosing Party" }],
//!   "fields": { "purpose": "Research", "returnMaterials": true },
//!   "files": { "idPhoto": "photo.png" }
//! }
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::path::PathBuf;

use consent_flow_core::DocumentType;
use consent_flow_core::FieldInput;
use consent_flow_core::FieldKind;
use consent_flow_core::FileDescriptor;
use consent_flow_core::Participant;
use consent_flow_core::ParticipantAttribute;
use consent_flow_core::SignatureImage;
use consent_flow_core::StepName;
use consent_flow_core::WorkflowController;
use consent_flow_core::WorkflowError;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Prepared answers for one document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Answers {
    /// Document type key (`nda`, `custom_<id>`, ...).
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    /// Optional document title override.
    #[serde(default)]
    pub title: Option<String>,
    /// Participants in order; extra seeded entries are removed.
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// Field values keyed by field id.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// File paths keyed by field id, relative to the answers file.
    #[serde(default)]
    pub files: BTreeMap<String, PathBuf>,
}

impl Answers {
    /// Parses an answers file.
    ///
    /// # Errors
    ///
    /// Returns [`AnswersError::Parse`] for malformed JSON or unknown keys.
    pub fn from_json(json: &str) -> Result<Self, AnswersError> {
        serde_json::from_str(json).map_err(|err| AnswersError::Parse(err.to_string()))
    }
}

/// Errors raised while replaying answers.
#[derive(Debug, Error)]
pub enum AnswersError {
    /// Answers file is malformed.
    #[error("answers parse error: {0}")]
    Parse(String),
    /// A value does not fit its field.
    #[error("answer for {field} rejected: {message}")]
    Field {
        /// Field id.
        field: String,
        /// Reason.
        message: String,
    },
    /// Fewer signature images than signers.
    #[error("{required} signature(s) required, {provided} provided")]
    Signatures {
        /// Signatures the document needs.
        required: usize,
        /// Signatures supplied.
        provided: usize,
    },
    /// The controller rejected a transition.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Selects the document type and fills every builder step, ending in review.
///
/// # Errors
///
/// Returns [`AnswersError`] when a value or transition is rejected.
pub fn fill_builder(
    controller: &mut WorkflowController,
    answers: &Answers,
    files: &BTreeMap<String, FileDescriptor>,
) -> Result<(), AnswersError> {
    select(controller, answers)?;
    while controller.step() == StepName::Builder {
        fill_step(controller, answers, files)?;
        controller.next()?;
    }
    Ok(())
}

/// Selects the answers' document type.
///
/// # Errors
///
/// Returns [`AnswersError::Workflow`] outside the welcome stage.
pub fn select(controller: &mut WorkflowController, answers: &Answers) -> Result<(), AnswersError> {
    controller.select_document_type(answers.document_type.clone(), answers.title.clone())?;
    Ok(())
}

/// Applies the answers for the fields on the current builder step.
///
/// # Errors
///
/// Returns [`AnswersError`] when a value does not fit its field.
pub fn fill_step(
    controller: &mut WorkflowController,
    answers: &Answers,
    files: &BTreeMap<String, FileDescriptor>,
) -> Result<(), AnswersError> {
    let Some(step) = controller.current_step().cloned() else {
        return Ok(());
    };
    for field in &step.fields {
        match &field.kind {
            FieldKind::Participants(_) => {
                if !answers.participants.is_empty() {
                    fill_participants(controller, &field.id, &answers.participants)?;
                }
            }
            FieldKind::File {
                ..
            } => {
                if let Some(file) = files.get(&field.id) {
                    controller.apply_field(&field.id, FieldInput::File(file.clone()))?;
                }
            }
            _ => {
                if let Some(value) = answers.fields.get(&field.id)
                    && let Some(input) = field_input(&field.id, value)?
                {
                    controller.apply_field(&field.id, input)?;
                }
            }
        }
    }
    Ok(())
}

/// Resizes the participant list to `wanted` and copies each participant in.
fn fill_participants(
    controller: &mut WorkflowController,
    field_id: &str,
    wanted: &[Participant],
) -> Result<(), AnswersError> {
    while participant_count(controller, field_id) < wanted.len() {
        let before = participant_count(controller, field_id);
        controller.apply_field(field_id, FieldInput::AddParticipant)?;
        if participant_count(controller, field_id) == before {
            return Err(AnswersError::Field {
                field: field_id.to_string(),
                message: format!("at most {before} participants allowed"),
            });
        }
    }
    while participant_count(controller, field_id) > wanted.len() {
        let before = participant_count(controller, field_id);
        controller.apply_field(field_id, FieldInput::RemoveParticipant(before - 1))?;
        if participant_count(controller, field_id) == before {
            break;
        }
    }
    for (index, participant) in wanted.iter().enumerate() {
        let attributes = [
            (ParticipantAttribute::FirstName, &participant.first_name),
            (ParticipantAttribute::LastName, &participant.last_name),
            (ParticipantAttribute::Email, &participant.email),
            (ParticipantAttribute::Role, &participant.role),
        ];
        for (attribute, value) in attributes {
            if attribute == ParticipantAttribute::Role && value.is_empty() {
                continue;
            }
            controller.apply_field(
                field_id,
                FieldInput::Participant {
                    index,
                    attribute,
                    value: value.clone(),
                },
            )?;
        }
    }
    Ok(())
}

/// Returns the number of participants under `field_id`.
fn participant_count(controller: &WorkflowController, field_id: &str) -> usize {
    controller.session().form_data().participants_in(field_id).len()
}

/// Converts a JSON answer into a field input; `null` skips the field.
fn field_input(field_id: &str, value: &Value) -> Result<Option<FieldInput>, AnswersError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(checked) => Ok(Some(FieldInput::Checked(*checked))),
        Value::Number(number) => Ok(Some(FieldInput::Text(number.to_string()))),
        Value::String(text) => Ok(Some(FieldInput::Text(text.clone()))),
        Value::Array(_) | Value::Object(_) => Err(AnswersError::Field {
            field: field_id.to_string(),
            message: "expected a string, number, or boolean".to_string(),
        }),
    }
}

// ============================================================================
// SECTION: Signing
// ============================================================================

/// Signs from review through to export. Signature images are used in
/// signer order; the single-signer path uses the first. Returns the number
/// of signatures captured.
///
/// # Errors
///
/// Returns [`AnswersError::Signatures`] when too few images are supplied and
/// [`AnswersError::Workflow`] when a transition is rejected.
pub fn sign_and_finish(
    controller: &mut WorkflowController,
    signatures: &[SignatureImage],
) -> Result<usize, AnswersError> {
    controller.proceed_to_signing()?;
    let captured = if controller.step() == StepName::Agreement {
        let required = controller.agreement_state()?.signers().len();
        if signatures.len() < required {
            return Err(AnswersError::Signatures {
                required,
                provided: signatures.len(),
            });
        }
        for (index, image) in signatures.iter().take(required).enumerate() {
            controller.activate_signer(index)?;
            controller.capture_signature(image.clone())?;
        }
        required
    } else {
        let image = signatures.first().ok_or(AnswersError::Signatures {
            required: 1,
            provided: 0,
        })?;
        controller.capture_signature(image.clone())?;
        1
    };
    controller.complete_signing()?;
    controller.continue_to_export()?;
    Ok(captured)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, reason = "Test assertions use expect/unwrap for clarity.")]

    use std::collections::BTreeMap;

    use consent_flow_core::ControllerConfig;
    use consent_flow_core::DocumentType;
    use consent_flow_core::SignatureImage;
    use consent_flow_core::SigningPath;
    use consent_flow_core::StepCatalog;
    use consent_flow_core::StepName;
    use consent_flow_core::WorkflowController;
    use consent_flow_core::WorkflowError;

    use super::Answers;
    use super::AnswersError;
    use super::fill_builder;
    use super::sign_and_finish;

    const NDA: &str = r#"{
        "type": "nda",
        "participants": [
            { "firstName": "Ada", "lastName": "Lovelace", "email": "ada@example.com", "role": "Disclosing Party" },
            { "firstName": "Alan", "lastName": "Turing", "email": "", "role": "" },
            { "firstName": "Grace", "lastName": "Hopper", "email": "", "role": "Witness" }
        ],
        "fields": { "purpose": "Research", "duration": 12, "returnMaterials": true, "jurisdiction": null }
    }"#;

    fn new_controller(signing_path: SigningPath) -> WorkflowController {
        WorkflowController::new(
            StepCatalog::builtin(),
            ControllerConfig {
                signing_path,
                signing_date: Some("2026-03-14".parse().unwrap()),
            },
        )
    }

    fn signature(tag: u8) -> SignatureImage {
        SignatureImage::from_png_bytes(vec![0x89, b'P', b'N', b'G', tag]).unwrap()
    }

    #[test]
    fn answers_fill_every_step() {
        let answers = Answers::from_json(NDA).unwrap();
        let mut controller = new_controller(SigningPath::Multi);
        fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap();
        assert_eq!(controller.step(), StepName::Review);
        let data = controller.session().form_data();
        assert_eq!(data.participants().len(), 3);
        assert_eq!(data.participants()[1].role, "Receiving Party");
        assert_eq!(data.participants()[2].role, "Witness");
        assert_eq!(data.get("purpose").map(consent_flow_core::FieldValue::display).as_deref(), Some("Research"));
        assert_eq!(data.get("returnMaterials").map(consent_flow_core::FieldValue::display).as_deref(), Some("Yes"));
        assert!(data.get("jurisdiction").is_none());
    }

    #[test]
    fn signatures_follow_signer_order() {
        let answers = Answers::from_json(NDA).unwrap();
        let mut controller = new_controller(SigningPath::Multi);
        fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap();
        let err = sign_and_finish(&mut controller, &[signature(1)]).unwrap_err();
        assert!(matches!(
            err,
            AnswersError::Signatures {
                required: 3,
                provided: 1
            }
        ));
        assert_eq!(controller.step(), StepName::Agreement);

        let mut controller = new_controller(SigningPath::Multi);
        fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap();
        let captured = sign_and_finish(&mut controller, &[signature(1), signature(2), signature(3)]).unwrap();
        assert_eq!(captured, 3);
        assert_eq!(controller.step(), StepName::Export);
        assert_eq!(controller.export_job().unwrap().payload().signatures.as_ref().unwrap().len(), 3);
    }

    #[test]
    fn single_signer_path_uses_first_image() {
        let answers = Answers::from_json(NDA).unwrap();
        let mut controller = new_controller(SigningPath::Single);
        fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap();
        assert!(matches!(sign_and_finish(&mut controller, &[]), Err(AnswersError::Signatures { .. })));
        let mut controller = new_controller(SigningPath::Single);
        fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap();
        assert_eq!(sign_and_finish(&mut controller, &[signature(9)]).unwrap(), 1);
    }

    #[test]
    fn unnamed_signers_are_refused() {
        let answers = Answers::from_json(r#"{ "type": "content-release" }"#).unwrap();
        assert_eq!(answers.document_type, DocumentType::ContentRelease);
        let mut controller = new_controller(SigningPath::Multi);
        fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap();
        let err = sign_and_finish(&mut controller, &[]).unwrap_err();
        assert!(matches!(err, AnswersError::Workflow(WorkflowError::NoSigners)));
    }

    #[test]
    fn malformed_answers_are_rejected() {
        assert!(matches!(Answers::from_json(r#"{ "type": "lease" }"#), Err(AnswersError::Parse(_))));
        assert!(matches!(Answers::from_json(r#"{ "type": "nda", "extra": 1 }"#), Err(AnswersError::Parse(_))));
        let answers = Answers::from_json(r#"{ "type": "nda", "fields": { "purpose": ["a"] } }"#).unwrap();
        let mut controller = new_controller(SigningPath::Multi);
        let err = fill_builder(&mut controller, &answers, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, AnswersError::Field { field, .. } if field == "purpose"));
    }
}
