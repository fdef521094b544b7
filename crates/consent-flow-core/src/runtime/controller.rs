// consent-flow-core/src/runtime/controller.rs
// ============================================================================
// Module: Consent Flow Workflow Controller
// Description: Stage machine driving a session from type selection to export.
// Purpose: Own the session and apply every transition in one place.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! The controller owns a single [`WorkflowSession`]. Every user action is an
//! operation on the controller; each either applies in full or is rejected
//! with a [`WorkflowError`] and leaves the session unchanged.
//!
//! Stage order: welcome, builder, review, agreement or signature, donation,
//! export. Start over returns to welcome from anywhere.
//!
//! The snapshot version increments by one on each builder Next, on review to
//! signing, on signing to donation, and on donation to export. It resets to
//! zero on type selection and start over. Field edits notify observers but
//! never change the version.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::AgreementText;
use crate::core::CustomTemplate;
use crate::core::DocumentType;
use crate::core::FieldChange;
use crate::core::FieldDescriptor;
use crate::core::FieldError;
use crate::core::FieldInput;
use crate::core::FormData;
use crate::core::PARTICIPANTS_FIELD;
use crate::core::SignatureImage;
use crate::core::SigningDate;
use crate::core::StepCatalog;
use crate::core::StepDescriptor;
use crate::core::StepName;
use crate::core::TemplateId;
use crate::core::WorkflowSnapshot;
use crate::core::apply_input;
use crate::core::document_title;
use crate::interfaces::DocumentPayload;
use crate::interfaces::SessionObserver;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::audit::TransitionOutcome;
use crate::runtime::audit::WorkflowAuditEvent;
use crate::runtime::audit::WorkflowAuditEventParams;
use crate::runtime::audit::WorkflowAuditSink;
use crate::runtime::builder::BuilderMove;
use crate::runtime::builder::BuilderState;
use crate::runtime::export::ExportJob;
use crate::runtime::review::ReviewState;
use crate::runtime::session::WorkflowSession;
use crate::runtime::session::WorkflowStage;
use crate::runtime::signing::AgreementState;
use crate::runtime::signing::SignatureState;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Signing path taken after review.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningPath {
    /// One signature per named participant.
    #[default]
    Multi,
    /// One signature for the whole document.
    Single,
}

/// Controller configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Signing path taken after review.
    pub signing_path: SigningPath,
    /// Fixed signing date; today's date when unset.
    pub signing_date: Option<SigningDate>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Workflow transition errors. A rejected transition leaves the session
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Operation is not available in the current stage.
    #[error("{event} is not available during {stage}")]
    InvalidTransition {
        /// Current stage.
        stage: StepName,
        /// Requested operation.
        event: &'static str,
    },
    /// A document type is already selected.
    #[error("document type is fixed for this session; start over to change it")]
    DocumentTypeLocked,
    /// No document type is selected.
    #[error("no document type selected")]
    MissingDocumentType,
    /// Field is not part of the current form.
    #[error("unknown field: {0}")]
    UnknownField(String),
    /// Field rejected the input.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// Participant count is outside the field bounds.
    #[error("field {field} needs {min} to {max} participants, found {actual}")]
    Cardinality {
        /// Field id.
        field: String,
        /// Minimum allowed.
        min: usize,
        /// Maximum allowed.
        max: usize,
        /// Current count.
        actual: usize,
    },
    /// Review has an unsaved edit.
    #[error("review has an unsaved edit")]
    ReviewEditPending,
    /// Review has no open edit.
    #[error("review has no open edit")]
    NoReviewEdit,
    /// No participant is named, so nobody can sign.
    #[error("no named participants to sign")]
    NoSigners,
    /// Signer index is out of range.
    #[error("signer {0} does not exist")]
    SignerOutOfRange(usize),
    /// No signer pad is open.
    #[error("no signer is active")]
    NoActiveSigner,
    /// Some signers have not signed.
    #[error("signatures missing for signers {missing:?}")]
    SignaturesIncomplete {
        /// Indexes of unsigned signers.
        missing: Vec<usize>,
    },
    /// Single-signer path has no capture.
    #[error("signature missing")]
    SignatureMissing,
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Workflow controller owning one session.
pub struct WorkflowController {
    /// Step catalog.
    catalog: StepCatalog,
    /// Controller configuration.
    config: ControllerConfig,
    /// Known custom templates.
    templates: BTreeMap<TemplateId, CustomTemplate>,
    /// Session state.
    session: WorkflowSession,
    /// Audit sink for transition events.
    audit: Arc<dyn WorkflowAuditSink>,
    /// Observers notified after each change.
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl WorkflowController {
    /// Creates a controller at the welcome stage.
    #[must_use]
    pub fn new(catalog: StepCatalog, config: ControllerConfig) -> Self {
        Self {
            catalog,
            config,
            templates: BTreeMap::new(),
            session: WorkflowSession::default(),
            audit: Arc::new(NoopAuditSink),
            observers: Vec::new(),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit_sink(mut self, audit: Arc<dyn WorkflowAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Registers an observer and sends it the current snapshot.
    pub fn add_observer(&mut self, observer: Arc<dyn SessionObserver>) {
        observer.session_changed(&self.session.snapshot());
        self.observers.push(observer);
    }

    /// Registers custom templates selectable by their document type.
    pub fn register_templates(&mut self, templates: impl IntoIterator<Item = CustomTemplate>) {
        for template in templates {
            self.templates.insert(template.id.clone(), template);
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Returns the session.
    #[must_use]
    pub const fn session(&self) -> &WorkflowSession {
        &self.session
    }

    /// Returns the current stage name.
    #[must_use]
    pub const fn step(&self) -> StepName {
        self.session.stage.name()
    }

    /// Returns the catalog.
    #[must_use]
    pub const fn catalog(&self) -> &StepCatalog {
        &self.catalog
    }

    /// Returns an observable copy of the session.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        self.session.snapshot()
    }

    /// Returns the builder steps for the session's stepping type.
    #[must_use]
    pub fn builder_steps(&self) -> &[StepDescriptor] {
        stepping_steps(&self.catalog, self.session.builder_type.as_ref())
    }

    /// Returns the current builder step while in the builder.
    #[must_use]
    pub fn current_step(&self) -> Option<&StepDescriptor> {
        match &self.session.stage {
            WorkflowStage::Builder(builder) => builder.current(self.builder_steps()),
            _ => None,
        }
    }

    /// Returns the agreement text for the selected type.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::MissingDocumentType`] before a type is
    /// selected; callers navigate back in that case.
    pub fn agreement_text(&self) -> Result<AgreementText, WorkflowError> {
        let document_type = self.session.selected_type.as_ref().ok_or(WorkflowError::MissingDocumentType)?;
        Ok(AgreementText::resolve(
            document_type,
            self.session.form_title.as_deref(),
            self.session.custom_agreement_content.as_deref(),
        ))
    }

    /// Returns the agreement stage while signing on the multi-signer path.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] outside that stage.
    pub fn agreement_state(&self) -> Result<&AgreementState, WorkflowError> {
        match &self.session.stage {
            WorkflowStage::Agreement(state) => Ok(state),
            stage => Err(invalid(stage.name(), "agreement_state")),
        }
    }

    /// Returns the review draft while an edit is open.
    #[must_use]
    pub const fn review_draft(&self) -> Option<&FormData> {
        match &self.session.stage {
            WorkflowStage::Review(review) => review.draft(),
            _ => None,
        }
    }

    // ------------------------------------------------------------------------
    // Welcome
    // ------------------------------------------------------------------------

    /// Selects the document type and enters the builder.
    ///
    /// Participants are seeded from the catalog defaults, or with one
    /// Releasor/Releasee pair for custom types. Custom types load their
    /// template markup as the agreement body.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::DocumentTypeLocked`] outside the welcome stage.
    pub fn select_document_type(&mut self, document_type: DocumentType, title: Option<String>) -> Result<(), WorkflowError> {
        self.run("select_document_type", |this| {
            if !matches!(this.session.stage, WorkflowStage::Welcome) {
                return Err(WorkflowError::DocumentTypeLocked);
            }
            let template = match &document_type {
                DocumentType::Custom(id) => this.templates.get(id),
                _ => None,
            };
            let form_title = title.or_else(|| template.map(|template| template.name.clone()));
            let custom_agreement_content = template.map(|template| template.content.clone());
            let mut form_data = FormData::new();
            form_data.set(PARTICIPANTS_FIELD, this.catalog.seed_participants(&document_type));
            this.session = WorkflowSession {
                stage: WorkflowStage::Builder(BuilderState::at(0)),
                builder_type: Some(this.catalog.stepping_type(&document_type)),
                selected_type: Some(document_type),
                form_title,
                form_data,
                signatures: None,
                custom_agreement_content,
                snapshot_version: 0,
            };
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Builder
    // ------------------------------------------------------------------------

    /// Applies a field input. In the builder the field must be on the current
    /// step; in review the input edits the open draft.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] when the field is unknown, the input does
    /// not fit it, or no editable form is open.
    pub fn apply_field(&mut self, field_id: &str, input: FieldInput) -> Result<FieldChange, WorkflowError> {
        self.run("apply_field", |this| {
            let stage = this.session.stage.name();
            match &mut this.session.stage {
                WorkflowStage::Builder(builder) => {
                    let descriptor = builder
                        .current(stepping_steps(&this.catalog, this.session.builder_type.as_ref()))
                        .and_then(|step| step.field(field_id))
                        .ok_or_else(|| WorkflowError::UnknownField(field_id.to_string()))?;
                    Ok(apply_input(descriptor, &mut this.session.form_data, input)?)
                }
                WorkflowStage::Review(review) => {
                    let descriptor = find_field(&this.catalog, this.session.builder_type.as_ref(), field_id)?;
                    let Some(draft) = review.draft_mut() else {
                        return Err(WorkflowError::NoReviewEdit);
                    };
                    let mut edited = draft.clone();
                    let change = apply_input(descriptor, &mut edited, input)?;
                    *draft = edited;
                    Ok(change)
                }
                _ => Err(invalid(stage, "apply_field")),
            }
        })
    }

    /// Commits the current builder step. On the last step the builder hands
    /// over to review.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside the builder or when a participants
    /// field is out of bounds.
    pub fn next(&mut self) -> Result<(), WorkflowError> {
        self.run("next", |this| {
            let stage = this.step();
            let WorkflowStage::Builder(builder) = &this.session.stage else {
                return Err(invalid(stage, "next"));
            };
            let movement = builder.next(this.builder_steps(), &this.session.form_data)?;
            this.session.stage = match movement {
                BuilderMove::Step(index) => WorkflowStage::Builder(BuilderState::at(index)),
                BuilderMove::Review | BuilderMove::Exit => WorkflowStage::Review(ReviewState::default()),
            };
            this.session.snapshot_version += 1;
            Ok(())
        })
    }

    /// Navigates back one stage or builder step. Back from the first builder
    /// step starts over.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] in welcome, donation, and
    /// export.
    pub fn back(&mut self) -> Result<(), WorkflowError> {
        self.run("back", |this| {
            let stage = this.step();
            match &this.session.stage {
                WorkflowStage::Builder(builder) => match builder.back() {
                    BuilderMove::Step(index) => {
                        this.session.stage = WorkflowStage::Builder(BuilderState::at(index));
                    }
                    BuilderMove::Exit | BuilderMove::Review => this.session = WorkflowSession::default(),
                },
                WorkflowStage::Review(_) => {
                    let last = this.builder_steps().len().saturating_sub(1);
                    this.session.stage = WorkflowStage::Builder(BuilderState::at(last));
                }
                WorkflowStage::Agreement(_) | WorkflowStage::Signature(_) => {
                    this.session.stage = WorkflowStage::Review(ReviewState::default());
                }
                WorkflowStage::Welcome | WorkflowStage::Donation | WorkflowStage::Export => {
                    return Err(invalid(stage, "back"));
                }
            }
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Review
    // ------------------------------------------------------------------------

    /// Opens a review edit over a copy of the form data.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] outside review.
    pub fn begin_review_edit(&mut self) -> Result<(), WorkflowError> {
        self.run("begin_review_edit", |this| {
            let stage = this.step();
            let WorkflowStage::Review(review) = &mut this.session.stage else {
                return Err(invalid(stage, "begin_review_edit"));
            };
            review.begin(&this.session.form_data);
            Ok(())
        })
    }

    /// Saves the open review edit, replacing the form data.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside review or without an open edit.
    pub fn save_review_edit(&mut self) -> Result<(), WorkflowError> {
        self.run("save_review_edit", |this| {
            let stage = this.step();
            let WorkflowStage::Review(review) = &mut this.session.stage else {
                return Err(invalid(stage, "save_review_edit"));
            };
            let draft = review.take().ok_or(WorkflowError::NoReviewEdit)?;
            this.session.form_data = draft;
            Ok(())
        })
    }

    /// Discards the open review edit.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside review or without an open edit.
    pub fn cancel_review_edit(&mut self) -> Result<(), WorkflowError> {
        self.run("cancel_review_edit", |this| {
            let stage = this.step();
            let WorkflowStage::Review(review) = &mut this.session.stage else {
                return Err(invalid(stage, "cancel_review_edit"));
            };
            review.take().map(|_| ()).ok_or(WorkflowError::NoReviewEdit)
        })
    }

    /// Leaves review for the configured signing stage.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside review or while an edit is open.
    pub fn proceed_to_signing(&mut self) -> Result<(), WorkflowError> {
        self.run("proceed_to_signing", |this| {
            let stage = this.step();
            let WorkflowStage::Review(review) = &this.session.stage else {
                return Err(invalid(stage, "proceed_to_signing"));
            };
            if review.is_editing() {
                return Err(WorkflowError::ReviewEditPending);
            }
            let document_type = this.session.selected_type.clone().ok_or(WorkflowError::MissingDocumentType)?;
            let date = this.config.signing_date.unwrap_or_else(SigningDate::today);
            this.session.stage = match this.config.signing_path {
                SigningPath::Multi => {
                    WorkflowStage::Agreement(AgreementState::new(document_type, this.session.form_data.participants(), date))
                }
                SigningPath::Single => WorkflowStage::Signature(SignatureState::new(document_type, date)),
            };
            this.session.snapshot_version += 1;
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Signing
    // ------------------------------------------------------------------------

    /// Opens the signature pad for a signer.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside the agreement stage or for an
    /// unknown signer.
    pub fn activate_signer(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.run("activate_signer", |this| this.agreement_mut("activate_signer")?.activate(index))
    }

    /// Closes the open signature pad without capturing.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] outside the agreement stage.
    pub fn cancel_active_signer(&mut self) -> Result<(), WorkflowError> {
        self.run("cancel_active_signer", |this| {
            this.agreement_mut("cancel_active_signer")?.cancel_active();
            Ok(())
        })
    }

    /// Stores a capture for the signer whose pad is open, or for the single
    /// signer on the single-signer path. Returns the slot index filled.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside signing or without an open pad.
    pub fn capture_signature(&mut self, image: SignatureImage) -> Result<usize, WorkflowError> {
        self.run("capture_signature", |this| {
            let stage = this.session.stage.name();
            match &mut this.session.stage {
                WorkflowStage::Agreement(state) => state.capture(image),
                WorkflowStage::Signature(state) => {
                    state.capture(image);
                    Ok(0)
                }
                _ => Err(invalid(stage, "capture_signature")),
            }
        })
    }

    /// Clears a signer's capture.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside the agreement stage or for an
    /// unknown signer.
    pub fn clear_signature(&mut self, index: usize) -> Result<(), WorkflowError> {
        self.run("clear_signature", |this| this.agreement_mut("clear_signature")?.clear(index))
    }

    /// Changes the signing date.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] outside signing.
    pub fn set_signing_date(&mut self, date: SigningDate) -> Result<(), WorkflowError> {
        self.run("set_signing_date", |this| {
            let stage = this.session.stage.name();
            match &mut this.session.stage {
                WorkflowStage::Agreement(state) => state.set_date(date),
                WorkflowStage::Signature(state) => state.set_date(date),
                _ => return Err(invalid(stage, "set_signing_date")),
            }
            Ok(())
        })
    }

    /// Completes signing once every required signature is present.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside signing, when nobody is named, or
    /// while a signature is missing; the stage does not change.
    pub fn complete_signing(&mut self) -> Result<(), WorkflowError> {
        self.run("complete_signing", |this| {
            let stage = this.step();
            let payload = match &this.session.stage {
                WorkflowStage::Agreement(state) => state.assemble()?,
                WorkflowStage::Signature(state) => state.assemble()?,
                _ => return Err(invalid(stage, "complete_signing")),
            };
            this.session.signatures = Some(payload);
            this.session.stage = WorkflowStage::Donation;
            this.session.snapshot_version += 1;
            Ok(())
        })
    }

    // ------------------------------------------------------------------------
    // Donation and export
    // ------------------------------------------------------------------------

    /// Leaves the donation prompt for export.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidTransition`] outside donation.
    pub fn continue_to_export(&mut self) -> Result<(), WorkflowError> {
        self.run("continue_to_export", |this| {
            let stage = this.step();
            if !matches!(this.session.stage, WorkflowStage::Donation) {
                return Err(invalid(stage, "continue_to_export"));
            }
            this.session.stage = WorkflowStage::Export;
            this.session.snapshot_version += 1;
            Ok(())
        })
    }

    /// Takes an owned copy of the session for rendering and saving.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError`] outside export.
    pub fn export_job(&self) -> Result<ExportJob, WorkflowError> {
        if !matches!(self.session.stage, WorkflowStage::Export) {
            return Err(invalid(self.step(), "export_job"));
        }
        let form_type = self.session.selected_type.clone().ok_or(WorkflowError::MissingDocumentType)?;
        let payload = DocumentPayload {
            form_title: document_title(&form_type, self.session.form_title.as_deref()),
            form_type,
            form_data: self.session.form_data.clone(),
            signatures: self.session.signatures.clone(),
            custom_agreement_content: self.session.custom_agreement_content.clone(),
        };
        Ok(ExportJob::new(payload, Arc::clone(&self.audit)))
    }

    /// Resets the session to the welcome stage.
    pub fn start_over(&mut self) {
        let from = self.step();
        self.session = WorkflowSession::default();
        self.record("start_over", from, TransitionOutcome::Applied, None);
        self.notify();
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    /// Runs an operation, auditing stage changes and rejections and
    /// notifying observers on success.
    fn run<T>(
        &mut self,
        trigger: &'static str,
        operation: impl FnOnce(&mut Self) -> Result<T, WorkflowError>,
    ) -> Result<T, WorkflowError> {
        let from = self.step();
        let version = self.session.snapshot_version;
        match operation(self) {
            Ok(value) => {
                if from != self.step() || version != self.session.snapshot_version {
                    self.record(trigger, from, TransitionOutcome::Applied, None);
                }
                self.notify();
                Ok(value)
            }
            Err(err) => {
                self.record(trigger, from, TransitionOutcome::Rejected, Some(err.to_string()));
                Err(err)
            }
        }
    }

    /// Records one transition event.
    fn record(&self, trigger: &'static str, from: StepName, outcome: TransitionOutcome, reason: Option<String>) {
        self.audit.record(&WorkflowAuditEvent::new(WorkflowAuditEventParams {
            trigger,
            from,
            to: self.step(),
            outcome,
            document_type: self.session.selected_type.as_ref().map(ToString::to_string),
            snapshot_version: self.session.snapshot_version,
            reason,
        }));
    }

    /// Sends the current snapshot to every observer.
    fn notify(&self) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.session.snapshot();
        for observer in &self.observers {
            observer.session_changed(&snapshot);
        }
    }

    /// Returns the agreement stage for mutation.
    fn agreement_mut(&mut self, event: &'static str) -> Result<&mut AgreementState, WorkflowError> {
        let stage = self.step();
        match &mut self.session.stage {
            WorkflowStage::Agreement(state) => Ok(state),
            _ => Err(invalid(stage, event)),
        }
    }
}

/// Returns the builder steps for a stepping type.
fn stepping_steps<'a>(catalog: &'a StepCatalog, builder_type: Option<&DocumentType>) -> &'a [StepDescriptor] {
    builder_type.map(|document_type| catalog.steps_for(document_type)).unwrap_or_default()
}

/// Builds an invalid-transition error.
const fn invalid(stage: StepName, event: &'static str) -> WorkflowError {
    WorkflowError::InvalidTransition {
        stage,
        event,
    }
}

/// Finds a field across every step of the stepping type.
fn find_field<'a>(
    catalog: &'a StepCatalog,
    builder_type: Option<&DocumentType>,
    field_id: &str,
) -> Result<&'a FieldDescriptor, WorkflowError> {
    stepping_steps(catalog, builder_type)
        .iter()
        .find_map(|step| step.field(field_id))
        .ok_or_else(|| WorkflowError::UnknownField(field_id.to_string()))
}
