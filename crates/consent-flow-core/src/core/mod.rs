// consent-flow-core/src/core/mod.rs
// ============================================================================
// Module: Consent Flow Core Types
// Description: Document types, step catalog, form data, and signature shapes.
// Purpose: Provide stable, serializable types shared by every workflow surface.
// Dependencies: base64, serde, serde_json, time
// ============================================================================

//! ## Overview
//! Core types describe what a session collects: the step catalog per document
//! type, the answers accumulated by the builder, and the signatures attached at
//! signing. Their JSON forms match the payloads the remote document store
//! keeps, so saved records can be rendered again later.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod agreement;
pub mod catalog;
pub mod data_url;
pub mod fields;
pub mod form_data;
pub mod identifiers;
pub mod signature;
pub mod snapshot;
pub mod template;
pub mod time;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use agreement::AgreementText;
pub use agreement::CUSTOM_TITLE;
pub use agreement::NO_AGREEMENT_TEXT;
pub use agreement::document_title;
pub use agreement::markup_to_text;
pub use catalog::CatalogError;
pub use catalog::FieldDescriptor;
pub use catalog::FieldKind;
pub use catalog::ParticipantsRule;
pub use catalog::RoleOption;
pub use catalog::StepCatalog;
pub use catalog::StepDescriptor;
pub use data_url::DataUrl;
pub use data_url::DataUrlError;
pub use fields::FieldChange;
pub use fields::FieldError;
pub use fields::FieldInput;
pub use fields::apply_input;
pub use form_data::FieldValue;
pub use form_data::FileDescriptor;
pub use form_data::FormData;
pub use form_data::PARTICIPANTS_FIELD;
pub use form_data::Participant;
pub use form_data::ParticipantAttribute;
pub use identifiers::DocumentId;
pub use identifiers::DocumentType;
pub use identifiers::DocumentTypeError;
pub use identifiers::TemplateId;
pub use identifiers::UserId;
pub use signature::SignatureEntry;
pub use signature::SignatureError;
pub use signature::SignatureImage;
pub use signature::SignaturePayload;
pub use signature::SignedParticipant;
pub use signature::SigningDate;
pub use snapshot::StepName;
pub use snapshot::WorkflowSnapshot;
pub use template::CustomTemplate;
pub use time::unix_millis;
