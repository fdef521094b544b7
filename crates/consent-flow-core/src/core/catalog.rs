// consent-flow-core/src/core/catalog.rs
// ============================================================================
// Module: Consent Flow Step Catalog
// Description: Ordered wizard steps and field descriptors per document type.
// Purpose: Define what the builder asks for and the participant cardinality rules.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The catalog maps each [`DocumentType`] to an ordered list of
//! [`StepDescriptor`]s. Lookups for a type the catalog does not hold return an
//! empty slice; the controller steps through the `general-consent` entry in
//! that case while keeping the selected type for agreement text lookup.
//!
//! Catalogs can be replaced from JSON in the same shape the built-in entries
//! serialize to. Loaded catalogs are validated before use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::form_data::PARTICIPANTS_FIELD;
use crate::core::form_data::Participant;
use crate::core::identifiers::DocumentType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Role given to the first seeded participant when no defaults exist.
pub const FALLBACK_FIRST_ROLE: &str = "Releasor";
/// Role given to the second seeded participant when no defaults exist.
pub const FALLBACK_SECOND_ROLE: &str = "Releasee";
/// Type whose steps are used for types missing from the catalog.
pub const FALLBACK_STEPPING_TYPE: DocumentType = DocumentType::GeneralConsent;
/// Number of participants seeded for custom and untyped sessions.
const FALLBACK_SEED_COUNT: usize = 2;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Catalog construction and validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    /// Catalog JSON failed to parse.
    #[error("catalog parse error: {0}")]
    Parse(String),
    /// Catalog content is inconsistent.
    #[error("invalid catalog: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Descriptors
// ============================================================================

/// Selectable participant role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleOption {
    /// Role value stored on the participant.
    pub value: String,
    /// Translation key for the role label.
    pub label_key: String,
    /// Translation key for the role description.
    #[serde(default)]
    pub description_key: Option<String>,
}

/// Cardinality and seeding rules for a participants field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantsRule {
    /// Minimum number of participants.
    pub min: usize,
    /// Maximum number of participants.
    pub max: usize,
    /// Translation key for the field description.
    #[serde(default)]
    pub description_key: Option<String>,
    /// Participants seeded when the type is selected.
    #[serde(default)]
    pub default_participants: Vec<Participant>,
    /// Roles a participant may take; the first is used for new entries.
    pub role_options: Vec<RoleOption>,
}

/// Input kind of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    /// Single-line text.
    Text,
    /// Email address.
    Email,
    /// Calendar date (`YYYY-MM-DD`).
    Date,
    /// Numeric input.
    Number,
    /// Boolean checkbox.
    Checkbox,
    /// Multi-line text.
    Textarea,
    /// Uploaded file stored inline.
    File {
        /// Accepted media type pattern.
        #[serde(default)]
        accept: Option<String>,
    },
    /// Ordered participant list.
    Participants(ParticipantsRule),
}

/// Field shown on a wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Form data key.
    pub id: String,
    /// Translation key for the label.
    pub label_key: String,
    /// Input kind and kind-specific rules.
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl FieldDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(id: impl Into<String>, label_key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            id: id.into(),
            label_key: label_key.into(),
            kind,
        }
    }

    /// Returns the participants rule when this is a participants field.
    #[must_use]
    pub const fn participants_rule(&self) -> Option<&ParticipantsRule> {
        match &self.kind {
            FieldKind::Participants(rule) => Some(rule),
            _ => None,
        }
    }
}

/// One wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDescriptor {
    /// Translation key for the step title.
    pub title_key: String,
    /// Fields in display order.
    pub fields: Vec<FieldDescriptor>,
}

impl StepDescriptor {
    /// Returns the field with `id`.
    #[must_use]
    pub fn field(&self, id: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.id == id)
    }

    /// Returns the participants fields on this step.
    pub fn participants_fields(&self) -> impl Iterator<Item = (&FieldDescriptor, &ParticipantsRule)> {
        self.fields.iter().filter_map(|field| field.participants_rule().map(|rule| (field, rule)))
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Step catalog keyed by document type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StepCatalog {
    /// Steps per document type.
    entries: BTreeMap<DocumentType, Vec<StepDescriptor>>,
}

impl StepCatalog {
    /// Creates a validated catalog from entries.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] when the entries are inconsistent.
    pub fn new(entries: BTreeMap<DocumentType, Vec<StepDescriptor>>) -> Result<Self, CatalogError> {
        let catalog = Self {
            entries,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parses and validates a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when parsing or validation fails.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let entries: BTreeMap<DocumentType, Vec<StepDescriptor>> =
            serde_json::from_str(json).map_err(|err| CatalogError::Parse(err.to_string()))?;
        Self::new(entries)
    }

    /// Returns the built-in catalog.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(DocumentType::ContentRelease, content_release_steps());
        entries.insert(DocumentType::GeneralConsent, general_consent_steps());
        entries.insert(DocumentType::Nda, nda_steps());
        Self {
            entries,
        }
    }

    /// Returns the ordered steps for a type, empty when the type is unknown.
    #[must_use]
    pub fn steps_for(&self, document_type: &DocumentType) -> &[StepDescriptor] {
        self.entries.get(document_type).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the type whose steps drive the builder for `document_type`.
    #[must_use]
    pub fn stepping_type(&self, document_type: &DocumentType) -> DocumentType {
        if self.entries.contains_key(document_type) {
            document_type.clone()
        } else {
            FALLBACK_STEPPING_TYPE
        }
    }

    /// Returns the document types held by the catalog.
    pub fn document_types(&self) -> impl Iterator<Item = &DocumentType> {
        self.entries.keys()
    }

    /// Returns the first participants rule for a type.
    #[must_use]
    pub fn participants_rule(&self, document_type: &DocumentType) -> Option<&ParticipantsRule> {
        self.steps_for(document_type).iter().flat_map(StepDescriptor::participants_fields).map(|(_, rule)| rule).next()
    }

    /// Returns the participants seeded when `document_type` is selected.
    ///
    /// Custom types and types without catalog defaults get one
    /// Releasor/Releasee pair.
    #[must_use]
    pub fn seed_participants(&self, document_type: &DocumentType) -> Vec<Participant> {
        if !document_type.is_custom()
            && let Some(rule) = self.participants_rule(document_type)
            && !rule.default_participants.is_empty()
        {
            return rule.default_participants.clone();
        }
        vec![Participant::with_role(FALLBACK_FIRST_ROLE), Participant::with_role(FALLBACK_SECOND_ROLE)]
    }

    /// Validates ids and cardinality rules.
    ///
    /// The fallback stepping type must have steps, and its participants rule
    /// must admit the Releasor/Releasee pair seeded for custom types.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Invalid`] on the first inconsistency found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.steps_for(&FALLBACK_STEPPING_TYPE).is_empty() {
            return Err(CatalogError::Invalid(format!("{FALLBACK_STEPPING_TYPE}: fallback entry has no steps")));
        }
        if let Some(rule) = self.participants_rule(&FALLBACK_STEPPING_TYPE)
            && !(rule.min ..= rule.max).contains(&FALLBACK_SEED_COUNT)
        {
            return Err(CatalogError::Invalid(format!(
                "{FALLBACK_STEPPING_TYPE}: bounds {}..={} exclude the {FALLBACK_SEED_COUNT} fallback participants",
                rule.min, rule.max
            )));
        }
        for (document_type, steps) in &self.entries {
            let mut seen = BTreeSet::new();
            for step in steps {
                for field in &step.fields {
                    if field.id.trim().is_empty() {
                        return Err(CatalogError::Invalid(format!("{document_type}: empty field id")));
                    }
                    if !seen.insert(field.id.as_str()) {
                        return Err(CatalogError::Invalid(format!("{document_type}: duplicate field id {}", field.id)));
                    }
                    if let Some(rule) = field.participants_rule() {
                        if field.id != PARTICIPANTS_FIELD {
                            return Err(CatalogError::Invalid(format!(
                                "{document_type}: participants field must use id {PARTICIPANTS_FIELD}, found {}",
                                field.id
                            )));
                        }
                        validate_rule(document_type, &field.id, rule)?;
                    }
                }
            }
        }
        Ok(())
    }
}

impl Default for StepCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Validates a single participants rule.
fn validate_rule(document_type: &DocumentType, field_id: &str, rule: &ParticipantsRule) -> Result<(), CatalogError> {
    if rule.max == 0 || rule.min > rule.max {
        return Err(CatalogError::Invalid(format!(
            "{document_type}.{field_id}: bounds {}..={} are empty",
            rule.min, rule.max
        )));
    }
    if rule.role_options.is_empty() {
        return Err(CatalogError::Invalid(format!("{document_type}.{field_id}: role options are empty")));
    }
    let seeded = rule.default_participants.len();
    if seeded != 0 && (seeded < rule.min || seeded > rule.max) {
        return Err(CatalogError::Invalid(format!(
            "{document_type}.{field_id}: {seeded} default participants outside {}..={}",
            rule.min, rule.max
        )));
    }
    Ok(())
}

// ============================================================================
// SECTION: Built-in Entries
// ============================================================================

/// Builds a participants field for a catalog type.
fn participants_field(prefix: &str, defaults: [&str; 2], roles: &[(&str, &str)]) -> FieldDescriptor {
    let rule = ParticipantsRule {
        min: 2,
        max: 10,
        description_key: Some(format!("form.{prefix}.participants_desc")),
        default_participants: defaults.iter().map(|role| Participant::with_role(*role)).collect(),
        role_options: roles
            .iter()
            .map(|(value, key)| RoleOption {
                value: (*value).to_string(),
                label_key: format!("form.{prefix}.role_{key}_label"),
                description_key: Some(format!("form.{prefix}.role_{key}_desc")),
            })
            .collect(),
    };
    FieldDescriptor::new(PARTICIPANTS_FIELD, format!("form.{prefix}.participants_label"), FieldKind::Participants(rule))
}

/// Builds a plain field.
fn field(id: &str, label_key: &str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor::new(id, label_key, kind)
}

/// Builds an image upload field.
fn photo_field(label_key: &str) -> FieldDescriptor {
    field(
        "idPhoto",
        label_key,
        FieldKind::File {
            accept: Some("image/*".to_string()),
        },
    )
}

/// Builds a step.
fn step(title_key: &str, fields: Vec<FieldDescriptor>) -> StepDescriptor {
    StepDescriptor {
        title_key: title_key.to_string(),
        fields,
    }
}

/// Content release steps.
fn content_release_steps() -> Vec<StepDescriptor> {
    let prefix = "form.content-release";
    vec![
        step(
            &format!("{prefix}.step1Title"),
            vec![participants_field(
                "content-release",
                ["Releasor", "Releasee"],
                &[("Releasor", "releasor"), ("Releasee", "releasee"), ("Additional Participant", "additional")],
            )],
        ),
        step(
            &format!("{prefix}.step2Title"),
            vec![
                field("eventName", &format!("{prefix}.eventName_label"), FieldKind::Text),
                field("date", "form.common.date", FieldKind::Date),
                photo_field("form.common.idPhotoOptional"),
                field("shareEmail", "form.common.shareEmail", FieldKind::Email),
            ],
        ),
        step(
            &format!("{prefix}.step3Title"),
            vec![
                field("socialMedia", &format!("{prefix}.socialMedia_label"), FieldKind::Checkbox),
                field("commercial", &format!("{prefix}.commercial_label"), FieldKind::Checkbox),
                field("marketing", &format!("{prefix}.marketing_label"), FieldKind::Checkbox),
                field("noExpiration", &format!("{prefix}.noExpiration_label"), FieldKind::Checkbox),
            ],
        ),
        step(
            &format!("{prefix}.step4Title"),
            vec![
                field("compensation", &format!("{prefix}.compensation_label"), FieldKind::Text),
                field("additionalTerms", "form.common.additionalTerms", FieldKind::Textarea),
            ],
        ),
    ]
}

/// General consent steps.
fn general_consent_steps() -> Vec<StepDescriptor> {
    let prefix = "form.general-consent";
    vec![
        step(
            &format!("{prefix}.step1Title"),
            vec![participants_field(
                "general-consent",
                ["Party A", "Party B"],
                &[("Party A", "partyA"), ("Party B", "partyB"), ("Witness", "witness")],
            )],
        ),
        step(
            &format!("{prefix}.step2Title"),
            vec![
                field("activityName", &format!("{prefix}.activityName_label"), FieldKind::Text),
                photo_field("form.common.idPhotoOptional"),
                field("shareEmail", "form.common.shareEmailOptional", FieldKind::Email),
            ],
        ),
        step(
            &format!("{prefix}.step3Title"),
            vec![
                field("healthDisclosure", &format!("{prefix}.healthDisclosure_label"), FieldKind::Checkbox),
                field("voluntaryParticipation", &format!("{prefix}.voluntaryParticipation_label"), FieldKind::Checkbox),
            ],
        ),
    ]
}

/// Non-disclosure agreement steps.
fn nda_steps() -> Vec<StepDescriptor> {
    let prefix = "form.nda";
    vec![
        step(
            &format!("{prefix}.step1Title"),
            vec![
                participants_field(
                    "nda",
                    ["Disclosing Party", "Receiving Party"],
                    &[("Disclosing Party", "disclosing"), ("Receiving Party", "receiving"), ("Witness", "witness")],
                ),
                field("effectiveDate", &format!("{prefix}.effectiveDate_label"), FieldKind::Date),
            ],
        ),
        step(
            &format!("{prefix}.step2Title"),
            vec![
                field("purpose", &format!("{prefix}.purpose_label"), FieldKind::Textarea),
                photo_field("form.common.idPhoto"),
                field("shareEmail", "form.common.shareEmail", FieldKind::Email),
            ],
        ),
        step(
            &format!("{prefix}.step3Title"),
            vec![
                field("duration", &format!("{prefix}.duration_label"), FieldKind::Number),
                field("returnMaterials", &format!("{prefix}.returnMaterials_label"), FieldKind::Checkbox),
            ],
        ),
        step(
            &format!("{prefix}.step4Title"),
            vec![
                field("jurisdiction", &format!("{prefix}.jurisdiction_label"), FieldKind::Text),
                field("additionalClauses", "form.common.additionalClauses", FieldKind::Textarea),
            ],
        ),
    ]
}
