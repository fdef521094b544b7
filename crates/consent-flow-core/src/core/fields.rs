// consent-flow-core/src/core/fields.rs
// ============================================================================
// Module: Consent Flow Field Inputs
// Description: Typed field edits applied against form data.
// Purpose: Map a field descriptor and a user input to a form data change.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each [`FieldDescriptor`] accepts a fixed family of [`FieldInput`]s. Inputs
//! that do not fit the field kind are rejected; inputs that fit are stored
//! without further validation. Participant lists keep `min <= len <= max`:
//! adding at the maximum and removing at the minimum are no-ops.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::catalog::FieldDescriptor;
use crate::core::catalog::FieldKind;
use crate::core::catalog::ParticipantsRule;
use crate::core::form_data::FieldValue;
use crate::core::form_data::FileDescriptor;
use crate::core::form_data::FormData;
use crate::core::form_data::Participant;
use crate::core::form_data::ParticipantAttribute;

// ============================================================================
// SECTION: Types
// ============================================================================

/// User edit addressed to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldInput {
    /// Typed text for text, email, date, number, or textarea fields.
    Text(String),
    /// Checkbox state.
    Checked(bool),
    /// Selected file.
    File(FileDescriptor),
    /// Clears a selected file.
    ClearFile,
    /// Edits one attribute of a participant.
    Participant {
        /// Participant position.
        index: usize,
        /// Attribute to change.
        attribute: ParticipantAttribute,
        /// New value.
        value: String,
    },
    /// Appends a participant with the first role option.
    AddParticipant,
    /// Removes the participant at an index.
    RemoveParticipant(usize),
}

/// Outcome of an applied input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldChange {
    /// Form data changed.
    Updated,
    /// Input was a permitted no-op.
    Unchanged,
}

/// Field input errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// Input does not fit the field kind.
    #[error("field {field} does not accept {input} input")]
    KindMismatch {
        /// Field id.
        field: String,
        /// Input family that was offered.
        input: &'static str,
    },
    /// Participant index is out of range.
    #[error("participant {index} not found in field {field}")]
    ParticipantNotFound {
        /// Field id.
        field: String,
        /// Requested index.
        index: usize,
    },
}

// ============================================================================
// SECTION: Participants Rule
// ============================================================================

impl ParticipantsRule {
    /// Returns true when `len` satisfies the rule bounds.
    #[must_use]
    pub const fn admits(&self, len: usize) -> bool {
        len >= self.min && len <= self.max
    }

    /// Appends a participant unless the list is at its maximum.
    pub fn add(&self, list: &mut Vec<Participant>) -> bool {
        if list.len() >= self.max {
            return false;
        }
        let role = self.role_options.first().map(|option| option.value.clone()).unwrap_or_default();
        list.push(Participant::with_role(role));
        true
    }

    /// Removes a participant unless the list is at its minimum or the index
    /// is out of range.
    pub fn remove(&self, list: &mut Vec<Participant>, index: usize) -> bool {
        if list.len() <= self.min || index >= list.len() {
            return false;
        }
        list.remove(index);
        true
    }
}

// ============================================================================
// SECTION: Input Application
// ============================================================================

/// Applies `input` to `data` for the field described by `descriptor`.
///
/// # Errors
///
/// Returns [`FieldError`] when the input does not fit the field.
pub fn apply_input(descriptor: &FieldDescriptor, data: &mut FormData, input: FieldInput) -> Result<FieldChange, FieldError> {
    let id = descriptor.id.as_str();
    match (&descriptor.kind, input) {
        (FieldKind::Text | FieldKind::Email | FieldKind::Date | FieldKind::Textarea, FieldInput::Text(text)) => {
            data.set(id, text);
            Ok(FieldChange::Updated)
        }
        (FieldKind::Number, FieldInput::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                data.remove(id);
            } else {
                data.set(id, parse_number(trimmed).unwrap_or(FieldValue::Text(text)));
            }
            Ok(FieldChange::Updated)
        }
        (FieldKind::Checkbox, FieldInput::Checked(checked)) => {
            data.set(id, checked);
            Ok(FieldChange::Updated)
        }
        (FieldKind::File { .. }, FieldInput::File(file)) => {
            data.set(id, file);
            Ok(FieldChange::Updated)
        }
        (FieldKind::File { .. }, FieldInput::ClearFile) => {
            Ok(if data.remove(id).is_some() { FieldChange::Updated } else { FieldChange::Unchanged })
        }
        (FieldKind::Participants(rule), FieldInput::AddParticipant) => {
            Ok(changed(data.update_participants(id, |list| rule.add(list))))
        }
        (FieldKind::Participants(rule), FieldInput::RemoveParticipant(index)) => {
            Ok(changed(data.update_participants(id, |list| rule.remove(list, index))))
        }
        (
            FieldKind::Participants(_),
            FieldInput::Participant {
                index,
                attribute,
                value,
            },
        ) => {
            if index >= data.participants_in(id).len() {
                return Err(FieldError::ParticipantNotFound {
                    field: id.to_string(),
                    index,
                });
            }
            data.update_participants(id, |list| {
                if let Some(participant) = list.get_mut(index) {
                    participant.set(attribute, value);
                }
            });
            Ok(FieldChange::Updated)
        }
        (_, input) => Err(FieldError::KindMismatch {
            field: id.to_string(),
            input: input_family(&input),
        }),
    }
}

/// Parses a numeric input.
fn parse_number(text: &str) -> Option<FieldValue> {
    if let Ok(value) = text.parse::<i64>() {
        return Some(FieldValue::from(value));
    }
    text.parse::<f64>().ok().and_then(serde_json::Number::from_f64).map(FieldValue::Number)
}

/// Maps a boolean mutation result onto a change outcome.
const fn changed(applied: bool) -> FieldChange {
    if applied { FieldChange::Updated } else { FieldChange::Unchanged }
}

/// Names an input family for error messages.
const fn input_family(input: &FieldInput) -> &'static str {
    match input {
        FieldInput::Text(_) => "text",
        FieldInput::Checked(_) => "checkbox",
        FieldInput::File(_) | FieldInput::ClearFile => "file",
        FieldInput::Participant { .. } | FieldInput::AddParticipant | FieldInput::RemoveParticipant(_) => "participant",
    }
}
