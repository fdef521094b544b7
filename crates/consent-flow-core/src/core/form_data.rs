// consent-flow-core/src/core/form_data.rs
// ============================================================================
// Module: Consent Flow Form Data
// Description: Accumulated wizard answers keyed by field id.
// Purpose: Hold scalar, file, and participant values across workflow stages.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! [`FormData`] maps field ids to [`FieldValue`]s. Values serialize untagged so
//! the JSON shape matches what the remote document store already holds:
//! strings, numbers, booleans, file descriptor objects, and participant lists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::core::data_url::DataUrl;
use crate::core::data_url::DataUrlError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Field id that holds the participant list in every catalog type.
pub const PARTICIPANTS_FIELD: &str = "participants";

// ============================================================================
// SECTION: Participants
// ============================================================================

/// Person named in an agreement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Contact email.
    pub email: String,
    /// Role value chosen from the field's role options.
    pub role: String,
}

impl Participant {
    /// Creates an unnamed participant with the given role.
    #[must_use]
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Self::default()
        }
    }

    /// Returns true when a first or last name is present.
    #[must_use]
    pub fn has_name(&self) -> bool {
        !self.first_name.trim().is_empty() || !self.last_name.trim().is_empty()
    }

    /// Returns the trimmed full name.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim()).trim().to_string()
    }
}

/// Participant attribute addressed by an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipantAttribute {
    /// Given name.
    FirstName,
    /// Family name.
    LastName,
    /// Contact email.
    Email,
    /// Role value.
    Role,
}

impl Participant {
    /// Sets one attribute.
    pub fn set(&mut self, attribute: ParticipantAttribute, value: impl Into<String>) {
        let slot = match attribute {
            ParticipantAttribute::FirstName => &mut self.first_name,
            ParticipantAttribute::LastName => &mut self.last_name,
            ParticipantAttribute::Email => &mut self.email,
            ParticipantAttribute::Role => &mut self.role,
        };
        *slot = value.into();
    }
}

// ============================================================================
// SECTION: Files
// ============================================================================

/// Uploaded file carried inline as a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    /// Original file name.
    pub name: String,
    /// Media type reported at upload.
    #[serde(rename = "type")]
    pub content_type: String,
    /// Inline `data:` URL holding the file bytes.
    pub data_url: String,
}

impl FileDescriptor {
    /// Creates a descriptor from raw bytes.
    #[must_use]
    pub fn from_bytes(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        let content_type = content_type.into();
        let data_url = DataUrl::new(content_type.clone(), bytes).encode();
        Self {
            name: name.into(),
            content_type,
            data_url,
        }
    }

    /// Decodes the inline payload.
    ///
    /// # Errors
    ///
    /// Returns [`DataUrlError`] when the data URL is malformed.
    pub fn decode(&self) -> Result<DataUrl, DataUrlError> {
        DataUrl::parse(&self.data_url)
    }
}

// ============================================================================
// SECTION: Field Values
// ============================================================================

/// Value captured for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Checkbox state.
    Bool(bool),
    /// Numeric input.
    Number(serde_json::Number),
    /// Text, email, date, or textarea input.
    Text(String),
    /// Participant list.
    Participants(Vec<Participant>),
    /// Uploaded file.
    File(FileDescriptor),
}

impl FieldValue {
    /// Creates a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Returns true when the value carries no user input.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::Participants(list) => list.is_empty(),
            Self::Bool(_) | Self::Number(_) | Self::File(_) => false,
        }
    }

    /// Renders the value for summaries. Booleans become `Yes`/`No`.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Bool(true) => "Yes".to_string(),
            Self::Bool(false) => "No".to_string(),
            Self::Number(number) => number.to_string(),
            Self::Text(text) => text.clone(),
            Self::Participants(list) => {
                list.iter().map(Participant::display_name).filter(|name| !name.is_empty()).collect::<Vec<_>>().join(", ")
            }
            Self::File(file) => file.name.clone(),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<FileDescriptor> for FieldValue {
    fn from(value: FileDescriptor) -> Self {
        Self::File(value)
    }
}

impl From<Vec<Participant>> for FieldValue {
    fn from(value: Vec<Participant>) -> Self {
        Self::Participants(value)
    }
}

// ============================================================================
// SECTION: Form Data
// ============================================================================

/// Accumulated answers keyed by field id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormData(BTreeMap<String, FieldValue>);

impl FormData {
    /// Creates empty form data.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the value for a field.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.0.get(id)
    }

    /// Sets a field value, replacing any prior value.
    pub fn set(&mut self, id: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(id.into(), value.into());
    }

    /// Removes a field value.
    pub fn remove(&mut self, id: &str) -> Option<FieldValue> {
        self.0.remove(id)
    }

    /// Returns the text value for a field when it holds text.
    #[must_use]
    pub fn text(&self, id: &str) -> Option<&str> {
        match self.0.get(id) {
            Some(FieldValue::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns the file descriptor for a field when it holds a file.
    #[must_use]
    pub fn file(&self, id: &str) -> Option<&FileDescriptor> {
        match self.0.get(id) {
            Some(FieldValue::File(file)) => Some(file),
            _ => None,
        }
    }

    /// Returns the participant list stored under `id`, empty when absent.
    #[must_use]
    pub fn participants_in(&self, id: &str) -> &[Participant] {
        match self.0.get(id) {
            Some(FieldValue::Participants(list)) => list,
            _ => &[],
        }
    }

    /// Returns the participant list stored under the shared participants key.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        self.participants_in(PARTICIPANTS_FIELD)
    }

    /// Applies `edit` to the participant list under `id`. A missing or
    /// mistyped entry is replaced by an empty list first.
    pub fn update_participants<R>(&mut self, id: &str, edit: impl FnOnce(&mut Vec<Participant>) -> R) -> R {
        let mut list = match self.0.remove(id) {
            Some(FieldValue::Participants(list)) => list,
            _ => Vec::new(),
        };
        let result = edit(&mut list);
        self.0.insert(id.to_string(), FieldValue::Participants(list));
        result
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Returns the number of stored fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no fields are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for FormData {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
