// consent-flow-core/src/core/identifiers.rs
// ============================================================================
// Module: Consent Flow Identifiers
// Description: Document type keys and opaque identifiers for users and records.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Identifiers serialize as plain strings. [`DocumentType`] is a closed set of
//! built-in kinds plus custom templates keyed by a `custom_` prefixed id; the
//! wire form of every variant is the string the remote API stores.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix carried by every custom template identifier.
pub const CUSTOM_PREFIX: &str = "custom_";

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Custom template identifier (full `custom_<suffix>` form).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    /// Creates a template identifier, adding the custom prefix when absent.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        if id.starts_with(CUSTOM_PREFIX) { Self(id) } else { Self(format!("{CUSTOM_PREFIX}{id}")) }
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for TemplateId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// User identifier assigned by the remote account service.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new user identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Saved document identifier assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Creates a new document identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Document Type
// ============================================================================

/// Kind of agreement a session produces.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DocumentType {
    /// Content release for recorded media.
    ContentRelease,
    /// General activity consent.
    GeneralConsent,
    /// Non-disclosure agreement.
    Nda,
    /// User-authored template.
    Custom(TemplateId),
}

impl DocumentType {
    /// Built-in document types in catalog order.
    pub const BUILTIN: [Self; 3] = [Self::ContentRelease, Self::GeneralConsent, Self::Nda];

    /// Returns the stable string key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::ContentRelease => "content-release",
            Self::GeneralConsent => "general-consent",
            Self::Nda => "nda",
            Self::Custom(id) => id.as_str(),
        }
    }

    /// Returns true for user-authored template types.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document type parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentTypeError {
    /// Key did not name a known type.
    #[error("unknown document type: {0}")]
    Unknown(String),
}

impl FromStr for DocumentType {
    type Err = DocumentTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "content-release" => Ok(Self::ContentRelease),
            "general-consent" => Ok(Self::GeneralConsent),
            "nda" => Ok(Self::Nda),
            other if other.len() > CUSTOM_PREFIX.len() && other.starts_with(CUSTOM_PREFIX) => {
                Ok(Self::Custom(TemplateId::new(other)))
            }
            other => Err(DocumentTypeError::Unknown(other.to_string())),
        }
    }
}

impl TryFrom<String> for DocumentType {
    type Error = DocumentTypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentType> for String {
    fn from(value: DocumentType) -> Self {
        value.as_str().to_string()
    }
}
