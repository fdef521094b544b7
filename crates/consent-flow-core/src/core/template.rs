// consent-flow-core/src/core/template.rs
// ============================================================================
// Module: Consent Flow Custom Templates
// Description: User-authored agreement templates.
// Purpose: Provide the agreement body for `custom_` document types.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A custom template pairs a display name with agreement markup. Its id doubles
//! as the [`DocumentType::Custom`] key, so selecting a template selects a type.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DocumentType;
use crate::core::identifiers::TemplateId;

// ============================================================================
// SECTION: Types
// ============================================================================

/// User-authored agreement template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTemplate {
    /// Template identifier (`custom_<suffix>`).
    pub id: TemplateId,
    /// Display name, also the default document title.
    pub name: String,
    /// Agreement markup made of `<h3>` and `<p>` sections.
    pub content: String,
}

impl CustomTemplate {
    /// Creates a template whose id is derived from a creation timestamp.
    #[must_use]
    pub fn new(created_at_ms: u128, name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: TemplateId::new(created_at_ms.to_string()),
            name: name.into(),
            content: content.into(),
        }
    }

    /// Returns the document type selecting this template.
    #[must_use]
    pub fn document_type(&self) -> DocumentType {
        DocumentType::Custom(self.id.clone())
    }
}
