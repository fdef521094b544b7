// consent-flow-core/src/core/agreement.rs
// ============================================================================
// Module: Consent Flow Agreement Text
// Description: Legal text and titles for built-in and custom document types.
// Purpose: Resolve the agreement body shown at signing and printed on export.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Built-in types carry fixed agreement bodies. Custom types take their body
//! from the selected template, whose content is a restricted markup of `<h3>`
//! headings and `<p>` paragraphs converted here to plain text.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DocumentType;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Body used when no agreement text exists for a type.
pub const NO_AGREEMENT_TEXT: &str = "No agreement text available.";
/// Title used for custom types without an explicit title.
pub const CUSTOM_TITLE: &str = "Custom Agreement";

/// Content release agreement body.
const CONTENT_RELEASE_TEXT: &str = include_str!("agreements/content_release.txt");
/// General consent agreement body.
const GENERAL_CONSENT_TEXT: &str = include_str!("agreements/general_consent.txt");
/// Non-disclosure agreement body.
const NDA_TEXT: &str = include_str!("agreements/nda.txt");

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolved agreement for a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementText {
    /// Document title.
    pub title: String,
    /// Plain-text body with paragraphs separated by blank lines.
    pub body: String,
}

impl AgreementText {
    /// Resolves the agreement for a document type.
    ///
    /// Custom types use `custom_content` when present. `custom_title`
    /// overrides the title for any type.
    #[must_use]
    pub fn resolve(document_type: &DocumentType, custom_title: Option<&str>, custom_content: Option<&str>) -> Self {
        let body = match document_type {
            DocumentType::ContentRelease => CONTENT_RELEASE_TEXT.trim().to_string(),
            DocumentType::GeneralConsent => GENERAL_CONSENT_TEXT.trim().to_string(),
            DocumentType::Nda => NDA_TEXT.trim().to_string(),
            DocumentType::Custom(_) => custom_content.map(markup_to_text).unwrap_or_default(),
        };
        let body = if body.is_empty() { NO_AGREEMENT_TEXT.to_string() } else { body };
        Self {
            title: document_title(document_type, custom_title),
            body,
        }
    }

    /// Returns the body paragraphs without blank separators.
    pub fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.body.split("\n\n").map(str::trim).filter(|paragraph| !paragraph.is_empty())
    }
}

/// Returns the document title for a type.
#[must_use]
pub fn document_title(document_type: &DocumentType, custom_title: Option<&str>) -> String {
    if let Some(title) = custom_title.map(str::trim).filter(|title| !title.is_empty()) {
        return title.to_string();
    }
    match document_type {
        DocumentType::ContentRelease => "Content Release Form",
        DocumentType::GeneralConsent => "General Consent Form",
        DocumentType::Nda => "Non-Disclosure Agreement",
        DocumentType::Custom(_) => CUSTOM_TITLE,
    }
    .to_string()
}

// ============================================================================
// SECTION: Markup Conversion
// ============================================================================

/// Converts template markup into plain text paragraphs.
#[must_use]
pub fn markup_to_text(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[.. start]);
        let Some(end) = rest[start ..].find('>') else {
            text.push_str(&rest[start ..]);
            rest = "";
            break;
        };
        let tag = rest[start + 1 .. start + end].trim().to_ascii_lowercase();
        match tag.split_whitespace().next().unwrap_or_default() {
            "/h1" | "/h2" | "/h3" | "/h4" | "/p" | "/div" | "/li" => text.push_str("\n\n"),
            "br" | "br/" => text.push('\n'),
            _ => {}
        }
        rest = &rest[start + end + 1 ..];
    }
    text.push_str(rest);
    let decoded = decode_entities(&text);
    decoded
        .split("\n\n")
        .map(|paragraph| paragraph.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n"))
        .filter(|paragraph| !paragraph.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Decodes the handful of HTML entities editors emit.
fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
