// consent-flow-core/src/core/data_url.rs
// ============================================================================
// Module: Consent Flow Data URLs
// Description: Base64 data URL parsing and encoding for embedded rasters.
// Purpose: Carry uploaded photos and signature images inside form payloads.
// Dependencies: base64, thiserror
// ============================================================================

//! ## Overview
//! Uploaded files and captured signatures travel as `data:<mime>;base64,...`
//! strings so saved payloads stay self-contained. Only the base64 form is
//! accepted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Data URL decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataUrlError {
    /// Missing `data:` scheme or `;base64,` marker.
    #[error("malformed data url: {0}")]
    Malformed(String),
    /// Payload is not valid base64.
    #[error("invalid base64 payload: {0}")]
    Encoding(String),
}

// ============================================================================
// SECTION: Types
// ============================================================================

/// Decoded data URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    /// Declared media type, for example `image/png`.
    pub mime_type: String,
    /// Decoded payload bytes.
    pub bytes: Vec<u8>,
}

impl DataUrl {
    /// Creates a data URL from raw bytes.
    #[must_use]
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Parses a `data:<mime>;base64,<payload>` string.
    ///
    /// # Errors
    ///
    /// Returns [`DataUrlError`] when the prefix or payload is invalid.
    pub fn parse(value: &str) -> Result<Self, DataUrlError> {
        let Some(rest) = value.trim().strip_prefix("data:") else {
            return Err(DataUrlError::Malformed("missing data: scheme".to_string()));
        };
        let Some((mime_type, payload)) = rest.split_once(";base64,") else {
            return Err(DataUrlError::Malformed("missing ;base64, marker".to_string()));
        };
        let bytes = STANDARD.decode(payload.trim()).map_err(|err| DataUrlError::Encoding(err.to_string()))?;
        Ok(Self::new(mime_type, bytes))
    }

    /// Encodes the data URL string form.
    #[must_use]
    pub fn encode(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Returns true when the media type is an image.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}
