// consent-flow-core/src/core/signature.rs
// ============================================================================
// Module: Consent Flow Signatures
// Description: Captured signature rasters, signing dates, and payload shapes.
// Purpose: Carry signer images from capture through rendering and persistence.
// Dependencies: serde, thiserror, time
// ============================================================================

//! ## Overview
//! A [`SignaturePayload`] is either the single-signer shape `{signature, date}`
//! or the multi-signer shape `{signatures: [...], date}` where each entry is a
//! participant with its signature image. Images are PNG data URLs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use thiserror::Error;
use time::Date;
use time::OffsetDateTime;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

use crate::core::data_url::DataUrl;
use crate::core::data_url::DataUrlError;
use crate::core::form_data::Participant;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Calendar date format used on the wire and in documents.
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Signature construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Signature is not a decodable data URL.
    #[error("invalid signature image: {0}")]
    InvalidImage(#[from] DataUrlError),
    /// Signature data URL is not an image.
    #[error("signature must be an image, got {0}")]
    NotAnImage(String),
    /// Signature image is empty.
    #[error("signature image is empty")]
    Empty,
    /// Signing date is not `YYYY-MM-DD`.
    #[error("invalid signing date: {0}")]
    InvalidDate(String),
}

// ============================================================================
// SECTION: Signature Image
// ============================================================================

/// Captured signature raster stored as an image data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignatureImage(String);

impl SignatureImage {
    /// Wraps a data URL after checking that it decodes to a non-empty image.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError`] when the data URL is unusable.
    pub fn from_data_url(data_url: impl Into<String>) -> Result<Self, SignatureError> {
        let data_url = data_url.into();
        let decoded = DataUrl::parse(&data_url)?;
        if !decoded.is_image() {
            return Err(SignatureError::NotAnImage(decoded.mime_type));
        }
        if decoded.bytes.is_empty() {
            return Err(SignatureError::Empty);
        }
        Ok(Self(data_url))
    }

    /// Wraps encoded PNG bytes.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::Empty`] when no bytes are given.
    pub fn from_png_bytes(bytes: Vec<u8>) -> Result<Self, SignatureError> {
        if bytes.is_empty() {
            return Err(SignatureError::Empty);
        }
        Ok(Self(DataUrl::new("image/png", bytes).encode()))
    }

    /// Returns the data URL.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the image payload.
    ///
    /// # Errors
    ///
    /// Returns [`DataUrlError`] when the stored data URL is malformed.
    pub fn decode(&self) -> Result<DataUrl, DataUrlError> {
        DataUrl::parse(&self.0)
    }
}

// ============================================================================
// SECTION: Signing Date
// ============================================================================

/// Calendar date a document was signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SigningDate(Date);

impl SigningDate {
    /// Wraps a calendar date.
    #[must_use]
    pub const fn new(date: Date) -> Self {
        Self(date)
    }

    /// Returns today's date in UTC.
    #[must_use]
    pub fn today() -> Self {
        Self(OffsetDateTime::now_utc().date())
    }

    /// Returns the wrapped date.
    #[must_use]
    pub const fn date(self) -> Date {
        self.0
    }
}

impl FromStr for SigningDate {
    type Err = SignatureError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Date::parse(value.trim(), DATE_FORMAT).map(Self).map_err(|err| SignatureError::InvalidDate(format!("{value}: {err}")))
    }
}

impl fmt::Display for SigningDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.0.format(DATE_FORMAT).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl Serialize for SigningDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SigningDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Participant paired with the signature they drew.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedParticipant {
    /// Participant details as entered in the builder.
    #[serde(flatten)]
    pub participant: Participant,
    /// Captured signature.
    pub signature: SignatureImage,
}

/// Signature data attached to a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignaturePayload {
    /// One entry per signer.
    Multi {
        /// Signed participants in signer order.
        signatures: Vec<SignedParticipant>,
        /// Signing date.
        date: SigningDate,
    },
    /// Single signer.
    Single {
        /// Captured signature.
        signature: SignatureImage,
        /// Signing date.
        date: SigningDate,
    },
}

/// Signature rendered into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureEntry<'a> {
    /// Caption printed above the image.
    pub label: &'a str,
    /// Signer details when known.
    pub participant: Option<&'a Participant>,
    /// Captured image.
    pub image: &'a SignatureImage,
}

impl SignaturePayload {
    /// Returns the signing date.
    #[must_use]
    pub const fn date(&self) -> SigningDate {
        match self {
            Self::Multi {
                date, ..
            }
            | Self::Single {
                date, ..
            } => *date,
        }
    }

    /// Returns the number of captured signatures.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Multi {
                signatures, ..
            } => signatures.len(),
            Self::Single {
                ..
            } => 1,
        }
    }

    /// Returns true when no signatures are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the signatures in signing order.
    #[must_use]
    pub fn entries(&self) -> Vec<SignatureEntry<'_>> {
        match self {
            Self::Multi {
                signatures, ..
            } => signatures
                .iter()
                .map(|signed| SignatureEntry {
                    label: signed.participant.role.as_str(),
                    participant: Some(&signed.participant),
                    image: &signed.signature,
                })
                .collect(),
            Self::Single {
                signature, ..
            } => vec![SignatureEntry {
                label: "Participant",
                participant: None,
                image: signature,
            }],
        }
    }
}
