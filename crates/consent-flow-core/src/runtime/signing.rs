// consent-flow-core/src/runtime/signing.rs
// ============================================================================
// Module: Consent Flow Signing Stages
// Description: Signer slots for the multi-signer and single-signer paths.
// Purpose: Collect one signature per signer and assemble the signature payload.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The agreement stage holds one slot per named participant. Only the active
//! signer's slot accepts a capture, and the payload is assembled only once
//! every slot holds an image. The single-signer stage holds one slot.
//! Both stages carry the document type so a session cannot sign without one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::DocumentType;
use crate::core::Participant;
use crate::core::SignatureImage;
use crate::core::SignaturePayload;
use crate::core::SignedParticipant;
use crate::core::SigningDate;
use crate::runtime::controller::WorkflowError;

// ============================================================================
// SECTION: Agreement Stage
// ============================================================================

/// Multi-signer capture state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgreementState {
    /// Document type being signed.
    document_type: DocumentType,
    /// Participants who must sign, in form order.
    signers: Vec<Participant>,
    /// One captured signature per signer.
    slots: Vec<Option<SignatureImage>>,
    /// Signer whose pad is open.
    active: Option<usize>,
    /// Signing date.
    date: SigningDate,
}

impl AgreementState {
    /// Creates a stage for the named participants.
    #[must_use]
    pub fn new(document_type: DocumentType, participants: &[Participant], date: SigningDate) -> Self {
        let signers: Vec<Participant> = participants.iter().filter(|participant| participant.has_name()).cloned().collect();
        let slots = vec![None; signers.len()];
        Self {
            document_type,
            signers,
            slots,
            active: None,
            date,
        }
    }

    /// Returns the document type being signed.
    #[must_use]
    pub const fn document_type(&self) -> &DocumentType {
        &self.document_type
    }

    /// Returns the signers.
    #[must_use]
    pub fn signers(&self) -> &[Participant] {
        &self.signers
    }

    /// Returns the signature slots.
    #[must_use]
    pub fn slots(&self) -> &[Option<SignatureImage>] {
        &self.slots
    }

    /// Returns the active signer index.
    #[must_use]
    pub const fn active(&self) -> Option<usize> {
        self.active
    }

    /// Returns the signing date.
    #[must_use]
    pub const fn date(&self) -> SigningDate {
        self.date
    }

    /// Returns the indexes of signers without a signature.
    #[must_use]
    pub fn missing(&self) -> Vec<usize> {
        self.slots.iter().enumerate().filter(|(_, slot)| slot.is_none()).map(|(index, _)| index).collect()
    }

    /// Opens the pad for a signer.
    pub(crate) fn activate(&mut self, index: usize) -> Result<(), WorkflowError> {
        if index >= self.signers.len() {
            return Err(WorkflowError::SignerOutOfRange(index));
        }
        self.active = Some(index);
        Ok(())
    }

    /// Closes the open pad without capturing.
    pub(crate) const fn cancel_active(&mut self) {
        self.active = None;
    }

    /// Stores a capture for the active signer and closes the pad.
    pub(crate) fn capture(&mut self, image: SignatureImage) -> Result<usize, WorkflowError> {
        let Some(index) = self.active else {
            return Err(WorkflowError::NoActiveSigner);
        };
        let Some(slot) = self.slots.get_mut(index) else {
            return Err(WorkflowError::SignerOutOfRange(index));
        };
        *slot = Some(image);
        self.active = None;
        Ok(index)
    }

    /// Clears a signer's capture.
    pub(crate) fn clear(&mut self, index: usize) -> Result<(), WorkflowError> {
        let Some(slot) = self.slots.get_mut(index) else {
            return Err(WorkflowError::SignerOutOfRange(index));
        };
        *slot = None;
        Ok(())
    }

    /// Replaces the signing date.
    pub(crate) const fn set_date(&mut self, date: SigningDate) {
        self.date = date;
    }

    /// Assembles the multi-signer payload.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NoSigners`] when nobody is named and
    /// [`WorkflowError::SignaturesIncomplete`] while any slot is empty.
    pub fn assemble(&self) -> Result<SignaturePayload, WorkflowError> {
        if self.signers.is_empty() {
            return Err(WorkflowError::NoSigners);
        }
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(WorkflowError::SignaturesIncomplete {
                missing,
            });
        }
        let signatures = self
            .signers
            .iter()
            .zip(&self.slots)
            .filter_map(|(participant, slot)| {
                slot.as_ref().map(|signature| SignedParticipant {
                    participant: participant.clone(),
                    signature: signature.clone(),
                })
            })
            .collect();
        Ok(SignaturePayload::Multi {
            signatures,
            date: self.date,
        })
    }
}

// ============================================================================
// SECTION: Signature Stage
// ============================================================================

/// Single-signer capture state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureState {
    /// Document type being signed.
    document_type: DocumentType,
    /// Captured signature.
    signature: Option<SignatureImage>,
    /// Signing date.
    date: SigningDate,
}

impl SignatureState {
    /// Creates an empty single-signer stage.
    #[must_use]
    pub const fn new(document_type: DocumentType, date: SigningDate) -> Self {
        Self {
            document_type,
            signature: None,
            date,
        }
    }

    /// Returns the document type being signed.
    #[must_use]
    pub const fn document_type(&self) -> &DocumentType {
        &self.document_type
    }

    /// Returns the captured signature.
    #[must_use]
    pub const fn signature(&self) -> Option<&SignatureImage> {
        self.signature.as_ref()
    }

    /// Returns the signing date.
    #[must_use]
    pub const fn date(&self) -> SigningDate {
        self.date
    }

    /// Stores a capture, replacing any earlier one.
    pub(crate) fn capture(&mut self, image: SignatureImage) {
        self.signature = Some(image);
    }

    /// Replaces the signing date.
    pub(crate) const fn set_date(&mut self, date: SigningDate) {
        self.date = date;
    }

    /// Assembles the single-signer payload.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::SignatureMissing`] before a capture.
    pub fn assemble(&self) -> Result<SignaturePayload, WorkflowError> {
        let Some(signature) = &self.signature else {
            return Err(WorkflowError::SignatureMissing);
        };
        Ok(SignaturePayload::Single {
            signature: signature.clone(),
            date: self.date,
        })
    }
}
