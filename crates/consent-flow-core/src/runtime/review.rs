// consent-flow-core/src/runtime/review.rs
// ============================================================================
// Module: Consent Flow Review Stage
// Description: Edit buffer over the accumulated form data.
// Purpose: Let users correct answers before signing without partial writes.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Review edits happen on a draft copy. Saving replaces the session's form
//! data in one step; cancelling drops the draft.

use crate::core::FormData;

/// Review stage state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewState {
    /// Draft being edited, if an edit is open.
    draft: Option<FormData>,
}

impl ReviewState {
    /// Returns the open draft.
    #[must_use]
    pub const fn draft(&self) -> Option<&FormData> {
        self.draft.as_ref()
    }

    /// Returns true while an edit is open.
    #[must_use]
    pub const fn is_editing(&self) -> bool {
        self.draft.is_some()
    }

    /// Opens an edit over a copy of `data`. An open draft is kept.
    pub(crate) fn begin(&mut self, data: &FormData) {
        if self.draft.is_none() {
            self.draft = Some(data.clone());
        }
    }

    /// Returns the open draft for mutation.
    pub(crate) const fn draft_mut(&mut self) -> Option<&mut FormData> {
        self.draft.as_mut()
    }

    /// Closes the edit and returns the draft.
    pub(crate) const fn take(&mut self) -> Option<FormData> {
        self.draft.take()
    }
}
