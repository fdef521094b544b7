// consent-flow-core/src/runtime/builder.rs
// ============================================================================
// Module: Consent Flow Form Builder
// Description: Step cursor for the form wizard.
// Purpose: Decide where Next and Back lead from the current builder step.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The builder walks the catalog steps of the stepping type. Answers are
//! written straight into the session's form data, so moving between steps
//! never loses input. Next is refused while a participants field on the
//! current step is outside its bounds.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::FormData;
use crate::core::StepDescriptor;
use crate::runtime::controller::WorkflowError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Builder cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuilderState {
    /// Zero-based step index.
    pub step_index: usize,
}

/// Where a builder navigation leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderMove {
    /// Stay in the builder at this step.
    Step(usize),
    /// Leave forward to review.
    Review,
    /// Leave backward to the welcome screen.
    Exit,
}

impl BuilderState {
    /// Creates a cursor at `step_index`.
    #[must_use]
    pub const fn at(step_index: usize) -> Self {
        Self {
            step_index,
        }
    }

    /// Returns the current step descriptor.
    #[must_use]
    pub fn current<'a>(&self, steps: &'a [StepDescriptor]) -> Option<&'a StepDescriptor> {
        steps.get(self.step_index)
    }

    /// Returns true on the last step, or when there are no steps.
    #[must_use]
    pub const fn is_final(&self, step_count: usize) -> bool {
        self.step_index + 1 >= step_count
    }

    /// Resolves Next after checking the current step's participant bounds.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Cardinality`] when a participants field on
    /// the current step is outside its bounds.
    pub fn next(&self, steps: &[StepDescriptor], data: &FormData) -> Result<BuilderMove, WorkflowError> {
        if let Some(step) = self.current(steps) {
            for (field, rule) in step.participants_fields() {
                let actual = data.participants_in(&field.id).len();
                if !rule.admits(actual) {
                    return Err(WorkflowError::Cardinality {
                        field: field.id.clone(),
                        min: rule.min,
                        max: rule.max,
                        actual,
                    });
                }
            }
        }
        if self.is_final(steps.len()) {
            Ok(BuilderMove::Review)
        } else {
            Ok(BuilderMove::Step(self.step_index + 1))
        }
    }

    /// Resolves Back.
    #[must_use]
    pub const fn back(&self) -> BuilderMove {
        if self.step_index == 0 { BuilderMove::Exit } else { BuilderMove::Step(self.step_index - 1) }
    }
}
