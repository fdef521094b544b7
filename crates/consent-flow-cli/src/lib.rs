// consent-flow-cli/src/lib.rs
// ============================================================================
// Module: Consent Flow CLI Library
// Description: Shared pieces of the consent-flow command line.
// Purpose: Expose answer replay and localized messages to the binary and tests.
// Dependencies: consent-flow-core, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`answers`] replays a prepared answers file through the workflow
//! controller; [`i18n`] holds the CLI message catalogs behind [`t!`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod answers;
pub mod i18n;
