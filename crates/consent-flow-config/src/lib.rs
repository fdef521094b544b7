// consent-flow-config/src/lib.rs
// ============================================================================
// Module: Consent Flow Config Library
// Description: Configuration model, validation, and example generation.
// Purpose: Single source of truth for consent-flow.toml semantics.
// Dependencies: consent-flow-core, serde, toml
// ============================================================================

//! ## Overview
//! `consent-flow-config` defines the configuration model for Consent Flow.
//! Loading is fail-closed: oversized, non-UTF-8, or out-of-range files are
//! rejected as a whole.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
