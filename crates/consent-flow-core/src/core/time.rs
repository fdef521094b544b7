// consent-flow-core/src/core/time.rs
// ============================================================================
// Module: Consent Flow Time
// Description: Wall-clock helpers for event timestamps and generated ids.
// Purpose: Keep clock access in one place.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Timestamps are unix milliseconds. A clock before the epoch reads as zero.

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current unix time in milliseconds.
#[must_use]
pub fn unix_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}
