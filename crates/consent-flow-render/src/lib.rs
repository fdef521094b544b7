// consent-flow-render/src/lib.rs
// ============================================================================
// Module: Consent Flow Render Library
// Description: PDF rendering for completed consent sessions.
// Purpose: Implement the core document renderer with standard PDF fonts.
// Dependencies: consent-flow-core, image, lopdf
// ============================================================================

//! ## Overview
//! `consent-flow-render` turns a render request into a paginated PDF: title,
//! summary of answers, party details, the optional ID photo, the agreement
//! body, and the signature block. Images that fail to decode are replaced
//! with a placeholder line instead of failing the render.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod images;
pub mod layout;
pub mod pdf;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use layout::PageGeometry;
pub use pdf::PdfRenderer;
pub use pdf::field_label;
