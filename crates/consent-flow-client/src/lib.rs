// consent-flow-client/src/lib.rs
// ============================================================================
// Module: Consent Flow Client Library
// Description: REST client, auth session, and custom template storage.
// Purpose: Connect the workflow to the remote account and document service.
// Dependencies: consent-flow-core, reqwest, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! `consent-flow-client` provides [`ApiClient`], a blocking REST client that
//! implements the core [`consent_flow_core::DocumentStore`] and
//! [`consent_flow_core::AssistantTokenSource`] interfaces, plus the local
//! [`SessionStore`] and [`TemplateStore`] that keep the login and custom
//! templates between runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod session;
pub mod templates;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::ApiClient;
pub use api::ApiClientConfig;
pub use api::CheckoutConfirmation;
pub use api::ClientError;
pub use session::AccountUser;
pub use session::AuthSession;
pub use session::SessionStore;
pub use templates::TemplateStore;
pub use templates::TemplateStoreError;
