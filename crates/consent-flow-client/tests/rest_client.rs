// consent-flow-client/tests/rest_client.rs
// ============================================================================
// Module: REST Client Tests
// Description: Request shapes and error mapping against a local server.
// Purpose: Ensure the client speaks the document, credit, and token API.
// Dependencies: consent-flow-client, consent-flow-core, serde_json, tiny_http
// ============================================================================

//! ## Overview
//! Each test serves canned JSON from a local `tiny_http` server and checks
//! both the parsed result and the request the client sent.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use common::client;
use common::serve;
use common::signed_in_client;
use consent_flow_client::ApiClient;
use consent_flow_client::ApiClientConfig;
use consent_flow_client::ClientError;
use consent_flow_core::AssistantTokenSource;
use consent_flow_core::DocumentId;
use consent_flow_core::DocumentPayload;
use consent_flow_core::DocumentStore;
use consent_flow_core::DocumentType;
use consent_flow_core::FormData;
use consent_flow_core::RenderedDocument;
use consent_flow_core::StoreError;
use consent_flow_core::TokenError;
use consent_flow_core::UploadRequest;
use serde_json::json;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Verifies cleartext base URLs need an explicit opt-in.
#[test]
fn http_base_url_requires_opt_in() {
    let err = ApiClient::new(ApiClientConfig::new("http://127.0.0.1:9/api")).unwrap_err();
    assert!(matches!(err, ClientError::Config(message) if message.contains("allow_http")));
    let err = ApiClient::new(ApiClientConfig::new("ftp://example.com")).unwrap_err();
    assert!(matches!(err, ClientError::Config(_)));
    let err = ApiClient::new(ApiClientConfig::new("https://user:pw@example.com")).unwrap_err();
    assert!(matches!(err, ClientError::Config(message) if message.contains("credentials")));
}

/// Verifies authenticated calls fail before any request without a token.
#[test]
fn missing_token_is_unauthorized() {
    let client = client("http://127.0.0.1:9/api");
    assert!(matches!(client.list_documents(), Err(ClientError::Unauthorized)));
    assert!(matches!(client.list(), Err(StoreError::Unauthorized)));
    assert!(matches!(client.ephemeral_token("en"), Err(TokenError::Unauthorized)));
}

// ============================================================================
// SECTION: Accounts
// ============================================================================

/// Verifies login posts credentials and returns the session.
#[test]
fn login_returns_session() {
    let server = serve(1, |_| {
        (200, json!({ "access_token": "abc", "user": { "_id": "u-1", "email": "ada@example.com" } }).to_string())
    });
    let session = client(&server.base_url).login("ada@example.com", "secret").unwrap();
    assert_eq!(session.access_token, "abc");
    assert_eq!(session.user.id.as_str(), "u-1");

    let captured = server.finish();
    assert_eq!(captured[0].method, "POST");
    assert_eq!(captured[0].url, "/api/auth/login");
    assert!(captured[0].authorization.is_none());
    let body: serde_json::Value = serde_json::from_str(&captured[0].body).unwrap();
    assert_eq!(body, json!({ "email": "ada@example.com", "password": "secret" }));
}

/// Verifies login responses without a token are rejected.
#[test]
fn login_without_token_is_invalid() {
    let server = serve(2, |capture| {
        if capture.body.contains("wrong") {
            (401, json!({ "message": "bad credentials" }).to_string())
        } else {
            (200, json!({ "user": { "id": "u-1" } }).to_string())
        }
    });
    let client = client(&server.base_url);
    assert!(matches!(client.login("a@example.com", "pw"), Err(ClientError::InvalidResponse(_))));
    assert!(matches!(client.login("a@example.com", "wrong"), Err(ClientError::Unauthorized)));
    server.finish();
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Verifies listing sends the bearer token and tolerates string payloads.
#[test]
fn list_documents_parses_items() {
    let payload = json!({ "formType": "nda", "formTitle": "Non-Disclosure Agreement" }).to_string();
    let server = serve(1, move |_| {
        (
            200,
            json!({
                "ok": true,
                "items": [
                    { "_id": "d1", "title": "Non-Disclosure Agreement", "createdAt": "2026-03-14", "payload": payload },
                    { "_id": "d2", "title": "Broken", "payload": "{oops" }
                ]
            })
            .to_string(),
        )
    });
    let documents = signed_in_client(&server.base_url).list().unwrap();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0].payload.as_ref().map(|payload| payload.form_type.clone()), Some(DocumentType::Nda));
    assert!(documents[1].payload.is_none());

    let captured = server.finish();
    assert_eq!(captured[0].url, "/api/contracts");
    assert_eq!(captured[0].authorization.as_deref(), Some("Bearer token-123"));
}

/// Verifies uploads send the file, title, and payload as multipart parts.
#[test]
fn upload_sends_multipart_form() {
    let server = serve(1, |_| {
        (200, json!({ "ok": true, "item": { "_id": "d9", "title": "General Consent Form" } }).to_string())
    });
    let payload = DocumentPayload {
        form_type: DocumentType::GeneralConsent,
        form_title: "General Consent Form".to_string(),
        form_data: FormData::new(),
        signatures: None,
        custom_agreement_content: None,
    };
    let upload = UploadRequest::new(
        payload,
        RenderedDocument {
            bytes: b"%PDF-1.5 body".to_vec(),
            content_type: "application/pdf",
            page_count: 1,
            placeholders: Vec::new(),
        },
    );
    let saved = signed_in_client(&server.base_url).upload(&upload).unwrap();
    assert_eq!(saved.id, DocumentId::new("d9"));

    let captured = server.finish();
    assert_eq!(captured[0].url, "/api/contracts/upload");
    assert!(captured[0].content_type.as_deref().unwrap_or_default().starts_with("multipart/form-data"));
    let body = &captured[0].body;
    assert!(body.contains("filename=\"General-Consent-Form.pdf\""));
    assert!(body.contains("name=\"title\""));
    assert!(body.contains("\"formType\":\"general-consent\""));
    assert!(body.contains("%PDF-1.5 body"));
}

/// Verifies upload responses without a record are rejected.
#[test]
fn upload_without_item_is_invalid() {
    let server = serve(1, |_| (200, json!({ "ok": true }).to_string()));
    let upload = UploadRequest {
        title: "x".to_string(),
        file_name: "x.pdf".to_string(),
        bytes: b"%PDF".to_vec(),
        content_type: "application/pdf",
        payload: DocumentPayload {
            form_type: DocumentType::Nda,
            form_title: "x".to_string(),
            form_data: FormData::new(),
            signatures: None,
            custom_agreement_content: None,
        },
    };
    let err = signed_in_client(&server.base_url).upload_document(&upload).unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)));
    server.finish();
}

/// Verifies deletes target the encoded id and map missing documents.
#[test]
fn delete_maps_not_found() {
    let server = serve(2, |capture| {
        if capture.url.ends_with("/d1") {
            (200, json!({ "ok": true }).to_string())
        } else {
            (404, json!({ "message": "missing" }).to_string())
        }
    });
    let client = signed_in_client(&server.base_url);
    client.delete(&DocumentId::new("d1")).unwrap();
    let err = client.delete(&DocumentId::new("a b")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound(id) if id == "a b"));

    let captured = server.finish();
    assert_eq!(captured[0].method, "DELETE");
    assert_eq!(captured[1].url, "/api/contracts/a%20b");
}

/// Verifies oversized responses fail closed.
#[test]
fn oversized_response_is_rejected() {
    let server = serve(1, |_| (200, json!({ "ok": true, "items": [], "pad": "x".repeat(4096) }).to_string()));
    let client = ApiClient::new(ApiClientConfig {
        allow_http: true,
        max_response_bytes: 1024,
        ..ApiClientConfig::new(server.base_url.clone())
    })
    .unwrap()
    .with_session(&consent_flow_client::AuthSession {
        user: consent_flow_client::AccountUser {
            id: "u-1".into(),
            email: String::new(),
        },
        access_token: "t".to_string(),
    });
    assert!(matches!(client.list_documents(), Err(ClientError::ResponseTooLarge(1024))));
    server.finish();
}

// ============================================================================
// SECTION: Credits and Tokens
// ============================================================================

/// Verifies balance, checkout, and confirmation calls.
#[test]
fn credit_calls_round_trip() {
    let server = serve(4, |capture| match capture.url.as_str() {
        "/api/credits/balance" => (200, json!({ "credits": 7 }).to_string()),
        "/api/credits/checkout-session" => (200, json!({ "url": "https://pay.example.com/s/1" }).to_string()),
        _ if capture.body.contains("sess_ok") => (200, json!({ "ok": true, "added": 10 }).to_string()),
        _ => (200, json!({ "ok": false, "message": "payment pending" }).to_string()),
    });
    let client = signed_in_client(&server.base_url);
    assert_eq!(client.credit_balance().unwrap(), 7);
    assert_eq!(client.create_checkout_session().unwrap(), "https://pay.example.com/s/1");
    assert_eq!(client.confirm_checkout("sess_ok").unwrap().added, Some(10));
    let err = client.confirm_checkout("sess_pending").unwrap_err();
    assert!(matches!(err, ClientError::Status { message, .. } if message == "payment pending"));

    let captured = server.finish();
    let body: serde_json::Value = serde_json::from_str(&captured[2].body).unwrap();
    assert_eq!(body, json!({ "sessionId": "sess_ok" }));
}

/// Verifies voice tokens are requested per language.
#[test]
fn voice_token_is_scoped_to_language() {
    let server = serve(2, |capture| {
        if capture.url.contains("lang=en") {
            (200, json!({ "client_secret": { "value": "ek_123" } }).to_string())
        } else {
            (402, json!({ "error": "insufficient_credits" }).to_string())
        }
    });
    let client = signed_in_client(&server.base_url);
    assert_eq!(client.ephemeral_token("en").unwrap(), "ek_123");
    assert!(matches!(client.voice_token("fr"), Err(ClientError::InsufficientCredits)));

    let captured = server.finish();
    assert_eq!(captured[0].url, "/api/voice-agent/legal/token?lang=en");
}
