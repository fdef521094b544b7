// consent-flow-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for input limits and command helpers.
// Purpose: Keep bounded reads, locale resolution, and preview decoding honest.
// Dependencies: consent-flow-cli main helpers, tempfile
// ============================================================================

//! ## Overview
//! Exercises the helpers behind the CLI commands without spawning the binary.
//!
//! Security posture: CLI inputs are untrusted; size limits must fail closed.

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

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;
use std::time::Duration;

use consent_flow_cli::i18n::Locale;
use consent_flow_config::AssistantConfig;
use consent_flow_config::AuditConfig;
use consent_flow_config::AuditSinkKind;
use consent_flow_core::FieldKind;
use consent_flow_core::ParticipantsRule;

use super::LangArg;
use super::ReadLimitError;
use super::assistant_settings;
use super::audit_sink;
use super::content_type_for;
use super::envelope_text;
use super::kind_label;
use super::read_bytes_with_limit;
use super::resolve_locale;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn read_bytes_with_limit_allows_small_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("small.json");
    fs::write(&path, b"{}").expect("write");
    let bytes = read_bytes_with_limit(&path, 16).expect("read");
    assert_eq!(bytes, b"{}");
}

#[test]
fn read_bytes_with_limit_rejects_large_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("large.bin");
    fs::write(&path, vec![0_u8; 32]).expect("write");
    match read_bytes_with_limit(&path, 16) {
        Err(ReadLimitError::TooLarge {
            size,
            limit,
        }) => {
            assert_eq!(size, 32);
            assert_eq!(limit, 16);
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[test]
fn read_bytes_with_limit_reports_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let result = read_bytes_with_limit(&dir.path().join("absent"), 16);
    assert!(matches!(result, Err(ReadLimitError::Io(_))));
}

#[test]
fn lang_flag_overrides_environment() {
    let locale = resolve_locale(Some(LangArg::En), Some("es")).expect("locale");
    assert_eq!(locale, Locale::En);
    let locale = resolve_locale(None, Some("es-AR")).expect("locale");
    assert_eq!(locale, Locale::Es);
    assert_eq!(resolve_locale(None, None).expect("locale"), Locale::En);
}

#[test]
fn unsupported_environment_locale_is_an_error() {
    let err = resolve_locale(None, Some("klingon")).expect_err("rejected");
    assert!(err.to_string().contains("klingon"));
}

#[test]
fn content_types_follow_extensions() {
    assert_eq!(content_type_for(Path::new("id.PNG")), "image/png");
    assert_eq!(content_type_for(Path::new("scan.jpeg")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
}

#[test]
fn field_kinds_have_short_labels() {
    assert_eq!(kind_label(&FieldKind::Checkbox), "checkbox");
    let file = FieldKind::File {
        accept: Some("image/*".to_string()),
    };
    assert_eq!(kind_label(&file), "file image/*");
    let rule = ParticipantsRule {
        min: 2,
        max: 10,
        description_key: None,
        default_participants: Vec::new(),
        role_options: Vec::new(),
    };
    assert_eq!(kind_label(&FieldKind::Participants(rule)), "participants 2-10");
}

#[test]
fn envelope_text_reads_user_items_only() {
    let item = r#"{"type":"conversation.item.create","item":{"type":"message","role":"user","content":[{"type":"input_text","text":"hello"}]}}"#;
    assert_eq!(envelope_text(item).as_deref(), Some("hello"));
    assert_eq!(envelope_text(r#"{"type":"response.create"}"#), None);
    assert_eq!(envelope_text("not json"), None);
}

#[test]
fn assistant_settings_carry_the_connect_timeout() {
    let config = AssistantConfig {
        connect_timeout_ms: Some(250),
        ..AssistantConfig::default()
    };
    let settings = assistant_settings(&config);
    assert_eq!(settings.connect_timeout, Some(Duration::from_millis(250)));
    assert_eq!(settings.model, config.model);
    assert_eq!(settings.lang, config.lang);
}

#[test]
fn file_audit_sink_requires_a_path() {
    let config = AuditConfig {
        sink: AuditSinkKind::File,
        path: None,
    };
    assert!(audit_sink(&config).is_err());

    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("audit.jsonl");
    let config = AuditConfig {
        sink: AuditSinkKind::File,
        path: Some(path.to_string_lossy().into_owned()),
    };
    assert!(audit_sink(&config).is_ok());
}
