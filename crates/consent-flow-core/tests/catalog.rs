// consent-flow-core/tests/catalog.rs
// ============================================================================
// Module: Step Catalog Tests
// Description: Built-in entries, fallback lookups, and JSON overrides.
// Purpose: Ensure catalogs load only when consistent.
// Dependencies: consent-flow-core, serde_json
// ============================================================================

//! ## Overview
//! Covers the built-in catalog shape, lookups for unknown types, participant
//! seeding, and validation of catalogs loaded from JSON.

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

use consent_flow_core::CatalogError;
use consent_flow_core::DocumentType;
use consent_flow_core::FieldKind;
use consent_flow_core::StepCatalog;
use consent_flow_core::TemplateId;
use serde_json::json;

fn participants_field(min: usize, max: usize, defaults: usize) -> serde_json::Value {
    let defaults: Vec<serde_json::Value> = (0 .. defaults).map(|_| json!({ "role": "Guest" })).collect();
    json!({
        "id": "participants",
        "labelKey": "form.test.participants_label",
        "type": "participants",
        "min": min,
        "max": max,
        "defaultParticipants": defaults,
        "roleOptions": [{ "value": "Guest", "labelKey": "form.test.role_guest_label" }],
    })
}

fn catalog_json(fields: &[serde_json::Value]) -> String {
    json!({ "general-consent": [{ "titleKey": "form.test.step1Title", "fields": fields }] }).to_string()
}

fn assert_invalid(result: Result<StepCatalog, CatalogError>, needle: &str) {
    match result {
        Err(CatalogError::Invalid(message)) => {
            assert!(message.contains(needle), "expected '{needle}' in '{message}'");
        }
        other => panic!("expected invalid catalog, got {other:?}"),
    }
}

// ============================================================================
// SECTION: Built-in Catalog
// ============================================================================

/// Verifies the built-in catalog validates and holds the three built-in types.
#[test]
fn builtin_catalog_is_valid() {
    let catalog = StepCatalog::builtin();
    catalog.validate().unwrap();
    let types: Vec<&DocumentType> = catalog.document_types().collect();
    assert_eq!(types.len(), 3);
    for document_type in &DocumentType::BUILTIN {
        let steps = catalog.steps_for(document_type);
        assert!(!steps.is_empty());
        assert!(matches!(steps[0].fields[0].kind, FieldKind::Participants(_)));
    }
}

/// Verifies built-in types seed their default roles.
#[test]
fn builtin_types_seed_default_roles() {
    let catalog = StepCatalog::builtin();
    let roles: Vec<String> =
        catalog.seed_participants(&DocumentType::Nda).into_iter().map(|participant| participant.role).collect();
    assert_eq!(roles, vec!["Disclosing Party", "Receiving Party"]);
}

/// Verifies unknown types have no steps and step through the fallback.
#[test]
fn unknown_types_fall_back() {
    let catalog = StepCatalog::builtin();
    let custom = DocumentType::Custom(TemplateId::new("1700000000000"));
    assert!(catalog.steps_for(&custom).is_empty());
    assert_eq!(catalog.stepping_type(&custom), DocumentType::GeneralConsent);
    let roles: Vec<String> = catalog.seed_participants(&custom).into_iter().map(|participant| participant.role).collect();
    assert_eq!(roles, vec!["Releasor", "Releasee"]);
}

/// Verifies the built-in catalog serializes to a shape that loads back.
#[test]
fn builtin_catalog_json_loads() {
    let json = serde_json::to_string(&StepCatalog::builtin()).unwrap();
    let loaded = StepCatalog::from_json(&json).unwrap();
    assert_eq!(loaded, StepCatalog::builtin());
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Verifies a minimal override catalog loads.
#[test]
fn override_catalog_loads() {
    let catalog = StepCatalog::from_json(&catalog_json(&[participants_field(1, 3, 1)])).unwrap();
    assert_eq!(catalog.participants_rule(&DocumentType::GeneralConsent).map(|rule| rule.max), Some(3));
    assert!(catalog.steps_for(&DocumentType::Nda).is_empty());
}

/// Verifies empty bounds are rejected.
#[test]
fn inverted_bounds_are_rejected() {
    assert_invalid(StepCatalog::from_json(&catalog_json(&[participants_field(4, 2, 0)])), "bounds");
    assert_invalid(StepCatalog::from_json(&catalog_json(&[participants_field(0, 0, 0)])), "bounds");
}

/// Verifies seeded participants must fit the bounds.
#[test]
fn defaults_outside_bounds_are_rejected() {
    assert_invalid(StepCatalog::from_json(&catalog_json(&[participants_field(1, 2, 3)])), "default participants");
}

/// Verifies duplicate field ids are rejected.
#[test]
fn duplicate_field_ids_are_rejected() {
    let text = json!({ "id": "activityName", "labelKey": "form.test.activity", "type": "text" });
    assert_invalid(StepCatalog::from_json(&catalog_json(&[text.clone(), text])), "duplicate field id");
}

/// Verifies participants fields must use the shared participants key.
#[test]
fn participants_field_id_is_fixed() {
    let mut field = participants_field(1, 2, 0);
    field["id"] = json!("guests");
    assert_invalid(StepCatalog::from_json(&catalog_json(&[field])), "participants field must use id");
}

/// Verifies an override must keep a fallback entry that fits the seeded pair.
#[test]
fn fallback_entry_is_required() {
    let nda_only = json!({ "nda": [{ "titleKey": "form.test.step1Title", "fields": [participants_field(2, 4, 0)] }] });
    assert_invalid(StepCatalog::from_json(&nda_only.to_string()), "fallback entry has no steps");
    assert_invalid(StepCatalog::from_json(r#"{ "general-consent": [] }"#), "fallback entry has no steps");
    assert_invalid(StepCatalog::from_json(&catalog_json(&[participants_field(1, 1, 0)])), "exclude the 2 fallback");
    assert_invalid(StepCatalog::from_json(&catalog_json(&[participants_field(3, 5, 0)])), "exclude the 2 fallback");
}

/// Verifies unknown type keys fail to parse.
#[test]
fn unknown_type_keys_fail_to_parse() {
    let result = StepCatalog::from_json(r#"{ "waiver": [] }"#);
    assert!(matches!(result, Err(CatalogError::Parse(_))));
}
