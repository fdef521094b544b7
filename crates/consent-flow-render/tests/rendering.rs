// consent-flow-render/tests/rendering.rs
// ============================================================================
// Module: PDF Rendering Tests
// Description: Rendered documents reload as valid, paginated PDFs.
// Purpose: Ensure exports stay readable and degrade cleanly on bad images.
// Dependencies: consent-flow-core, consent-flow-render, image, lopdf
// ============================================================================

//! ## Overview
//! Renders payloads the way an export job would and reloads the bytes with
//! lopdf to check page counts and placeholder handling.

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

use std::io::Cursor;

use consent_flow_core::DocumentPayload;
use consent_flow_core::DocumentRenderer;
use consent_flow_core::DocumentType;
use consent_flow_core::FieldValue;
use consent_flow_core::FileDescriptor;
use consent_flow_core::FormData;
use consent_flow_core::Participant;
use consent_flow_core::RenderError;
use consent_flow_core::SignatureImage;
use consent_flow_core::SignaturePayload;
use consent_flow_core::SignedParticipant;
use consent_flow_core::SigningDate;
use consent_flow_core::TemplateId;
use consent_flow_render::PageGeometry;
use consent_flow_render::PdfRenderer;
use image::ImageFormat;
use image::Rgba;
use image::RgbaImage;

fn png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([20, 20, 80, alpha]));
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png).expect("encode png");
    bytes.into_inner()
}

fn date() -> SigningDate {
    "2026-03-14".parse().expect("date")
}

fn participant(first: &str, last: &str, role: &str) -> Participant {
    Participant {
        first_name: first.to_string(),
        last_name: last.to_string(),
        email: format!("{}@example.com", first.to_lowercase()),
        role: role.to_string(),
    }
}

fn signed(participant: Participant, image: SignatureImage) -> SignedParticipant {
    SignedParticipant {
        participant,
        signature: image,
    }
}

fn nda_payload(signature: SignatureImage) -> DocumentPayload {
    let parties = vec![participant("Ada", "Lovelace", "Disclosing Party"), participant("Alan", "Turing", "Receiving Party")];
    let mut form_data = FormData::new();
    form_data.set("participants", parties.clone());
    form_data.set("purpose", "Evaluation of a joint research project");
    form_data.set("duration", 24_i64);
    form_data.set("returnMaterials", true);
    form_data.set("effectiveDate", "");
    DocumentPayload {
        form_type: DocumentType::Nda,
        form_title: "Non-Disclosure Agreement".to_string(),
        form_data,
        signatures: Some(SignaturePayload::Multi {
            signatures: parties.into_iter().map(|party| signed(party, signature.clone())).collect(),
            date: date(),
        }),
        custom_agreement_content: None,
    }
}

fn reload_page_count(bytes: &[u8]) -> usize {
    let document = lopdf::Document::load_mem(bytes).expect("reload pdf");
    document.get_pages().len()
}

/// Returns the lowest text baseline in points across every page.
fn lowest_baseline(bytes: &[u8]) -> f32 {
    let document = lopdf::Document::load_mem(bytes).expect("reload pdf");
    let mut lowest = f32::MAX;
    for page_id in document.get_pages().into_values() {
        let content = document.get_page_content(page_id).expect("page content");
        let content = lopdf::content::Content::decode(&content).expect("decode content");
        for operation in content.operations.iter().filter(|operation| operation.operator == "Td") {
            let y = match operation.operands.get(1) {
                Some(lopdf::Object::Real(value)) => *value,
                Some(lopdf::Object::Integer(value)) => *value as f32,
                other => panic!("unexpected Td operand: {other:?}"),
            };
            lowest = lowest.min(y);
        }
    }
    lowest
}

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Verifies a signed NDA renders a PDF that reloads with the reported pages.
#[test]
fn signed_nda_renders_valid_pdf() {
    let signature = SignatureImage::from_png_bytes(png(40, 20, 128)).unwrap();
    let request = nda_payload(signature).render_request();
    let document = PdfRenderer::default().render(&request).unwrap();

    assert!(document.bytes.starts_with(b"%PDF-1.5"));
    assert_eq!(document.content_type, "application/pdf");
    assert!(document.page_count >= 1);
    assert_eq!(reload_page_count(&document.bytes), document.page_count);
    assert!(document.placeholders.is_empty());
}

/// Verifies long agreements continue onto further pages.
#[test]
fn long_agreements_paginate() {
    let paragraph = "<p>The participant agrees that recordings made during the session may be edited, \
                     published, and distributed in any medium without further notice or compensation.</p>";
    let markup = paragraph.repeat(80);
    let payload = DocumentPayload {
        form_type: DocumentType::Custom(TemplateId::new("1700000000000")),
        form_title: "Studio Rules".to_string(),
        form_data: FormData::new(),
        signatures: None,
        custom_agreement_content: Some(markup),
    };
    let document = PdfRenderer::default().render(&payload.render_request()).unwrap();
    assert!(document.page_count > 1, "expected several pages, got {}", document.page_count);
    assert_eq!(reload_page_count(&document.bytes), document.page_count);
}

/// Verifies a textarea answer taller than a page continues onto the next page.
#[test]
fn long_summary_values_stay_above_the_bottom_margin() {
    let signature = SignatureImage::from_png_bytes(png(40, 20, 128)).unwrap();
    let mut payload = nda_payload(signature);
    let clauses: Vec<String> = (1 ..= 80).map(|index| format!("Clause {index}: the receiving party keeps records.")).collect();
    payload.form_data.set("additionalClauses", clauses.join("\n"));
    let document = PdfRenderer::default().render(&payload.render_request()).unwrap();

    let bottom = PageGeometry::A4.margin_mm * 72.0 / 25.4;
    let lowest = lowest_baseline(&document.bytes);
    assert!(lowest >= bottom - 0.01, "baseline {lowest} below bottom margin {bottom}");
    assert!(document.page_count > 1);
}

/// Verifies an empty custom agreement still renders.
#[test]
fn empty_custom_agreement_renders() {
    let payload = DocumentPayload {
        form_type: DocumentType::Custom(TemplateId::new("1")),
        form_title: String::new(),
        form_data: FormData::new(),
        signatures: None,
        custom_agreement_content: None,
    };
    let document = PdfRenderer::default().render(&payload.render_request()).unwrap();
    assert_eq!(document.page_count, 1);
}

/// Verifies single-signer payloads use the participant caption.
#[test]
fn single_signer_renders() {
    let mut payload = nda_payload(SignatureImage::from_png_bytes(png(8, 4, 255)).unwrap());
    payload.signatures = Some(SignaturePayload::Single {
        signature: SignatureImage::from_png_bytes(vec![1, 2, 3]).unwrap(),
        date: date(),
    });
    let document = PdfRenderer::default().render(&payload.render_request()).unwrap();
    assert_eq!(document.placeholders, vec!["Could not load Participant Signature.".to_string()]);
}

// ============================================================================
// SECTION: Degradation
// ============================================================================

/// Verifies undecodable images become placeholder lines.
#[test]
fn undecodable_images_become_placeholders() {
    let broken = SignatureImage::from_png_bytes(b"not really a png".to_vec()).unwrap();
    let mut payload = nda_payload(broken);
    payload.form_data.set("idPhoto", FieldValue::File(FileDescriptor::from_bytes("id.png", "image/png", vec![0, 1, 2])));

    let document = PdfRenderer::default().render(&payload.render_request()).unwrap();
    assert_eq!(
        document.placeholders,
        vec![
            "Could not load ID image.".to_string(),
            "Could not load Party #1 Signature (Ada Lovelace).".to_string(),
            "Could not load Party #2 Signature (Alan Turing).".to_string(),
        ]
    );
    assert_eq!(reload_page_count(&document.bytes), document.page_count);
}

/// Verifies a decodable ID photo is embedded.
#[test]
fn id_photo_is_embedded() {
    let mut payload = nda_payload(SignatureImage::from_png_bytes(png(8, 4, 255)).unwrap());
    payload.form_data.set("idPhoto", FileDescriptor::from_bytes("id.png", "image/png", png(16, 10, 255)));
    let document = PdfRenderer::default().render(&payload.render_request()).unwrap();
    assert!(document.placeholders.is_empty());
}

/// Verifies geometries without room for values are rejected.
#[test]
fn narrow_pages_are_rejected() {
    let renderer = PdfRenderer::new(PageGeometry::new(100.0, 150.0, 30.0));
    let payload = nda_payload(SignatureImage::from_png_bytes(png(4, 4, 255)).unwrap());
    assert!(matches!(renderer.render(&payload.render_request()), Err(RenderError::Invalid(_))));
}

/// Verifies letter pages render and reload.
#[test]
fn letter_pages_render() {
    let renderer = PdfRenderer::new(PageGeometry::new(215.9, 279.4, 20.0));
    let payload = nda_payload(SignatureImage::from_png_bytes(png(4, 4, 255)).unwrap());
    let document = renderer.render(&payload.render_request()).unwrap();
    assert_eq!(reload_page_count(&document.bytes), document.page_count);
}
