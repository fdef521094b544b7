// consent-flow-render/src/pdf.rs
// ============================================================================
// Module: PDF Renderer
// Description: Section layout and PDF assembly for consent documents.
// Purpose: Produce the exported document for a completed session.
// Dependencies: consent-flow-core, lopdf
// ============================================================================

//! ## Overview
//! [`PdfRenderer`] lays a document out in a fixed section order:
//!
//! 1. Title.
//! 2. Summary of the scalar answers, skipping participants and the ID photo.
//! 3. One block per participant with name and email.
//! 4. ID photo, when uploaded.
//! 5. Agreement body, wrapped to the content width.
//! 6. Signing date and one captioned image per signature.
//!
//! Pages break whenever the next block would cross the bottom margin. Text
//! uses the standard Helvetica faces, so nothing is embedded beyond images.

// ============================================================================
// SECTION: Imports
// ============================================================================

use consent_flow_core::DocumentRenderer;
use consent_flow_core::FieldValue;
use consent_flow_core::PARTICIPANTS_FIELD;
use consent_flow_core::RenderError;
use consent_flow_core::RenderRequest;
use consent_flow_core::RenderedDocument;
use consent_flow_core::SignaturePayload;
use lopdf::Dictionary;
use lopdf::Document;
use lopdf::Object;
use lopdf::ObjectId;
use lopdf::Stream;
use lopdf::content::Content;
use lopdf::content::Operation;
use lopdf::dictionary;

use crate::images::DecodedImage;
use crate::layout::Font;
use crate::layout::PageCursor;
use crate::layout::PageGeometry;
use crate::layout::encode_win_ansi;
use crate::layout::wrap_text;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Media type of rendered documents.
const PDF_CONTENT_TYPE: &str = "application/pdf";
/// PDF version written to the header.
const PDF_VERSION: &str = "1.5";
/// Form field holding the optional ID photo.
const ID_PHOTO_FIELD: &str = "idPhoto";
/// Horizontal offset of summary values from the margin.
const VALUE_OFFSET_MM: f32 = 50.0;
/// Width reserved for summary labels and the gutter.
const LABEL_COLUMN_MM: f32 = 55.0;
/// Indent of participant detail lines.
const DETAIL_INDENT_MM: f32 = 5.0;
/// Title font size.
const TITLE_SIZE: f32 = 18.0;
/// Section heading font size.
const HEADING_SIZE: f32 = 12.0;
/// Body font size.
const BODY_SIZE: f32 = 10.0;
/// Agreement text font size.
const AGREEMENT_SIZE: f32 = 9.0;
/// Line height of summary and detail text.
const BODY_LINE_MM: f32 = 5.0;
/// Line height of agreement text.
const AGREEMENT_LINE_MM: f32 = 4.0;
/// Rule thickness under section headings.
const RULE_WIDTH_MM: f32 = 0.5;
/// Printed ID photo size.
const ID_PHOTO_MM: (f32, f32) = (80.0, 50.0);
/// Printed signature size.
const SIGNATURE_MM: (f32, f32) = (60.0, 30.0);
/// Value printed for empty answers.
const EMPTY_VALUE: &str = "N/A";

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Renders consent documents as PDF.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PdfRenderer {
    /// Page size and margin.
    geometry: PageGeometry,
}

impl PdfRenderer {
    /// Creates a renderer for the given page geometry.
    #[must_use]
    pub const fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
        }
    }

    /// Returns the page geometry.
    #[must_use]
    pub const fn geometry(&self) -> PageGeometry {
        self.geometry
    }
}

impl DocumentRenderer for PdfRenderer {
    fn render(&self, request: &RenderRequest) -> Result<RenderedDocument, RenderError> {
        if self.geometry.content_width() <= LABEL_COLUMN_MM {
            return Err(RenderError::Invalid(format!(
                "content width {:.1} mm leaves no room for values",
                self.geometry.content_width()
            )));
        }
        let mut document = Document::with_version(PDF_VERSION);
        let mut composer = Composer::new(self.geometry, &mut document);
        composer.title(&request.agreement.title);
        composer.summary(request);
        composer.parties(request);
        composer.id_photo(request);
        composer.agreement(request);
        if let Some(signatures) = &request.signatures {
            composer.signatures(signatures);
        }
        let Composer {
            cursor,
            images,
            placeholders,
            ..
        } = composer;
        let pages = cursor.into_pages();
        let page_count = pages.len();
        let bytes = assemble(&mut document, self.geometry, &request.agreement.title, pages, &images)?;
        Ok(RenderedDocument {
            bytes,
            content_type: PDF_CONTENT_TYPE,
            page_count,
            placeholders,
        })
    }
}

// ============================================================================
// SECTION: Composer
// ============================================================================

/// Lays out sections onto pages.
struct Composer<'a> {
    /// Layout cursor.
    cursor: PageCursor,
    /// Document receiving image objects.
    document: &'a mut Document,
    /// Embedded images by resource name.
    images: Vec<(String, ObjectId)>,
    /// Placeholder lines drawn for undecodable images.
    placeholders: Vec<String>,
}

impl<'a> Composer<'a> {
    /// Starts composing on an empty first page.
    fn new(geometry: PageGeometry, document: &'a mut Document) -> Self {
        Self {
            cursor: PageCursor::new(geometry),
            document,
            images: Vec::new(),
            placeholders: Vec::new(),
        }
    }

    /// Left margin.
    fn margin(&self) -> f32 {
        self.cursor.geometry().margin_mm
    }

    /// Prints the document title.
    fn title(&mut self, title: &str) {
        let margin = self.margin();
        let width = self.cursor.geometry().content_width();
        for (index, line) in wrap_text(title, width, TITLE_SIZE).iter().enumerate() {
            if index > 0 {
                self.cursor.advance(8.0);
            }
            self.cursor.text(margin, Font::Bold, TITLE_SIZE, line);
        }
        self.cursor.advance(10.0);
    }

    /// Prints a bold section heading underlined by a rule.
    fn heading(&mut self, heading: &str) {
        let margin = self.margin();
        self.cursor.text(margin, Font::Bold, HEADING_SIZE, heading);
        self.cursor.advance(8.0);
        self.cursor.rule(-4.0, RULE_WIDTH_MM);
    }

    /// Prints the scalar answers as label/value rows.
    fn summary(&mut self, request: &RenderRequest) {
        self.heading("SUMMARY OF DETAILS");
        let margin = self.margin();
        let value_width = self.cursor.geometry().content_width() - LABEL_COLUMN_MM;
        for (key, value) in request.form_data.iter() {
            if key == ID_PHOTO_FIELD
                || key == PARTICIPANTS_FIELD
                || matches!(value, FieldValue::Participants(_) | FieldValue::File(_))
            {
                continue;
            }
            let display = value.display();
            let display = if display.trim().is_empty() { EMPTY_VALUE.to_string() } else { display };
            let lines = wrap_text(&display, value_width, BODY_SIZE);
            let height = line_block(lines.len(), BODY_LINE_MM) + 1.0;
            self.cursor.ensure_space(height);
            self.cursor.text(margin, Font::Bold, BODY_SIZE, &format!("{}:", field_label(key)));
            for (index, line) in lines.iter().enumerate() {
                if index > 0 {
                    self.cursor.advance(BODY_LINE_MM);
                    self.cursor.ensure_space(BODY_LINE_MM);
                }
                self.cursor.text(margin + VALUE_OFFSET_MM, Font::Regular, BODY_SIZE, line);
            }
            self.cursor.advance(BODY_LINE_MM + 1.0);
        }
    }

    /// Prints one block per participant.
    fn parties(&mut self, request: &RenderRequest) {
        let margin = self.margin();
        for (index, participant) in request.form_data.participants().iter().enumerate() {
            self.cursor.ensure_space(20.0);
            self.cursor.advance(4.0);
            let role = participant.role.trim();
            let title = if role.is_empty() {
                format!("Party #{}", index + 1)
            } else {
                format!("Party #{} ({role})", index + 1)
            };
            self.cursor.text(margin, Font::Bold, BODY_SIZE, &title);
            self.cursor.advance(6.0);
            let name = participant.display_name();
            self.cursor.text(margin + DETAIL_INDENT_MM, Font::Regular, BODY_SIZE, &format!("Name: {}", or_empty(&name)));
            self.cursor.advance(BODY_LINE_MM);
            let email = participant.email.trim();
            self.cursor.text(margin + DETAIL_INDENT_MM, Font::Regular, BODY_SIZE, &format!("Email: {}", or_empty(email)));
            self.cursor.advance(BODY_LINE_MM);
        }
    }

    /// Prints the uploaded ID photo.
    fn id_photo(&mut self, request: &RenderRequest) {
        let Some(file) = request.form_data.file(ID_PHOTO_FIELD) else {
            return;
        };
        let margin = self.margin();
        self.cursor.ensure_space(60.0);
        self.cursor.advance(4.0);
        self.cursor.text(margin, Font::Bold, BODY_SIZE, "ID Photo:");
        self.cursor.advance(BODY_LINE_MM);
        match DecodedImage::from_data_url(&file.data_url) {
            Ok(image) => {
                let name = self.embed(&image);
                let (width, height) = ID_PHOTO_MM;
                self.cursor.image(&name, margin, width, height);
                self.cursor.advance(height + 5.0);
            }
            Err(_) => self.placeholder("Could not load ID image."),
        }
    }

    /// Prints the agreement body.
    fn agreement(&mut self, request: &RenderRequest) {
        let margin = self.margin();
        let width = self.cursor.geometry().content_width();
        self.cursor.ensure_space(20.0);
        self.cursor.advance(10.0);
        self.heading("AGREEMENT");
        for (index, paragraph) in request.agreement.paragraphs().enumerate() {
            if index > 0 {
                self.cursor.advance(AGREEMENT_LINE_MM);
            }
            for line in wrap_text(paragraph, width, AGREEMENT_SIZE) {
                self.cursor.ensure_space(AGREEMENT_LINE_MM);
                self.cursor.text(margin, Font::Regular, AGREEMENT_SIZE, &line);
                self.cursor.advance(AGREEMENT_LINE_MM);
            }
        }
    }

    /// Prints the signing date and every captured signature.
    fn signatures(&mut self, signatures: &SignaturePayload) {
        let margin = self.margin();
        self.cursor.ensure_space(20.0);
        self.cursor.advance(10.0);
        self.heading("SIGNATURES");
        self.cursor.text(margin, Font::Regular, BODY_SIZE, &format!("Signed on: {}", signatures.date()));
        self.cursor.advance(8.0);
        for (index, entry) in signatures.entries().iter().enumerate() {
            let caption = match (signatures, entry.participant) {
                (SignaturePayload::Multi { .. }, Some(participant)) if participant.has_name() => {
                    format!("Party #{} Signature ({})", index + 1, participant.display_name())
                }
                (SignaturePayload::Multi { .. }, _) => format!("Party #{} Signature", index + 1),
                (SignaturePayload::Single { .. }, _) => format!("{} Signature", entry.label),
            };
            self.cursor.ensure_space(40.0);
            self.cursor.text(margin, Font::Bold, BODY_SIZE, &format!("{caption}:"));
            self.cursor.advance(BODY_LINE_MM);
            match entry.image.decode().map_err(|err| err.to_string()).and_then(|url| DecodedImage::from_bytes(&url.bytes)) {
                Ok(image) => {
                    let name = self.embed(&image);
                    let (width, height) = SIGNATURE_MM;
                    self.cursor.image(&name, margin, width, height);
                    self.cursor.advance(height + 5.0);
                }
                Err(_) => self.placeholder(&format!("Could not load {caption}.")),
            }
        }
    }

    /// Prints a placeholder line in place of an image.
    fn placeholder(&mut self, text: &str) {
        let margin = self.margin();
        self.cursor.text(margin, Font::Regular, BODY_SIZE, text);
        self.cursor.advance(BODY_LINE_MM);
        self.placeholders.push(text.to_string());
    }

    /// Embeds an image and returns its resource name.
    fn embed(&mut self, image: &DecodedImage) -> String {
        let id = image.embed(self.document);
        let name = format!("Im{}", self.images.len() + 1);
        self.images.push((name.clone(), id));
        name
    }
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Writes the page tree, resources, and catalog, and serializes the file.
fn assemble(
    document: &mut Document,
    geometry: PageGeometry,
    title: &str,
    pages: Vec<Vec<Operation>>,
    images: &[(String, ObjectId)],
) -> Result<Vec<u8>, RenderError> {
    let regular = document.add_object(standard_font("Helvetica"));
    let bold = document.add_object(standard_font("Helvetica-Bold"));
    let mut xobjects = Dictionary::new();
    for (name, id) in images {
        xobjects.set(name.as_bytes().to_vec(), *id);
    }
    let resources = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
        "XObject" => xobjects,
    });

    let pages_id = document.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content {
            operations,
        };
        let encoded = content.encode().map_err(|err| RenderError::Encoding(err.to_string()))?;
        let content_id = document.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    let count = i64::try_from(kids.len()).map_err(|err| RenderError::Encoding(err.to_string()))?;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(geometry.width_pt()),
                Object::Real(geometry.height_pt()),
            ],
        }),
    );
    let catalog = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info = document.add_object(dictionary! {
        "Title" => Object::string_literal(encode_win_ansi(title)),
        "Producer" => Object::string_literal("consent-flow"),
    });
    document.trailer.set("Root", catalog);
    document.trailer.set("Info", info);
    document.compress();

    let mut bytes = Vec::new();
    document.save_to(&mut bytes).map_err(|err| RenderError::Encoding(err.to_string()))?;
    Ok(bytes)
}

/// Builds a standard Type 1 font dictionary.
fn standard_font(base: &str) -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Converts a form field key into a printed label.
///
/// `camelCase` and `snake_case` keys become capitalized words; a trailing
/// `Id` word prints as `ID`.
#[must_use]
pub fn field_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch == '_' || ch == '-' {
            if !label.ends_with(' ') {
                label.push(' ');
            }
            continue;
        }
        if ch.is_uppercase() && !label.is_empty() && !label.ends_with(' ') {
            label.push(' ');
        }
        if label.is_empty() || label.ends_with(' ') {
            label.extend(ch.to_uppercase());
        } else {
            label.push(ch);
        }
    }
    let label = label.trim().to_string();
    match label.strip_suffix(" Id") {
        Some(stem) => format!("{stem} ID"),
        None => label,
    }
}

/// Returns `N/A` for empty text.
fn or_empty(text: &str) -> &str {
    if text.trim().is_empty() { EMPTY_VALUE } else { text }
}

/// Height of a block of `lines` lines.
fn line_block(lines: usize, line_mm: f32) -> f32 {
    let lines = u16::try_from(lines).unwrap_or(u16::MAX);
    f32::from(lines) * line_mm
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::field_label;

    #[test]
    fn labels_split_camel_case() {
        assert_eq!(field_label("activityName"), "Activity Name");
        assert_eq!(field_label("guardianId"), "Guardian ID");
        assert_eq!(field_label("return_materials"), "Return Materials");
        assert_eq!(field_label("duration"), "Duration");
    }
}
