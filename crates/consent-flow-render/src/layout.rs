// consent-flow-render/src/layout.rs
// ============================================================================
// Module: Page Layout
// Description: Millimetre page geometry, a top-down cursor, and text wrapping.
// Purpose: Turn document sections into positioned PDF content operations.
// Dependencies: lopdf
// ============================================================================

//! ## Overview
//! Sections are laid out top-down in millimetres from the top-left corner.
//! [`PageCursor`] tracks the vertical position, starts a new page whenever
//! the next block would cross the bottom margin, and emits content
//! operations in PDF points with the origin flipped to the bottom-left.

// ============================================================================
// SECTION: Imports
// ============================================================================

use lopdf::Object;
use lopdf::StringFormat;
use lopdf::content::Operation;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;
/// Average glyph advance used when a character has no metric, in 1/1000 em.
const DEFAULT_ADVANCE: u16 = 556;
/// Character substituted for text outside the encodable range.
const REPLACEMENT: u8 = b'?';

/// Helvetica advance widths for ASCII 32..=126, in 1/1000 em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556,
    556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334,
    260, 334, 584,
];

// ============================================================================
// SECTION: Geometry
// ============================================================================

/// Page size and margin in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Page width.
    pub width_mm: f32,
    /// Page height.
    pub height_mm: f32,
    /// Margin applied on every edge.
    pub margin_mm: f32,
}

impl PageGeometry {
    /// A4 portrait with a 15 mm margin.
    pub const A4: Self = Self {
        width_mm: 210.0,
        height_mm: 297.0,
        margin_mm: 15.0,
    };

    /// Creates a geometry from page dimensions and a margin.
    #[must_use]
    pub const fn new(width_mm: f32, height_mm: f32, margin_mm: f32) -> Self {
        Self {
            width_mm,
            height_mm,
            margin_mm,
        }
    }

    /// Returns the printable width between the side margins.
    #[must_use]
    pub fn content_width(&self) -> f32 {
        2.0f32.mul_add(-self.margin_mm, self.width_mm)
    }

    /// Returns the page width in points.
    #[must_use]
    pub fn width_pt(&self) -> f32 {
        self.width_mm * PT_PER_MM
    }

    /// Returns the page height in points.
    #[must_use]
    pub fn height_pt(&self) -> f32 {
        self.height_mm * PT_PER_MM
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// Standard font selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    /// Helvetica.
    Regular,
    /// Helvetica-Bold.
    Bold,
}

impl Font {
    /// Returns the resource name registered for the font.
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }
}

// ============================================================================
// SECTION: Cursor
// ============================================================================

/// Top-down layout cursor over a growing list of pages.
#[derive(Debug)]
pub struct PageCursor {
    /// Page geometry.
    geometry: PageGeometry,
    /// Content operations per page.
    pages: Vec<Vec<Operation>>,
    /// Current vertical position from the top edge, in millimetres.
    y: f32,
}

impl PageCursor {
    /// Starts a single empty page with the cursor at the top margin.
    #[must_use]
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![Vec::new()],
            y: geometry.margin_mm,
        }
    }

    /// Returns the page geometry.
    #[must_use]
    pub const fn geometry(&self) -> PageGeometry {
        self.geometry
    }

    /// Returns the current vertical position.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Moves the cursor down.
    pub fn advance(&mut self, mm: f32) {
        self.y += mm;
    }

    /// Starts a new page when a block of `height_mm` would cross the bottom
    /// margin.
    pub fn ensure_space(&mut self, height_mm: f32) {
        if self.y + height_mm > self.geometry.height_mm - self.geometry.margin_mm {
            self.pages.push(Vec::new());
            self.y = self.geometry.margin_mm;
        }
    }

    /// Draws one line of text with its baseline at the cursor.
    pub fn text(&mut self, x_mm: f32, font: Font, size_pt: f32, text: &str) {
        let (x, y) = self.point(x_mm, self.y);
        let operations = [
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(font.resource().as_bytes().to_vec()), Object::Real(size_pt)]),
            Operation::new("Td", vec![Object::Real(x), Object::Real(y)]),
            Operation::new("Tj", vec![Object::String(encode_win_ansi(text), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ];
        self.current().extend(operations);
    }

    /// Draws a horizontal rule across the content width at `offset_mm`
    /// relative to the cursor.
    pub fn rule(&mut self, offset_mm: f32, width_mm: f32) {
        let geometry = self.geometry;
        let (x1, y) = self.point(geometry.margin_mm, self.y + offset_mm);
        let (x2, _) = self.point(geometry.width_mm - geometry.margin_mm, self.y + offset_mm);
        let operations = [
            Operation::new("w", vec![Object::Real(width_mm * PT_PER_MM)]),
            Operation::new("m", vec![Object::Real(x1), Object::Real(y)]),
            Operation::new("l", vec![Object::Real(x2), Object::Real(y)]),
            Operation::new("S", vec![]),
        ];
        self.current().extend(operations);
    }

    /// Draws a named image XObject with its top-left corner at the cursor.
    pub fn image(&mut self, name: &str, x_mm: f32, width_mm: f32, height_mm: f32) {
        let (x, y) = self.point(x_mm, self.y + height_mm);
        let operations = [
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Real(width_mm * PT_PER_MM),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(height_mm * PT_PER_MM),
                    Object::Real(x),
                    Object::Real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ];
        self.current().extend(operations);
    }

    /// Consumes the cursor and returns the operations per page.
    #[must_use]
    pub fn into_pages(self) -> Vec<Vec<Operation>> {
        self.pages
    }

    /// Returns the operations of the page being filled.
    fn current(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Converts top-left millimetres to bottom-left points.
    fn point(&self, x_mm: f32, y_mm: f32) -> (f32, f32) {
        (x_mm * PT_PER_MM, (self.geometry.height_mm - y_mm) * PT_PER_MM)
    }
}

// ============================================================================
// SECTION: Text
// ============================================================================

/// Returns the rendered width of `text` in millimetres.
#[must_use]
pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(advance(ch))).sum();
    let units = u16::try_from(units).map_or(f32::from(u16::MAX), f32::from);
    units / 1000.0 * size_pt / PT_PER_MM
}

/// Splits `text` into lines no wider than `width_mm`.
///
/// Explicit newlines are kept. Words wider than a whole line are broken by
/// character.
#[must_use]
pub fn wrap_text(text: &str, width_mm: f32, size_pt: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for source in text.split('\n') {
        let mut line = String::new();
        for word in source.split_whitespace() {
            let candidate = if line.is_empty() { word.to_string() } else { format!("{line} {word}") };
            if text_width_mm(&candidate, size_pt) <= width_mm {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            for ch in word.chars() {
                line.push(ch);
                if text_width_mm(&line, size_pt) > width_mm && line.chars().count() > 1 {
                    line.pop();
                    lines.push(std::mem::take(&mut line));
                    line.push(ch);
                }
            }
        }
        lines.push(line);
    }
    lines
}

/// Encodes text for the standard fonts' WinAnsi encoding.
///
/// Typographic quotes and dashes map to their WinAnsi code points. Other
/// characters outside Latin-1 become `?`.
#[must_use]
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2026}' => 0x85,
            '\t' => b' ',
            other => u8::try_from(u32::from(other)).ok().filter(|byte| *byte >= 0x20).unwrap_or(REPLACEMENT),
        })
        .collect()
}

/// Returns the Helvetica advance for a character.
fn advance(ch: char) -> u16 {
    let code = u32::from(ch);
    if (32 ..= 126).contains(&code) {
        usize::try_from(code - 32).ok().and_then(|index| HELVETICA_WIDTHS.get(index).copied()).unwrap_or(DEFAULT_ADVANCE)
    } else {
        DEFAULT_ADVANCE
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use super::PageCursor;
    use super::PageGeometry;
    use super::encode_win_ansi;
    use super::text_width_mm;
    use super::wrap_text;

    #[test]
    fn wrap_respects_width() {
        let text = "The participant agrees to follow the instructions of the organizer at all times.";
        let lines = wrap_text(text, 40.0, 10.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width_mm(line, 10.0) <= 40.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn wrap_keeps_newlines_and_breaks_long_words() {
        let lines = wrap_text("first\nsecond", 100.0, 9.0);
        assert_eq!(lines, vec!["first", "second"]);
        let long = "x".repeat(200);
        let lines = wrap_text(&long, 20.0, 9.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), long);
    }

    #[test]
    fn win_ansi_maps_quotes() {
        assert_eq!(encode_win_ansi("\u{201C}a\u{201D} b\u{2019}"), vec![0x93, b'a', 0x94, b' ', b'b', 0x92]);
        assert_eq!(encode_win_ansi("\u{4E2D}"), vec![b'?']);
    }

    #[test]
    fn cursor_breaks_pages_at_bottom_margin() {
        let mut cursor = PageCursor::new(PageGeometry::A4);
        cursor.ensure_space(200.0);
        cursor.advance(200.0);
        cursor.ensure_space(100.0);
        assert!((cursor.y() - 15.0).abs() < f32::EPSILON);
        assert_eq!(cursor.into_pages().len(), 2);
    }
}
