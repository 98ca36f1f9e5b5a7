//! Text layout from page content streams
//!
//! Walks the text operators of a content stream and places every shown
//! glyph in user space, using the advance widths and Unicode mapping of
//! the font selected by `Tf`. Glyph boxes span a fixed share of the font
//! size above and below the baseline.

use super::content::extract_number;
use super::font::{FontMap, FontMetrics};
use crate::constants::*;
use crate::types::BoundingBox;
use lopdf::Object;
use lopdf::content::Operation;

// =============================================================================
// Geometry
// =============================================================================

/// PDF transformation matrix `[a b c d e f]` (row-vector convention)
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    pub(crate) const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translate(tx: f32, ty: f32) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        Some(Matrix {
            a: extract_number(&operands[0])?,
            b: extract_number(&operands[1])?,
            c: extract_number(&operands[2])?,
            d: extract_number(&operands[3])?,
            e: extract_number(&operands[4])?,
            f: extract_number(&operands[5])?,
        })
    }

    /// `self` applied first, then `other`
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of a unit vertical vector after transformation
    fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

// =============================================================================
// Glyph Placement
// =============================================================================

/// A shown glyph, located both on the page and in the content stream
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedGlyph {
    /// Index of the showing operation
    pub op: usize,
    /// Index of the string within a `TJ` array (0 for other operators)
    pub element: usize,
    /// Byte offset of the character code within the string
    pub byte: usize,
    /// Length of the character code in bytes
    pub len: usize,
    /// Decoded text; empty when the font maps the code to nothing
    pub text: String,
    pub bbox: BoundingBox,
    /// Baseline height in user space
    pub baseline: f32,
    /// Font size in user space
    pub size: f32,
    /// Horizontal advance in thousandths of text space, the unit of `TJ` adjustments
    pub advance_units: f32,
}

/// Parameters saved and restored by `q` / `Q`
#[derive(Debug, Clone, Copy)]
struct GraphicsState<'a> {
    ctm: Matrix,
    font: Option<&'a FontMetrics>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for GraphicsState<'_> {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

struct TextWalker<'a> {
    fonts: &'a FontMap,
    /// Metrics for strings shown with an unknown or unset font
    fallback: FontMetrics,
    gs: GraphicsState<'a>,
    stack: Vec<GraphicsState<'a>>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    glyphs: Vec<PlacedGlyph>,
}

impl<'a> TextWalker<'a> {
    fn new(fonts: &'a FontMap) -> Self {
        Self {
            fonts,
            fallback: FontMetrics::default(),
            gs: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            glyphs: Vec::new(),
        }
    }

    fn visit(&mut self, index: usize, op: &Operation) {
        let operands = &op.operands;
        let num = |i: usize| operands.get(i).and_then(extract_number);

        match op.operator.as_str() {
            "q" => self.stack.push(self.gs),
            "Q" => {
                if let Some(gs) = self.stack.pop() {
                    self.gs = gs;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.gs.ctm = m.then(&self.gs.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    self.gs.font = self.fonts.get(name);
                    if self.gs.font.is_none() {
                        log::trace!("Font {} not in page resources", String::from_utf8_lossy(name));
                    }
                }
                if let Some(size) = num(1) {
                    self.gs.font_size = size;
                }
            }
            "Tc" => self.gs.char_spacing = num(0).unwrap_or(self.gs.char_spacing),
            "Tw" => self.gs.word_spacing = num(0).unwrap_or(self.gs.word_spacing),
            "Tz" => {
                if let Some(scale) = num(0) {
                    self.gs.horizontal_scale = scale / 100.0;
                }
            }
            "TL" => self.gs.leading = num(0).unwrap_or(self.gs.leading),
            "Ts" => self.gs.rise = num(0).unwrap_or(self.gs.rise),
            "Td" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.move_line(tx, ty);
                }
            }
            "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    self.gs.leading = -ty;
                    self.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(index, 0, bytes);
                }
            }
            "'" => {
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.first() {
                    self.show(index, 0, bytes);
                }
            }
            "\"" => {
                if let (Some(aw), Some(ac)) = (num(0), num(1)) {
                    self.gs.word_spacing = aw;
                    self.gs.char_spacing = ac;
                }
                self.next_line();
                if let Some(Object::String(bytes, _)) = operands.get(2) {
                    self.show(index, 0, bytes);
                }
            }
            "TJ" => {
                if let Some(Object::Array(elements)) = operands.first() {
                    for (element, item) in elements.iter().enumerate() {
                        match item {
                            Object::String(bytes, _) => self.show(index, element, bytes),
                            other => {
                                if let Some(adjust) = extract_number(other) {
                                    let tx = -adjust / 1000.0
                                        * self.gs.font_size
                                        * self.gs.horizontal_scale;
                                    self.advance(tx);
                                }
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.line_matrix = Matrix::translate(tx, ty).then(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.gs.leading);
    }

    fn advance(&mut self, tx: f32) {
        self.text_matrix = Matrix::translate(tx, 0.0).then(&self.text_matrix);
    }

    fn show(&mut self, op: usize, element: usize, bytes: &[u8]) {
        let gs = self.gs;
        let codes = gs.font.unwrap_or(&self.fallback).glyphs(bytes);
        for code in codes {
            // Word spacing applies to the single-byte code 32 only
            let word_spacing = if code.len == 1 && bytes[code.byte] == b' ' {
                gs.word_spacing
            } else {
                0.0
            };
            let width = code.width / 1000.0 * gs.font_size;
            let tx = (width + gs.char_spacing + word_spacing) * gs.horizontal_scale;

            let m = self.text_matrix.then(&gs.ctm);
            let (x0, baseline) = m.apply(0.0, gs.rise);
            let (x1, _) = m.apply(tx, gs.rise);
            let size = gs.font_size.abs() * m.vertical_scale();

            let advance_units = if gs.font_size != 0.0 {
                (width + gs.char_spacing + word_spacing) * 1000.0 / gs.font_size
            } else {
                0.0
            };

            self.glyphs.push(PlacedGlyph {
                op,
                element,
                byte: code.byte,
                len: code.len,
                text: code.text,
                bbox: BoundingBox::new(
                    x0,
                    baseline - DESCENT_RATIO * size,
                    x1,
                    baseline + ASCENT_RATIO * size,
                ),
                baseline,
                size,
                advance_units,
            });

            self.advance(tx);
        }
    }

    /// Whether the walk ended with no pending `q` and an identity CTM
    fn ends_clean(&self) -> bool {
        self.stack.is_empty() && self.gs.ctm == Matrix::IDENTITY
    }
}

/// Place every glyph shown by `operations`, measured with the page's `fonts`
pub(crate) fn place_glyphs(operations: &[Operation], fonts: &FontMap) -> Vec<PlacedGlyph> {
    let mut walker = TextWalker::new(fonts);
    for (index, op) in operations.iter().enumerate() {
        walker.visit(index, op);
    }
    walker.glyphs
}

/// Whether operations appended after `operations` run with a clean graphics state
pub(crate) fn ends_with_clean_state(operations: &[Operation]) -> bool {
    let fonts = FontMap::new();
    let mut walker = TextWalker::new(&fonts);
    for (index, op) in operations.iter().enumerate() {
        walker.visit(index, op);
    }
    walker.ends_clean()
}

// =============================================================================
// Lines
// =============================================================================

/// A character on a text line; synthetic word breaks carry the gap they span
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LineChar {
    pub ch: char,
    pub bbox: BoundingBox,
}

/// Glyphs sharing a baseline, in content order
#[derive(Debug, Clone, Default)]
pub(crate) struct TextLine {
    pub chars: Vec<LineChar>,
    baseline: f32,
}

impl TextLine {
    pub(crate) fn text(&self) -> String {
        self.chars.iter().map(|c| c.ch).collect()
    }
}

/// Group glyphs into lines, inserting spaces where the layout implies a word break.
///
/// A glyph that decodes to several characters shares its box evenly among them.
pub(crate) fn layout_lines(glyphs: &[PlacedGlyph]) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();

    for glyph in glyphs {
        let count = glyph.text.chars().count();
        let Some(first) = glyph.text.chars().next() else {
            continue;
        };

        let starts_line = match lines.last() {
            Some(line) => (glyph.baseline - line.baseline).abs() > LINE_BREAK_RATIO * glyph.size,
            None => true,
        };
        if starts_line {
            lines.push(TextLine {
                chars: Vec::new(),
                baseline: glyph.baseline,
            });
        }

        let Some(line) = lines.last_mut() else {
            continue;
        };
        if let Some(prev) = line.chars.last() {
            let gap = glyph.bbox.x0 - prev.bbox.x1;
            let jumped_back = glyph.bbox.x0 < prev.bbox.x0 - glyph.size;
            let either_space = prev.ch == ' ' || first == ' ';
            if !either_space && (gap > WORD_GAP_RATIO * glyph.size || jumped_back) {
                let bbox = if jumped_back {
                    BoundingBox::new(glyph.bbox.x0, glyph.bbox.y0, glyph.bbox.x0, glyph.bbox.y1)
                } else {
                    BoundingBox::new(prev.bbox.x1, glyph.bbox.y0, glyph.bbox.x0, glyph.bbox.y1)
                };
                line.chars.push(LineChar { ch: ' ', bbox });
            }
        }

        let step = glyph.bbox.width() / count as f32;
        for (i, ch) in glyph.text.chars().enumerate() {
            let x0 = glyph.bbox.x0 + step * i as f32;
            line.chars.push(LineChar {
                ch,
                bbox: BoundingBox::new(x0, glyph.bbox.y0, x0 + step, glyph.bbox.y1),
            });
        }
    }

    lines
}

/// Plain text of a page, one line per text line
pub(crate) fn lines_text(lines: &[TextLine]) -> String {
    lines
        .iter()
        .map(TextLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bounding boxes of every non-overlapping occurrence of `literal`, in reading order.
///
/// Matching ignores case.
pub(crate) fn find_in_lines(lines: &[TextLine], literal: &str) -> Vec<BoundingBox> {
    let needle: Vec<char> = literal.chars().collect();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits = Vec::new();
    for line in lines {
        let hay = &line.chars;
        let mut i = 0;
        while i + needle.len() <= hay.len() {
            let matches = hay[i..i + needle.len()]
                .iter()
                .zip(&needle)
                .all(|(c, n)| same_letter(c.ch, *n));
            if matches {
                let bbox = hay[i + 1..i + needle.len()]
                    .iter()
                    .fold(hay[i].bbox, |acc, c| acc.union(&c.bbox));
                hits.push(bbox);
                i += needle.len();
            } else {
                i += 1;
            }
        }
    }
    hits
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
