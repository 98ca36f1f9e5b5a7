//! Font metrics and text decoding for the text engine
//!
//! Each font resource of a page is reduced to what placing glyphs needs:
//! how many bytes make one character code, the advance width of each code
//! and the Unicode text it stands for.
//!
//! Widths come from `/FirstChar` + `/Widths` for simple fonts and from the
//! descendant's `/W` + `/DW` for composite (Type0) fonts. Standard 14
//! fonts without a `/Widths` array use their built-in AFM widths. Text
//! comes from `/ToUnicode` when present and WinAnsi otherwise.

use super::content::extract_number;
use crate::constants::{CID_DEFAULT_WIDTH, MISSING_GLYPH_WIDTH};
use encoding_rs::WINDOWS_1252;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;

/// Font resource name -> metrics
pub(crate) type FontMap = HashMap<Vec<u8>, FontMetrics>;

/// One character code of a shown string
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GlyphCode {
    /// Byte offset of the code within the string
    pub byte: usize,
    /// Number of bytes in the code
    pub len: usize,
    /// Advance in thousandths of text space
    pub width: f32,
    /// Unicode text of the glyph, possibly empty or several characters
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct CidWidthRange {
    start: u32,
    end: u32,
    width: f32,
}

#[derive(Debug, Clone)]
pub(crate) struct FontMetrics {
    /// Composite fonts use two-byte codes
    two_byte: bool,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: Vec<CidWidthRange>,
    missing_width: f32,
    to_unicode: HashMap<u32, String>,
}

impl Default for FontMetrics {
    /// Helvetica with WinAnsi text, used when a font cannot be resolved
    fn default() -> Self {
        Self::standard("Helvetica")
    }
}

impl FontMetrics {
    /// Metrics of a standard 14 font shown with WinAnsi encoding
    pub(crate) fn standard(base_font: &str) -> Self {
        let (widths, missing_width) = standard_widths(base_font);
        Self {
            two_byte: false,
            first_char: u32::from(b' '),
            widths,
            cid_widths: Vec::new(),
            missing_width,
            to_unicode: HashMap::new(),
        }
    }

    /// Read metrics from a font dictionary
    pub(crate) fn from_dictionary(doc: &Document, font: &Dictionary) -> Self {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .map(|n| String::from_utf8_lossy(n).into_owned())
            .unwrap_or_default();
        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| stream_content(doc, o))
            .map(|data| parse_to_unicode(&data))
            .unwrap_or_default();

        let is_type0 = matches!(font.get(b"Subtype").and_then(Object::as_name), Ok(b"Type0"));
        if is_type0 {
            let descendant = font
                .get(b"DescendantFonts")
                .ok()
                .and_then(|o| resolve(doc, o).as_array().ok())
                .and_then(|fonts| fonts.first())
                .and_then(|o| resolve(doc, o).as_dict().ok());
            let missing_width = descendant
                .and_then(|d| d.get(b"DW").ok())
                .and_then(|o| extract_number(resolve(doc, o)))
                .unwrap_or(CID_DEFAULT_WIDTH);
            let cid_widths = descendant
                .and_then(|d| d.get(b"W").ok())
                .and_then(|o| resolve(doc, o).as_array().ok())
                .map(|w| parse_cid_widths(doc, w))
                .unwrap_or_default();
            return Self {
                two_byte: true,
                first_char: 0,
                widths: Vec::new(),
                cid_widths,
                missing_width,
                to_unicode,
            };
        }

        let widths: Vec<f32> = font
            .get(b"Widths")
            .ok()
            .and_then(|o| resolve(doc, o).as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|o| extract_number(resolve(doc, o)).unwrap_or(0.0))
                    .collect()
            })
            .unwrap_or_default();

        if widths.is_empty() {
            return Self {
                to_unicode,
                ..Self::standard(&base_font)
            };
        }

        let first_char = font
            .get(b"FirstChar")
            .ok()
            .and_then(|o| resolve(doc, o).as_i64().ok())
            .and_then(|v| u32::try_from(v).ok())
            .unwrap_or(0);
        let missing_width = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| resolve(doc, o).as_dict().ok())
            .and_then(|d| d.get(b"MissingWidth").ok())
            .and_then(|o| extract_number(resolve(doc, o)))
            .unwrap_or(0.0);

        Self {
            two_byte: false,
            first_char,
            widths,
            cid_widths: Vec::new(),
            missing_width,
            to_unicode,
        }
    }

    /// Split a shown string into character codes
    pub(crate) fn glyphs(&self, bytes: &[u8]) -> Vec<GlyphCode> {
        let step = if self.two_byte { 2 } else { 1 };
        bytes
            .chunks(step)
            .enumerate()
            .map(|(i, chunk)| {
                let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
                GlyphCode {
                    byte: i * step,
                    len: chunk.len(),
                    width: self.width(code),
                    text: self.text(code),
                }
            })
            .collect()
    }

    fn width(&self, code: u32) -> f32 {
        if self.two_byte {
            return self
                .cid_widths
                .iter()
                .find(|r| (r.start..=r.end).contains(&code))
                .map_or(self.missing_width, |r| r.width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .unwrap_or(self.missing_width)
    }

    fn text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if self.two_byte {
            return char::REPLACEMENT_CHARACTER.to_string();
        }
        match u8::try_from(code) {
            Ok(b) if b.is_ascii() => char::from(b).to_string(),
            Ok(b) => WINDOWS_1252
                .decode_without_bom_handling(&[b])
                .0
                .into_owned(),
            Err(_) => char::REPLACEMENT_CHARACTER.to_string(),
        }
    }
}

/// Metrics of every font resource visible to a page, including inherited ones.
///
/// A page whose fonts cannot be read gets an empty map, so its text is
/// placed with default metrics.
pub(crate) fn page_fonts(doc: &Document, page_id: ObjectId) -> FontMap {
    match doc.get_page_fonts(page_id) {
        Ok(fonts) => fonts
            .into_iter()
            .map(|(name, font)| (name, FontMetrics::from_dictionary(doc, font)))
            .collect(),
        Err(e) => {
            log::debug!("Could not read fonts of page {:?}: {}", page_id, e);
            FontMap::new()
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

fn stream_content(doc: &Document, obj: &Object) -> Option<Vec<u8>> {
    let stream = resolve(doc, obj).as_stream().ok()?;
    Some(
        stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
    )
}

/// Parse a CIDFont `/W` array: `c [w1 w2 ...]` or `c_first c_last w`
fn parse_cid_widths(doc: &Document, entries: &[Object]) -> Vec<CidWidthRange> {
    let entries: Vec<&Object> = entries.iter().map(|o| resolve(doc, o)).collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let Ok(start) = entries[i].as_i64() else {
            i += 1;
            continue;
        };
        let start = start.max(0) as u32;
        match entries.get(i + 1) {
            Some(Object::Array(widths)) => {
                for (offset, w) in widths.iter().enumerate() {
                    if let Some(width) = extract_number(resolve(doc, w)) {
                        let cid = start + offset as u32;
                        out.push(CidWidthRange {
                            start: cid,
                            end: cid,
                            width,
                        });
                    }
                }
                i += 2;
            }
            Some(Object::Integer(end)) => {
                if let Some(width) = entries.get(i + 2).and_then(|o| extract_number(o)) {
                    out.push(CidWidthRange {
                        start,
                        end: (*end).max(0) as u32,
                        width,
                    });
                }
                i += 3;
            }
            _ => i += 1,
        }
    }
    out
}

// =============================================================================
// ToUnicode CMaps
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Word(String),
    Open,
    Close,
}

fn cmap_tokens(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'[' => {
                tokens.push(CMapToken::Open);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::Close);
                i += 1;
            }
            b'<' if data.get(i + 1) == Some(&b'<') => i += 2,
            b'>' if data.get(i + 1) == Some(&b'>') => i += 2,
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(data.len(), |p| start + p);
                tokens.push(CMapToken::Hex(parse_hex(&data[start..end])));
                i = end + 1;
            }
            b'(' => {
                // Literal strings only appear in the CMap header
                let mut depth = 0;
                while i < data.len() {
                    match data[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                i += 1;
                while i < data.len() && !b"[]<>()% \t\r\n\x0c".contains(&data[i]) {
                    i += 1;
                }
                tokens.push(CMapToken::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
            }
        }
    }
    tokens
}

fn parse_hex(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits
        .iter()
        .filter_map(|&b| char::from(b).to_digit(16))
        .map(|d| d as u8)
        .collect();
    nibbles
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16be(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks(2)
        .map(|pair| (u16::from(pair[0]) << 8) | u16::from(pair.get(1).copied().unwrap_or(0)))
        .collect()
}

/// Map character codes to text from the `bfchar` and `bfrange` sections
fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let tokens = cmap_tokens(data);
    let mut map = HashMap::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(w) if w == "beginbfchar" => {
                i += 1;
                while let (Some(CMapToken::Hex(src)), Some(CMapToken::Hex(dst))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    map.insert(code_of(src), String::from_utf16_lossy(&utf16be(dst)));
                    i += 2;
                }
            }
            CMapToken::Word(w) if w == "beginbfrange" => {
                i += 1;
                while let (Some(CMapToken::Hex(lo)), Some(CMapToken::Hex(hi))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    let lo = code_of(lo);
                    // A range never spans more than one two-byte code space
                    let hi = code_of(hi).min(lo.saturating_add(0xFFFF));
                    match tokens.get(i + 2) {
                        Some(CMapToken::Hex(dst)) => {
                            let base = utf16be(dst);
                            for (offset, code) in (lo..=hi).enumerate() {
                                let mut units = base.clone();
                                if let Some(last) = units.last_mut() {
                                    *last = last.wrapping_add(offset as u16);
                                }
                                map.insert(code, String::from_utf16_lossy(&units));
                            }
                            i += 3;
                        }
                        Some(CMapToken::Open) => {
                            i += 3;
                            let mut code = lo;
                            while let Some(CMapToken::Hex(dst)) = tokens.get(i) {
                                if code <= hi {
                                    map.insert(code, String::from_utf16_lossy(&utf16be(dst)));
                                }
                                code = code.saturating_add(1);
                                i += 1;
                            }
                            if tokens.get(i) == Some(&CMapToken::Close) {
                                i += 1;
                            }
                        }
                        _ => i += 2,
                    }
                }
            }
            _ => i += 1,
        }
    }

    map
}

// =============================================================================
// Standard 14 Widths
// =============================================================================

/// Helvetica widths for codes 32..=126
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // space../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    278, 278, 584, 584, 584, 556, 1015, // :..@
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    278, 278, 278, 469, 556, 333, // [..`
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a..m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n..z
    334, 260, 334, 584, // {..~
];

/// Helvetica-Bold widths for codes 32..=126
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // space../
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0..9
    333, 333, 584, 584, 584, 611, 975, // :..@
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A..M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N..Z
    333, 278, 333, 584, 556, 333, // [..`
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a..m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n..z
    389, 280, 389, 584, // {..~
];

const COURIER_WIDTH: f32 = 600.0;

/// Widths for codes 32..=126 and for every other code.
///
/// Unknown families are measured as Helvetica.
fn standard_widths(base_font: &str) -> (Vec<f32>, f32) {
    // Subset fonts carry a "ABCDEF+" prefix
    let name = base_font
        .split_once('+')
        .map_or(base_font, |(_, rest)| rest);

    if name.starts_with("Courier") {
        return (vec![COURIER_WIDTH; 95], COURIER_WIDTH);
    }
    let table = if name.contains("Bold") {
        &HELVETICA_BOLD_WIDTHS
    } else {
        &HELVETICA_WIDTHS
    };
    (table.iter().map(|&w| f32::from(w)).collect(), MISSING_GLYPH_WIDTH)
}
