//! Page edits: masking regions and inserting text
//!
//! Masking both paints over a region and removes the glyphs whose centers
//! fall inside it, replacing them with `TJ` spacing equal to their font
//! advance so the rest of the line keeps its position. Removed text is no
//! longer found by later searches.

use super::content::{page_operations, set_page_operations};
use super::font::page_fonts;
use super::text::{PlacedGlyph, ends_with_clean_state, place_glyphs};
use crate::options::TextStyle;
use crate::types::*;
use encoding_rs::WINDOWS_1252;
use lopdf::content::Operation;
use lopdf::{Document, Object, ObjectId, StringFormat};
use std::collections::BTreeMap;

/// Cover `area` with an opaque fill and drop the glyphs underneath it.
///
/// Returns the number of glyphs removed.
pub(crate) fn mask_region(
    doc: &mut Document,
    page_id: ObjectId,
    area: BoundingBox,
    fill: Rgb,
) -> Result<usize> {
    let operations = page_operations(doc, page_id)?;
    let glyphs = place_glyphs(&operations, &page_fonts(doc, page_id));

    let covered: Vec<&PlacedGlyph> = glyphs
        .iter()
        .filter(|g| {
            let (x, y) = g.bbox.center();
            area.contains(x, y)
        })
        .collect();
    let removed = covered.len();

    let operations = if covered.is_empty() {
        operations
    } else {
        remove_glyphs(operations, &covered)
    };

    let fill_ops = vec![
        Operation::new("q", vec![]),
        Operation::new("rg", rgb_operands(fill)),
        Operation::new(
            "re",
            vec![
                Object::Real(area.x0),
                Object::Real(area.y0),
                Object::Real(area.width()),
                Object::Real(area.height()),
            ],
        ),
        Operation::new("f", vec![]),
        Operation::new("Q", vec![]),
    ];

    set_page_operations(doc, page_id, append_isolated(operations, fill_ops))?;
    Ok(removed)
}

/// Show `text` with its baseline starting at `origin`, using the font registered as `font_resource`
pub(crate) fn insert_text(
    doc: &mut Document,
    page_id: ObjectId,
    origin: (f32, f32),
    text: &str,
    font_resource: &str,
    style: &TextStyle,
) -> Result<()> {
    let operations = page_operations(doc, page_id)?;

    let text_ops = vec![
        Operation::new("q", vec![]),
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![
                Object::Name(font_resource.as_bytes().to_vec()),
                Object::Real(style.font_size),
            ],
        ),
        Operation::new("rg", rgb_operands(style.color)),
        Operation::new("Tr", vec![Object::Integer(0)]),
        Operation::new(
            "Tm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Real(origin.0),
                Object::Real(origin.1),
            ],
        ),
        Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
        ),
        Operation::new("ET", vec![]),
        Operation::new("Q", vec![]),
    ];

    set_page_operations(doc, page_id, append_isolated(operations, text_ops))
}

// =============================================================================
// Helper Functions
// =============================================================================

fn rgb_operands(color: Rgb) -> Vec<Object> {
    vec![
        Object::Real(color.r),
        Object::Real(color.g),
        Object::Real(color.b),
    ]
}

/// Append `extra` so it runs with the default graphics state.
///
/// Existing content is wrapped in `q`/`Q` only when it leaves state behind.
fn append_isolated(mut operations: Vec<Operation>, extra: Vec<Operation>) -> Vec<Operation> {
    if !ends_with_clean_state(&operations) {
        let mut wrapped = Vec::with_capacity(operations.len() + extra.len() + 2);
        wrapped.push(Operation::new("q", vec![]));
        wrapped.append(&mut operations);
        wrapped.push(Operation::new("Q", vec![]));
        operations = wrapped;
    }
    operations.extend(extra);
    operations
}

/// Encode for a WinAnsi font; characters it cannot show become `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (bytes, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// A glyph to drop from a string: its code length and the advance to compensate
#[derive(Debug, Clone, Copy)]
struct Removal {
    len: usize,
    advance_units: f32,
}

/// (element, byte offset) -> removal, for one showing operation
type Removals = BTreeMap<(usize, usize), Removal>;

/// Rewrite showing operations so the given glyphs are skipped, not drawn
fn remove_glyphs(operations: Vec<Operation>, covered: &[&PlacedGlyph]) -> Vec<Operation> {
    let mut by_op: BTreeMap<usize, Removals> = BTreeMap::new();
    for glyph in covered {
        by_op.entry(glyph.op).or_default().insert(
            (glyph.element, glyph.byte),
            Removal {
                len: glyph.len,
                advance_units: glyph.advance_units,
            },
        );
    }

    let mut result = Vec::with_capacity(operations.len());
    for (index, op) in operations.into_iter().enumerate() {
        match by_op.get(&index) {
            Some(removed) => result.extend(rewrite_show(op, removed)),
            None => result.push(op),
        }
    }
    result
}

/// Turn one showing operation into equivalent operations ending in a `TJ`
fn rewrite_show(op: Operation, removed: &Removals) -> Vec<Operation> {
    let mut operands = op.operands;
    let (prefix, elements) = match op.operator.as_str() {
        "TJ" => match operands.pop() {
            Some(Object::Array(elements)) => (Vec::new(), elements),
            _ => return vec![Operation::new("TJ", operands)],
        },
        "Tj" => (Vec::new(), operands.into_iter().take(1).collect()),
        "'" => (
            vec![Operation::new("T*", vec![])],
            operands.into_iter().take(1).collect(),
        ),
        "\"" => {
            let mut iter = operands.into_iter();
            let word_spacing = iter.next().unwrap_or(Object::Integer(0));
            let char_spacing = iter.next().unwrap_or(Object::Integer(0));
            (
                vec![
                    Operation::new("Tw", vec![word_spacing]),
                    Operation::new("Tc", vec![char_spacing]),
                    Operation::new("T*", vec![]),
                ],
                iter.take(1).collect(),
            )
        }
        other => return vec![Operation::new(other, operands)],
    };

    let mut array = Vec::new();
    for (element, item) in elements.into_iter().enumerate() {
        match item {
            Object::String(bytes, format) => {
                split_string(&bytes, format, element, removed, &mut array);
            }
            other => array.push(other),
        }
    }

    let mut ops = prefix;
    ops.push(Operation::new("TJ", vec![Object::Array(array)]));
    ops
}

/// Append the kept runs of `bytes` to `array`, with spacing in place of removed glyphs
fn split_string(
    bytes: &[u8],
    format: StringFormat,
    element: usize,
    removed: &Removals,
    array: &mut Vec<Object>,
) {
    let mut kept = Vec::new();
    let mut skipped_units = 0.0f32;

    let mut byte = 0;
    while byte < bytes.len() {
        match removed.get(&(element, byte)) {
            Some(removal) => {
                if !kept.is_empty() {
                    array.push(Object::String(std::mem::take(&mut kept), format.clone()));
                }
                skipped_units += removal.advance_units;
                byte += removal.len.max(1);
            }
            None => {
                if skipped_units != 0.0 {
                    array.push(Object::Real(-skipped_units));
                    skipped_units = 0.0;
                }
                kept.push(bytes[byte]);
                byte += 1;
            }
        }
    }

    if !kept.is_empty() {
        array.push(Object::String(kept, format));
    }
    if skipped_units != 0.0 {
        array.push(Object::Real(-skipped_units));
    }
}
