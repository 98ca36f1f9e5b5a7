//! Page content stream and resource access

use crate::types::*;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

// =============================================================================
// Reading
// =============================================================================

/// Get the decompressed content stream data of a page.
pub(crate) fn get_page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let contents = match page_dict.get(b"Contents") {
        Ok(c) => c,
        Err(_) => return Ok(Vec::new()), // No content = blank page
    };

    match contents {
        Object::Reference(id) => get_single_content_stream(doc, *id),
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

/// Get content from a single content stream reference
fn get_single_content_stream(doc: &Document, id: ObjectId) -> Result<Vec<u8>> {
    match doc.get_object(id)? {
        Object::Stream(stream) => Ok(stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone())),
        // Some writers point Contents at an array object
        Object::Array(arr) => get_concatenated_content_streams(doc, arr),
        _ => Ok(Vec::new()),
    }
}

/// Concatenate multiple content streams
fn get_concatenated_content_streams(doc: &Document, refs: &[Object]) -> Result<Vec<u8>> {
    let mut result = Vec::new();

    for obj in refs {
        if let Object::Reference(id) = obj {
            if let Ok(stream) = doc.get_object(*id)?.as_stream() {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                result.extend_from_slice(&content);
                result.push(b'\n');
            }
        }
    }

    Ok(result)
}

/// Decode a page's content stream into operations
pub(crate) fn page_operations(doc: &Document, page_id: ObjectId) -> Result<Vec<Operation>> {
    let data = get_page_content(doc, page_id)?;
    let content = Content::decode(&data)
        .map_err(|e| SortError::Content(format!("failed to parse page content: {e}")))?;
    Ok(content.operations)
}

// =============================================================================
// Writing
// =============================================================================

/// Replace a page's content with the given operations as a single new stream
pub(crate) fn set_page_operations(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<()> {
    let data = Content { operations }
        .encode()
        .map_err(|e| SortError::Content(format!("failed to encode page content: {e}")))?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), data));

    match doc.get_object_mut(page_id)? {
        Object::Dictionary(dict) => {
            dict.set("Contents", Object::Reference(content_id));
            Ok(())
        }
        _ => Err(SortError::Content(format!(
            "page object {:?} is not a dictionary",
            page_id
        ))),
    }
}

// =============================================================================
// Resources
// =============================================================================

/// Register `font_id` under `name` in the page's font resources
pub(crate) fn add_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    name: &str,
    font_id: ObjectId,
) -> Result<()> {
    let resources = doc.get_dictionary(page_id)?.get(b"Resources").ok().cloned();

    match resources {
        Some(Object::Reference(resources_id)) => {
            let mut resources = doc.get_dictionary(resources_id)?.clone();
            set_font_entry(doc, &mut resources, name, font_id)?;
            doc.objects
                .insert(resources_id, Object::Dictionary(resources));
        }
        other => {
            let mut resources = match other {
                Some(Object::Dictionary(dict)) => dict,
                _ => Dictionary::new(),
            };
            set_font_entry(doc, &mut resources, name, font_id)?;
            if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
                page.set("Resources", Object::Dictionary(resources));
            }
        }
    }

    Ok(())
}

fn set_font_entry(
    doc: &mut Document,
    resources: &mut Dictionary,
    name: &str,
    font_id: ObjectId,
) -> Result<()> {
    match resources.get(b"Font").ok().cloned() {
        Some(Object::Reference(fonts_id)) => {
            let mut fonts = doc.get_dictionary(fonts_id)?.clone();
            fonts.set(name, Object::Reference(font_id));
            doc.objects.insert(fonts_id, Object::Dictionary(fonts));
        }
        Some(Object::Dictionary(mut fonts)) => {
            fonts.set(name, Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(fonts));
        }
        _ => {
            let mut fonts = Dictionary::new();
            fonts.set(name, Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(fonts));
        }
    }
    Ok(())
}

/// Create a standard 14 Type1 font object with WinAnsi encoding
pub(crate) fn create_standard_font(doc: &mut Document, base_font: &str) -> ObjectId {
    let mut font_dict = Dictionary::new();
    font_dict.set("Type", Object::Name(b"Font".to_vec()));
    font_dict.set("Subtype", Object::Name(b"Type1".to_vec()));
    font_dict.set("BaseFont", Object::Name(base_font.as_bytes().to_vec()));
    font_dict.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    doc.add_object(font_dict)
}

/// Extract numeric value from a PDF object
pub(crate) fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
