//! Copying pages between documents
//!
//! Pages are imported as page objects (not form XObjects) so their text
//! stays searchable and editable in the output.

use crate::constants::DEFAULT_PAGE_DIMENSIONS;
use crate::types::Result;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Source object id -> output object id
pub(crate) type CopyCache = HashMap<ObjectId, ObjectId>;

// =============================================================================
// Page Import
// =============================================================================

/// Copy one page into `output` as a child of `parent_id`.
///
/// Inherited attributes are resolved and written onto the copy, since the
/// copy no longer sits under the source page tree.
pub(crate) fn import_page(
    output: &mut Document,
    source: &Document,
    page_id: ObjectId,
    parent_id: ObjectId,
    cache: &mut CopyCache,
) -> Result<ObjectId> {
    // Reserve the id first so annotations pointing back at the page resolve to the copy
    let new_page_id = match cache.get(&page_id) {
        Some(&id) if !is_placed_page(output, id, parent_id) => id,
        _ => {
            let id = output.new_object_id();
            cache.insert(page_id, id);
            id
        }
    };

    let page_dict = source.get_dictionary(page_id)?;
    let mut new_dict = Dictionary::new();
    for (key, value) in page_dict.iter() {
        if key.as_slice() == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }

    for key in INHERITABLE_KEYS {
        if new_dict.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(source, page_dict, key) {
            new_dict.set(key.to_vec(), copy_object_deep(output, source, &value, cache)?);
        }
    }

    if !new_dict.has(b"MediaBox") {
        new_dict.set("MediaBox", Object::Array(default_media_box()));
    }
    new_dict.set("Parent", Object::Reference(parent_id));

    output
        .objects
        .insert(new_page_id, Object::Dictionary(new_dict));
    Ok(new_page_id)
}

/// Whether `id` is already a page in the output tree (the same source page appended twice)
fn is_placed_page(output: &Document, id: ObjectId, parent_id: ObjectId) -> bool {
    output
        .get_dictionary(id)
        .and_then(|dict| dict.get(b"Parent"))
        .and_then(Object::as_reference)
        .map(|parent| parent == parent_id)
        .unwrap_or(false)
}

/// Walk up the page tree looking for an inheritable attribute
fn inherited_attribute(doc: &Document, page_dict: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page_dict.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk guards against malformed cyclic trees
    for _ in 0..64 {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

/// Get default MediaBox for US Letter size
fn default_media_box() -> Vec<Object> {
    vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Integer(DEFAULT_PAGE_DIMENSIONS.0 as i64),
        Object::Integer(DEFAULT_PAGE_DIMENSIONS.1 as i64),
    ]
}

// =============================================================================
// Deep Copy
// =============================================================================

/// Deep copy an object from source to output document, following references.
///
/// Ids are reserved before recursing, so reference cycles terminate and
/// shared objects (fonts, images) are copied once per output document.
pub(crate) fn copy_object_deep(
    output: &mut Document,
    source: &Document,
    obj: &Object,
    cache: &mut CopyCache,
) -> Result<Object> {
    match obj {
        Object::Reference(id) => {
            if let Some(&new_id) = cache.get(id) {
                return Ok(Object::Reference(new_id));
            }

            let new_id = output.new_object_id();
            cache.insert(*id, new_id);

            let referenced = source.get_object(*id)?;
            let copied = copy_object_deep(output, source, referenced, cache)?;
            output.objects.insert(new_id, copied);

            Ok(Object::Reference(new_id))
        }
        Object::Dictionary(dict) => Ok(Object::Dictionary(copy_dictionary(
            output, source, dict, cache,
        )?)),
        Object::Array(arr) => {
            let new_arr: Result<Vec<_>> = arr
                .iter()
                .map(|item| copy_object_deep(output, source, item, cache))
                .collect();
            Ok(Object::Array(new_arr?))
        }
        Object::Stream(stream) => Ok(Object::Stream(Stream {
            dict: copy_dictionary(output, source, &stream.dict, cache)?,
            content: stream.content.clone(),
            allows_compression: stream.allows_compression,
            start_position: None,
        })),
        // Primitive types: just clone
        _ => Ok(obj.clone()),
    }
}

fn copy_dictionary(
    output: &mut Document,
    source: &Document,
    dict: &Dictionary,
    cache: &mut CopyCache,
) -> Result<Dictionary> {
    // A page reached through a link or annotation must not drag in the source page tree
    let is_page = dict
        .get(b"Type")
        .and_then(Object::as_name)
        .map(|name| name == b"Page")
        .unwrap_or(false);

    let mut new_dict = Dictionary::new();
    for (key, value) in dict.iter() {
        if is_page && key.as_slice() == b"Parent" {
            continue;
        }
        new_dict.set(key.clone(), copy_object_deep(output, source, value, cache)?);
    }
    Ok(new_dict)
}
