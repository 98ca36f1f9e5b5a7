//! Stable ordering of document descriptors

use crate::options::SortDirection;
use crate::types::DocumentDescriptor;

/// Stable sort by key.
///
/// Descending order reverses only the key comparison; equal keys always
/// keep ascending scan order. The `-1` sentinel is the smallest numeric
/// key, so it leads ascending output and trails descending output.
pub fn order(
    mut descriptors: Vec<DocumentDescriptor>,
    direction: SortDirection,
) -> Vec<DocumentDescriptor> {
    descriptors.sort_by(|a, b| {
        let primary = a.sort_key.cmp(&b.sort_key);
        let primary = if direction.is_descending() {
            primary.reverse()
        } else {
            primary
        };
        primary.then_with(|| a.ordinal.cmp(&b.ordinal))
    });
    descriptors
}
