//! Partitioning a page sequence into fixed-size logical documents

use crate::types::*;

/// Split `total_pages` into consecutive groups of `group_size` pages.
///
/// The last group may be shorter. Keys are left neutral for the key
/// extractor to fill in.
pub fn segment(total_pages: usize, group_size: usize) -> Result<Vec<DocumentDescriptor>> {
    if group_size == 0 {
        return Err(SortError::Config(
            "Pages per document must be at least 1".to_string(),
        ));
    }

    let count = total_pages.div_ceil(group_size);
    let descriptors = (0..count)
        .map(|ordinal| {
            let start = ordinal * group_size;
            let end = (start + group_size).min(total_pages);
            DocumentDescriptor::new(ordinal, PageRange::new(start, end))
        })
        .collect();

    Ok(descriptors)
}
