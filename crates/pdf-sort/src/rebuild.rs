//! Reassembling sorted documents and substituting placeholders

use crate::document::PageSink;
use crate::options::TextStyle;
use crate::progress::{CancelToken, Phase, ProgressTracker};
use crate::types::*;

/// What to substitute, and with which values
#[derive(Debug, Clone, Copy)]
pub struct Substitution<'a> {
    /// Literal token searched for on each appended page
    pub placeholder: Option<&'a str>,
    /// Values aligned to the sorted position of each document
    pub replacements: &'a [String],
    pub style: &'a TextStyle,
}

impl<'a> Substitution<'a> {
    /// Replacement for the document at sorted `position`, if any
    pub fn value_for(&self, position: usize) -> Option<(&'a str, &'a str)> {
        let placeholder = self.placeholder.filter(|p| !p.is_empty())?;
        let value = self.replacements.get(position)?;
        Some((placeholder, value.as_str()))
    }
}

/// Append each document to `sink` in the given order, substituting placeholders.
///
/// Returns the number of occurrences replaced. Any failure aborts the whole
/// rebuild; the partially built sink must then be discarded.
pub(crate) fn rebuild<K: PageSink>(
    source: &K::Source,
    ordered: &[DocumentDescriptor],
    substitution: &Substitution<'_>,
    sink: &mut K,
    tracker: &mut ProgressTracker<'_>,
    cancel: &CancelToken,
) -> Result<usize> {
    let mut substitutions = 0;

    for (position, descriptor) in ordered.iter().enumerate() {
        cancel.check()?;

        substitutions += rebuild_document(source, descriptor, position, substitution, sink)
            .map_err(|e| SortError::Rebuild {
                ordinal: descriptor.ordinal,
                range: descriptor.range,
                source: Box::new(e),
            })?;

        tracker.advance(Phase::Rebuilding);
    }

    Ok(substitutions)
}

fn rebuild_document<K: PageSink>(
    source: &K::Source,
    descriptor: &DocumentDescriptor,
    position: usize,
    substitution: &Substitution<'_>,
    sink: &mut K,
) -> Result<usize> {
    let before = sink.page_count();
    let appended = sink.append_pages(source, descriptor.range)?;

    let expected = PageRange::new(before, before + descriptor.page_count());
    if appended != expected || sink.page_count() != expected.end {
        return Err(SortError::Content(format!(
            "pages {} landed at {} in the output, expected {}",
            descriptor.range, appended, expected
        )));
    }

    let Some((placeholder, value)) = substitution.value_for(position) else {
        return Ok(0);
    };

    let style = substitution.style;
    let mut replaced = 0;
    for page in appended.indices() {
        // Collected before editing so no occurrence is handled twice
        let hits = sink.find_occurrences(page, placeholder)?;
        for hit in hits {
            sink.mask(page, hit, style.mask_fill)?;
            let (x, y) = hit.origin();
            sink.insert_text(page, (x, y + style.baseline_offset), value, style)?;
            replaced += 1;
        }
    }

    log::debug!(
        "Document #{} (sorted position {}): replaced {} occurrence(s) of {:?}",
        descriptor.ordinal,
        position,
        replaced,
        placeholder
    );
    Ok(replaced)
}
