//! PDF primitives consumed by the sorting pipeline
//!
//! The pipeline only talks to [`PageSource`] and [`PageSink`]; the lopdf
//! backed [`SourceDocument`] and [`OutputDocument`] are the production
//! implementations.

mod content;
mod copy;
mod edit;
mod font;
mod io;
mod text;

pub use io::{OutputDocument, SourceDocument};

use crate::options::TextStyle;
use crate::types::*;

/// Read access to a paginated document
pub trait PageSource {
    fn page_count(&self) -> usize;

    /// Extracted text of the page at `index` (0-based)
    fn page_text(&self, index: usize) -> Result<String>;
}

/// A growing output document that pages are appended to and edited in place
pub trait PageSink: PageSource {
    type Source: PageSource + ?Sized;

    /// Append `range` of `source` in order and return where the pages landed
    fn append_pages(&mut self, source: &Self::Source, range: PageRange) -> Result<PageRange>;

    /// Bounding boxes of every occurrence of `literal` on a page, in reading order
    fn find_occurrences(&self, page: usize, literal: &str) -> Result<Vec<BoundingBox>>;

    /// Paint `area` opaquely and remove the text under it
    fn mask(&mut self, page: usize, area: BoundingBox, fill: Rgb) -> Result<()>;

    /// Insert `text` with its baseline starting at `origin`
    fn insert_text(
        &mut self,
        page: usize,
        origin: (f32, f32),
        text: &str,
        style: &TextStyle,
    ) -> Result<()>;
}
