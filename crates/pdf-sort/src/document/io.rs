//! lopdf-backed source and output documents

use super::content::{add_font_resource, create_standard_font, page_operations};
use super::copy::{CopyCache, import_page};
use super::font::page_fonts;
use super::text::{TextLine, find_in_lines, layout_lines, lines_text, place_glyphs};
use super::{PageSink, PageSource, edit};
use crate::constants::REPLACEMENT_FONT_RESOURCE;
use crate::options::TextStyle;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::HashMap;
use std::path::Path;

fn page_lines(doc: &Document, page_id: ObjectId) -> Result<Vec<TextLine>> {
    let operations = page_operations(doc, page_id)?;
    let fonts = page_fonts(doc, page_id);
    Ok(layout_lines(&place_glyphs(&operations, &fonts)))
}

fn lookup_page(page_ids: &[ObjectId], index: usize) -> Result<ObjectId> {
    page_ids
        .get(index)
        .copied()
        .ok_or(SortError::PageOutOfRange {
            index,
            count: page_ids.len(),
        })
}

// =============================================================================
// Source
// =============================================================================

/// An opened input PDF
pub struct SourceDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
}

impl SourceDocument {
    pub fn from_document(doc: Document) -> Self {
        let page_ids = doc.get_pages().values().copied().collect();
        Self { doc, page_ids }
    }

    /// Load a PDF from a file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let bytes = tokio::fs::read(&path).await?;
        tokio::task::spawn_blocking(move || Self::load_mem(&bytes)).await?
    }

    /// Load a PDF from memory
    pub fn load_mem(bytes: &[u8]) -> Result<Self> {
        Ok(Self::from_document(Document::load_mem(bytes)?))
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn page_id(&self, index: usize) -> Result<ObjectId> {
        lookup_page(&self.page_ids, index)
    }
}

impl PageSource for SourceDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let lines = page_lines(&self.doc, self.page_id(index)?)?;
        Ok(lines_text(&lines))
    }
}

// =============================================================================
// Output
// =============================================================================

/// A PDF assembled from pages of one source document.
///
/// Copied objects are cached by source object id, so every page appended
/// to one output must come from the same source.
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    copied: CopyCache,
    /// Base font name -> font object
    fonts: HashMap<String, ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");

        // Create page tree root ID
        let pages_id = doc.new_object_id();
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(Vec::new())),
            ("Count", Object::Integer(0)),
        ]);
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        // Create catalog
        let catalog_id = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", catalog_id);

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            copied: CopyCache::new(),
            fonts: HashMap::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Serialize the document
    pub fn to_bytes(mut self) -> Result<Vec<u8>> {
        let mut writer = Vec::new();
        self.doc.save_to(&mut writer)?;
        Ok(writer)
    }

    /// Save the document, removing a partially written file on failure
    pub async fn save(self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_owned();
        let bytes = tokio::task::spawn_blocking(move || self.to_bytes()).await??;
        if let Err(e) = tokio::fs::write(&path, bytes).await {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                log::debug!("No partial output to remove at {}: {}", path.display(), cleanup);
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        lookup_page(&self.page_ids, index)
    }

    fn sync_page_tree(&mut self) {
        let kids = self
            .page_ids
            .iter()
            .map(|id| Object::Reference(*id))
            .collect();
        let pages_dict = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));
    }

    /// Font object for `base_font`, created once per document
    fn font(&mut self, base_font: &str) -> ObjectId {
        if let Some(&id) = self.fonts.get(base_font) {
            return id;
        }
        let id = create_standard_font(&mut self.doc, base_font);
        self.fonts.insert(base_font.to_string(), id);
        id
    }
}

impl PageSource for OutputDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_text(&self, index: usize) -> Result<String> {
        let lines = page_lines(&self.doc, self.page_id(index)?)?;
        Ok(lines_text(&lines))
    }
}

impl PageSink for OutputDocument {
    type Source = SourceDocument;

    fn append_pages(&mut self, source: &SourceDocument, range: PageRange) -> Result<PageRange> {
        range.check_within(source.page_count())?;

        let start = self.page_ids.len();
        for index in range.indices() {
            let source_page = source.page_id(index)?;
            let page_id = import_page(
                &mut self.doc,
                source.document(),
                source_page,
                self.pages_id,
                &mut self.copied,
            )?;
            self.page_ids.push(page_id);
        }
        self.sync_page_tree();

        Ok(PageRange::new(start, self.page_ids.len()))
    }

    fn find_occurrences(&self, page: usize, literal: &str) -> Result<Vec<BoundingBox>> {
        let lines = page_lines(&self.doc, self.page_id(page)?)?;
        Ok(find_in_lines(&lines, literal))
    }

    fn mask(&mut self, page: usize, area: BoundingBox, fill: Rgb) -> Result<()> {
        let page_id = self.page_id(page)?;
        let removed = edit::mask_region(&mut self.doc, page_id, area, fill)?;
        log::trace!("Masked {:?} on output page {}, {} glyphs removed", area, page, removed);
        Ok(())
    }

    fn insert_text(
        &mut self,
        page: usize,
        origin: (f32, f32),
        text: &str,
        style: &TextStyle,
    ) -> Result<()> {
        let page_id = self.page_id(page)?;
        let font_id = self.font(&style.font_name);
        add_font_resource(&mut self.doc, page_id, REPLACEMENT_FONT_RESOURCE, font_id)?;
        edit::insert_text(
            &mut self.doc,
            page_id,
            origin,
            text,
            REPLACEMENT_FONT_RESOURCE,
            style,
        )
    }
}
