//! Collaborator traits: the external boundaries the pipeline pulls input
//! from. Production callers implement these against a PDF extractor; tests
//! and examples use the in-memory fixtures below.

use crate::font::FontSpecTable;
use crate::fragment::RawFragment;
use crate::geometry::Rect;
use crate::media::MediaKind;

/// Supplies the raw, unpositioned-by-us text fragments for one page.
pub trait FragmentSource {
    /// Total page count, used to size header/footer detection.
    fn page_count(&self) -> u32;
    /// Page dimensions `(width, height)` in page units.
    fn page_size(&self, page: u32) -> (f32, f32);
    /// Every raw fragment the extractor found on `page`, in extractor order.
    fn fragments(&self, page: u32) -> Vec<RawFragment>;
}

/// One media region as reported by the extractor, before dedup/placement.
#[derive(Debug, Clone)]
pub struct RawMediaRegion {
    pub bbox: Rect,
    pub kind: MediaKind,
    pub source_id: String,
    pub cells: Vec<crate::media::TableCell>,
}

/// Supplies raster/vector/table regions for one page.
pub trait MediaSource {
    fn media(&self, page: u32) -> Vec<RawMediaRegion>;
}

/// Supplies the document-wide font table the extractor built while parsing.
pub trait MetadataSource {
    fn font_table(&self) -> FontSpecTable;
    fn book_title(&self) -> Option<String> {
        None
    }
    fn book_authors(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Supplies the PDF's own outline (bookmarks), when present, as chapter
/// boundary hints. A missing or empty outline is handled by falling back to
/// font-role-based chapter detection.
pub trait OutlineSource {
    /// `(page, title)` pairs for every top-level outline entry, in order.
    fn top_level_entries(&self) -> Vec<(u32, String)>;
}

/// An in-memory `FragmentSource`/`MediaSource` fixture for tests: every page
/// is supplied up front rather than pulled lazily from a real document.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    pub pages: Vec<InMemoryPage>,
    pub font_table: FontSpecTable,
    pub book_title: Option<String>,
    pub book_authors: Vec<String>,
    pub outline: Vec<(u32, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPage {
    pub width: f32,
    pub height: f32,
    pub fragments: Vec<RawFragment>,
    pub media: Vec<RawMediaRegion>,
}

impl FragmentSource for InMemoryDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_size(&self, page: u32) -> (f32, f32) {
        self.pages
            .get(page as usize - 1)
            .map(|p| (p.width, p.height))
            .unwrap_or((612.0, 792.0))
    }

    fn fragments(&self, page: u32) -> Vec<RawFragment> {
        self.pages.get(page as usize - 1).map(|p| p.fragments.clone()).unwrap_or_default()
    }
}

impl MediaSource for InMemoryDocument {
    fn media(&self, page: u32) -> Vec<RawMediaRegion> {
        self.pages.get(page as usize - 1).map(|p| p.media.clone()).unwrap_or_default()
    }
}

impl MetadataSource for InMemoryDocument {
    fn font_table(&self) -> FontSpecTable {
        self.font_table.clone()
    }

    fn book_title(&self) -> Option<String> {
        self.book_title.clone()
    }

    fn book_authors(&self) -> Vec<String> {
        self.book_authors.clone()
    }
}

impl OutlineSource for InMemoryDocument {
    fn top_level_entries(&self) -> Vec<(u32, String)> {
        self.outline.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontId;

    #[test]
    fn test_in_memory_document_reports_page_count_and_size() {
        let doc = InMemoryDocument {
            pages: vec![InMemoryPage {
                width: 612.0,
                height: 792.0,
                fragments: vec![RawFragment {
                    stream_index: 0,
                    left: 10.0,
                    top: 10.0,
                    width: 50.0,
                    height: 12.0,
                    text: "hello".to_string(),
                    font_id: FontId(1),
                    bold: false,
                    italic: false,
                }],
                media: Vec::new(),
            }],
            ..Default::default()
        };
        assert_eq!(doc.page_count(), 1);
        assert_eq!(doc.page_size(1), (612.0, 792.0));
        assert_eq!(doc.fragments(1).len(), 1);
    }
}
