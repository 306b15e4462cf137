//! The structured output tree: a DocBook-like `book { bookinfo, chapter+ {
//! section*, para*, list*, figure*, table* } }` hierarchy, the final
//! artefact the pipeline emits.

use crate::font::FontId;

/// Inline content inside a `Para`, carrying the font metadata preserved by
/// the fragment layout engine's `original_fragments`.
#[derive(Debug, Clone)]
pub enum Inline {
    Phrase { text: String, font: FontId, size: f32 },
    Emphasis { text: String, font: FontId, size: f32 },
    Subscript { text: String, font: FontId, size: f32 },
    Superscript { text: String, font: FontId, size: f32 },
}

#[derive(Debug, Clone, Default)]
pub struct Para {
    pub inlines: Vec<Inline>,
}

impl Para {
    pub fn text(&self) -> String {
        self.inlines
            .iter()
            .map(|i| match i {
                Inline::Phrase { text, .. }
                | Inline::Emphasis { text, .. }
                | Inline::Subscript { text, .. }
                | Inline::Superscript { text, .. } => text.as_str(),
            })
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListEl {
    pub items: Vec<Para>,
}

#[derive(Debug, Clone)]
pub struct Figure {
    pub resource_id: String,
    pub caption: Option<Para>,
}

#[derive(Debug, Clone, Default)]
pub struct TableEl {
    pub rows: Vec<Vec<String>>,
    pub caption: Option<Para>,
}

/// One node in a chapter's body, in reading order.
#[derive(Debug, Clone)]
pub enum Block {
    Section { depth: u8, title: Para, body: Vec<Block> },
    Para(Para),
    List(ListEl),
    Figure(Figure),
    Table(TableEl),
    TocEntry(Para),
    IndexEntry(Para),
    AlphabetHeader(char),
}

#[derive(Debug, Clone, Default)]
pub struct Chapter {
    pub title: Option<Para>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Default)]
pub struct BookInfo {
    pub isbn: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub publication_date: Option<String>,
    pub edition: Option<String>,
    pub copyright_year: Option<String>,
    pub copyright_holder: Option<String>,
}

/// The finished, packaging-ready document.
#[derive(Debug, Clone, Default)]
pub struct DocumentTree {
    pub book_info: BookInfo,
    pub title: Option<Para>,
    pub chapters: Vec<Chapter>,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk every `Figure`/`Table` in the tree and collect the resource ids
    /// they reference, for the reference-mapper resolution check.
    pub fn referenced_resource_ids(&self) -> Vec<String> {
        fn walk(blocks: &[Block], out: &mut Vec<String>) {
            for block in blocks {
                match block {
                    Block::Figure(f) => out.push(f.resource_id.clone()),
                    Block::Section { body, .. } => walk(body, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        for chapter in &self.chapters {
            walk(&chapter.blocks, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_chapter_markers_default_to_single_implicit_chapter() {
        let mut tree = DocumentTree::new();
        tree.chapters.push(Chapter::default());
        assert_eq!(tree.chapters.len(), 1);
    }

    #[test]
    fn test_referenced_resource_ids_walks_sections() {
        let mut tree = DocumentTree::new();
        let mut chapter = Chapter::default();
        chapter.blocks.push(Block::Section {
            depth: 1,
            title: Para::default(),
            body: vec![Block::Figure(Figure {
                resource_id: "img-1".to_string(),
                caption: None,
            })],
        });
        tree.chapters.push(chapter);
        assert_eq!(tree.referenced_resource_ids(), vec!["img-1".to_string()]);
    }
}
