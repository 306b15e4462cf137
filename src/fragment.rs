//! The fragment data model: the atomic unit produced by the external glyph
//! extractor and manipulated by the layout stages.
//!
//! A [`Fragment`] starts life as exactly what the extractor saw on a page —
//! one `Tj`/`TJ` run, hence [`RawFragment`] — and is progressively annotated
//! and merged as it passes through the fragment layout engine, column
//! resolver, reading-order assigner, and paragraph grouper. Fields that are
//! only meaningful after a given stage are `Option`s defaulting to `None`.

use crate::font::FontId;
use crate::geometry::Rect;

/// What the external extractor hands in for a single page, before any of the
/// core stages have touched it.
#[derive(Debug, Clone)]
pub struct RawFragment {
    /// Order in which this fragment was emitted from the content stream.
    /// Stable and unique within a page.
    pub stream_index: u32,
    /// Left edge, in page units.
    pub left: f32,
    /// Top edge, in page units (smaller = higher on the page).
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub font_id: FontId,
    pub bold: bool,
    pub italic: bool,
}

impl RawFragment {
    pub fn bbox(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    /// `top + height`: the line on which characters sit.
    pub fn baseline(&self) -> f32 {
        self.top + self.height
    }
}

/// Whether a fragment has been folded in as a superscript or subscript of
/// some larger neighbour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptType {
    Super,
    Sub,
}

/// A fragment as manipulated by the core pipeline: a `RawFragment` plus
/// everything the stages derive from it.
///
/// Invariants upheld by the stages that produce this type:
/// - `width >= 0.0`, `height > 0.0`.
/// - `baseline() > top`.
/// - `stream_index` is unique among fragments on the same page (before
///   merging; a merged fragment keeps the `stream_index` of its first
///   component).
/// - After the fragment layout engine runs, the union of
///   `original_fragments`' bounding boxes is contained in `bbox()`.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub page: u32,
    pub stream_index: u32,
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
    pub text: String,
    pub font_id: FontId,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub page_width: f32,
    pub page_height: f32,

    /// `0` = full-width, `1..N` = column index left to right. `None` before
    /// the column resolver has run.
    pub column_id: Option<u32>,
    /// Index of the row this fragment belonged to during row grouping.
    pub row_index: Option<u32>,
    /// Globally monotonic per-page position in the linearised reading order.
    pub reading_order_index: Option<u32>,
    /// Per-page monotonic index of the reading block this fragment falls in.
    pub reading_block: Option<u32>,
    /// Index of the paragraph this fragment belongs to, once grouped.
    pub paragraph_id: Option<u32>,

    pub is_script: bool,
    pub script_type: Option<ScriptType>,
    /// `stream_index` of the neighbour this fragment was folded into, if any.
    pub script_parent: Option<u32>,

    /// Raw fragments folded into this one by the fragment layout engine, in
    /// left-to-right order. A fragment that has not been merged with
    /// anything still carries exactly itself here.
    pub original_fragments: Vec<RawFragment>,
}

impl Fragment {
    /// Build a pipeline-ready fragment directly from what the extractor gave
    /// us, before any stage has touched it.
    pub fn from_raw(page: u32, page_width: f32, page_height: f32, raw: RawFragment) -> Self {
        Self {
            page,
            stream_index: raw.stream_index,
            left: raw.left,
            top: raw.top,
            width: raw.width,
            height: raw.height,
            text: raw.text.clone(),
            font_id: raw.font_id,
            font_size: 0.0,
            bold: raw.bold,
            italic: raw.italic,
            page_width,
            page_height,
            column_id: None,
            row_index: None,
            reading_order_index: None,
            reading_block: None,
            paragraph_id: None,
            is_script: false,
            script_type: None,
            script_parent: None,
            original_fragments: vec![raw],
        }
    }

    pub fn bbox(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    /// `top + height`: the line on which characters sit.
    pub fn baseline(&self) -> f32 {
        self.top + self.height
    }

    /// Union the bounding box of `other` into this fragment's and extend
    /// `original_fragments` with `other`'s components, preserving left-to-
    /// right order of the originals.
    pub fn absorb(&mut self, other: &Fragment) {
        let merged = self.bbox().union(&other.bbox());
        self.left = merged.x;
        self.top = merged.y;
        self.width = merged.width;
        self.height = merged.height;
        self.original_fragments
            .extend(other.original_fragments.iter().cloned());
        self.original_fragments
            .sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal));
    }

    /// Whether the union of `original_fragments`' bboxes sits inside this
    /// fragment's own bbox, as required after merging.
    pub fn bbox_covers_originals(&self) -> bool {
        let bbox = self.bbox();
        self.original_fragments.iter().all(|f| {
            let r = f.bbox();
            r.left() >= bbox.left() - 0.01
                && r.top() >= bbox.top() - 0.01
                && r.right() <= bbox.right() + 0.01
                && r.bottom() <= bbox.bottom() + 0.01
        })
    }

    pub fn starts_with_space(&self) -> bool {
        self.text.starts_with(' ')
    }

    pub fn ends_with_space(&self) -> bool {
        self.text.ends_with(' ')
    }

    pub fn ends_with_hyphen(&self) -> bool {
        self.text.ends_with('-') || self.text.ends_with('\u{00AD}')
    }
}

/// An ephemeral, ordered run of fragments sharing a baseline within
/// tolerance. Used inside the fragment layout engine and the reading-order
/// assigner; never persisted past those stages.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub baseline: f32,
    pub fragments: Vec<Fragment>,
}

impl Row {
    pub fn new(first: Fragment) -> Self {
        Self {
            baseline: first.baseline(),
            fragments: vec![first],
        }
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(stream_index: u32, left: f32, top: f32, width: f32, height: f32, text: &str) -> RawFragment {
        RawFragment {
            stream_index,
            left,
            top,
            width,
            height,
            text: text.to_string(),
            font_id: FontId(1),
            bold: false,
            italic: false,
        }
    }

    #[test]
    fn test_baseline_is_top_plus_height() {
        let f = Fragment::from_raw(1, 612.0, 792.0, raw(0, 10.0, 100.0, 50.0, 12.0, "hi"));
        assert_eq!(f.baseline(), 112.0);
    }

    #[test]
    fn test_absorb_unions_bbox_and_originals() {
        let mut a = Fragment::from_raw(1, 612.0, 792.0, raw(0, 0.0, 100.0, 20.0, 12.0, "foo"));
        let b = Fragment::from_raw(1, 612.0, 792.0, raw(1, 25.0, 100.0, 20.0, 12.0, "bar"));
        a.absorb(&b);
        assert_eq!(a.original_fragments.len(), 2);
        assert!(a.bbox_covers_originals());
        assert_eq!(a.width, 45.0);
    }

    #[test]
    fn test_ends_with_hyphen() {
        let f = Fragment::from_raw(1, 612.0, 792.0, raw(0, 0.0, 0.0, 10.0, 10.0, "contin-"));
        assert!(f.ends_with_hyphen());
    }
}
