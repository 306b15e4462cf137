//! Paragraph grouper: a linear pass over ordered fragments that opens and
//! closes paragraphs using font, size, style, gap, bullet, and block
//! signals, plus a document-wide cross-page merge pass.

use crate::fragment::Fragment;
use crate::pipeline::config::PipelineConfig;
use lazy_static::lazy_static;
use regex::Regex;

const BULLET_GLYPHS: &[char] = &[
    '•', '●', '○', '■', '□', '▪', '▫', '·', '-', '*', '–', '—', '→', '⇒', '▸', '►',
];

lazy_static! {
    static ref ORDERED_LIST_MARKER: Regex =
        Regex::new(r"^(\(?\d+[.\)]|[A-HJ-Za-hj-z][.\)])\s+\w{2,}").unwrap();
    static ref SENTENCE_TERMINATOR: Regex = Regex::new(r"[.!?;:]\s*$").unwrap();
    static ref HEADING_PATTERN: Regex = Regex::new(r"^(Chapter\s+\d+|\d+(\.\d+)+)").unwrap();
}

/// Whether `text` starts with a recognised bullet glyph or an ordered-list
/// marker (`1.`, `a)`, ...).
pub fn starts_with_bullet(text: &str) -> bool {
    let trimmed = text.trim_start();
    if let Some(first) = trimmed.chars().next() {
        if BULLET_GLYPHS.contains(&first) {
            return true;
        }
    }
    ORDERED_LIST_MARKER.is_match(trimmed)
}

/// An ordered, non-empty run of fragments making up one paragraph.
#[derive(Debug, Clone)]
pub struct Paragraph {
    pub id: u32,
    pub fragments: Vec<Fragment>,
    pub is_list_item: bool,
}

impl Paragraph {
    fn new(id: u32, first: Fragment, is_list_item: bool) -> Self {
        Self {
            id,
            fragments: vec![first],
            is_list_item,
        }
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    pub fn page(&self) -> u32 {
        self.fragments[0].page
    }

    pub fn column_id(&self) -> Option<u32> {
        self.fragments[0].column_id
    }

    pub fn reading_block(&self) -> Option<u32> {
        self.fragments[0].reading_block
    }

    pub fn font_size(&self) -> f32 {
        self.fragments[0].font_size
    }

    pub fn font_id(&self) -> crate::font::FontId {
        self.fragments[0].font_id
    }

    pub fn is_bold(&self) -> bool {
        self.fragments.last().map(|f| f.bold).unwrap_or(false)
    }
}

fn median_line_height(fragments: &[Fragment]) -> f32 {
    if fragments.is_empty() {
        return 12.0;
    }
    let mut heights: Vec<f32> = fragments.iter().map(|f| f.height).collect();
    heights.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    heights[heights.len() / 2]
}

/// Merge an isolated bullet-glyph fragment with its immediately following
/// text when the horizontal gap is within the lenient bullet-merge
/// tolerance, producing a single `"• text"` fragment.
fn merge_bullet_prefixes(mut fragments: Vec<Fragment>, config: &PipelineConfig) -> Vec<Fragment> {
    let mut merged: Vec<Fragment> = Vec::with_capacity(fragments.len());
    let mut i = 0;
    fragments.sort_by_key(|f| f.reading_order_index.unwrap_or(0));
    while i < fragments.len() {
        let is_lone_bullet = fragments[i].text.trim().chars().count() <= 2 && starts_with_bullet(&fragments[i].text);
        if is_lone_bullet && i + 1 < fragments.len() {
            let gap = fragments[i + 1].left - (fragments[i].left + fragments[i].width);
            let same_line = fragments[i].page == fragments[i + 1].page
                && (fragments[i].baseline() - fragments[i + 1].baseline()).abs() <= 2.0;
            if same_line && gap >= 0.0 && gap <= config.bullet_merge_gap_tolerance {
                let mut head = fragments[i].clone();
                let next = fragments[i + 1].clone();
                head.text = format!("{} {}", head.text.trim(), next.text);
                head.absorb(&next);
                merged.push(head);
                i += 2;
                continue;
            }
        }
        merged.push(fragments[i].clone());
        i += 1;
    }
    merged
}

/// Decide whether `curr` continues `prev`'s paragraph. See the design's
/// rules for the full continuation/break semantics.
fn continues(prev: &Fragment, curr: &Fragment, base_gap_threshold: f32, config: &PipelineConfig) -> bool {
    if prev.page != curr.page
        || prev.column_id != curr.column_id
        || prev.reading_block != curr.reading_block
        || prev.font_id != curr.font_id
    {
        return false;
    }
    if (prev.font_size - curr.font_size).abs() >= config.paragraph_size_break_threshold {
        return false;
    }

    let vertical_gap = curr.top - prev.baseline();
    let shares_baseline = (prev.baseline() - curr.baseline()).abs() <= 0.5;

    if shares_baseline && (prev.ends_with_space() || prev.ends_with_hyphen() || curr.starts_with_space()) {
        return true;
    }
    if vertical_gap <= curr.font_size {
        return true;
    }

    if starts_with_bullet(&curr.text) && vertical_gap > config.bullet_new_paragraph_min_gap {
        return false;
    }

    let gap_threshold = (config.adaptive_gap_factor * curr.font_size).max(base_gap_threshold);
    vertical_gap <= gap_threshold
}

/// Group one page's ordered, column/block/reading-order-assigned fragments
/// into paragraphs.
pub fn group_paragraphs(fragments: Vec<Fragment>, next_id: &mut u32, config: &PipelineConfig) -> Vec<Paragraph> {
    if fragments.is_empty() {
        return Vec::new();
    }
    let base_gap_threshold = config.base_gap_line_height_factor * median_line_height(&fragments);
    let fragments = merge_bullet_prefixes(fragments, config);

    let mut paragraphs: Vec<Paragraph> = Vec::new();
    for fragment in fragments {
        let is_list_start = starts_with_bullet(&fragment.text);
        match paragraphs.last_mut() {
            Some(p) if continues(p.fragments.last().unwrap(), &fragment, base_gap_threshold, config) => {
                p.fragments.push(fragment);
            }
            _ => {
                *next_id += 1;
                paragraphs.push(Paragraph::new(*next_id, fragment, is_list_start));
            }
        }
    }
    paragraphs
}

/// Merge the last paragraph on page N with the first on page N+1 when every
/// continuity condition in the design holds. Reading blocks are numbered
/// fresh on every page, so block identity can't be part of the cross-page
/// check — column identity (which is stable across pages for a given layout)
/// stands in for it instead.
pub fn merge_cross_page(mut paragraphs: Vec<Paragraph>) -> Vec<Paragraph> {
    let mut i = 0;
    while i + 1 < paragraphs.len() {
        let consecutive_pages = paragraphs[i + 1].page() == paragraphs[i].page() + 1;
        let same_column = paragraphs[i].column_id() == paragraphs[i + 1].column_id();
        let same_font = paragraphs[i].font_id() == paragraphs[i + 1].font_id();
        let size_close = (paragraphs[i].font_size() - paragraphs[i + 1].font_size()).abs() < 2.0;
        let last_text = paragraphs[i].text();
        let first_text = paragraphs[i + 1].text();
        let ends_terminated = SENTENCE_TERMINATOR.is_match(last_text.trim_end());
        let starts_heading_like = HEADING_PATTERN.is_match(first_text.trim_start()) || starts_with_bullet(&first_text);
        let bold_transition = paragraphs[i].is_bold() != paragraphs[i + 1].is_bold();

        let mergeable = consecutive_pages
            && same_column
            && same_font
            && size_close
            && !ends_terminated
            && !starts_heading_like
            && !bold_transition;

        if mergeable {
            let next = paragraphs.remove(i + 1);
            paragraphs[i].fragments.extend(next.fragments);
        } else {
            i += 1;
        }
    }
    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontId;
    use crate::fragment::RawFragment;

    fn make(page: u32, stream_index: u32, left: f32, top: f32, font_size: f32, font_id: u32, text: &str) -> Fragment {
        let mut f = Fragment::from_raw(
            page,
            612.0,
            792.0,
            RawFragment {
                stream_index,
                left,
                top,
                width: 200.0,
                height: 12.0,
                text: text.to_string(),
                font_id: FontId(font_id),
                bold: false,
                italic: false,
            },
        );
        f.font_size = font_size;
        f.column_id = Some(1);
        f.reading_block = Some(1);
        f.reading_order_index = Some(stream_index);
        f
    }

    #[test]
    fn test_starts_with_bullet_detects_glyph_and_ordered_marker() {
        assert!(starts_with_bullet("• An item"));
        assert!(starts_with_bullet("1. First step here"));
        assert!(!starts_with_bullet("Regular sentence."));
    }

    #[test]
    fn test_simple_paragraph_stays_together() {
        let fragments = vec![
            make(1, 0, 50.0, 100.0, 10.0, 1, "This is a line"),
            make(1, 1, 50.0, 112.0, 10.0, 1, "continuing the thought"),
        ];
        let mut next_id = 0;
        let config = PipelineConfig::default();
        let paragraphs = group_paragraphs(fragments, &mut next_id, &config);
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].fragments.len(), 2);
    }

    #[test]
    fn test_font_size_change_breaks_paragraph() {
        let fragments = vec![
            make(1, 0, 50.0, 100.0, 10.0, 1, "Body text"),
            make(1, 1, 50.0, 112.0, 18.0, 1, "A Heading"),
        ];
        let mut next_id = 0;
        let config = PipelineConfig::default();
        let paragraphs = group_paragraphs(fragments, &mut next_id, &config);
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_large_gap_breaks_paragraph() {
        let fragments = vec![
            make(1, 0, 50.0, 100.0, 10.0, 1, "First paragraph line"),
            make(1, 1, 50.0, 300.0, 10.0, 1, "Far below, new paragraph"),
        ];
        let mut next_id = 0;
        let config = PipelineConfig::default();
        let paragraphs = group_paragraphs(fragments, &mut next_id, &config);
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_cross_page_merge_joins_unterminated_paragraph() {
        let mut p1 = Paragraph::new(1, make(10, 0, 50.0, 700.0, 10.0, 1, "and this discussion continues"), false);
        p1.fragments[0].column_id = Some(1);
        p1.fragments[0].reading_block = Some(3);
        let mut p2 = Paragraph::new(2, make(11, 0, 50.0, 100.0, 10.0, 1, "into the next page."), false);
        p2.fragments[0].column_id = Some(1);
        p2.fragments[0].reading_block = Some(1);

        let merged = merge_cross_page(vec![p1, p2]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].fragments.len(), 2);
        assert_eq!(merged[0].fragments[0].page, 10);
        assert_eq!(merged[0].fragments[1].page, 11);
    }

    #[test]
    fn test_cross_page_merge_respects_sentence_terminator() {
        let mut p1 = Paragraph::new(1, make(10, 0, 50.0, 700.0, 10.0, 1, "This sentence ends here."), false);
        p1.fragments[0].column_id = Some(1);
        p1.fragments[0].reading_block = Some(3);
        let mut p2 = Paragraph::new(2, make(11, 0, 50.0, 100.0, 10.0, 1, "A new sentence begins."), false);
        p2.fragments[0].column_id = Some(1);
        p2.fragments[0].reading_block = Some(1);

        let merged = merge_cross_page(vec![p1, p2]);
        assert_eq!(merged.len(), 2);
    }
}
