//! Font-role & semantic labeller: document-wide font statistics drive role
//! assignment, and the paragraph/media stream is labelled into the final
//! chapter/section/TOC/index/list/figure/table structure.

use crate::document_tree::{Block, BookInfo, Chapter, DocumentTree, Figure, Inline, ListEl, Para, TableEl};
use crate::font::{FontId, FontRole, FontRoleTable, FontSpecTable};
use crate::fragment::Fragment;
use crate::media::{MediaKind, MediaRegion};
use crate::paragraph::{starts_with_bullet, Paragraph};
use crate::pipeline::config::PipelineConfig;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref CHAPTER_PATTERN: Regex = Regex::new(r"(?i)^chapter\s+\d+").unwrap();
    static ref FIGURE_CAPTION: Regex = Regex::new(r"(?i)^figure\s+\d+\.").unwrap();
    static ref TABLE_CAPTION: Regex = Regex::new(r"(?i)^table\s+\d+\.").unwrap();
}

/// Per-font frequency/coverage statistics used to derive font roles.
struct FontStats {
    size: f32,
    count: u32,
    pages: std::collections::HashSet<u32>,
}

/// Build frequency x page-coverage statistics from every fragment, keyed by
/// font id, then derive a role for each id.
pub fn derive_font_roles(fragments: &[Fragment], font_table: &FontSpecTable, config: &PipelineConfig) -> FontRoleTable {
    let mut stats: HashMap<FontId, FontStats> = HashMap::new();
    for fragment in fragments {
        let size = font_table.get(fragment.font_id).map(|s| s.size).unwrap_or(fragment.font_size);
        let entry = stats.entry(fragment.font_id).or_insert_with(|| FontStats {
            size,
            count: 0,
            pages: std::collections::HashSet::new(),
        });
        entry.count += 1;
        entry.pages.insert(fragment.page);
    }

    let mut roles = FontRoleTable::new();
    if stats.is_empty() {
        return roles;
    }

    let (body_min, body_max) = config.body_font_size_range;
    let body_font = stats
        .iter()
        .filter(|(_, s)| s.size >= body_min && s.size <= body_max)
        .max_by_key(|(_, s)| s.count)
        .map(|(id, _)| *id)
        // Missing body font: fall back to the overall most frequent font.
        .or_else(|| stats.iter().max_by_key(|(_, s)| s.count).map(|(id, _)| *id));

    let Some(body_font) = body_font else { return roles };
    roles.set(body_font, FontRole::Body);
    let body_size = stats[&body_font].size;

    let mut heading_sizes: Vec<f32> = stats
        .iter()
        .filter(|(id, s)| **id != body_font && s.size > body_size)
        .map(|(_, s)| s.size)
        .collect();
    heading_sizes.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    heading_sizes.dedup_by(|a, b| (*a - *b).abs() < 0.5);
    heading_sizes.truncate(config.max_heading_levels as usize);

    for (id, s) in &stats {
        if *id == body_font {
            continue;
        }
        if let Some(level) = heading_sizes.iter().position(|sz| (*sz - s.size).abs() < 0.5) {
            roles.set(*id, FontRole::Heading((level + 1) as u8));
        }
    }

    // Title: the unique highest-size, low-count font appearing on an early page.
    if let Some((title_id, _)) = stats
        .iter()
        .filter(|(id, s)| **id != body_font && s.count <= 3 && s.pages.iter().any(|p| *p <= 3))
        .max_by(|(_, a), (_, b)| a.size.partial_cmp(&b.size).unwrap_or(std::cmp::Ordering::Equal))
    {
        roles.set(*title_id, FontRole::Title);
    }

    let heading1_size = heading_sizes.first().copied().unwrap_or(body_size);
    for fragment in fragments {
        let text = fragment.text.trim();
        let size = font_table.get(fragment.font_id).map(|s| s.size).unwrap_or(fragment.font_size);
        if size >= heading1_size {
            if text.eq_ignore_ascii_case("table of contents") {
                roles.set(fragment.font_id, FontRole::TocHeading);
            } else if text.eq_ignore_ascii_case("index") {
                roles.set(fragment.font_id, FontRole::IndexHeading);
            }
        }
    }

    roles
}

/// Whether `fragment`'s text is a single uppercase Latin letter — used to
/// exempt index alphabet headers from the Roman-numeral page-number filter.
fn is_single_uppercase_letter(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.chars().count() == 1 && trimmed.chars().next().map(|c| c.is_ascii_uppercase()).unwrap_or(false)
}

fn is_roman_numeral(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| "IVXLCDMivxlcdm".contains(c))
}

/// Pre-filter pass: drop running headers/footers repeated across enough
/// pages, print artefacts, invisible text, overflow text, and roman-numeral
/// page numbers confined to the top/bottom margin band.
pub fn prefilter_headers_footers(pages: &mut [Vec<Fragment>], config: &PipelineConfig) {
    let total_pages = pages.len().max(1) as u32;
    let min_pages = config
        .header_footer_min_pages
        .max((config.header_footer_min_page_fraction * total_pages as f32).ceil() as u32);

    let mut occurrence_pages: HashMap<(String, i32, i32), Vec<(usize, usize)>> = HashMap::new();
    for (page_idx, page) in pages.iter().enumerate() {
        for (frag_idx, fragment) in page.iter().enumerate() {
            if fragment.text.trim().chars().count() < 5 {
                continue;
            }
            if FIGURE_CAPTION.is_match(&fragment.text) || TABLE_CAPTION.is_match(&fragment.text) {
                continue;
            }
            let key = (
                fragment.text.trim().to_string(),
                ((fragment.top / fragment.page_height) * 100.0).round() as i32,
                ((fragment.left / fragment.page_width) * 100.0).round() as i32,
            );
            occurrence_pages.entry(key).or_default().push((page_idx, frag_idx));
        }
    }

    let mut to_drop: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
    for locations in occurrence_pages.values() {
        let distinct_pages: std::collections::HashSet<usize> = locations.iter().map(|(p, _)| *p).collect();
        if distinct_pages.len() as u32 >= min_pages {
            // Keep only the first occurrence; drop all the rest.
            for &(page_idx, frag_idx) in locations.iter().skip(1) {
                to_drop.insert((page_idx, frag_idx));
            }
        }
    }

    for (page_idx, page) in pages.iter_mut().enumerate() {
        let mut keep = vec![true; page.len()];
        for (frag_idx, fragment) in page.iter().enumerate() {
            if to_drop.contains(&(page_idx, frag_idx)) {
                keep[frag_idx] = false;
                continue;
            }
            if fragment.text.ends_with(".indd") {
                keep[frag_idx] = false;
                continue;
            }
            if fragment.height < config.invisible_text_max_height {
                keep[frag_idx] = false;
                continue;
            }
            if fragment.top > 1.05 * fragment.page_height {
                keep[frag_idx] = false;
                continue;
            }
            if is_roman_numeral(&fragment.text) && !is_single_uppercase_letter(&fragment.text) {
                let top_fraction = fragment.top / fragment.page_height;
                let bottom_fraction = (fragment.top + fragment.height) / fragment.page_height;
                let in_margin = top_fraction <= config.page_number_zone_fraction
                    || bottom_fraction >= 1.0 - config.page_number_zone_fraction;
                if in_margin {
                    keep[frag_idx] = false;
                }
            }
        }
        let mut iter = keep.into_iter();
        page.retain(|_| iter.next().unwrap_or(true));
    }
}

fn inline_from_original(text: String, font: FontId, size: f32) -> Inline {
    Inline::Phrase { text, font, size }
}

fn para_to_doc_para(p: &Paragraph) -> Para {
    let mut inlines = Vec::new();
    for fragment in &p.fragments {
        for original in &fragment.original_fragments {
            inlines.push(inline_from_original(original.text.clone(), fragment.font_id, fragment.font_size));
        }
    }
    if inlines.is_empty() {
        inlines.push(inline_from_original(p.text(), p.font_id(), p.font_size()));
    }
    Para { inlines }
}

/// State carried across the label pass for a TOC or Index section that is
/// currently open.
#[derive(Clone, Copy, PartialEq, Eq)]
enum OpenSection {
    None,
    Toc,
    Index,
}

/// One item in the page-ordered paragraph/media stream the label pass walks.
/// Interleaving the two (rather than labelling all paragraphs first and
/// appending media afterward) is what lets a figure land inside the chapter
/// that was open at its own page/position instead of always chapter 0.
enum StreamItem {
    Para(Paragraph),
    Media(MediaRegion),
}

fn stream_position(item: &StreamItem) -> (u32, f32) {
    match item {
        StreamItem::Para(p) => (p.page(), p.fragments[0].reading_order_index.unwrap_or(0) as f32),
        StreamItem::Media(m) => (m.page, m.reading_order_index.unwrap_or(0.0)),
    }
}

/// A caption paragraph matching `Figure N.` / `Table N.` anywhere in the
/// document, for the given media kind. Searched document-wide rather than
/// chapter-local since a figure can land in the stream before its caption
/// paragraph does.
fn find_caption(paragraphs: &[Paragraph], kind: MediaKind) -> Option<Para> {
    let pattern: &Regex = if kind == MediaKind::Table { &TABLE_CAPTION } else { &FIGURE_CAPTION };
    paragraphs.iter().find(|p| pattern.is_match(p.text().trim())).map(para_to_doc_para)
}

fn media_to_block(region: MediaRegion, caption: Option<Para>) -> Block {
    match region.kind {
        MediaKind::Table => {
            let mut by_row: HashMap<u32, Vec<(u32, String)>> = HashMap::new();
            for cell in &region.cells {
                by_row.entry(cell.row).or_default().push((cell.col, cell.text.clone()));
            }
            let mut row_indices: Vec<u32> = by_row.keys().copied().collect();
            row_indices.sort_unstable();
            let rows = row_indices
                .into_iter()
                .map(|r| {
                    let mut cells = by_row.remove(&r).unwrap_or_default();
                    cells.sort_by_key(|(c, _)| *c);
                    cells.into_iter().map(|(_, text)| text).collect()
                })
                .collect();
            Block::Table(TableEl { rows, caption })
        }
        MediaKind::Raster | MediaKind::Vector => Block::Figure(Figure {
            resource_id: region.source_id,
            caption,
        }),
    }
}

/// Label the final paragraph + media stream into the output document tree.
pub fn label_document(paragraphs: Vec<Paragraph>, media: Vec<MediaRegion>, roles: &FontRoleTable) -> DocumentTree {
    let caption_pool = paragraphs.clone();

    let mut stream: Vec<StreamItem> =
        paragraphs.into_iter().map(StreamItem::Para).chain(media.into_iter().map(StreamItem::Media)).collect();
    stream.sort_by(|a, b| {
        let (page_a, order_a) = stream_position(a);
        let (page_b, order_b) = stream_position(b);
        page_a.cmp(&page_b).then(order_a.partial_cmp(&order_b).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut tree = DocumentTree::new();
    let mut current_chapter: Option<Chapter> = None;
    let mut open_list: Option<ListEl> = None;
    let mut open_section = OpenSection::None;
    let mut section_font_size: f32 = f32::MAX;

    let flush_list = |chapter: &mut Chapter, list: &mut Option<ListEl>| {
        if let Some(list) = list.take() {
            chapter.blocks.push(Block::List(list));
        }
    };

    for item in stream {
        let paragraph = match item {
            StreamItem::Media(region) => {
                if current_chapter.is_none() {
                    current_chapter = Some(Chapter::default());
                }
                let chapter = current_chapter.as_mut().expect("just ensured Some");
                flush_list(chapter, &mut open_list);
                let caption = find_caption(&caption_pool, region.kind);
                chapter.blocks.push(media_to_block(region, caption));
                continue;
            }
            StreamItem::Para(paragraph) => paragraph,
        };

        let role = roles.role_of(paragraph.font_id());
        let text = paragraph.text();

        if role == FontRole::Title && tree.title.is_none() {
            tree.title = Some(para_to_doc_para(&paragraph));
            continue;
        }

        if current_chapter.is_none() {
            current_chapter = Some(Chapter::default());
        }
        let chapter = current_chapter.as_mut().expect("just ensured Some");

        if role == FontRole::TocHeading {
            flush_list(chapter, &mut open_list);
            open_section = OpenSection::Toc;
            section_font_size = paragraph.font_size();
            chapter.blocks.push(Block::Section {
                depth: 1,
                title: para_to_doc_para(&paragraph),
                body: Vec::new(),
            });
            continue;
        }
        if role == FontRole::IndexHeading {
            flush_list(chapter, &mut open_list);
            open_section = OpenSection::Index;
            section_font_size = paragraph.font_size();
            chapter.blocks.push(Block::Section {
                depth: 1,
                title: para_to_doc_para(&paragraph),
                body: Vec::new(),
            });
            continue;
        }

        match open_section {
            OpenSection::Toc if paragraph.font_size() < section_font_size => {
                chapter.blocks.push(Block::TocEntry(para_to_doc_para(&paragraph)));
                continue;
            }
            OpenSection::Index if is_single_uppercase_letter(text.trim()) => {
                chapter
                    .blocks
                    .push(Block::AlphabetHeader(text.trim().chars().next().unwrap_or('?')));
                continue;
            }
            OpenSection::Index if paragraph.font_size() < section_font_size => {
                chapter.blocks.push(Block::IndexEntry(para_to_doc_para(&paragraph)));
                continue;
            }
            _ => {
                open_section = OpenSection::None;
            }
        }

        if CHAPTER_PATTERN.is_match(text.trim()) {
            flush_list(chapter, &mut open_list);
            if let Some(finished) = current_chapter.take() {
                if !finished.blocks.is_empty() || finished.title.is_some() {
                    tree.chapters.push(finished);
                }
            }
            let mut new_chapter = Chapter::default();
            new_chapter.title = Some(para_to_doc_para(&paragraph));
            current_chapter = Some(new_chapter);
            continue;
        }

        if let FontRole::Heading(level) = role {
            flush_list(chapter, &mut open_list);
            chapter.blocks.push(Block::Section {
                depth: level,
                title: para_to_doc_para(&paragraph),
                body: Vec::new(),
            });
            continue;
        }

        if paragraph.is_list_item || starts_with_bullet(&text) {
            let item = para_to_doc_para(&paragraph);
            match open_list.as_mut() {
                Some(list) => list.items.push(item),
                None => {
                    open_list = Some(ListEl { items: vec![item] });
                }
            }
            continue;
        }
        flush_list(chapter, &mut open_list);
        chapter.blocks.push(Block::Para(para_to_doc_para(&paragraph)));
    }

    if let Some(mut chapter) = current_chapter.take() {
        flush_list(&mut chapter, &mut open_list);
        tree.chapters.push(chapter);
    }

    if tree.chapters.is_empty() {
        tree.chapters.push(Chapter::default());
    }

    tree.book_info = BookInfo::default();
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontSpec;
    use crate::fragment::RawFragment;

    fn raw_fragment(page: u32, id: u32, top: f32, left: f32, size: f32, text: &str) -> Fragment {
        let mut f = Fragment::from_raw(
            page,
            612.0,
            792.0,
            RawFragment {
                stream_index: id,
                left,
                top,
                width: 200.0,
                height: size,
                text: text.to_string(),
                font_id: FontId(id),
                bold: false,
                italic: false,
            },
        );
        f.font_size = size;
        f
    }

    #[test]
    fn test_body_font_is_largest_weighted_count_in_range() {
        let mut fragments = Vec::new();
        for i in 0..20 {
            fragments.push(raw_fragment(1, 1, 100.0 + i as f32, 50.0, 10.0, "body text"));
        }
        fragments.push(raw_fragment(1, 2, 50.0, 50.0, 24.0, "Title"));

        let mut table = FontSpecTable::new();
        table.insert(
            FontId(1),
            FontSpec {
                size: 10.0,
                family: "Body".into(),
                color: (0, 0, 0),
                weight: Default::default(),
                italic: false,
            },
        );
        table.insert(
            FontId(2),
            FontSpec {
                size: 24.0,
                family: "Title".into(),
                color: (0, 0, 0),
                weight: Default::default(),
                italic: false,
            },
        );

        let config = PipelineConfig::default();
        let roles = derive_font_roles(&fragments, &table, &config);
        assert_eq!(roles.role_of(FontId(1)), FontRole::Body);
    }

    #[test]
    fn test_index_alphabet_header_is_preserved_not_dropped() {
        // Scenario 6: a single "C" near the top/bottom margin used to be
        // indistinguishable from a roman-numeral page number; the
        // single-uppercase-letter exemption keeps it.
        let mut fragment = raw_fragment(5, 1, 40.0, 300.0, 14.0, "C");
        fragment.page_height = 792.0;
        let mut pages = vec![vec![fragment]];
        let config = PipelineConfig::default();
        prefilter_headers_footers(&mut pages, &config);
        assert_eq!(pages[0].len(), 1);
    }

    #[test]
    fn test_roman_numeral_page_number_in_margin_is_dropped() {
        let mut fragment = raw_fragment(5, 1, 20.0, 300.0, 10.0, "xii");
        fragment.page_height = 792.0;
        let mut pages = vec![vec![fragment]];
        let config = PipelineConfig::default();
        prefilter_headers_footers(&mut pages, &config);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_repeated_header_dropped_after_first_occurrence() {
        let mut pages: Vec<Vec<Fragment>> = Vec::new();
        for page in 1..=15u32 {
            pages.push(vec![raw_fragment(page, 1, 20.0, 50.0, 10.0, "Running Header Text")]);
        }
        let config = PipelineConfig::default();
        prefilter_headers_footers(&mut pages, &config);
        assert_eq!(pages[0].len(), 1);
        assert!(pages[1].is_empty());
    }

    #[test]
    fn test_missing_chapter_markers_yield_single_implicit_chapter() {
        let mut roles = FontRoleTable::new();
        roles.set(FontId(1), FontRole::Body);
        let p = Paragraph {
            id: 1,
            fragments: vec![raw_fragment(1, 1, 100.0, 50.0, 10.0, "Plain body text.")],
            is_list_item: false,
        };
        let tree = label_document(vec![p], Vec::new(), &roles);
        assert_eq!(tree.chapters.len(), 1);
    }
}
