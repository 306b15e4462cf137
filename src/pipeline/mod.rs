//! The pipeline driver: wires the fragment layout engine, column resolver,
//! reading-order assigner, media resolver, paragraph grouper, and semantic
//! labeller into a per-page + document-wide two-phase process.

pub mod collaborators;
pub mod config;

use crate::document_tree::DocumentTree;
use crate::error::Result;
use crate::font::FontSpecTable;
use crate::fragment::Fragment;
use crate::layout::{column_detector, fragment_engine, reading_order};
use crate::media::{self, MediaRegion};
use crate::paragraph::{self, Paragraph};
use crate::reference_mapper::ReferenceMapper;
use collaborators::{FragmentSource, MediaSource};
use config::PipelineConfig;

/// Everything produced by running one page through the per-page stages.
#[derive(Debug, Clone, Default)]
pub struct PageBundle {
    pub page: u32,
    pub fragments: Vec<Fragment>,
    pub media: Vec<MediaRegion>,
}

/// Owns the document-wide mutable state (the reference mapper and the font
/// table) and drives fragments through the per-page and document-wide
/// stages.
pub struct Pipeline {
    config: PipelineConfig,
    font_table: FontSpecTable,
    reference_mapper: ReferenceMapper,
    next_paragraph_id: u32,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, font_table: FontSpecTable) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            font_table,
            reference_mapper: ReferenceMapper::new(),
            next_paragraph_id: 0,
        })
    }

    pub fn reference_mapper(&self) -> &ReferenceMapper {
        &self.reference_mapper
    }

    pub fn reference_mapper_mut(&mut self) -> &mut ReferenceMapper {
        &mut self.reference_mapper
    }

    /// Run one page through the fragment layout engine, column resolver,
    /// reading-order assigner, and media resolver.
    pub fn process_page(&mut self, source: &(impl FragmentSource + MediaSource), page: u32) -> Result<PageBundle> {
        let (page_width, page_height) = source.page_size(page);
        let raw_fragments = source.fragments(page);
        log::debug!("page {page}: {} raw fragments", raw_fragments.len());

        let mut fragments: Vec<Fragment> = raw_fragments
            .into_iter()
            .map(|raw| {
                let font_id = raw.font_id;
                let mut fragment = Fragment::from_raw(page, page_width, page_height, raw);
                fragment.font_size = self.font_table.get(font_id).map(|s| s.size).unwrap_or(fragment.height);
                fragment
            })
            .collect();

        fragments = fragment_engine::run_fragment_engine(fragments, &self.config);
        column_detector::assign_columns(&mut fragments, &self.config);
        reading_order::assign_reading_order(&mut fragments);

        let mut regions: Vec<MediaRegion> = source
            .media(page)
            .into_iter()
            .map(|raw| {
                let mut region = MediaRegion::new(page, raw.bbox, raw.kind, raw.source_id.clone());
                region.cells = raw.cells;
                self.reference_mapper.add_resource(
                    raw.source_id,
                    format!("page{page:04}_{}", region.bbox.x as i64),
                    match raw.kind {
                        crate::media::MediaKind::Raster => crate::reference_mapper::ResourceKind::Raster,
                        crate::media::MediaKind::Vector => crate::reference_mapper::ResourceKind::Vector,
                        crate::media::MediaKind::Table => crate::reference_mapper::ResourceKind::Table,
                    },
                    page,
                    raw.bbox,
                );
                region
            })
            .collect();
        regions = media::dedup_media(regions, &self.config);
        media::place_media(&mut regions, &mut fragments, &self.config);

        Ok(PageBundle {
            page,
            fragments,
            media: regions,
        })
    }

    /// Run the document-wide passes over every page's bundle: header/footer
    /// filtering, font-role derivation, paragraph grouping + cross-page
    /// merge, and final semantic labelling.
    pub fn finalize(&mut self, pages: Vec<PageBundle>) -> Result<DocumentTree> {
        let mut per_page_fragments: Vec<Vec<Fragment>> = pages.iter().map(|p| p.fragments.clone()).collect();
        crate::semantic::prefilter_headers_footers(&mut per_page_fragments, &self.config);

        let all_fragments: Vec<Fragment> = per_page_fragments.iter().flatten().cloned().collect();
        let roles = crate::semantic::derive_font_roles(&all_fragments, &self.font_table, &self.config);
        log::info!(
            "derived font roles from {} fragments across {} pages",
            all_fragments.len(),
            per_page_fragments.len()
        );

        let mut paragraphs: Vec<Paragraph> = Vec::new();
        for page_fragments in per_page_fragments {
            let page_paragraphs = paragraph::group_paragraphs(page_fragments, &mut self.next_paragraph_id, &self.config);
            paragraphs.extend(page_paragraphs);
        }
        let paragraphs = paragraph::merge_cross_page(paragraphs);

        let media: Vec<MediaRegion> = pages.into_iter().flat_map(|p| p.media).collect();
        let tree = crate::semantic::label_document(paragraphs, media, &roles);

        for id in tree.referenced_resource_ids() {
            if self.reference_mapper.resolve(&id).is_err() {
                log::warn!("resource {id} referenced by the document tree has no final name yet");
            }
        }

        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontId;
    use crate::fragment::RawFragment;
    use collaborators::{InMemoryDocument, InMemoryPage};

    fn doc_with_one_page() -> InMemoryDocument {
        InMemoryDocument {
            pages: vec![InMemoryPage {
                width: 612.0,
                height: 792.0,
                fragments: vec![RawFragment {
                    stream_index: 0,
                    left: 50.0,
                    top: 100.0,
                    width: 200.0,
                    height: 12.0,
                    text: "Plain body text.".to_string(),
                    font_id: FontId(1),
                    bold: false,
                    italic: false,
                }],
                media: Vec::new(),
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_process_page_then_finalize_produces_one_chapter() {
        let doc = doc_with_one_page();
        let mut pipeline = Pipeline::new(PipelineConfig::default(), FontSpecTable::new()).unwrap();
        let bundle = pipeline.process_page(&doc, 1).unwrap();
        assert_eq!(bundle.fragments.len(), 1);

        let tree = pipeline.finalize(vec![bundle]).unwrap();
        assert_eq!(tree.chapters.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = PipelineConfig::default();
        config.full_width_fraction = 2.0;
        assert!(Pipeline::new(config, FontSpecTable::new()).is_err());
    }
}
