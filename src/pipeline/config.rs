//! Unified configuration for the reading-structure reconstruction pipeline.
//!
//! This module consolidates every tunable constant used by the core stages
//! (fragment layout, column resolution, reading order, media dedup,
//! paragraph grouping, and semantic labelling) into a single
//! [`PipelineConfig`], each field documented with its default and valid
//! domain. [`LayoutProfile`] offers a handful of presets that pre-tune the
//! gap/bullet/heading thresholds for broad document families, the way a
//! caller would otherwise have to hand-tune them per document.

use crate::error::{Error, Result};

/// Logging detail level for the pipeline. Controls the verbosity of
/// diagnostics written when the `logging` feature is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Error,
    #[default]
    Warn,
    Info,
    Debug,
}

/// Broad document-family presets that pre-tune the thresholds most sensitive
/// to layout style. Any field can still be overridden after picking a
/// preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutProfile {
    /// Balanced defaults; the right starting point when the document family
    /// is unknown.
    Generic,
    /// Dense multi-column text with footnotes and frequent full-width
    /// interrupters (figures, equations).
    Academic,
    /// Single-column narrative prose with few headings and long paragraphs.
    Novel,
}

impl LayoutProfile {
    pub fn create_config(&self) -> PipelineConfig {
        match self {
            Self::Generic => PipelineConfig::default(),
            Self::Academic => Self::academic_config(),
            Self::Novel => Self::novel_config(),
        }
    }

    fn academic_config() -> PipelineConfig {
        PipelineConfig {
            footnote_zone_top_fraction: 0.70,
            adaptive_gap_factor: 0.6,
            column_min_cluster_height: 10,
            ..PipelineConfig::default()
        }
    }

    fn novel_config() -> PipelineConfig {
        PipelineConfig {
            column_min_cluster_height: 30,
            single_column_alignment_fraction: 0.9,
            adaptive_gap_factor: 0.8,
            ..PipelineConfig::default()
        }
    }
}

/// Every tunable constant in the reading-structure pipeline, with documented
/// defaults matching the reference thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    // --- Fragment layout engine thresholds ---
    /// Script candidate width cap, in page units. Default 15.0.
    pub script_max_width: f32,
    /// Script candidate height cap, in page units. Default 12.0.
    pub script_max_height: f32,
    /// Script candidate maximum text length. Default 3.
    pub script_max_text_len: usize,
    /// Maximum horizontal gap to a script candidate's neighbour. Default 5.0.
    pub script_neighbor_gap: f32,
    /// A script candidate's height must be below this fraction of its
    /// neighbour's height. Default 0.75.
    pub script_height_ratio: f32,
    /// `top_diff` upper bound (inclusive) for superscript classification,
    /// lower bound is the negative of this value. Default 3.0.
    pub superscript_top_diff: f32,
    /// `top_diff` upper bound (inclusive) for subscript classification.
    /// Default 10.0.
    pub subscript_top_diff: f32,
    /// Same-row merge gap tolerance, in page units. Default 1.5.
    pub row_merge_gap_tolerance: f32,
    /// Row baseline grouping tolerance cap, in page units. Default 2.0; the
    /// effective tolerance is `min(this, 0.4 * median_line_spacing)`.
    pub row_baseline_tolerance_cap: f32,

    // --- Column resolver thresholds ---
    /// One-dimensional clustering tolerance for fragment `left` coordinates.
    /// Default 20.0.
    pub column_cluster_tolerance: f32,
    /// Minimum number of unique baselines a cluster must span to count as a
    /// real column start. Default 12.
    pub column_min_cluster_height: u32,
    /// Fraction of fragments that must align with the dominant cluster for
    /// the page to be treated as single-column. Default 0.80.
    pub single_column_alignment_fraction: f32,
    /// Maximum `0<->1` weave transitions tolerated before forcing
    /// single-column treatment. Default 5.
    pub single_column_max_weave_transitions: u32,
    /// Fraction of page width above which a fragment is treated as
    /// full-width regardless of column boundaries. Default 0.45.
    pub full_width_fraction: f32,
    /// Top fraction of the page below which footnote-zone full-width
    /// propagation rules apply. Default 0.75.
    pub footnote_zone_top_fraction: f32,
    /// Minimum run length (in fragments) a column-id run must reach to
    /// survive transition smoothing. Default 3.
    pub transition_smoothing_min_run: u32,

    // --- Media resolver thresholds ---
    /// IoU above which a vector is dropped as a table duplicate. Default 0.3.
    pub vector_table_iou_threshold: f32,
    /// IoU above which a vector is dropped as a raster duplicate. Default 0.3.
    pub vector_raster_iou_threshold: f32,
    /// `area(vector ∩ raster) / area(raster)` above which the raster is
    /// considered enveloped by the vector. Default 0.2.
    pub raster_in_vector_containment: f32,
    /// IoU above which two table regions are unconditionally duplicates.
    /// Default 0.5.
    pub table_dedup_iou_threshold: f32,
    /// Secondary table-dedup IoU threshold used alongside centroid distance.
    /// Default 0.1.
    pub table_dedup_secondary_iou: f32,
    /// Centroid distance (page units) paired with the secondary IoU
    /// threshold. Default 50.0.
    pub table_dedup_centroid_distance: f32,
    /// Fraction of single-character/bullet glyphs in a table's first column
    /// above which the candidate is rejected as a bullet list. Default 0.70.
    pub bullet_table_first_column_fraction: f32,
    /// A media region only swallows the fragments whose centre it contains
    /// when their combined area is no more than this fraction of the
    /// region's own area. Above it, the "containment" is treated as a
    /// coincidental overlap (e.g. a caption or body line under an oversized
    /// vector bbox) and the fragments are kept. Default 0.3.
    pub media_capture_area_fraction: f32,

    // --- Paragraph grouper thresholds ---
    /// Minimum point difference in font size that forces a new paragraph.
    /// Default 2.0.
    pub paragraph_size_break_threshold: f32,
    /// Multiplier on font size used to compute the adaptive vertical-gap
    /// threshold for paragraph breaks. Default 0.7.
    pub adaptive_gap_factor: f32,
    /// Multiplier on median line height used as the base gap threshold.
    /// Default 2.0.
    pub base_gap_line_height_factor: f32,
    /// Horizontal gap tolerance for merging a bullet glyph with its
    /// following text. Default 20.0.
    pub bullet_merge_gap_tolerance: f32,
    /// Minimum vertical gap above which a bullet-prefixed fragment forces a
    /// new paragraph. Default 2.0.
    pub bullet_new_paragraph_min_gap: f32,

    // --- Font-role & semantic labeller thresholds ---
    /// Font size range within which the body role is searched for.
    /// Default (8.0, 14.0).
    pub body_font_size_range: (f32, f32),
    /// Maximum number of distinct heading levels derived. Default 6.
    pub max_heading_levels: u8,
    /// Minimum page count (or fraction of total pages, whichever is larger)
    /// a repeated fragment must appear on to be treated as a running
    /// header/footer. Default 10 pages / 1% of pages.
    pub header_footer_min_pages: u32,
    pub header_footer_min_page_fraction: f32,
    /// Fragments with `height` below this are treated as invisible text and
    /// dropped. Default 6.0.
    pub invisible_text_max_height: f32,
    /// Top/bottom page fraction within which Roman-numeral page numbers are
    /// dropped. Default 0.08.
    pub page_number_zone_fraction: f32,

    pub log_level: LogLevel,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            script_max_width: 15.0,
            script_max_height: 12.0,
            script_max_text_len: 3,
            script_neighbor_gap: 5.0,
            script_height_ratio: 0.75,
            superscript_top_diff: 3.0,
            subscript_top_diff: 10.0,
            row_merge_gap_tolerance: 1.5,
            row_baseline_tolerance_cap: 2.0,

            column_cluster_tolerance: 20.0,
            column_min_cluster_height: 12,
            single_column_alignment_fraction: 0.80,
            single_column_max_weave_transitions: 5,
            full_width_fraction: 0.45,
            footnote_zone_top_fraction: 0.75,
            transition_smoothing_min_run: 3,

            vector_table_iou_threshold: 0.3,
            vector_raster_iou_threshold: 0.3,
            raster_in_vector_containment: 0.2,
            table_dedup_iou_threshold: 0.5,
            table_dedup_secondary_iou: 0.1,
            table_dedup_centroid_distance: 50.0,
            bullet_table_first_column_fraction: 0.70,
            media_capture_area_fraction: 0.3,

            paragraph_size_break_threshold: 2.0,
            adaptive_gap_factor: 0.7,
            base_gap_line_height_factor: 2.0,
            bullet_merge_gap_tolerance: 20.0,
            bullet_new_paragraph_min_gap: 2.0,

            body_font_size_range: (8.0, 14.0),
            max_heading_levels: 6,
            header_footer_min_pages: 10,
            header_footer_min_page_fraction: 0.01,
            invisible_text_max_height: 6.0,
            page_number_zone_fraction: 0.08,

            log_level: LogLevel::Warn,
        }
    }
}

impl PipelineConfig {
    /// Validate every field's domain, returning the first violation found.
    pub fn validate(&self) -> Result<()> {
        let checks: &[(bool, &str, f32, &str)] = &[
            (
                self.script_max_width > 0.0,
                "script_max_width",
                self.script_max_width,
                "positive",
            ),
            (
                self.script_max_height > 0.0,
                "script_max_height",
                self.script_max_height,
                "positive",
            ),
            (
                self.row_merge_gap_tolerance >= 0.0,
                "row_merge_gap_tolerance",
                self.row_merge_gap_tolerance,
                "non-negative",
            ),
            (
                self.column_cluster_tolerance > 0.0,
                "column_cluster_tolerance",
                self.column_cluster_tolerance,
                "positive",
            ),
            (
                (0.0..=1.0).contains(&self.single_column_alignment_fraction),
                "single_column_alignment_fraction",
                self.single_column_alignment_fraction,
                "in [0.0, 1.0]",
            ),
            (
                (0.0..=1.0).contains(&self.full_width_fraction),
                "full_width_fraction",
                self.full_width_fraction,
                "in [0.0, 1.0]",
            ),
            (
                (0.0..=1.0).contains(&self.footnote_zone_top_fraction),
                "footnote_zone_top_fraction",
                self.footnote_zone_top_fraction,
                "in [0.0, 1.0]",
            ),
            (
                (0.0..=1.0).contains(&self.vector_table_iou_threshold),
                "vector_table_iou_threshold",
                self.vector_table_iou_threshold,
                "in [0.0, 1.0]",
            ),
            (
                (0.0..=1.0).contains(&self.vector_raster_iou_threshold),
                "vector_raster_iou_threshold",
                self.vector_raster_iou_threshold,
                "in [0.0, 1.0]",
            ),
            (
                (0.0..=1.0).contains(&self.raster_in_vector_containment),
                "raster_in_vector_containment",
                self.raster_in_vector_containment,
                "in [0.0, 1.0]",
            ),
            (
                (0.0..=1.0).contains(&self.media_capture_area_fraction),
                "media_capture_area_fraction",
                self.media_capture_area_fraction,
                "in [0.0, 1.0]",
            ),
            (
                self.paragraph_size_break_threshold >= 0.0,
                "paragraph_size_break_threshold",
                self.paragraph_size_break_threshold,
                "non-negative",
            ),
            (
                self.body_font_size_range.0 <= self.body_font_size_range.1,
                "body_font_size_range",
                self.body_font_size_range.0,
                "lower bound <= upper bound",
            ),
            (
                self.max_heading_levels >= 1 && self.max_heading_levels <= 6,
                "max_heading_levels",
                self.max_heading_levels as f32,
                "in [1, 6]",
            ),
        ];

        for (ok, field, value, expected) in checks {
            if !ok {
                return Err(Error::ConfigOutOfRange {
                    field: field.to_string(),
                    value: value.to_string(),
                    expected: expected.to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_profile_presets_validate() {
        assert!(LayoutProfile::Academic.create_config().validate().is_ok());
        assert!(LayoutProfile::Novel.create_config().validate().is_ok());
        assert!(LayoutProfile::Generic.create_config().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_fraction_rejected() {
        let mut config = PipelineConfig::default();
        config.full_width_fraction = 1.5;
        let err = config.validate().unwrap_err();
        match err {
            Error::ConfigOutOfRange { field, .. } => assert_eq!(field, "full_width_fraction"),
            other => panic!("expected ConfigOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn test_negative_gap_tolerance_rejected() {
        let mut config = PipelineConfig::default();
        config.row_merge_gap_tolerance = -1.0;
        assert!(config.validate().is_err());
    }
}
