//! Media regions (raster images, vector clusters, tables) and the media
//! resolver: per-page deduplication and placement into the reading order.

use crate::fragment::Fragment;
use crate::geometry::Rect;
use crate::pipeline::config::PipelineConfig;

/// What kind of content a media region captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Raster,
    Vector,
    Table,
}

/// One cell of a table region.
#[derive(Debug, Clone)]
pub struct TableCell {
    pub row: u32,
    pub col: u32,
    pub text: String,
    pub bbox: Rect,
}

/// A raster image, vector cluster, or table region on a page.
#[derive(Debug, Clone)]
pub struct MediaRegion {
    pub page: u32,
    pub bbox: Rect,
    pub kind: MediaKind,
    /// Stable identifier used by the reference mapper.
    pub source_id: String,
    /// Populated only for `kind == Table`.
    pub cells: Vec<TableCell>,

    pub reading_order_index: Option<f32>,
    pub reading_block: Option<u32>,
    pub caption_paragraph_id: Option<u32>,
    pub skipped_duplicate: bool,
}

impl MediaRegion {
    pub fn new(page: u32, bbox: Rect, kind: MediaKind, source_id: impl Into<String>) -> Self {
        Self {
            page,
            bbox,
            kind,
            source_id: source_id.into(),
            cells: Vec::new(),
            reading_order_index: None,
            reading_block: None,
            caption_paragraph_id: None,
            skipped_duplicate: false,
        }
    }

    /// Fraction of this region's first column that is a single character or
    /// a bullet glyph — used to reject bullet lists mis-detected as tables.
    fn first_column_bullet_fraction(&self) -> f32 {
        let max_col = self.cells.iter().map(|c| c.col).max();
        let Some(first_col) = max_col.map(|_| 0u32) else {
            return 0.0;
        };
        let first_col_cells: Vec<&TableCell> = self.cells.iter().filter(|c| c.col == first_col).collect();
        if first_col_cells.is_empty() {
            return 0.0;
        }
        let bullet_like = first_col_cells
            .iter()
            .filter(|c| {
                let t = c.text.trim();
                t.chars().count() <= 1 || crate::paragraph::starts_with_bullet(t)
            })
            .count();
        bullet_like as f32 / first_col_cells.len() as f32
    }

    fn column_count(&self) -> u32 {
        self.cells.iter().map(|c| c.col).max().map(|m| m + 1).unwrap_or(0)
    }
}

/// Drop vectors that duplicate a table or raster, reject bullet-list tables,
/// and dedup near-identical table regions, per the ordered rules in the
/// design.
pub fn dedup_media(mut regions: Vec<MediaRegion>, config: &PipelineConfig) -> Vec<MediaRegion> {
    let tables: Vec<Rect> = regions.iter().filter(|r| r.kind == MediaKind::Table).map(|r| r.bbox).collect();
    let rasters: Vec<Rect> = regions.iter().filter(|r| r.kind == MediaKind::Raster).map(|r| r.bbox).collect();

    regions.retain(|r| {
        if r.kind != MediaKind::Vector {
            return true;
        }
        let overlaps_table = tables.iter().any(|t| r.bbox.iou(t) > config.vector_table_iou_threshold);
        let overlaps_raster = rasters.iter().any(|raster| r.bbox.iou(raster) > config.vector_raster_iou_threshold);
        let envelops_raster = rasters
            .iter()
            .any(|raster| r.bbox.containment_of(raster) > config.raster_in_vector_containment);
        !(overlaps_table || overlaps_raster || envelops_raster)
    });

    // Reject bullet-list mis-detections before table dedup.
    regions.retain(|r| {
        if r.kind != MediaKind::Table {
            return true;
        }
        !(r.column_count() >= 2 && r.first_column_bullet_fraction() > config.bullet_table_first_column_fraction)
    });

    // Table dedup: two regions are duplicates iff IoU exceeds the primary
    // threshold, or (centroid distance is small AND IoU exceeds the looser
    // secondary threshold). Keep the first of each duplicate group.
    let mut keep = vec![true; regions.len()];
    for i in 0..regions.len() {
        if regions[i].kind != MediaKind::Table || !keep[i] {
            continue;
        }
        for j in (i + 1)..regions.len() {
            if regions[j].kind != MediaKind::Table || !keep[j] {
                continue;
            }
            let iou = regions[i].bbox.iou(&regions[j].bbox);
            let centroid_a = regions[i].bbox.center();
            let centroid_b = regions[j].bbox.center();
            let centroid_distance = crate::geometry::euclidean_distance(&centroid_a, &centroid_b);
            let duplicate = iou > config.table_dedup_iou_threshold
                || (centroid_distance < config.table_dedup_centroid_distance && iou > config.table_dedup_secondary_iou);
            if duplicate {
                keep[j] = false;
            }
        }
    }
    let mut iter = keep.into_iter();
    regions.retain(|_| iter.next().unwrap_or(true));

    regions
}

/// Assign reading-order positions to surviving media: each region is placed
/// just after the nearest fragment above it by bottom edge. Fragments whose
/// centre falls inside a region are removed only when their combined area
/// is a small fraction of the region's own area — otherwise the overlap is
/// coincidental (a caption or body line under an oversized vector bbox) and
/// the fragments are kept.
pub fn place_media(regions: &mut [MediaRegion], fragments: &mut Vec<Fragment>, config: &PipelineConfig) {
    for region in regions.iter_mut() {
        let nearest_above = fragments
            .iter()
            .filter(|f| f.page == region.page && f.baseline() <= region.bbox.top())
            .min_by(|a, b| {
                (region.bbox.top() - a.baseline())
                    .partial_cmp(&(region.bbox.top() - b.baseline()))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

        match nearest_above {
            Some(anchor) => {
                region.reading_order_index = Some(anchor.reading_order_index.unwrap_or(0) as f32 + 0.5);
                region.reading_block = anchor.reading_block;
            }
            None => {
                region.reading_order_index = Some(0.5);
                region.reading_block = Some(0);
            }
        }
    }

    let mut drop = vec![false; fragments.len()];
    for region in regions.iter() {
        let region_area = region.bbox.width.max(0.0) * region.bbox.height.max(0.0);
        if region_area <= 0.0 {
            continue;
        }
        let captured: Vec<usize> = fragments
            .iter()
            .enumerate()
            .filter(|(_, f)| f.page == region.page && region.bbox.contains_point(&f.bbox().center()))
            .map(|(i, _)| i)
            .collect();
        if captured.is_empty() {
            continue;
        }
        let captured_area: f32 = captured.iter().map(|&i| fragments[i].width.max(0.0) * fragments[i].height.max(0.0)).sum();
        if captured_area <= config.media_capture_area_fraction * region_area {
            for i in captured {
                drop[i] = true;
            }
        }
    }

    let mut iter = drop.into_iter();
    fragments.retain(|_| !iter.next().unwrap_or(false));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(kind: MediaKind, bbox: Rect, id: &str) -> MediaRegion {
        MediaRegion::new(1, bbox, kind, id)
    }

    #[test]
    fn test_vector_enveloping_two_rasters_is_dropped() {
        // Scenario 4: vector V encloses raster A and B; IoU with either is
        // low, but containment of each raster by V is 1.0.
        let a = region(MediaKind::Raster, Rect::new(100.0, 100.0, 300.0, 300.0), "raster-a");
        let b = region(MediaKind::Raster, Rect::new(450.0, 100.0, 300.0, 300.0), "raster-b");
        let v = region(MediaKind::Vector, Rect::new(50.0, 80.0, 750.0, 370.0), "vector-v");

        let config = PipelineConfig::default();
        let survivors = dedup_media(vec![a, b, v], &config);

        assert_eq!(survivors.len(), 2);
        assert!(survivors.iter().all(|r| r.kind == MediaKind::Raster));
    }

    #[test]
    fn test_vector_overlapping_table_is_dropped() {
        let t = region(MediaKind::Table, Rect::new(100.0, 100.0, 200.0, 200.0), "table-1");
        let v = region(MediaKind::Vector, Rect::new(100.0, 100.0, 200.0, 200.0), "vector-1");
        let config = PipelineConfig::default();
        let survivors = dedup_media(vec![t, v], &config);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].kind, MediaKind::Table);
    }

    #[test]
    fn test_near_duplicate_tables_are_merged() {
        let t1 = region(MediaKind::Table, Rect::new(100.0, 100.0, 200.0, 100.0), "table-1");
        let t2 = region(MediaKind::Table, Rect::new(105.0, 102.0, 200.0, 100.0), "table-2");
        let config = PipelineConfig::default();
        let survivors = dedup_media(vec![t1, t2], &config);
        assert_eq!(survivors.len(), 1);
    }

    #[test]
    fn test_bullet_list_table_is_rejected() {
        let mut t = region(MediaKind::Table, Rect::new(0.0, 0.0, 200.0, 100.0), "fake-table");
        for row in 0..4 {
            t.cells.push(TableCell {
                row,
                col: 0,
                text: "•".to_string(),
                bbox: Rect::new(0.0, row as f32 * 20.0, 10.0, 15.0),
            });
            t.cells.push(TableCell {
                row,
                col: 1,
                text: "an item of text".to_string(),
                bbox: Rect::new(15.0, row as f32 * 20.0, 180.0, 15.0),
            });
        }
        let config = PipelineConfig::default();
        let survivors = dedup_media(vec![t], &config);
        assert!(survivors.is_empty());
    }
}
