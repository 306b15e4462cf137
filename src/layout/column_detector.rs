//! Column resolver: per-page detection of column structure and assignment
//! of a column id to every fragment.
//!
//! Column id `0` means full-width; `1..N` numbers columns left to right.
//! Single-column pages are assigned column id `1`, never `0`.

use crate::fragment::Fragment;
use crate::pipeline::config::PipelineConfig;

/// One detected column start: the cluster centre and how many unique
/// baselines back it.
#[derive(Debug, Clone, Copy)]
struct ColumnCluster {
    center: f32,
    baseline_count: u32,
}

/// Cluster fragment `left` coordinates one-dimensionally with the configured
/// tolerance, discarding clusters that don't span enough unique baselines to
/// count as a real column start.
fn cluster_column_starts(fragments: &[Fragment], config: &PipelineConfig) -> Vec<ColumnCluster> {
    let mut lefts: Vec<f32> = fragments.iter().map(|f| f.left).collect();
    lefts.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mut raw_clusters: Vec<Vec<f32>> = Vec::new();
    for left in lefts {
        match raw_clusters.last_mut() {
            Some(cluster) if (left - cluster[cluster.len() - 1]).abs() <= config.column_cluster_tolerance => {
                cluster.push(left);
            }
            _ => raw_clusters.push(vec![left]),
        }
    }

    raw_clusters
        .into_iter()
        .filter_map(|cluster| {
            let center = cluster.iter().sum::<f32>() / cluster.len() as f32;
            let baseline_count = fragments
                .iter()
                .filter(|f| (f.left - center).abs() <= config.column_cluster_tolerance)
                .map(|f| (f.baseline() * 100.0) as i64)
                .collect::<std::collections::HashSet<_>>()
                .len() as u32;
            if baseline_count >= config.column_min_cluster_height {
                Some(ColumnCluster { center, baseline_count })
            } else {
                None
            }
        })
        .collect()
}

fn is_single_column(
    fragments: &[Fragment],
    clusters: &[ColumnCluster],
    page_width: f32,
    config: &PipelineConfig,
) -> bool {
    if clusters.len() <= 1 {
        return true;
    }

    let dominant = clusters
        .iter()
        .max_by_key(|c| c.baseline_count)
        .expect("non-empty clusters checked above");
    let aligned = fragments
        .iter()
        .filter(|f| (f.left - dominant.center).abs() <= config.column_cluster_tolerance)
        .count();
    if fragments.is_empty() {
        return true;
    }
    if aligned as f32 / fragments.len() as f32 >= config.single_column_alignment_fraction {
        return true;
    }

    // Pathological weaving: a naive width-based first pass produces more
    // than the configured number of 0<->1 transitions in left-to-right,
    // top-to-bottom order.
    let mut ordered: Vec<&Fragment> = fragments.iter().collect();
    ordered.sort_by(|a, b| {
        a.baseline()
            .partial_cmp(&b.baseline())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal))
    });
    let naive_ids: Vec<u32> = ordered
        .iter()
        .map(|f| if f.width >= config.full_width_fraction * page_width { 0 } else { 1 })
        .collect();
    let transitions = naive_ids.windows(2).filter(|w| w[0] != w[1]).count() as u32;
    transitions > config.single_column_max_weave_transitions
}

/// Compute the boundary midpoints between sorted cluster centres, with the
/// outer boundaries extended to infinity.
fn boundaries(centers: &[f32]) -> Vec<f32> {
    let mut b = vec![f32::NEG_INFINITY];
    for w in centers.windows(2) {
        b.push((w[0] + w[1]) / 2.0);
    }
    b.push(f32::INFINITY);
    b
}

fn assign_multi_column(fragments: &mut [Fragment], col_starts: &[f32], page_width: f32, config: &PipelineConfig) {
    let bounds = boundaries(col_starts);

    for fragment in fragments.iter_mut() {
        let left = fragment.left;
        let right = fragment.left + fragment.width;

        let spans_page = left <= 0.05 * page_width && right >= 0.95 * page_width;
        let is_wide = fragment.width >= config.full_width_fraction * page_width;

        fragment.column_id = Some(if spans_page || is_wide {
            0
        } else {
            let mut id = col_starts.len() as u32;
            for i in 0..col_starts.len() {
                if left >= bounds[i] && left < bounds[i + 1] {
                    id = (i + 1) as u32;
                    break;
                }
            }
            id
        });
    }

    propagate_footnote_zone(fragments, config);
}

/// Footnote-zone propagation: in the bottom band of the page, allow column
/// id `0` to spread from a wide fragment to vertically adjacent narrow
/// continuation lines, with a more lenient width requirement than elsewhere
/// on the page.
fn propagate_footnote_zone(fragments: &mut [Fragment], config: &PipelineConfig) {
    let footnote_top = config.footnote_zone_top_fraction * fragments.first().map(|f| f.page_height).unwrap_or(0.0);

    let mut indices: Vec<usize> = (0..fragments.len()).collect();
    indices.sort_by(|&a, &b| {
        fragments[a]
            .baseline()
            .partial_cmp(&fragments[b].baseline())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for w in indices.windows(2) {
        let (prev_idx, curr_idx) = (w[0], w[1]);
        if fragments[curr_idx].top < footnote_top {
            continue;
        }
        let prev_is_wide = fragments[prev_idx].column_id == Some(0);
        if !prev_is_wide {
            continue;
        }
        let line_height = fragments[prev_idx].height.max(1.0);
        let gap = fragments[curr_idx].top - fragments[prev_idx].baseline();
        if gap >= 0.0 && gap <= 1.5 * line_height {
            fragments[curr_idx].column_id = Some(0);
        }
    }
}

/// Find maximal runs of identical column id in reading order and reassign
/// any run shorter than the configured minimum, sandwiched between two runs
/// of the same other id and not containing a full-width fragment, to the
/// surrounding id.
fn smooth_transitions(fragments: &mut [Fragment], page_width: f32, config: &PipelineConfig) {
    let mut order: Vec<usize> = (0..fragments.len()).collect();
    order.sort_by(|&a, &b| {
        fragments[a]
            .baseline()
            .partial_cmp(&fragments[b].baseline())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(fragments[a].left.partial_cmp(&fragments[b].left).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut runs: Vec<(u32, Vec<usize>)> = Vec::new();
    for idx in order {
        let col = fragments[idx].column_id.unwrap_or(0);
        match runs.last_mut() {
            Some((id, members)) if *id == col => members.push(idx),
            _ => runs.push((col, vec![idx])),
        }
    }

    for i in 1..runs.len().saturating_sub(1) {
        let (prev_id, _) = &runs[i - 1];
        let (curr_id, curr_members) = &runs[i];
        let (next_id, _) = &runs[i + 1];
        if prev_id != next_id || curr_id == prev_id {
            continue;
        }
        if curr_members.len() as u32 >= config.transition_smoothing_min_run {
            continue;
        }
        let has_full_width = curr_members.iter().any(|&idx| fragments[idx].width >= 0.6 * page_width);
        if has_full_width {
            continue;
        }
        let replacement = *prev_id;
        for &idx in curr_members {
            fragments[idx].column_id = Some(replacement);
        }
    }
}

/// Assign every fragment on a page a column id, mutating in place. If `K =
/// 0` (no reliable clusters) or the single-column heuristic fires, every
/// fragment gets column id `1`.
pub fn assign_columns(fragments: &mut [Fragment], config: &PipelineConfig) {
    if fragments.is_empty() {
        return;
    }
    let page_width = fragments[0].page_width;

    let clusters = cluster_column_starts(fragments, config);
    if clusters.is_empty() || is_single_column(fragments, &clusters, page_width, config) {
        for fragment in fragments.iter_mut() {
            fragment.column_id = Some(1);
        }
        return;
    }

    let mut centers: Vec<f32> = clusters.iter().map(|c| c.center).collect();
    centers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    assign_multi_column(fragments, &centers, page_width, config);
    smooth_transitions(fragments, page_width, config);
}
