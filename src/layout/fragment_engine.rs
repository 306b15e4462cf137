//! Fragment layout engine: per-page merging of fragments on the same
//! baseline, and detection/folding of super- and subscripts.
//!
//! Runs as a four-phase pass over a single page's fragments: script
//! detection (on `top`, not baseline), row grouping (on baseline), same-row
//! merging, then cross-row script folding.

use crate::fragment::{Fragment, Row, ScriptType};
use crate::pipeline::config::PipelineConfig;

/// Glyphs a script candidate's text must not consist of even when its
/// geometry matches — these are symbols that are legitimately small and
/// offset without being a super/subscript of anything.
const SCRIPT_EXCLUSIONS: &[&str] = &[
    "°", "™", "®", "©", "•", "·", "½", "¼", "¾", "⅓", "⅔",
];

fn is_script_candidate(f: &Fragment, config: &PipelineConfig) -> bool {
    if f.width >= config.script_max_width
        || f.height >= config.script_max_height
        || f.text.chars().count() > config.script_max_text_len
    {
        return false;
    }
    if !f.text.chars().all(|c| c.is_alphanumeric()) {
        return false;
    }
    if SCRIPT_EXCLUSIONS.contains(&f.text.as_str()) {
        return false;
    }
    !f.text.is_empty()
}

/// Find the nearest non-candidate neighbour to `idx` on either side, by
/// horizontal gap, restricted to fragments whose vertical span is close
/// enough to plausibly anchor a script. Among every neighbour satisfying the
/// gap/height-ratio rule, the closest one wins; a tie (e.g. a script sitting
/// flush between its base and a following continuation, both at gap 0) is
/// broken in favour of the left/base neighbour rather than left ambiguous —
/// that matches how scripts actually sit relative to their base. Returns
/// `None` only when no neighbour satisfies the rule at all.
fn find_script_parent(fragments: &[Fragment], idx: usize, config: &PipelineConfig) -> Option<usize> {
    let candidate = &fragments[idx];
    let mut best: Option<(usize, f32, bool)> = None;

    for (j, other) in fragments.iter().enumerate() {
        if j == idx || is_script_candidate(other, config) {
            continue;
        }
        // Vertical ranges must be close enough that "adjacent" is meaningful.
        let vertical_gap = (candidate.top - other.top).abs();
        if vertical_gap > other.height.max(candidate.height) * 3.0 {
            continue;
        }
        let is_left = other.left + other.width <= candidate.left;
        let gap = if is_left {
            candidate.left - (other.left + other.width)
        } else if candidate.left + candidate.width <= other.left {
            other.left - (candidate.left + candidate.width)
        } else {
            continue;
        };
        if gap > config.script_neighbor_gap || candidate.height >= config.script_height_ratio * other.height {
            continue;
        }

        best = match best {
            None => Some((j, gap, is_left)),
            Some((_, best_gap, best_is_left)) if gap < best_gap - 1e-6 => Some((j, gap, is_left)),
            Some((_, best_gap, best_is_left)) if (gap - best_gap).abs() <= 1e-6 && is_left && !best_is_left => {
                Some((j, gap, is_left))
            }
            Some(existing) => Some(existing),
        };
    }

    best.map(|(j, _, _)| j)
}

/// Phase 1 — mark superscript/subscript candidates in place, by mutating
/// `is_script`, `script_type`, and `script_parent`.
fn detect_scripts(fragments: &mut [Fragment], config: &PipelineConfig) {
    let candidate_flags: Vec<bool> = fragments.iter().map(|f| is_script_candidate(f, config)).collect();
    let parents: Vec<Option<usize>> = (0..fragments.len())
        .map(|idx| {
            if candidate_flags[idx] {
                find_script_parent(fragments, idx, config)
            } else {
                None
            }
        })
        .collect();

    for (idx, parent_idx) in parents.into_iter().enumerate() {
        let Some(parent_idx) = parent_idx else { continue };
        let top_diff = fragments[idx].top - fragments[parent_idx].top;
        let script_type = if (-config.superscript_top_diff..=config.superscript_top_diff).contains(&top_diff) {
            Some(ScriptType::Super)
        } else if top_diff > config.superscript_top_diff && top_diff <= config.subscript_top_diff {
            Some(ScriptType::Sub)
        } else {
            None
        };
        if let Some(script_type) = script_type {
            let parent_stream_index = fragments[parent_idx].stream_index;
            let f = &mut fragments[idx];
            f.is_script = true;
            f.script_type = Some(script_type);
            f.script_parent = Some(parent_stream_index);
        }
    }
}

/// Phase 2 — sort by `(baseline, left)` and walk linearly, opening a new row
/// whenever the baseline drifts past tolerance.
fn group_rows(mut fragments: Vec<Fragment>, config: &PipelineConfig) -> Vec<Row> {
    fragments.sort_by(|a, b| {
        a.baseline()
            .partial_cmp(&b.baseline())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal))
    });

    let tolerance = row_baseline_tolerance(&fragments, config);

    let mut rows: Vec<Row> = Vec::new();
    for fragment in fragments {
        match rows.last_mut() {
            Some(row) if (fragment.baseline() - row.baseline).abs() <= tolerance => row.push(fragment),
            _ => rows.push(Row::new(fragment)),
        }
    }
    rows
}

fn row_baseline_tolerance(fragments: &[Fragment], config: &PipelineConfig) -> f32 {
    if fragments.len() < 2 {
        return config.row_baseline_tolerance_cap;
    }
    let mut baselines: Vec<f32> = fragments.iter().map(|f| f.baseline()).collect();
    baselines.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut gaps: Vec<f32> = baselines.windows(2).map(|w| (w[1] - w[0]).abs()).filter(|g| *g > 0.01).collect();
    if gaps.is_empty() {
        return config.row_baseline_tolerance_cap;
    }
    gaps.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = gaps[gaps.len() / 2];
    config.row_baseline_tolerance_cap.min(0.4 * median)
}

fn nominal_space_width(row: &Row) -> f32 {
    let avg_char_width: f32 = row
        .fragments
        .iter()
        .map(|f| if f.text.is_empty() { 0.0 } else { f.width / f.text.chars().count() as f32 })
        .sum::<f32>()
        / row.fragments.len().max(1) as f32;
    avg_char_width.max(1.0)
}

/// Phase 3 — within a row, sorted by left, merge adjacent fragments under
/// the three-gap rule.
fn merge_row(mut row: Row, config: &PipelineConfig) -> Row {
    row.fragments.sort_by(|a, b| a.left.partial_cmp(&b.left).unwrap_or(std::cmp::Ordering::Equal));
    let nominal_space = nominal_space_width(&row);

    let mut merged: Vec<Fragment> = Vec::new();
    for fragment in row.fragments {
        let should_merge = match merged.last() {
            None => false,
            Some(prev) => {
                let gap = fragment.left - (prev.left + prev.width);
                let rule1 = prev.ends_with_space() && !fragment.starts_with_space() && gap.abs() <= config.row_merge_gap_tolerance;
                let rule2 = gap.abs() <= config.row_merge_gap_tolerance;
                let rule3 = fragment.starts_with_space()
                    && (gap - nominal_space).abs() <= config.row_merge_gap_tolerance;
                rule1 || rule2 || rule3
            }
        };
        if should_merge {
            let prev = merged.last_mut().expect("checked above");
            let text = format!("{}{}", prev.text, fragment.text);
            prev.absorb(&fragment);
            prev.text = text;
        } else {
            merged.push(fragment);
        }
    }

    row.fragments = merged;
    row
}

/// Phase 4 — fold scripts whose parent lies in a different row into that
/// parent's text, ordering multiple folded scripts left-to-right.
fn fold_cross_row_scripts(rows: Vec<Row>) -> Vec<Fragment> {
    let mut all: Vec<Fragment> = rows.into_iter().flat_map(|r| r.fragments).collect();

    let script_indices: Vec<usize> = all
        .iter()
        .enumerate()
        .filter(|(_, f)| f.is_script && f.script_parent.is_some())
        .map(|(i, _)| i)
        .collect();

    let mut folded_into: std::collections::HashMap<u32, Vec<usize>> = std::collections::HashMap::new();
    for idx in &script_indices {
        let parent = all[*idx].script_parent.unwrap();
        folded_into.entry(parent).or_default().push(*idx);
    }

    let mut to_remove: Vec<usize> = Vec::new();
    for (parent_stream_index, mut script_idxs) in folded_into {
        let Some(parent_idx) = all.iter().position(|f| f.stream_index == parent_stream_index) else {
            continue;
        };
        script_idxs.sort_by(|&a, &b| {
            all[a].left.partial_cmp(&all[b].left).unwrap_or(std::cmp::Ordering::Equal)
        });
        for idx in script_idxs {
            let marker = match all[idx].script_type {
                Some(ScriptType::Super) => '^',
                Some(ScriptType::Sub) => '_',
                None => continue,
            };
            let script_text = all[idx].text.clone();
            let script_bbox = all[idx].bbox();
            let script_originals = all[idx].original_fragments.clone();
            let parent = &mut all[parent_idx];
            parent.text = format!("{}{}{}", parent.text, marker, script_text);
            let union = parent.bbox().union(&script_bbox);
            parent.left = union.x;
            parent.top = union.y;
            parent.width = union.width;
            parent.height = union.height;
            parent.original_fragments.extend(script_originals);
            to_remove.push(idx);
        }
    }

    to_remove.sort_unstable();
    for idx in to_remove.into_iter().rev() {
        all.remove(idx);
    }
    all
}

/// Run the fragment layout engine over one page's fragments, returning the
/// merged, script-folded fragments. A row that ends up empty is dropped
/// silently rather than raising an error.
///
/// Folding a script into its parent (phase 4) can close a gap that phase 3's
/// same-row merge already walked past — e.g. a base fragment that only
/// touches its neighbour once the script between them has been absorbed.
/// A second row-merge pass picks up exactly that case; nothing left to fold
/// means nothing left for it to do, so it's a no-op otherwise.
pub fn run_fragment_engine(mut fragments: Vec<Fragment>, config: &PipelineConfig) -> Vec<Fragment> {
    if fragments.is_empty() {
        return fragments;
    }

    detect_scripts(&mut fragments, config);

    let rows = group_rows(fragments, config);
    let merged_rows: Vec<Row> = rows
        .into_iter()
        .filter(|r| !r.fragments.is_empty())
        .map(|r| merge_row(r, config))
        .collect();

    let folded = fold_cross_row_scripts(merged_rows);

    let rows = group_rows(folded, config);
    rows.into_iter()
        .filter(|r| !r.fragments.is_empty())
        .map(|r| merge_row(r, config))
        .flat_map(|r| r.fragments)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontId;
    use crate::fragment::RawFragment;

    fn make(page: u32, stream_index: u32, left: f32, top: f32, width: f32, height: f32, text: &str) -> Fragment {
        Fragment::from_raw(
            page,
            612.0,
            792.0,
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
            },
        )
    }

    #[test]
    fn test_superscript_folding_scenario() {
        // Scenario 1 from the design notes: "...around 10" + "7" (superscript) + "Hz...".
        let f1 = make(1, 0, 101.0, 191.0, 428.0, 18.0, "...around 10");
        let f2 = make(1, 1, 529.0, 192.0, 5.0, 11.0, "7");
        let f3 = make(1, 2, 534.0, 191.0, 166.0, 18.0, "Hz...");

        let config = PipelineConfig::default();
        let out = run_fragment_engine(vec![f1, f2, f3], &config);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "...around 10^7Hz...");
        assert_eq!(out[0].original_fragments.len(), 3);
        assert!(out[0].bbox_covers_originals());
    }

    #[test]
    fn test_drop_cap_preserved_across_rows() {
        // Scenario 2: a drop cap and three narrow continuation lines stay
        // as four independent, unmerged, non-script fragments.
        let cap = make(1, 0, 10.0, 100.0, 30.0, 48.0, "T");
        let l1 = make(1, 1, 50.0, 100.0, 200.0, 12.0, "his is a line");
        let l2 = make(1, 2, 50.0, 115.0, 200.0, 12.0, "cap spanning");
        let l3 = make(1, 3, 50.0, 130.0, 200.0, 12.0, "the drop cap");

        let config = PipelineConfig::default();
        let out = run_fragment_engine(vec![cap, l1, l2, l3], &config);

        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|f| !f.is_script));
    }

    #[test]
    fn test_same_row_merge_with_space() {
        let a = make(1, 0, 0.0, 100.0, 20.0, 12.0, "foo ");
        let b = make(1, 1, 21.0, 100.0, 20.0, 12.0, "bar");
        let config = PipelineConfig::default();
        let out = run_fragment_engine(vec![a, b], &config);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].text, "foo bar");
    }

    #[test]
    fn test_running_fragment_engine_twice_is_idempotent() {
        let f1 = make(1, 0, 101.0, 191.0, 428.0, 18.0, "...around 10");
        let f2 = make(1, 1, 529.0, 192.0, 5.0, 11.0, "7");
        let f3 = make(1, 2, 534.0, 191.0, 166.0, 18.0, "Hz...");
        let config = PipelineConfig::default();

        let once = run_fragment_engine(vec![f1, f2, f3], &config);
        let twice = run_fragment_engine(once.clone(), &config);

        assert_eq!(once.len(), twice.len());
        assert_eq!(once[0].text, twice[0].text);
    }
}
