//! Reading-order and block assigner: linearises a page's fragments into a
//! globally consistent reading sequence and partitions them into reading
//! blocks along the column-by-column, top-to-bottom flow.

use crate::fragment::Fragment;

/// Produce the per-page reading order: sort each column's fragments by
/// `(baseline, left)`, then interleave by baseline while keeping each
/// maximal same-column run in its column-sorted order. A new reading block
/// begins whenever the column id changes between consecutive fragments in
/// the resulting order.
///
/// Mutates `reading_order_index` (1-based) and `reading_block` (1-based) in
/// place. Fragments without a column id (should not happen once the column
/// resolver has run) are placed last, in a trailing block of their own.
pub fn assign_reading_order(fragments: &mut [Fragment]) {
    if fragments.is_empty() {
        return;
    }

    let mut with_column: Vec<usize> = (0..fragments.len())
        .filter(|&i| fragments[i].column_id.is_some())
        .collect();
    let mut without_column: Vec<usize> = (0..fragments.len())
        .filter(|&i| fragments[i].column_id.is_none())
        .collect();

    with_column.sort_by(|&a, &b| {
        fragments[a]
            .baseline()
            .partial_cmp(&fragments[b].baseline())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Re-sort each maximal same-column run (in baseline order) by
    // (baseline, left), per the column-major requirement within a run.
    let mut ordered: Vec<usize> = Vec::with_capacity(with_column.len());
    let mut run_start = 0;
    while run_start < with_column.len() {
        let run_col = fragments[with_column[run_start]].column_id;
        let mut run_end = run_start + 1;
        while run_end < with_column.len() && fragments[with_column[run_end]].column_id == run_col {
            run_end += 1;
        }
        let mut run: Vec<usize> = with_column[run_start..run_end].to_vec();
        run.sort_by(|&a, &b| {
            fragments[a]
                .baseline()
                .partial_cmp(&fragments[b].baseline())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(fragments[a].left.partial_cmp(&fragments[b].left).unwrap_or(std::cmp::Ordering::Equal))
        });
        ordered.extend(run);
        run_start = run_end;
    }

    without_column.sort_by(|&a, &b| {
        fragments[a]
            .baseline()
            .partial_cmp(&fragments[b].baseline())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ordered.extend(without_column);

    let mut block = 0u32;
    let mut last_column_id: Option<Option<u32>> = None;
    for (i, &idx) in ordered.iter().enumerate() {
        let column_id = fragments[idx].column_id;
        if last_column_id != Some(column_id) {
            block += 1;
            last_column_id = Some(column_id);
        }
        fragments[idx].reading_order_index = Some((i + 1) as u32);
        fragments[idx].reading_block = Some(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::FontId;
    use crate::fragment::RawFragment;

    fn make(stream_index: u32, column_id: u32, left: f32, top: f32) -> Fragment {
        let mut f = Fragment::from_raw(
            1,
            612.0,
            792.0,
            RawFragment {
                stream_index,
                left,
                top,
                width: 200.0,
                height: 12.0,
                text: "line".to_string(),
                font_id: FontId(1),
                bold: false,
                italic: false,
            },
        );
        f.column_id = Some(column_id);
        f
    }

    #[test]
    fn test_single_column_monotonic_order() {
        let mut fragments = vec![make(0, 1, 50.0, 100.0), make(1, 1, 50.0, 120.0), make(2, 1, 50.0, 140.0)];
        assign_reading_order(&mut fragments);
        let indices: Vec<u32> = fragments.iter().map(|f| f.reading_order_index.unwrap()).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert!(fragments.iter().all(|f| f.reading_block == Some(1)));
    }

    #[test]
    fn test_column_change_starts_new_block() {
        // title (col 0), then col 1, col 2 body text interleaved by baseline.
        let mut fragments = vec![
            make(0, 0, 20.0, 50.0),
            make(1, 1, 50.0, 100.0),
            make(2, 1, 50.0, 120.0),
            make(3, 2, 350.0, 100.0),
            make(4, 2, 350.0, 120.0),
        ];
        assign_reading_order(&mut fragments);

        let blocks: Vec<u32> = fragments.iter().map(|f| f.reading_block.unwrap()).collect();
        assert_eq!(blocks[0], 1);
        // Fragments 1/2 are column 1, 3/4 are column 2: they should land in
        // distinct blocks since the column id changes between them.
        assert_ne!(blocks[1], blocks[3]);
    }

    #[test]
    fn test_reading_order_indices_are_unique_and_dense() {
        let mut fragments = vec![make(0, 1, 50.0, 100.0), make(1, 2, 350.0, 100.0), make(2, 1, 50.0, 120.0)];
        assign_reading_order(&mut fragments);
        let mut indices: Vec<u32> = fragments.iter().map(|f| f.reading_order_index.unwrap()).collect();
        indices.sort_unstable();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_page_produces_no_output() {
        let mut fragments: Vec<Fragment> = Vec::new();
        assign_reading_order(&mut fragments);
        assert!(fragments.is_empty());
    }
}
