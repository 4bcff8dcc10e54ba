//! Reading-order reconstruction
//!
//! Pages are classified independently (in parallel) and then merged back in
//! ascending page order. Within a two-column page, left and right fragments
//! are interleaved row by row on their top edge.

use crate::columns::{assign_columns, BoundaryEstimate, ColumnDetectionConfig};
use crate::extractor::{Column, TextFragment};
use crate::normalize::clean_text;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// How the two columns of a page are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Interleave left and right fragments that share a row (top edge)
    #[default]
    RowAlternation,
    /// Read the whole left column, then the whole right column
    ColumnSequential,
}

/// Options for layout reconstruction
#[derive(Debug, Clone, Default)]
pub struct LayoutOptions {
    /// Column boundary detection settings
    pub columns: ColumnDetectionConfig,
    /// Merge strategy for two-column pages
    pub merge_strategy: MergeStrategy,
}

/// Group fragments by page in ascending page order, keeping stream order within a page
pub fn group_by_page(fragments: Vec<TextFragment>) -> Vec<(usize, Vec<TextFragment>)> {
    let mut pages: BTreeMap<usize, Vec<TextFragment>> = BTreeMap::new();
    for fragment in fragments {
        pages.entry(fragment.page_index).or_default().push(fragment);
    }
    pages.into_iter().collect()
}

/// Classify every page and return all fragments in reading order
pub fn order_fragments(fragments: Vec<TextFragment>, options: &LayoutOptions) -> Vec<TextFragment> {
    let total = fragments.len();
    let fragments: Vec<TextFragment> = fragments
        .into_iter()
        .filter(|f| {
            let ok = f.is_well_formed();
            if !ok {
                log::debug!("Skipping malformed fragment on page {}", f.page_index);
            }
            ok
        })
        .collect();
    if fragments.len() < total {
        log::warn!("Dropped {} malformed fragments", total - fragments.len());
    }

    let pages: Vec<(usize, Vec<TextFragment>)> = group_by_page(fragments)
        .into_par_iter()
        .map(|(page_index, mut page)| {
            let estimate = assign_columns(&mut page, &options.columns);
            match estimate {
                BoundaryEstimate::Detected(x) => {
                    log::debug!("Page {}: column boundary at x={:.1}", page_index + 1, x)
                }
                BoundaryEstimate::Fallback(x) => {
                    log::debug!("Page {}: fallback boundary at x={:.1}", page_index + 1, x)
                }
                BoundaryEstimate::Undetected => {
                    log::debug!("Page {}: treated as single column", page_index + 1)
                }
            }
            (page_index, page)
        })
        .collect();

    let mut ordered = Vec::with_capacity(pages.iter().map(|(_, p)| p.len()).sum());
    for (_, page) in pages {
        ordered.extend(order_page(page, options.merge_strategy));
    }
    ordered
}

/// Merge already classified fragments, possibly spanning several pages, into reading order
pub fn reconstruct_reading_order(
    fragments: Vec<TextFragment>,
    strategy: MergeStrategy,
) -> Vec<TextFragment> {
    let mut ordered = Vec::with_capacity(fragments.len());
    for (_, page) in group_by_page(fragments) {
        ordered.extend(order_page(page, strategy));
    }
    ordered
}

/// Order the classified fragments of one page.
///
/// Fragments are sorted top to bottom (stable, so ties keep stream order).
/// A page with both left and right fragments is merged per `strategy`;
/// anything else is returned in that sorted order. `Unknown` fragments on a
/// two-column page travel with the left column.
pub fn order_page(mut fragments: Vec<TextFragment>, strategy: MergeStrategy) -> Vec<TextFragment> {
    fragments.sort_by(|a, b| a.bbox.y0.total_cmp(&b.bbox.y0));

    let has_left = fragments.iter().any(|f| f.column == Column::Left);
    let has_right = fragments.iter().any(|f| f.column == Column::Right);
    if !(has_left && has_right) {
        return fragments;
    }

    let (right, left): (Vec<_>, Vec<_>) = fragments
        .into_iter()
        .partition(|f| f.column == Column::Right);

    match strategy {
        MergeStrategy::RowAlternation => interleave_rows(left, right),
        MergeStrategy::ColumnSequential => {
            let mut result = left;
            result.extend(right);
            result
        }
    }
}

/// Walk both y-sorted columns together. For each distinct top edge, emit
/// every left fragment at that height, then every right fragment at it.
fn interleave_rows(left: Vec<TextFragment>, right: Vec<TextFragment>) -> Vec<TextFragment> {
    let mut result = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();

    loop {
        let row_y = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => {
                if l.bbox.y0.total_cmp(&r.bbox.y0).is_le() {
                    l.bbox.y0
                } else {
                    r.bbox.y0
                }
            }
            (Some(l), None) => l.bbox.y0,
            (None, Some(r)) => r.bbox.y0,
            (None, None) => break,
        };

        while let Some(fragment) = left.next_if(|f| same_row(f.bbox.y0, row_y)) {
            result.push(fragment);
        }
        while let Some(fragment) = right.next_if(|f| same_row(f.bbox.y0, row_y)) {
            result.push(fragment);
        }
    }

    result
}

/// Numeric equality, so `-0.0` and `0.0` share a row. The bitwise fallback
/// lets a fragment always match the row it opened, even with a NaN `y0`.
fn same_row(y: f32, row_y: f32) -> bool {
    y == row_y || y.total_cmp(&row_y).is_eq()
}

/// Order fragments, join them one per line and clean the result
pub fn fragments_to_text(fragments: Vec<TextFragment>, options: &LayoutOptions) -> String {
    let ordered = order_fragments(fragments, options);
    let joined = ordered
        .iter()
        .map(|f| f.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    clean_text(&joined)
}
