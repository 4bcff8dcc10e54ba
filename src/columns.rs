//! Column boundary detection and fragment classification
//!
//! Two-column pages put most fragment left edges into two x-position
//! clusters with a sparse gutter between them. The detector bins left edges
//! into a histogram across the page width and looks for that sparse stretch.

use crate::extractor::{Column, TextFragment};

/// Configuration for column boundary detection
#[derive(Debug, Clone)]
pub struct ColumnDetectionConfig {
    /// Number of equal-width histogram bins across the page (default: 20)
    pub histogram_bins: usize,
    /// Fraction of the fullest bin below which a bin counts as sparse (default: 0.3)
    pub valley_threshold_ratio: f32,
    /// Minimum distinct left-edge positions needed to attempt detection (default: 4)
    pub min_distinct_positions: usize,
    /// Boundary used when no valley is found, as a fraction of the page width.
    /// `None` treats such pages as single-column.
    pub fallback_boundary_ratio: Option<f32>,
}

impl Default for ColumnDetectionConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 20,
            valley_threshold_ratio: 0.3,
            min_distinct_positions: 4,
            fallback_boundary_ratio: Some(0.5),
        }
    }
}

/// Where a page's column boundary came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryEstimate {
    /// Found by valley detection
    Detected(f32),
    /// No valley; derived from the fallback ratio
    Fallback(f32),
    /// No valley and fallback disabled
    Undetected,
}

impl BoundaryEstimate {
    pub fn x(&self) -> Option<f32> {
        match self {
            BoundaryEstimate::Detected(x) | BoundaryEstimate::Fallback(x) => Some(*x),
            BoundaryEstimate::Undetected => None,
        }
    }
}

/// Rightmost edge of any fragment on the page
pub fn page_width(fragments: &[TextFragment]) -> f32 {
    fragments
        .iter()
        .map(|f| f.bbox.x1)
        .fold(0.0f32, f32::max)
}

/// Estimate the x-coordinate separating left and right columns of one page.
///
/// Returns `None` when the page has too few distinct left edges or the
/// left-edge histogram has no sparse stretch between two dense bins.
pub fn find_column_boundary(
    fragments: &[TextFragment],
    config: &ColumnDetectionConfig,
) -> Option<f32> {
    if fragments.is_empty() || config.histogram_bins < 3 {
        return None;
    }

    let mut x_positions: Vec<f32> = fragments.iter().map(|f| f.bbox.x0).collect();
    x_positions.sort_by(|a, b| a.total_cmp(b));
    x_positions.dedup();
    if x_positions.len() < config.min_distinct_positions {
        return None;
    }

    let width = page_width(fragments);
    if width <= 0.0 {
        return None;
    }
    let bin_width = width / config.histogram_bins as f32;

    let histogram = left_edge_histogram(fragments, bin_width, config.histogram_bins);
    let valleys = find_valleys(&histogram, config.valley_threshold_ratio);

    // Middle valley when several gaps are found
    let &(start, end) = valleys.get(valleys.len() / 2)?;
    let bin = start + (end - start) / 2;
    Some(bin as f32 * bin_width)
}

/// Count fragment left edges per bin; edges at or past the last bin are clamped into it
fn left_edge_histogram(fragments: &[TextFragment], bin_width: f32, bins: usize) -> Vec<usize> {
    let mut histogram = vec![0usize; bins];
    for fragment in fragments {
        let idx = ((fragment.bbox.x0 / bin_width).max(0.0) as usize).min(bins - 1);
        histogram[idx] += 1;
    }
    histogram
}

/// Find sparse runs of bins flanked on both sides by dense bins.
///
/// Each valley is an inclusive `(start, end)` bin range. A bin is sparse when
/// its count is below `ratio` times the fullest bin. Runs touching the first
/// or last bin are page margins, not gutters.
fn find_valleys(histogram: &[usize], ratio: f32) -> Vec<(usize, usize)> {
    let max = histogram.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Vec::new();
    }

    let threshold = max as f32 * ratio;
    let dense = |i: usize| histogram[i] as f32 >= threshold;

    let mut valleys = Vec::new();
    let mut i = 1;
    while i + 1 < histogram.len() {
        if dense(i) || !dense(i - 1) {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i;
        while end + 1 < histogram.len() && !dense(end + 1) {
            end += 1;
        }
        if end + 1 < histogram.len() {
            valleys.push((start, end));
        }
        i = end + 1;
    }

    valleys
}

/// Detect the boundary, falling back to the configured ratio of the page width
pub fn resolve_boundary(
    fragments: &[TextFragment],
    config: &ColumnDetectionConfig,
) -> BoundaryEstimate {
    if let Some(x) = find_column_boundary(fragments, config) {
        return BoundaryEstimate::Detected(x);
    }

    match config.fallback_boundary_ratio {
        Some(ratio) if !fragments.is_empty() => {
            let x = page_width(fragments) * ratio;
            log::warn!(
                "No clear two-column layout detected, using fallback boundary at x={:.1}",
                x
            );
            BoundaryEstimate::Fallback(x)
        }
        _ => BoundaryEstimate::Undetected,
    }
}

/// Tag each fragment `Left` if it starts before `boundary`, otherwise `Right`
pub fn classify_fragments(fragments: &mut [TextFragment], boundary: f32) {
    for fragment in fragments.iter_mut() {
        fragment.column = if fragment.bbox.x0 < boundary {
            Column::Left
        } else {
            Column::Right
        };
    }
}

/// Resolve the page boundary and classify every fragment against it.
///
/// Without any boundary all fragments go to the left column, which the
/// reconstructor treats as a single-column page.
pub fn assign_columns(
    fragments: &mut [TextFragment],
    config: &ColumnDetectionConfig,
) -> BoundaryEstimate {
    let estimate = resolve_boundary(fragments, config);
    match estimate.x() {
        Some(boundary) => classify_fragments(fragments, boundary),
        None => fragments.iter_mut().for_each(|f| f.column = Column::Left),
    }
    estimate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::BBox;

    fn frag(x0: f32, x1: f32, y0: f32) -> TextFragment {
        TextFragment::new("text", BBox::new(x0, y0, x1, y0 + 10.0), 0)
    }

    #[test]
    fn test_two_clusters_boundary_between() {
        // Left starts at 10-15, right at 300-305, page width 600
        let fragments = vec![
            frag(10.0, 250.0, 10.0),
            frag(12.0, 250.0, 30.0),
            frag(15.0, 250.0, 50.0),
            frag(300.0, 600.0, 10.0),
            frag(305.0, 590.0, 30.0),
        ];
        let boundary = find_column_boundary(&fragments, &ColumnDetectionConfig::default())
            .expect("boundary");
        assert_eq!(boundary, 150.0);
        assert!(boundary > 15.0 && boundary < 300.0);
    }

    #[test]
    fn test_single_cluster_has_no_boundary() {
        let fragments: Vec<TextFragment> = (0..8)
            .map(|i| frag(50.0 + i as f32, 550.0, i as f32 * 20.0))
            .collect();
        assert_eq!(
            find_column_boundary(&fragments, &ColumnDetectionConfig::default()),
            None
        );
    }

    #[test]
    fn test_too_few_distinct_positions() {
        let fragments = vec![
            frag(10.0, 200.0, 0.0),
            frag(15.0, 200.0, 20.0),
            frag(20.0, 200.0, 40.0),
        ];
        assert_eq!(
            find_column_boundary(&fragments, &ColumnDetectionConfig::default()),
            None
        );

        // Repeated positions do not count twice
        let repeated = vec![
            frag(10.0, 200.0, 0.0),
            frag(10.0, 200.0, 20.0),
            frag(300.0, 600.0, 0.0),
            frag(300.0, 600.0, 20.0),
        ];
        assert_eq!(
            find_column_boundary(&repeated, &ColumnDetectionConfig::default()),
            None
        );
    }

    #[test]
    fn test_empty_page() {
        assert_eq!(
            find_column_boundary(&[], &ColumnDetectionConfig::default()),
            None
        );
        assert_eq!(
            resolve_boundary(&[], &ColumnDetectionConfig::default()),
            BoundaryEstimate::Undetected
        );
    }

    #[test]
    fn test_single_bin_valleys_pick_middle() {
        let histogram = [5, 0, 5, 0, 5, 0, 5];
        assert_eq!(find_valleys(&histogram, 0.3), vec![(1, 1), (3, 3), (5, 5)]);
    }

    #[test]
    fn test_margin_runs_are_not_valleys() {
        let histogram = [0, 0, 6, 6, 0, 0];
        assert!(find_valleys(&histogram, 0.3).is_empty());
        assert!(find_valleys(&[0, 0, 0], 0.3).is_empty());
    }

    #[test]
    fn test_fallback_boundary() {
        let fragments = vec![frag(10.0, 400.0, 0.0), frag(12.0, 300.0, 20.0)];
        let estimate = resolve_boundary(&fragments, &ColumnDetectionConfig::default());
        assert_eq!(estimate, BoundaryEstimate::Fallback(200.0));

        let config = ColumnDetectionConfig {
            fallback_boundary_ratio: Some(0.25),
            ..Default::default()
        };
        assert_eq!(
            resolve_boundary(&fragments, &config),
            BoundaryEstimate::Fallback(100.0)
        );
    }

    #[test]
    fn test_disabled_fallback_is_single_column() {
        let config = ColumnDetectionConfig {
            fallback_boundary_ratio: None,
            ..Default::default()
        };
        let mut fragments = vec![frag(10.0, 400.0, 0.0), frag(300.0, 400.0, 20.0)];
        let estimate = assign_columns(&mut fragments, &config);
        assert_eq!(estimate, BoundaryEstimate::Undetected);
        assert!(fragments.iter().all(|f| f.column == Column::Left));
    }

    #[test]
    fn test_classify_is_idempotent() {
        let mut fragments = vec![
            frag(10.0, 100.0, 0.0),
            frag(149.9, 200.0, 0.0),
            frag(150.0, 300.0, 0.0),
            frag(400.0, 500.0, 0.0),
        ];
        classify_fragments(&mut fragments, 150.0);
        let first: Vec<Column> = fragments.iter().map(|f| f.column).collect();
        assert_eq!(
            first,
            vec![Column::Left, Column::Left, Column::Right, Column::Right]
        );

        classify_fragments(&mut fragments, 150.0);
        let second: Vec<Column> = fragments.iter().map(|f| f.column).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_classify_everything_on_one_side() {
        let mut fragments = vec![frag(10.0, 100.0, 0.0), frag(20.0, 100.0, 10.0)];
        classify_fragments(&mut fragments, 500.0);
        assert!(fragments.iter().all(|f| f.column == Column::Left));
    }
}
