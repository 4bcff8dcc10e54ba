use pdf_reading_order::extractor::extract_fragments;
use pdf_reading_order::{assign_columns, ColumnDetectionConfig};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: debug_pages <pdf_path> [max_page | min-max]");
        std::process::exit(1);
    }

    let range = args.get(2).map(|s| s.as_str()).unwrap_or("1-3");
    let (min_page, max_page): (usize, usize) = if let Some((a, b)) = range.split_once('-') {
        (a.parse().unwrap_or(1), b.parse().unwrap_or(3))
    } else {
        (1, range.parse().unwrap_or(3))
    };

    let fragments = extract_fragments(&args[1]).expect("Failed to extract");
    let config = ColumnDetectionConfig::default();

    for page in min_page..=max_page {
        let mut page_fragments: Vec<_> = fragments
            .iter()
            .filter(|f| f.page_index + 1 == page)
            .cloned()
            .collect();
        let boundary = assign_columns(&mut page_fragments, &config);
        println!(
            "=== PAGE {} ({} fragments, boundary {:?}) ===",
            page,
            page_fragments.len(),
            boundary
        );
        for f in &page_fragments {
            println!(
                "  x0={:7.1} y0={:7.1} x1={:7.1} y1={:7.1} {:?} text={:?}",
                f.bbox.x0, f.bbox.y0, f.bbox.x1, f.bbox.y1, f.column, f.text
            );
        }
        println!();
    }
}
