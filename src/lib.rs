//! Reading-order text extraction for one- and two-column PDFs using lopdf
//!
//! This crate provides:
//! - Positioned text fragment extraction from PDF content streams
//! - Per-page column boundary detection and fragment classification
//! - Reading-order reconstruction across columns and pages
//! - Cleanup of the resulting plain text
//! - File and directory conversion with a whole-page fallback

pub mod columns;
pub mod convert;
pub mod extractor;
pub mod normalize;
pub mod reading_order;

pub use columns::{
    assign_columns, classify_fragments, find_column_boundary, resolve_boundary,
    BoundaryEstimate, ColumnDetectionConfig,
};
pub use convert::{
    convert_directory, convert_pdf_to_txt, extract_with_fallback, preview_layout, BatchReport,
    ConvertOptions, ConvertResult, ExtractionMethod, LayoutKind, PageLayout,
};
pub use extractor::{extract_fragments, extract_text, BBox, Column, TextFragment};
pub use normalize::clean_text;
pub use reading_order::{
    fragments_to_text, order_fragments, reconstruct_reading_order, LayoutOptions, MergeStrategy,
};

use lopdf::Document;
use std::path::Path;

/// High-level extraction result
#[derive(Debug)]
pub struct PdfTextResult {
    /// Cleaned text in reading order
    pub text: String,
    /// Page count
    pub page_count: u32,
    /// Number of text fragments found before ordering
    pub fragment_count: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Extract a PDF file's text in reading order
pub fn process_pdf<P: AsRef<Path>>(
    path: P,
    options: &LayoutOptions,
) -> Result<PdfTextResult, PdfError> {
    let start = std::time::Instant::now();
    let doc = extractor::load_document(path)?;
    process_document(&doc, options, start)
}

/// Extract text in reading order from a PDF memory buffer
pub fn process_pdf_mem(buffer: &[u8], options: &LayoutOptions) -> Result<PdfTextResult, PdfError> {
    let start = std::time::Instant::now();
    let doc = extractor::load_document_mem(buffer)?;
    process_document(&doc, options, start)
}

fn process_document(
    doc: &Document,
    options: &LayoutOptions,
    start: std::time::Instant,
) -> Result<PdfTextResult, PdfError> {
    let fragments = extractor::extract_fragments_from_doc(doc, None)?;
    let fragment_count = fragments.len();
    let text = fragments_to_text(fragments, options);

    Ok(PdfTextResult {
        text,
        page_count: doc.get_pages().len() as u32,
        fragment_count,
        processing_time_ms: start.elapsed().as_millis() as u64,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("PDF is encrypted")]
    Encrypted,
    #[error("Invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

impl From<lopdf::Error> for PdfError {
    fn from(e: lopdf::Error) -> Self {
        PdfError::Parse(e.to_string())
    }
}
