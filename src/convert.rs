//! File-level conversion: single PDFs, whole directories and layout previews
//!
//! Layout-aware extraction is tried first; if it fails the whole-page
//! extraction is used instead, and only when both fail is the error returned.

use crate::columns::{assign_columns, BoundaryEstimate, ColumnDetectionConfig};
use crate::extractor::{self, Column, TextFragment};
use crate::normalize::clean_text;
use crate::reading_order::{fragments_to_text, group_by_page, LayoutOptions};
use crate::PdfError;
use lopdf::Document;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Number of sample fragments shown per column in a preview
const PREVIEW_SAMPLES: usize = 2;

/// Maximum characters of a preview sample before it is truncated
const PREVIEW_CHARS: usize = 80;

/// Text extraction method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractionMethod {
    /// Column detection and reading-order reconstruction
    #[default]
    Layout,
    /// Plain per-page extraction without layout analysis
    WholePage,
}

/// Options for converting PDFs to text files
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Method tried first
    pub method: ExtractionMethod,
    /// Layout reconstruction settings
    pub layout: LayoutOptions,
}

/// Result of a single conversion
#[derive(Debug, Clone)]
pub struct ConvertResult {
    /// Cleaned text as written to disk
    pub text: String,
    /// Where the text was written
    pub output_path: PathBuf,
    /// Method that produced the text
    pub method: ExtractionMethod,
}

/// Result of a directory conversion
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Successfully converted `(pdf, txt)` pairs
    pub converted: Vec<(PathBuf, PathBuf)>,
    /// PDFs that could not be converted
    pub failed: Vec<(PathBuf, PdfError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.converted.len() + self.failed.len()
    }
}

/// Output path next to the PDF with a `.txt` extension
pub fn default_output_path(pdf_path: &Path) -> PathBuf {
    pdf_path.with_extension("txt")
}

/// Extract cleaned text from a loaded document with the given method
pub fn extract_with_method(
    doc: &Document,
    method: ExtractionMethod,
    layout: &LayoutOptions,
) -> Result<String, PdfError> {
    match method {
        ExtractionMethod::Layout => {
            let fragments = extractor::extract_fragments_from_doc(doc, None)?;
            Ok(fragments_to_text(fragments, layout))
        }
        ExtractionMethod::WholePage => {
            let text = extractor::extract_text_from_doc(doc)?;
            Ok(clean_text(&text))
        }
    }
}

/// Run `extract` with `method`; if layout extraction fails, retry once with
/// whole-page extraction. Returns the text and the method that produced it.
pub fn extract_with_fallback<F>(
    method: ExtractionMethod,
    mut extract: F,
) -> Result<(String, ExtractionMethod), PdfError>
where
    F: FnMut(ExtractionMethod) -> Result<String, PdfError>,
{
    match extract(method) {
        Ok(text) => Ok((text, method)),
        Err(e) if method == ExtractionMethod::Layout => {
            log::error!("Layout extraction failed: {}", e);
            log::info!("Retrying with whole-page extraction...");
            let text = extract(ExtractionMethod::WholePage)?;
            Ok((text, ExtractionMethod::WholePage))
        }
        Err(e) => Err(e),
    }
}

/// Convert one PDF to a text file.
///
/// `output_path` defaults to the PDF path with a `.txt` extension.
pub fn convert_pdf_to_txt<P: AsRef<Path>>(
    pdf_path: P,
    output_path: Option<&Path>,
    options: &ConvertOptions,
) -> Result<ConvertResult, PdfError> {
    let pdf_path = pdf_path.as_ref();
    let output_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(pdf_path));

    let doc = extractor::load_document(pdf_path)?;

    let (text, method) = extract_with_fallback(options.method, |method| {
        extract_with_method(&doc, method, &options.layout)
    })
    .map_err(|e| {
        log::error!("Extraction failed for {}: {}", pdf_path.display(), e);
        e
    })?;

    fs::write(&output_path, &text)?;
    log::info!("Text saved to: {}", output_path.display());

    Ok(ConvertResult {
        text,
        output_path,
        method,
    })
}

/// Convert every `*.pdf` below `input_dir`, mirroring the directory layout
/// into `output_dir` (default: `input_dir`). Per-file failures are collected
/// in the report instead of aborting the batch.
pub fn convert_directory(
    input_dir: &Path,
    output_dir: Option<&Path>,
    options: &ConvertOptions,
) -> Result<BatchReport, PdfError> {
    if !input_dir.is_dir() {
        return Err(PdfError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("input directory not found: {}", input_dir.display()),
        )));
    }

    let output_dir = output_dir.unwrap_or(input_dir);
    fs::create_dir_all(output_dir)?;

    let pattern = format!(
        "{}/**/*.pdf",
        glob::Pattern::escape(&input_dir.to_string_lossy())
    );
    let pdf_files: Vec<PathBuf> = glob::glob(&pattern)?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .collect();

    let mut report = BatchReport::default();
    if pdf_files.is_empty() {
        log::warn!("No PDF files found in {}", input_dir.display());
        return Ok(report);
    }
    log::info!("Found {} PDF files", pdf_files.len());

    for (i, pdf_file) in pdf_files.iter().enumerate() {
        log::info!("[{}/{}] Processing {}", i + 1, pdf_files.len(), pdf_file.display());

        let relative = pdf_file.strip_prefix(input_dir).unwrap_or(pdf_file);
        let output_path = output_dir.join(relative).with_extension("txt");

        let result = output_path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .map_err(PdfError::from)
            .and_then(|_| convert_pdf_to_txt(pdf_file, Some(&output_path), options));

        match result {
            Ok(converted) => {
                log::info!(
                    "Converted {} ({} characters)",
                    pdf_file.display(),
                    converted.text.chars().count()
                );
                report.converted.push((pdf_file.clone(), converted.output_path));
            }
            Err(e) => {
                log::error!("Failed: {} - {}", pdf_file.display(), e);
                report.failed.push((pdf_file.clone(), e));
            }
        }
    }

    log::info!(
        "Batch finished: {}/{} converted",
        report.converted.len(),
        report.total()
    );
    Ok(report)
}

/// Broad layout class of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutKind {
    TwoColumn,
    SingleColumn,
    Empty,
}

/// Column summary of one page
#[derive(Debug, Clone)]
pub struct PageLayout {
    /// Page index (0-indexed)
    pub page_index: usize,
    /// Boundary used to classify the page
    pub boundary: BoundaryEstimate,
    pub left_count: usize,
    pub right_count: usize,
    /// Leading fragments of the left column, truncated
    pub left_samples: Vec<String>,
    /// Leading fragments of the right column, truncated
    pub right_samples: Vec<String>,
}

impl PageLayout {
    pub fn kind(&self) -> LayoutKind {
        match (self.left_count, self.right_count) {
            (0, 0) => LayoutKind::Empty,
            (l, r) if l > 0 && r > 0 => LayoutKind::TwoColumn,
            _ => LayoutKind::SingleColumn,
        }
    }
}

/// Summarize the column layout of one page's fragments
pub fn summarize_page(
    page_index: usize,
    mut fragments: Vec<TextFragment>,
    config: &ColumnDetectionConfig,
) -> PageLayout {
    let boundary = assign_columns(&mut fragments, config);

    let samples = |column: Column| -> Vec<String> {
        fragments
            .iter()
            .filter(|f| f.column == column)
            .take(PREVIEW_SAMPLES)
            .map(|f| truncate_sample(&f.text))
            .collect()
    };
    let count = |column: Column| fragments.iter().filter(|f| f.column == column).count();

    PageLayout {
        page_index,
        boundary,
        left_count: count(Column::Left),
        right_count: count(Column::Right),
        left_samples: samples(Column::Left),
        right_samples: samples(Column::Right),
    }
}

/// Analyze the column layout of the first `max_pages` pages of a PDF
pub fn preview_layout<P: AsRef<Path>>(
    pdf_path: P,
    max_pages: usize,
    config: &ColumnDetectionConfig,
) -> Result<Vec<PageLayout>, PdfError> {
    let doc = extractor::load_document(pdf_path)?;
    preview_layout_from_doc(&doc, max_pages, config)
}

/// Analyze the column layout of the first `max_pages` pages of a loaded document
pub fn preview_layout_from_doc(
    doc: &Document,
    max_pages: usize,
    config: &ColumnDetectionConfig,
) -> Result<Vec<PageLayout>, PdfError> {
    let page_count = doc.get_pages().len().min(max_pages);
    let fragments = extractor::extract_fragments_from_doc(doc, Some(page_count))?;
    let mut pages: BTreeMap<usize, Vec<TextFragment>> =
        group_by_page(fragments).into_iter().collect();

    Ok((0..page_count)
        .map(|page_index| {
            let page = pages.remove(&page_index).unwrap_or_default();
            summarize_page(page_index, page, config)
        })
        .collect())
}

fn truncate_sample(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
