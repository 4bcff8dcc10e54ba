//! CLI tool for reading-order PDF to text conversion

use clap::Parser;
use pdf_reading_order::{
    convert_directory, convert_pdf_to_txt, preview_layout, BoundaryEstimate, ConvertOptions,
    ExtractionMethod, LayoutKind, MergeStrategy,
};
use std::path::PathBuf;
use std::process;

#[derive(Parser, Debug)]
#[command(
    name = "pdf2txt",
    version,
    about = "Convert one- and two-column PDFs to plain text in reading order"
)]
struct Cli {
    /// Input PDF file or folder
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file (or folder with --batch)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Convert every PDF below the input folder
    #[arg(long)]
    batch: bool,

    /// Show the detected column layout instead of converting
    #[arg(long)]
    preview: bool,

    /// Pages analyzed by --preview
    #[arg(long, value_name = "N", default_value_t = 3)]
    pages: usize,

    /// Skip layout analysis and extract whole pages
    #[arg(long)]
    whole_page: bool,

    /// Read the full left column before the right column
    #[arg(long)]
    column_sequential: bool,

    /// Fallback boundary as a fraction of page width when no gutter is found
    #[arg(long, value_name = "RATIO", conflicts_with = "no_fallback")]
    fallback_ratio: Option<f32>,

    /// Treat pages without a detected gutter as single-column
    #[arg(long)]
    no_fallback: bool,

    /// Show debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn convert_options(&self) -> ConvertOptions {
        let mut options = ConvertOptions::default();
        if self.whole_page {
            options.method = ExtractionMethod::WholePage;
        }
        if self.column_sequential {
            options.layout.merge_strategy = MergeStrategy::ColumnSequential;
        }
        if self.no_fallback {
            options.layout.columns.fallback_boundary_ratio = None;
        } else if let Some(ratio) = self.fallback_ratio {
            options.layout.columns.fallback_boundary_ratio = Some(ratio);
        }
        options
    }
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let options = cli.convert_options();

    if cli.preview {
        if !cli.input.is_file() {
            eprintln!("Error: --preview only supports a single PDF file");
            process::exit(1);
        }
        run_preview(&cli, &options);
    } else if cli.batch || cli.input.is_dir() {
        match convert_directory(&cli.input, cli.output.as_deref(), &options) {
            Ok(report) => {
                println!(
                    "Converted {}/{} files",
                    report.converted.len(),
                    report.total()
                );
                for (pdf, err) in &report.failed {
                    println!("  failed: {} ({})", pdf.display(), err);
                }
                if !report.failed.is_empty() {
                    process::exit(1);
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    } else {
        match convert_pdf_to_txt(&cli.input, cli.output.as_deref(), &options) {
            Ok(result) => {
                println!("Text written to: {}", result.output_path.display());
                println!("Length: {} characters", result.text.chars().count());
                if result.method != options.method {
                    println!("Note: whole-page fallback was used");
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
    }
}

fn run_preview(cli: &Cli, options: &ConvertOptions) {
    let pages = match preview_layout(&cli.input, cli.pages, &options.layout.columns) {
        Ok(pages) => pages,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    println!("PDF Layout Preview");
    println!("==================");
    println!("File: {}", cli.input.display());

    for page in &pages {
        println!();
        println!("=== Page {} ===", page.page_index + 1);
        match page.boundary {
            BoundaryEstimate::Detected(x) => println!("Boundary: x={:.1} (detected)", x),
            BoundaryEstimate::Fallback(x) => println!("Boundary: x={:.1} (fallback)", x),
            BoundaryEstimate::Undetected => println!("Boundary: none"),
        }
        println!("Left column fragments: {}", page.left_count);
        for (i, sample) in page.left_samples.iter().enumerate() {
            println!("  {}: {}", i + 1, sample);
        }
        println!("Right column fragments: {}", page.right_count);
        for (i, sample) in page.right_samples.iter().enumerate() {
            println!("  {}: {}", i + 1, sample);
        }
        println!(
            "Layout: {}",
            match page.kind() {
                LayoutKind::TwoColumn => "two columns",
                LayoutKind::SingleColumn => "single column",
                LayoutKind::Empty => "no text found",
            }
        );
    }
}
