//! Text extraction from PDF using lopdf
//!
//! This module turns page content streams into positioned [`TextFragment`]s,
//! the input of the column detector, and also provides the plain whole-page
//! extraction used as a fallback.

use crate::PdfError;
use lopdf::{Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::Path;

/// Page height used when no MediaBox can be resolved (US Letter)
const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

/// Glyph advance, in thousandths of an em, when a font carries no widths
const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

/// Largest horizontal gap, in ems, bridged when merging operators into a run
const MAX_RUN_GAP_EM: f32 = 1.0;

/// Gap, in ems, that gets a space inserted when two runs are merged
const WORD_GAP_EM: f32 = 0.15;

/// Baselines closer than this (points) are the same line
const Y_TOLERANCE: f32 = 3.0;

/// `TJ` adjustment (thousandths of an em) read as a word space
const TJ_SPACE_ADJUSTMENT: f32 = 200.0;

/// Axis-aligned bounding box in top-down page coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    /// Left edge
    pub x0: f32,
    /// Top edge
    pub y0: f32,
    /// Right edge
    pub x1: f32,
    /// Bottom edge
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (x0, x1) = if x1 < x0 { (x1, x0) } else { (x0, x1) };
        let (y0, y1) = if y1 < y0 { (y1, y0) } else { (y0, y1) };
        Self { x0, y0, x1, y1 }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.y0.is_finite() && self.x1.is_finite() && self.y1.is_finite()
    }
}

/// Column a fragment was assigned to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Column {
    Left,
    Right,
    #[default]
    Unknown,
}

/// A contiguous run of text with its position on the page
#[derive(Debug, Clone, PartialEq)]
pub struct TextFragment {
    /// The text content
    pub text: String,
    /// Bounding box, origin at top-left of the page
    pub bbox: BBox,
    /// Page index (0-indexed)
    pub page_index: usize,
    /// Column assignment, `Unknown` until classified
    pub column: Column,
}

impl TextFragment {
    /// Create an unclassified fragment. Reversed edges are swapped.
    pub fn new(text: impl Into<String>, bbox: BBox, page_index: usize) -> Self {
        Self {
            text: text.into(),
            bbox: BBox::new(bbox.x0, bbox.y0, bbox.x1, bbox.y1),
            page_index,
            column: Column::Unknown,
        }
    }

    /// Non-blank text and finite geometry
    pub fn is_well_formed(&self) -> bool {
        !self.text.trim().is_empty() && self.bbox.is_finite()
    }
}

/// Open a PDF file, rejecting documents that stay encrypted
pub fn load_document<P: AsRef<Path>>(path: P) -> Result<Document, PdfError> {
    let doc = Document::load(path)?;
    ensure_readable(doc)
}

/// Open a PDF from a memory buffer, rejecting documents that stay encrypted
pub fn load_document_mem(buffer: &[u8]) -> Result<Document, PdfError> {
    let doc = Document::load_mem(buffer)?;
    ensure_readable(doc)
}

fn ensure_readable(doc: Document) -> Result<Document, PdfError> {
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted);
    }
    Ok(doc)
}

/// Extract text from PDF file as plain string, page by page
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String, PdfError> {
    let doc = load_document(path)?;
    extract_text_from_doc(&doc)
}

/// Extract text from PDF memory buffer
pub fn extract_text_mem(buffer: &[u8]) -> Result<String, PdfError> {
    let doc = load_document_mem(buffer)?;
    extract_text_from_doc(&doc)
}

/// Whole-page extraction without any layout analysis.
/// Pages are separated by a blank line.
pub fn extract_text_from_doc(doc: &Document) -> Result<String, PdfError> {
    let mut parts = Vec::new();

    for (page_num, _) in doc.get_pages() {
        log::info!("Extracting page {} (whole page)", page_num);
        let text = doc
            .extract_text(&[page_num])
            .map_err(|e| PdfError::Parse(e.to_string()))?;
        if !text.trim().is_empty() {
            parts.push(text);
        }
    }

    Ok(parts.join("\n\n"))
}

/// Extract positioned fragments from PDF file
pub fn extract_fragments<P: AsRef<Path>>(path: P) -> Result<Vec<TextFragment>, PdfError> {
    let doc = load_document(path)?;
    extract_fragments_from_doc(&doc, None)
}

/// Extract positioned fragments from memory buffer
pub fn extract_fragments_mem(buffer: &[u8]) -> Result<Vec<TextFragment>, PdfError> {
    let doc = load_document_mem(buffer)?;
    extract_fragments_from_doc(&doc, None)
}

/// Extract positioned fragments from a loaded document, optionally only from
/// the first `max_pages` pages. Fragments come back in page order.
pub fn extract_fragments_from_doc(
    doc: &Document,
    max_pages: Option<usize>,
) -> Result<Vec<TextFragment>, PdfError> {
    let pages = doc.get_pages();
    let limit = max_pages.unwrap_or(pages.len());
    let mut all_fragments = Vec::new();

    for (page_index, (page_num, &page_id)) in pages.iter().enumerate().take(limit) {
        log::info!("Processing page {}", page_num);
        let fragments = extract_page_fragments(doc, page_id, page_index)?;
        all_fragments.extend(fragments);
    }

    Ok(all_fragments)
}

/// Multiply two 2D transformation matrices
/// Matrix format: [a, b, c, d, e, f] representing:
/// | a  b  0 |
/// | c  d  0 |
/// | e  f  1 |
fn multiply_matrices(m1: &[f32; 6], m2: &[f32; 6]) -> [f32; 6] {
    [
        m1[0] * m2[0] + m1[1] * m2[2],
        m1[0] * m2[1] + m1[1] * m2[3],
        m1[2] * m2[0] + m1[3] * m2[2],
        m1[2] * m2[1] + m1[3] * m2[3],
        m1[4] * m2[0] + m1[5] * m2[2] + m2[4],
        m1[4] * m2[1] + m1[5] * m2[3] + m2[5],
    ]
}

/// Advance widths of a simple font, in thousandths of text space units
#[derive(Debug, Clone)]
struct GlyphWidths {
    first_char: u32,
    widths: Vec<f32>,
}

impl GlyphWidths {
    /// Read `/FirstChar` and `/Widths`. Composite (Type0) fonts use two-byte
    /// codes and are left to the per-character estimate.
    fn from_font(doc: &Document, font: &lopdf::Dictionary) -> Option<Self> {
        let subtype = font.get(b"Subtype").and_then(|o| o.as_name()).ok()?;
        if subtype == b"Type0" {
            return None;
        }

        let first_char = font.get(b"FirstChar").ok().and_then(get_number)?;
        let widths = resolve(doc, font.get(b"Widths").ok()?)
            .as_array()
            .ok()?
            .iter()
            .map(|w| get_number(resolve(doc, w)).unwrap_or(DEFAULT_GLYPH_WIDTH))
            .collect();

        Some(Self {
            first_char: first_char.max(0.0) as u32,
            widths,
        })
    }

    fn units(&self, bytes: &[u8]) -> f32 {
        bytes
            .iter()
            .map(|&b| {
                (b as u32)
                    .checked_sub(self.first_char)
                    .and_then(|i| self.widths.get(i as usize))
                    .copied()
                    .unwrap_or(DEFAULT_GLYPH_WIDTH)
            })
            .sum()
    }
}

/// Text shown on one line, possibly spanning several text-showing operators
#[derive(Debug, Clone, PartialEq)]
struct Run {
    text: String,
    x0: f32,
    x1: f32,
    baseline: f32,
    size: f32,
}

impl Run {
    /// Whether `next` continues this run: same baseline, to the right, and
    /// no wider a gap than `MAX_RUN_GAP_EM`
    fn continues(&self, next: &Run) -> bool {
        let em = self.size.max(next.size);
        (self.baseline - next.baseline).abs() < Y_TOLERANCE
            && next.x0 >= self.x0
            && next.x0 - self.x1 <= em * MAX_RUN_GAP_EM
    }

    fn append(&mut self, next: Run) {
        let em = self.size.max(next.size);
        if next.x0 - self.x1 > em * WORD_GAP_EM
            && !self.text.ends_with(char::is_whitespace)
            && !next.text.starts_with(char::is_whitespace)
        {
            self.text.push(' ');
        }
        self.text.push_str(&next.text);
        self.x1 = self.x1.max(next.x1);
        self.size = em;
    }

    fn into_fragment(self, page_height: f32, page_index: usize) -> TextFragment {
        // Flip to top-down coordinates
        let top = page_height - self.baseline - self.size;
        let bottom = page_height - self.baseline + self.size * 0.2;

        TextFragment::new(
            self.text.trim().to_string(),
            BBox::new(self.x0, top, self.x1.max(self.x0 + 1.0), bottom.max(top + 1.0)),
            page_index,
        )
    }
}

/// Text and graphics state needed to place shown strings on the page
struct PageState<'a> {
    doc: &'a Document,
    fonts: BTreeMap<Vec<u8>, &'a lopdf::Dictionary>,
    widths: BTreeMap<Vec<u8>, GlyphWidths>,
    page_height: f32,
    page_index: usize,
    ctm: [f32; 6],
    text_matrix: [f32; 6],
    current_font: String,
    current_font_size: f32,
    pending: Option<Run>,
    fragments: Vec<TextFragment>,
}

impl PageState<'_> {
    /// Current text position in page space
    fn position(&self) -> (f32, f32) {
        let combined = multiply_matrices(&self.text_matrix, &self.ctm);
        (combined[4], combined[5])
    }

    fn rendered_size(&self) -> f32 {
        effective_font_size(self.current_font_size, &self.text_matrix).abs()
    }

    /// Move the text position by `tx` unscaled text space units
    fn advance(&mut self, tx: f32) {
        self.text_matrix[4] += tx * self.text_matrix[0];
        self.text_matrix[5] += tx * self.text_matrix[1];
    }

    fn decode(&self, obj: &Object) -> Option<String> {
        extract_text_from_operand(obj, self.doc, &self.fonts, &self.current_font)
    }

    /// Decode a string operand and move the text position past it
    fn show(&mut self, obj: &Object) -> Option<String> {
        let text = self.decode(obj)?;
        if let Object::String(bytes, _) = obj {
            let units = match self.widths.get(self.current_font.as_bytes()) {
                Some(widths) => widths.units(bytes),
                None => text.chars().count() as f32 * DEFAULT_GLYPH_WIDTH,
            };
            self.advance(units / 1000.0 * self.current_font_size);
        }
        Some(text)
    }

    /// `Tj` and `'`
    fn show_text(&mut self, operand: &Object) {
        let start = self.position();
        let size = self.rendered_size();
        if let Some(text) = self.show(operand) {
            let end_x = self.position().0;
            self.push_run(text, start, end_x, size);
        }
    }

    /// `TJ`: strings interleaved with position adjustments
    fn show_array(&mut self, array: &[Object]) {
        let start = self.position();
        let size = self.rendered_size();
        let mut text = String::new();

        for item in array {
            if let Object::String(..) = item {
                if let Some(piece) = self.show(item) {
                    text.push_str(&piece);
                }
            } else if let Some(adjust) = get_number(item) {
                self.advance(-adjust / 1000.0 * self.current_font_size);
                if adjust <= -TJ_SPACE_ADJUSTMENT
                    && !text.is_empty()
                    && !text.ends_with(char::is_whitespace)
                {
                    text.push(' ');
                }
            }
        }

        let end_x = self.position().0;
        self.push_run(text, start, end_x, size);
    }

    /// Extend the pending run or start a new one
    fn push_run(&mut self, text: String, start: (f32, f32), end_x: f32, size: f32) {
        if text.trim().is_empty() {
            return;
        }

        let x1 = if end_x > start.0 {
            end_x
        } else {
            start.0 + text.chars().count() as f32 * size * DEFAULT_GLYPH_WIDTH / 1000.0
        };
        let run = Run {
            text,
            x0: start.0,
            x1,
            baseline: start.1,
            size,
        };

        if let Some(pending) = self.pending.as_mut() {
            if pending.continues(&run) {
                pending.append(run);
                return;
            }
        }
        self.flush();
        self.pending = Some(run);
    }

    fn flush(&mut self) {
        if let Some(run) = self.pending.take() {
            self.fragments
                .push(run.into_fragment(self.page_height, self.page_index));
        }
    }
}

/// Extract fragments from a single page.
///
/// Consecutive text-showing operators on the same baseline are merged into
/// one fragment, so lines drawn word by word come out whole.
fn extract_page_fragments(
    doc: &Document,
    page_id: ObjectId,
    page_index: usize,
) -> Result<Vec<TextFragment>, PdfError> {
    use lopdf::content::Content;

    let content_data = doc
        .get_page_content(page_id)
        .map_err(|e| PdfError::Parse(e.to_string()))?;

    let content = Content::decode(&content_data).map_err(|e| PdfError::Parse(e.to_string()))?;

    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let widths = fonts
        .iter()
        .filter_map(|(name, font)| Some((name.clone(), GlyphWidths::from_font(doc, font)?)))
        .collect();

    let mut state = PageState {
        doc,
        fonts,
        widths,
        page_height: page_height(doc, page_id),
        page_index,
        ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        text_matrix: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        current_font: String::new(),
        current_font_size: 12.0,
        pending: None,
        fragments: Vec::new(),
    };
    let mut ctm_stack: Vec<[f32; 6]> = Vec::new();
    let mut line_matrix = [1.0f32, 0.0, 0.0, 1.0, 0.0, 0.0];
    let mut leading: Option<f32> = None;
    let mut in_text_block = false;

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(saved) = ctm_stack.pop() {
                    state.ctm = saved;
                }
            }
            "cm" => {
                if op.operands.len() >= 6 {
                    let new_matrix = [
                        get_number(&op.operands[0]).unwrap_or(1.0),
                        get_number(&op.operands[1]).unwrap_or(0.0),
                        get_number(&op.operands[2]).unwrap_or(0.0),
                        get_number(&op.operands[3]).unwrap_or(1.0),
                        get_number(&op.operands[4]).unwrap_or(0.0),
                        get_number(&op.operands[5]).unwrap_or(0.0),
                    ];
                    state.ctm = multiply_matrices(&new_matrix, &state.ctm);
                }
            }
            "BT" => {
                in_text_block = true;
                state.text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
            }
            "ET" => in_text_block = false,
            "Tf" => {
                if op.operands.len() >= 2 {
                    if let Ok(name) = op.operands[0].as_name() {
                        state.current_font = String::from_utf8_lossy(name).to_string();
                    }
                    if let Some(size) = get_number(&op.operands[1]) {
                        state.current_font_size = size;
                    }
                }
            }
            "TL" => {
                if let Some(value) = op.operands.first().and_then(get_number) {
                    leading = Some(value);
                }
            }
            "Td" | "TD" => {
                if op.operands.len() >= 2 {
                    let tx = get_number(&op.operands[0]).unwrap_or(0.0);
                    let ty = get_number(&op.operands[1]).unwrap_or(0.0);
                    if op.operator == "TD" {
                        leading = Some(-ty);
                    }
                    line_matrix[4] += tx * line_matrix[0] + ty * line_matrix[2];
                    line_matrix[5] += tx * line_matrix[1] + ty * line_matrix[3];
                    state.text_matrix = line_matrix;
                }
            }
            "Tm" => {
                if op.operands.len() >= 6 {
                    for (i, operand) in op.operands.iter().take(6).enumerate() {
                        state.text_matrix[i] =
                            get_number(operand).unwrap_or(if i == 0 || i == 3 { 1.0 } else { 0.0 });
                    }
                    line_matrix = state.text_matrix;
                }
            }
            "T*" => {
                line_matrix[5] -= leading.unwrap_or(state.current_font_size * 1.2);
                state.text_matrix = line_matrix;
            }
            "Tj" => {
                if let (true, Some(operand)) = (in_text_block, op.operands.first()) {
                    state.show_text(operand);
                }
            }
            "TJ" => {
                if in_text_block {
                    if let Some(Ok(array)) = op.operands.first().map(|o| o.as_array()) {
                        state.show_array(array);
                    }
                }
            }
            "'" => {
                line_matrix[5] -= leading.unwrap_or(state.current_font_size * 1.2);
                state.text_matrix = line_matrix;
                if let Some(operand) = op.operands.first() {
                    state.show_text(operand);
                }
            }
            _ => {}
        }
    }

    state.flush();
    Ok(state.fragments)
}

/// Follow an indirect reference, keeping the object itself if it cannot be resolved
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Page height from the MediaBox, following inherited attributes up the page tree
fn page_height(doc: &Document, page_id: ObjectId) -> f32 {
    let mut current = Some(page_id);
    // Bounded walk; malformed trees can contain parent cycles
    for _ in 0..32 {
        let Some(id) = current else { break };
        let Ok(dict) = doc.get_dictionary(id) else { break };

        if let Ok(media_box) = dict.get(b"MediaBox") {
            if let Ok(values) = resolve(doc, media_box).as_array() {
                let numbers: Vec<f32> = values.iter().filter_map(get_number).collect();
                if numbers.len() == 4 {
                    return (numbers[3] - numbers[1]).abs();
                }
            }
        }

        current = dict.get(b"Parent").and_then(|p| p.as_reference()).ok();
    }
    DEFAULT_PAGE_HEIGHT
}

/// Helper to get f32 from Object
fn get_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Compute effective font size from base size and text matrix
fn effective_font_size(base_size: f32, text_matrix: &[f32; 6]) -> f32 {
    let scale_x = (text_matrix[0].powi(2) + text_matrix[1].powi(2)).sqrt();
    let scale_y = (text_matrix[2].powi(2) + text_matrix[3].powi(2)).sqrt();
    base_size * scale_x.max(scale_y)
}

/// Extract text from a text operand, handling encoding
fn extract_text_from_operand(
    obj: &Object,
    doc: &Document,
    fonts: &BTreeMap<Vec<u8>, &lopdf::Dictionary>,
    current_font: &str,
) -> Option<String> {
    if let Object::String(bytes, _) = obj {
        if let Some(font_dict) = fonts.get(current_font.as_bytes()) {
            if let Ok(encoding) = font_dict.get_font_encoding(doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return Some(text);
                }
            }
        }

        // Fallback: try UTF-16BE then Latin-1
        if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
            let utf16: Vec<u16> = bytes[2..]
                .chunks_exact(2)
                .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
                .collect();
            return Some(String::from_utf16_lossy(&utf16));
        }

        Some(bytes.iter().map(|&b| b as char).collect())
    } else {
        None
    }
}
