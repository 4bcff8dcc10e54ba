//! Cleanup of the linearized page text
//!
//! Collapses whitespace and drops boilerplate lines: page numbers, page
//! labels and fragments too short to carry content.

use once_cell::sync::Lazy;
use regex::Regex;

/// Lines shorter than this (in characters) are treated as noise
const MIN_LINE_CHARS: usize = 3;

static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n\s*\n").unwrap());
static HORIZONTAL_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static PAGE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static PAGE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^page(\s*\d+(\s*(of|/)\s*\d+)?)?$").unwrap());

/// Clean extracted text: one line per kept line, no blank lines
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = BLANK_LINES_RE.replace_all(text, "\n\n");
    let text = HORIZONTAL_WS_RE.replace_all(&text, " ");
    let text = text.replace("\n ", "\n");

    text.lines()
        .map(str::trim)
        .filter(|line| !is_boilerplate(line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Empty lines, page numbers, page labels and very short lines
fn is_boilerplate(line: &str) -> bool {
    line.is_empty()
        || PAGE_NUMBER_RE.is_match(line)
        || PAGE_LABEL_RE.is_match(line)
        || line.chars().count() < MIN_LINE_CHARS
}
