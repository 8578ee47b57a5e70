//! Post-processing: deterministic cleanup of extracted text and model output.
//!
//! pdfium's text layer and tesseract both leave artefacts that make the text
//! harder to prompt with and harder to check for emptiness: CRLF line
//! endings, form feeds between pages, zero-width characters, runs of blank
//! lines from page margins. Model output has its own quirk: list-shaped
//! answers often come back wrapped in a ```` ``` ```` fence.
//!
//! Each rule is a pure `&str → String` function; [`clean_text`] and
//! [`clean_response`] chain them in a fixed order.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise extracted document text.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Remove form feeds (tesseract ends every page with `\x0c`)
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive newlines to a single blank line
/// 6. Trim the whole text
///
/// The result is empty when the input held no visible text.
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = s.replace('\x0c', "\n");
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

/// Prepare a model response for the block parsers.
///
/// Normalises line endings and strips a single outer code fence.
pub fn clean_response(input: &str) -> String {
    let s = normalise_line_endings(input);
    strip_outer_fence(&s)
}

// ── Rule: Normalise line endings ─────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule: Strip invisible Unicode ────────────────────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

// ── Rule: Trim trailing whitespace per line ──────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule: Collapse excessive blank lines ─────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule: Strip outer code fence ─────────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\n(.*?)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    let trimmed = input.trim();
    match RE_OUTER_FENCE.captures(trimmed) {
        Some(caps) => caps[1].to_string(),
        None => trimmed.to_string(),
    }
}
