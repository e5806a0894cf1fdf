//! Report rendering: one analysis record → a downloadable DOCX or PDF.
//!
//! The critique text follows a small line-oriented convention (`##`
//! subheadings, `**bold**` paragraphs, `-` bullets, plain paragraphs),
//! so rendering starts from a closed line classifier rather than a real
//! markdown parser. Every line classifies into some variant; malformed
//! input cannot make the classifier fail. Renderers produce in-memory
//! buffers only; writing them anywhere is the caller's decision.

pub mod docx;
pub mod pdf;

use chrono::NaiveDateTime;

/// One classified line of the critique text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// `## ...` — subheading, marker stripped.
    Heading(String),
    /// `**...**` — emphasized paragraph, markers stripped.
    Bold(String),
    /// `- ...` — bullet list item, marker stripped.
    Bullet(String),
    /// Anything else with visible content.
    Paragraph(String),
    /// Whitespace only — vertical spacing in the output.
    Blank,
}

/// Classify one line of critique text. Total: every input maps to a
/// variant, checked in order (heading, bold, bullet, blank, paragraph).
pub fn classify(line: &str) -> Line {
    if let Some(rest) = line.strip_prefix("##") {
        return Line::Heading(rest.trim_start_matches('#').trim().to_string());
    }
    let trimmed_end = line.trim_end();
    if trimmed_end.starts_with("**") && trimmed_end.ends_with("**") && trimmed_end.len() >= 4 {
        return Line::Bold(trimmed_end.replace("**", "").trim().to_string());
    }
    if let Some(rest) = line.strip_prefix('-') {
        return Line::Bullet(rest.trim().to_string());
    }
    if line.trim().is_empty() {
        return Line::Blank;
    }
    Line::Paragraph(line.to_string())
}

/// Classify a whole critique, one entry per input line.
pub fn classify_result(text: &str) -> Vec<Line> {
    text.lines().map(classify).collect()
}

/// Everything a renderer needs about one record.
///
/// `generated_at` is supplied by the caller instead of being read from
/// the clock, so rendering the same record twice produces identical
/// bytes.
#[derive(Debug, Clone)]
pub struct ReportInput<'a> {
    pub username: &'a str,
    pub file_name: &'a str,
    pub result: &'a str,
    pub timestamp: &'a str,
    pub generated_at: NaiveDateTime,
    pub system_name: &'a str,
}

/// Suggested download name:
/// `<prefix>_<original-file-stem>_<username>_<YYYYmmdd_HHMMSS>.<ext>`.
pub fn suggested_filename(
    prefix: &str,
    file_name: &str,
    username: &str,
    generated_at: NaiveDateTime,
    ext: &str,
) -> String {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    format!(
        "{}_{}_{}_{}.{}",
        prefix,
        stem,
        username,
        generated_at.format("%Y%m%d_%H%M%S"),
        ext
    )
}
