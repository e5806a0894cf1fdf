//! PDF report rendering.
//!
//! Builds a paginated letter-size PDF with `lopdf`: Helvetica base fonts,
//! WinAnsi encoding, greedy word wrapping, and page breaks driven by a
//! vertical cursor. Text outside WinAnsi coverage is a typed generation
//! failure that propagates to the caller; there is no lossy substitution
//! and no retry.

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use super::{classify_result, Line, ReportInput};

// Letter geometry, in points.
const PAGE_WIDTH: f32 = 612.0;
const PAGE_HEIGHT: f32 = 792.0;
const MARGIN_LEFT: f32 = 54.0;
const MARGIN_RIGHT: f32 = 54.0;
const MARGIN_TOP: f32 = 72.0;
const MARGIN_BOTTOM: f32 = 54.0;

const SIZE_TITLE: f32 = 24.0;
const SIZE_HEADING: f32 = 14.0;
const SIZE_BODY: f32 = 11.0;
const SIZE_FOOTER: f32 = 9.0;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// Average Helvetica glyph width as a fraction of the font size; used for
/// wrapping and centering estimates.
const AVG_GLYPH_WIDTH: f32 = 0.5;

const LINE_SPACING: f32 = 1.4;
const BULLET_INDENT: f32 = 14.0;
const LABEL_COLUMN: f32 = 90.0;

/// A character the WinAnsi code page cannot represent.
#[derive(Debug)]
pub struct UnencodableChar(pub char);

impl std::fmt::Display for UnencodableChar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "character {:?} (U+{:04X}) is not representable in the report font",
            self.0, self.0 as u32
        )
    }
}

impl std::error::Error for UnencodableChar {}

/// Encode text as WinAnsi bytes. ASCII and Latin-1 pass through; the
/// common typographic characters models like to emit get their WinAnsi
/// slots; anything else is an error.
fn encode_winansi(text: &str) -> Result<Vec<u8>, UnencodableChar> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        let b = match c {
            '\t' => 0x20,
            ' '..='~' => c as u8,
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en dash
            '\u{2014}' => 0x97, // em dash
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            other => return Err(UnencodableChar(other)),
        };
        bytes.push(b);
    }
    Ok(bytes)
}

/// Greedy word wrap to a character budget. Words longer than the budget
/// are hard-split so a pathological token cannot overflow the page.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(head);
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn chars_per_line(size: f32, indent: f32) -> usize {
    ((PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT - indent) / (size * AVG_GLYPH_WIDTH)) as usize
}

/// Accumulates content operations page by page, breaking when the
/// vertical cursor reaches the bottom margin.
struct Composer {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl Composer {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN_TOP,
        }
    }

    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed < MARGIN_BOTTOM {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN_TOP;
        }
    }

    fn spacer(&mut self, height: f32) {
        self.y -= height;
    }

    fn ops(&mut self) -> &mut Vec<Operation> {
        self.pages.last_mut().expect("composer always has a page")
    }

    fn text_at(&mut self, text: &str, font: &str, size: f32, x: f32, gray: Option<f32>) -> Result<()> {
        let encoded = encode_winansi(text)?;
        let y = self.y;
        let ops = self.ops();
        if let Some(level) = gray {
            ops.push(Operation::new("g", vec![level.into()]));
        }
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
        ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encoded, StringFormat::Literal)],
        ));
        ops.push(Operation::new("ET", vec![]));
        if gray.is_some() {
            ops.push(Operation::new("g", vec![0.0f32.into()]));
        }
        Ok(())
    }

    /// One baseline-advanced line at the left margin plus `indent`.
    fn line(&mut self, text: &str, font: &str, size: f32, indent: f32) -> Result<()> {
        self.ensure_room(size * LINE_SPACING);
        self.y -= size * LINE_SPACING;
        self.text_at(text, font, size, MARGIN_LEFT + indent, None)
    }

    fn centered_line(&mut self, text: &str, font: &str, size: f32, gray: Option<f32>) -> Result<()> {
        self.ensure_room(size * LINE_SPACING);
        self.y -= size * LINE_SPACING;
        let estimated = text.chars().count() as f32 * size * AVG_GLYPH_WIDTH;
        let x = ((PAGE_WIDTH - estimated) / 2.0).max(MARGIN_LEFT);
        self.text_at(text, font, size, x, gray)
    }

    /// `label` in bold at the margin, `value` in the value column, one
    /// baseline.
    fn labeled_line(&mut self, label: &str, value: &str, size: f32) -> Result<()> {
        self.ensure_room(size * LINE_SPACING);
        self.y -= size * LINE_SPACING;
        self.text_at(label, FONT_BOLD, size, MARGIN_LEFT, None)?;
        self.text_at(value, FONT_REGULAR, size, MARGIN_LEFT + LABEL_COLUMN, None)
    }

    fn wrapped(&mut self, text: &str, font: &str, size: f32, indent: f32) -> Result<()> {
        for piece in wrap(text, chars_per_line(size, indent)) {
            self.line(&piece, font, size, indent)?;
        }
        Ok(())
    }
}

/// Render one analysis record as a paginated PDF buffer.
pub fn render_pdf(input: &ReportInput) -> Result<Vec<u8>> {
    let mut composer = Composer::new();

    composer.centered_line("Project Analysis Report", FONT_BOLD, SIZE_TITLE, None)?;
    composer.centered_line(input.system_name, FONT_BOLD, SIZE_HEADING, None)?;
    composer.spacer(14.0);

    composer.labeled_line("User:", input.username, SIZE_BODY)?;
    composer.labeled_line("File:", input.file_name, SIZE_BODY)?;
    composer.labeled_line("Analyzed:", input.timestamp, SIZE_BODY)?;
    composer.labeled_line("System:", input.system_name, SIZE_BODY)?;
    composer.spacer(14.0);

    composer.line("Analysis result", FONT_BOLD, SIZE_HEADING, 0.0)?;
    composer.spacer(4.0);

    for line in classify_result(input.result) {
        match line {
            Line::Heading(text) => {
                composer.spacer(6.0);
                composer.wrapped(&text, FONT_BOLD, SIZE_HEADING, 0.0)?;
            }
            Line::Bold(text) => composer.wrapped(&text, FONT_BOLD, SIZE_BODY, 0.0)?,
            Line::Bullet(text) => {
                composer.wrapped(&format!("\u{2022} {}", text), FONT_REGULAR, SIZE_BODY, BULLET_INDENT)?
            }
            Line::Paragraph(text) => composer.wrapped(&text, FONT_REGULAR, SIZE_BODY, 0.0)?,
            Line::Blank => composer.spacer(SIZE_BODY * 0.8),
        }
    }

    composer.spacer(18.0);
    let footer = format!(
        "Generated by {} | {}",
        input.system_name,
        input.generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    composer.centered_line(&footer, FONT_REGULAR, SIZE_FOOTER, Some(0.5))?;

    build_document(composer.pages)
}

fn build_document(pages: Vec<Vec<Operation>>) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let font_bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => font_regular,
            FONT_BOLD => font_bold,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for operations in pages {
        let content = Content { operations };
        let stream_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => stream_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                PAGE_WIDTH.into(),
                PAGE_HEIGHT.into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_input() -> ReportInput<'static> {
        ReportInput {
            username: "alice",
            file_name: "project.pdf",
            result: "## Analysis\n**Objectives found:**\n- study satisfaction\n\nOverall coherent.",
            timestamp: "2026-03-14T09:26:53.000000",
            generated_at: NaiveDate::from_ymd_opt(2026, 3, 14)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            system_name: "AI Project Grader",
        }
    }

    #[test]
    fn winansi_covers_ascii_and_typographic_extras() {
        assert_eq!(encode_winansi("plain").unwrap(), b"plain".to_vec());
        assert_eq!(encode_winansi("\u{2022}").unwrap(), vec![0x95]);
        assert_eq!(encode_winansi("caf\u{00E9}").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert!(encode_winansi("\u{0E44}\u{0E17}\u{0E22}").is_err());
    }

    #[test]
    fn wrap_respects_budget_and_splits_long_words() {
        let lines = wrap("alpha beta gamma delta", 11);
        assert_eq!(lines, ["alpha beta", "gamma delta"]);

        let lines = wrap("abcdefghij", 4);
        assert_eq!(lines, ["abcd", "efgh", "ij"]);

        assert_eq!(wrap("", 10), [""]);
    }

    #[test]
    fn renders_a_parseable_pdf() {
        let buffer = render_pdf(&sample_input()).unwrap();
        assert!(buffer.starts_with(b"%PDF-1.5"));
        let doc = Document::load_mem(&buffer).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn long_reports_paginate() {
        let mut result = String::from("## Analysis\n");
        for i in 0..200 {
            result.push_str(&format!("- finding number {} with some explanation text\n", i));
        }
        let input = sample_input();
        let input = ReportInput {
            result: &result,
            ..input
        };
        let buffer = render_pdf(&input).unwrap();
        let doc = Document::load_mem(&buffer).unwrap();
        assert!(doc.get_pages().len() > 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = sample_input();
        assert_eq!(render_pdf(&input).unwrap(), render_pdf(&input).unwrap());
    }

    #[test]
    fn unencodable_text_fails_generation() {
        let input = sample_input();
        let input = ReportInput {
            result: "objective \u{4E2D}\u{6587}",
            ..input
        };
        assert!(render_pdf(&input).is_err());
    }
}
