//! DOCX report rendering.
//!
//! Builds a minimal OOXML package — `[Content_Types].xml`, `_rels/.rels`,
//! `word/document.xml` — with `quick-xml` for the document part and `zip`
//! for the container. Formatting is applied directly on runs rather than
//! through a styles part, which keeps the package to the three entries a
//! word processor actually requires.
//!
//! Zip entry timestamps are pinned, so the same input renders to the same
//! bytes.

use anyhow::Result;
use chrono::NaiveDateTime;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

use super::{classify_result, Line, ReportInput};
use crate::models::AnalysisRecord;

/// Heading accent, matching the dashboard theme.
const ACCENT_COLOR: &str = "2E86DE";
const FOOTER_COLOR: &str = "969696";

const SZ_TITLE: &str = "56";
const SZ_SUBTITLE: &str = "28";
const SZ_SECTION: &str = "26";
const SZ_HEADING: &str = "24";
const SZ_FOOTER: &str = "18";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

type Xml = Writer<Cursor<Vec<u8>>>;

fn open(w: &mut Xml, name: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn open_with(w: &mut Xml, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut el = BytesStart::new(name);
    for (k, v) in attrs {
        el.push_attribute((*k, *v));
    }
    w.write_event(Event::Start(el))?;
    Ok(())
}

fn empty_with(w: &mut Xml, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut el = BytesStart::new(name);
    for (k, v) in attrs {
        el.push_attribute((*k, *v));
    }
    w.write_event(Event::Empty(el))?;
    Ok(())
}

fn close(w: &mut Xml, name: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[derive(Default, Clone, Copy)]
struct RunStyle<'a> {
    bold: bool,
    size: Option<&'a str>,
    color: Option<&'a str>,
}

fn write_run(w: &mut Xml, text: &str, style: RunStyle) -> Result<()> {
    open(w, "w:r")?;
    if style.bold || style.size.is_some() || style.color.is_some() {
        open(w, "w:rPr")?;
        if style.bold {
            empty_with(w, "w:b", &[])?;
        }
        if let Some(sz) = style.size {
            empty_with(w, "w:sz", &[("w:val", sz)])?;
            empty_with(w, "w:szCs", &[("w:val", sz)])?;
        }
        if let Some(color) = style.color {
            empty_with(w, "w:color", &[("w:val", color)])?;
        }
        close(w, "w:rPr")?;
    }
    open_with(w, "w:t", &[("xml:space", "preserve")])?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    close(w, "w:t")?;
    close(w, "w:r")?;
    Ok(())
}

#[derive(Default, Clone, Copy)]
struct ParaStyle<'a> {
    align: Option<&'a str>,
    indent_left: Option<&'a str>,
}

fn write_paragraph(w: &mut Xml, para: ParaStyle, runs: &[(&str, RunStyle)]) -> Result<()> {
    open(w, "w:p")?;
    if para.align.is_some() || para.indent_left.is_some() {
        open(w, "w:pPr")?;
        if let Some(indent) = para.indent_left {
            empty_with(w, "w:ind", &[("w:left", indent)])?;
        }
        if let Some(align) = para.align {
            empty_with(w, "w:jc", &[("w:val", align)])?;
        }
        close(w, "w:pPr")?;
    }
    for (text, style) in runs {
        write_run(w, text, *style)?;
    }
    close(w, "w:p")?;
    Ok(())
}

fn blank_paragraph(w: &mut Xml) -> Result<()> {
    write_paragraph(w, ParaStyle::default(), &[])
}

fn section_heading(w: &mut Xml, text: &str) -> Result<()> {
    write_paragraph(
        w,
        ParaStyle::default(),
        &[(
            text,
            RunStyle {
                bold: true,
                size: Some(SZ_SECTION),
                color: Some(ACCENT_COLOR),
            },
        )],
    )
}

fn table_open(w: &mut Xml, col_widths: &[&str]) -> Result<()> {
    open(w, "w:tbl")?;
    open(w, "w:tblPr")?;
    empty_with(w, "w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
    open(w, "w:tblBorders")?;
    for side in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
        empty_with(
            w,
            side,
            &[("w:val", "single"), ("w:sz", "4"), ("w:color", "auto")],
        )?;
    }
    close(w, "w:tblBorders")?;
    close(w, "w:tblPr")?;
    open(w, "w:tblGrid")?;
    for width in col_widths {
        empty_with(w, "w:gridCol", &[("w:w", width)])?;
    }
    close(w, "w:tblGrid")?;
    Ok(())
}

fn table_row(w: &mut Xml, cells: &[(&str, bool)]) -> Result<()> {
    open(w, "w:tr")?;
    for (text, bold) in cells {
        open(w, "w:tc")?;
        open(w, "w:tcPr")?;
        empty_with(w, "w:tcW", &[("w:w", "0"), ("w:type", "auto")])?;
        close(w, "w:tcPr")?;
        write_paragraph(
            w,
            ParaStyle::default(),
            &[(
                text,
                RunStyle {
                    bold: *bold,
                    ..RunStyle::default()
                },
            )],
        )?;
        close(w, "w:tc")?;
    }
    close(w, "w:tr")?;
    Ok(())
}

fn document_open(w: &mut Xml) -> Result<()> {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    open_with(
        w,
        "w:document",
        &[(
            "xmlns:w",
            "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
        )],
    )?;
    open(w, "w:body")?;
    Ok(())
}

fn document_close(w: &mut Xml) -> Result<()> {
    // One-inch margins all around.
    open(w, "w:sectPr")?;
    empty_with(
        w,
        "w:pgMar",
        &[
            ("w:top", "1440"),
            ("w:right", "1440"),
            ("w:bottom", "1440"),
            ("w:left", "1440"),
        ],
    )?;
    close(w, "w:sectPr")?;
    close(w, "w:body")?;
    close(w, "w:document")?;
    Ok(())
}

fn footer_line(w: &mut Xml, system_name: &str, generated_at: NaiveDateTime) -> Result<()> {
    let text = format!(
        "Generated by {} | {}",
        system_name,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    );
    write_paragraph(
        w,
        ParaStyle {
            align: Some("center"),
            ..ParaStyle::default()
        },
        &[(
            text.as_str(),
            RunStyle {
                bold: false,
                size: Some(SZ_FOOTER),
                color: Some(FOOTER_COLOR),
            },
        )],
    )
}

fn write_critique_body(w: &mut Xml, result: &str) -> Result<()> {
    for line in classify_result(result) {
        match line {
            Line::Heading(text) => write_paragraph(
                w,
                ParaStyle::default(),
                &[(
                    text.as_str(),
                    RunStyle {
                        bold: true,
                        size: Some(SZ_HEADING),
                        color: None,
                    },
                )],
            )?,
            Line::Bold(text) => write_paragraph(
                w,
                ParaStyle::default(),
                &[(
                    text.as_str(),
                    RunStyle {
                        bold: true,
                        ..RunStyle::default()
                    },
                )],
            )?,
            Line::Bullet(text) => {
                let item = format!("\u{2022} {}", text);
                write_paragraph(
                    w,
                    ParaStyle {
                        indent_left: Some("360"),
                        ..ParaStyle::default()
                    },
                    &[(item.as_str(), RunStyle::default())],
                )?;
            }
            Line::Paragraph(text) => {
                write_paragraph(w, ParaStyle::default(), &[(text.as_str(), RunStyle::default())])?
            }
            Line::Blank => {}
        }
    }
    Ok(())
}

/// Package the document part into the OOXML zip container.
fn package(document_xml: &[u8]) -> Result<Vec<u8>> {
    let mut archive = zip::ZipWriter::new(Cursor::new(Vec::new()));
    // Pinned entry timestamp keeps output byte-stable across renders.
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default());

    archive.start_file("[Content_Types].xml", options)?;
    archive.write_all(CONTENT_TYPES.as_bytes())?;
    archive.start_file("_rels/.rels", options)?;
    archive.write_all(ROOT_RELS.as_bytes())?;
    archive.start_file("word/document.xml", options)?;
    archive.write_all(document_xml)?;

    Ok(archive.finish()?.into_inner())
}

/// Render one analysis record as a DOCX buffer.
pub fn render_docx(input: &ReportInput) -> Result<Vec<u8>> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    document_open(&mut w)?;

    write_paragraph(
        &mut w,
        ParaStyle {
            align: Some("center"),
            ..ParaStyle::default()
        },
        &[(
            "Project Analysis Report",
            RunStyle {
                bold: true,
                size: Some(SZ_TITLE),
                color: Some(ACCENT_COLOR),
            },
        )],
    )?;
    write_paragraph(
        &mut w,
        ParaStyle {
            align: Some("center"),
            ..ParaStyle::default()
        },
        &[(
            input.system_name,
            RunStyle {
                bold: true,
                size: Some(SZ_SUBTITLE),
                color: None,
            },
        )],
    )?;
    blank_paragraph(&mut w)?;

    section_heading(&mut w, "Analysis details")?;
    table_open(&mut w, &["2880", "5760"])?;
    table_row(&mut w, &[("User", true), (input.username, false)])?;
    table_row(&mut w, &[("File", true), (input.file_name, false)])?;
    table_row(&mut w, &[("Analyzed", true), (input.timestamp, false)])?;
    table_row(&mut w, &[("System", true), (input.system_name, false)])?;
    close(&mut w, "w:tbl")?;
    blank_paragraph(&mut w)?;

    section_heading(&mut w, "Analysis result")?;
    write_critique_body(&mut w, input.result)?;
    blank_paragraph(&mut w)?;

    footer_line(&mut w, input.system_name, input.generated_at)?;
    document_close(&mut w)?;

    package(&w.into_inner().into_inner())
}

/// Render a user's whole history as a summary DOCX: headline statistics
/// plus one table row per stored analysis.
pub fn render_summary_docx(
    username: &str,
    history: &[AnalysisRecord],
    generated_at: NaiveDateTime,
    system_name: &str,
) -> Result<Vec<u8>> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    document_open(&mut w)?;

    write_paragraph(
        &mut w,
        ParaStyle {
            align: Some("center"),
            ..ParaStyle::default()
        },
        &[(
            "Analysis History Summary",
            RunStyle {
                bold: true,
                size: Some(SZ_TITLE),
                color: Some(ACCENT_COLOR),
            },
        )],
    )?;
    write_paragraph(
        &mut w,
        ParaStyle::default(),
        &[
            (
                "User: ",
                RunStyle {
                    bold: true,
                    ..RunStyle::default()
                },
            ),
            (username, RunStyle::default()),
        ],
    )?;
    let generated = generated_at.format("%Y-%m-%d %H:%M:%S").to_string();
    write_paragraph(
        &mut w,
        ParaStyle::default(),
        &[
            (
                "Generated: ",
                RunStyle {
                    bold: true,
                    ..RunStyle::default()
                },
            ),
            (generated.as_str(), RunStyle::default()),
        ],
    )?;
    blank_paragraph(&mut w)?;

    section_heading(&mut w, "Summary statistics")?;
    let latest = history
        .first()
        .map(|r| r.timestamp.as_str())
        .unwrap_or("never");
    let distinct_files = history
        .iter()
        .map(|r| r.file_name.as_str())
        .collect::<BTreeSet<_>>()
        .len();
    let total = history.len().to_string();
    let distinct = distinct_files.to_string();
    table_open(&mut w, &["4320", "4320"])?;
    table_row(&mut w, &[("Total analyses", true), (total.as_str(), false)])?;
    table_row(&mut w, &[("Most recent", true), (latest, false)])?;
    table_row(&mut w, &[("Distinct files", true), (distinct.as_str(), false)])?;
    close(&mut w, "w:tbl")?;
    blank_paragraph(&mut w)?;

    section_heading(&mut w, "History")?;
    if history.is_empty() {
        write_paragraph(
            &mut w,
            ParaStyle::default(),
            &[("No analyses yet.", RunStyle::default())],
        )?;
    } else {
        table_open(&mut w, &["3600", "3240", "1800"])?;
        table_row(
            &mut w,
            &[("File", true), ("Timestamp", true), ("Size (chars)", true)],
        )?;
        for record in history {
            // Seconds precision is enough for the listing.
            let ts: String = record.timestamp.chars().take(19).collect();
            let size = record.file_size_chars.to_string();
            table_row(
                &mut w,
                &[
                    (record.file_name.as_str(), false),
                    (ts.as_str(), false),
                    (size.as_str(), false),
                ],
            )?;
        }
        close(&mut w, "w:tbl")?;
    }
    blank_paragraph(&mut w)?;

    footer_line(&mut w, system_name, generated_at)?;
    document_close(&mut w)?;

    package(&w.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Read;

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

    fn document_xml(buffer: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(buffer)).unwrap();
        let mut entry = archive.by_name("word/document.xml").unwrap();
        let mut xml = String::new();
        entry.read_to_string(&mut xml).unwrap();
        xml
    }

    #[test]
    fn package_contains_required_parts() {
        let buffer = render_docx(&sample_input()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(&buffer[..])).unwrap();
        for name in ["[Content_Types].xml", "_rels/.rels", "word/document.xml"] {
            assert!(archive.by_name(name).is_ok(), "missing {}", name);
        }
    }

    #[test]
    fn body_carries_classified_lines() {
        let xml = document_xml(&render_docx(&sample_input()).unwrap());
        assert!(xml.contains("Analysis result"));
        assert!(xml.contains("Objectives found:"));
        assert!(xml.contains("\u{2022} study satisfaction"));
        assert!(xml.contains("Overall coherent."));
        // Heading marker must be stripped, not rendered.
        assert!(!xml.contains("## Analysis"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let input = sample_input();
        let first = render_docx(&input).unwrap();
        let second = render_docx(&input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn summary_handles_empty_history() {
        let buffer = render_summary_docx(
            "alice",
            &[],
            NaiveDate::from_ymd_opt(2026, 3, 14)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            "AI Project Grader",
        )
        .unwrap();
        let xml = document_xml(&buffer);
        assert!(xml.contains("No analyses yet."));
        assert!(xml.contains("never"));
    }
}
