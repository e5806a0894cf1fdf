//! Structural checks of generated report documents: the DOCX container is
//! unzipped and its XML scanned, and the PDF is re-parsed with the same
//! extraction stack the analyze pipeline uses on uploads.

use std::io::{Cursor, Read};

use chrono::{NaiveDate, NaiveDateTime};
use grader_harness::extract;
use grader_harness::models::AnalysisRecord;
use grader_harness::render::{self, docx, pdf, ReportInput};

fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 14)
        .unwrap()
        .and_hms_opt(10, 30, 0)
        .unwrap()
}

fn sample_input() -> ReportInput<'static> {
    ReportInput {
        username: "alice",
        file_name: "satisfaction_study.pdf",
        result: "## Analysis\n\
                 **Objectives found:**\n\
                 - measure student satisfaction\n\
                 - improve learning outcomes\n\
                 **Verdict per objective:**\n\
                 - objective 1: supported by the survey numbers\n\
                 \n\
                 The conclusions answer the stated objectives.",
        timestamp: "2026-03-13T18:42:10.000000",
        generated_at: generated_at(),
        system_name: "AI Project Grader",
    }
}

fn docx_document_xml(buffer: &[u8]) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(buffer)).unwrap();
    let mut entry = archive.by_name("word/document.xml").unwrap();
    let mut xml = String::new();
    entry.read_to_string(&mut xml).unwrap();
    xml
}

#[test]
fn docx_document_xml_is_well_formed() {
    let buffer = docx::render_docx(&sample_input()).unwrap();
    let xml = docx_document_xml(&buffer);

    let mut reader = quick_xml::Reader::from_str(&xml);
    let mut depth = 0i32;
    let mut paragraphs = 0usize;
    loop {
        match reader.read_event().unwrap() {
            quick_xml::events::Event::Start(e) => {
                depth += 1;
                if e.name().as_ref() == b"w:p" {
                    paragraphs += 1;
                }
            }
            quick_xml::events::Event::End(_) => depth -= 1,
            quick_xml::events::Event::Eof => break,
            _ => {}
        }
    }
    assert_eq!(depth, 0, "unbalanced elements");
    // Title, subtitle, metadata, section headings, body lines, footer.
    assert!(paragraphs > 10, "only {} paragraphs", paragraphs);
}

#[test]
fn docx_round_trips_through_the_upload_extractor() {
    let buffer = docx::render_docx(&sample_input()).unwrap();
    let text = extract::extract_text(&buffer, extract::MIME_DOCX).unwrap();

    assert!(text.contains("Project Analysis Report"));
    assert!(text.contains("measure student satisfaction"));
    assert!(text.contains("The conclusions answer the stated objectives."));
}

#[test]
fn pdf_text_is_recoverable() {
    let buffer = pdf::render_pdf(&sample_input()).unwrap();
    let text = pdf_extract::extract_text_from_mem(&buffer).unwrap();

    assert!(text.contains("Project Analysis Report"));
    assert!(text.contains("Analysis result"));
    assert!(text.contains("satisfaction"));
}

#[test]
fn rendering_twice_is_byte_identical() {
    let input = sample_input();

    let docx_first = docx::render_docx(&input).unwrap();
    let docx_second = docx::render_docx(&input).unwrap();
    assert_eq!(docx_first, docx_second);

    let pdf_first = pdf::render_pdf(&input).unwrap();
    let pdf_second = pdf::render_pdf(&input).unwrap();
    assert_eq!(pdf_first, pdf_second);
}

#[test]
fn summary_report_lists_every_record() {
    let history = vec![
        AnalysisRecord {
            id: 2,
            username: "alice".into(),
            timestamp: "2026-03-13T18:42:10.000000".into(),
            file_name: "beta.pdf".into(),
            file_size_chars: 210,
            result: "**Coherent**".into(),
        },
        AnalysisRecord {
            id: 1,
            username: "alice".into(),
            timestamp: "2026-03-10T09:00:00.000000".into(),
            file_name: "alpha.docx".into(),
            file_size_chars: 140,
            result: "plain".into(),
        },
    ];

    let buffer =
        docx::render_summary_docx("alice", &history, generated_at(), "AI Project Grader").unwrap();
    let xml = docx_document_xml(&buffer);

    assert!(xml.contains("Analysis History Summary"));
    assert!(xml.contains("alpha.docx"));
    assert!(xml.contains("beta.pdf"));
    // Timestamps are shown to seconds precision.
    assert!(xml.contains("2026-03-13T18:42:10"));
    assert!(!xml.contains("2026-03-13T18:42:10.000000"));
    assert!(xml.contains("Distinct files"));
}

#[test]
fn suggested_filenames_match_for_both_formats() {
    let name_docx =
        render::suggested_filename("report", "proj.pdf", "alice", generated_at(), "docx");
    let name_pdf = render::suggested_filename("report", "proj.pdf", "alice", generated_at(), "pdf");
    assert_eq!(name_docx, "report_proj_alice_20260314_103000.docx");
    assert_eq!(name_pdf, "report_proj_alice_20260314_103000.pdf");
}

#[test]
fn localized_prefix_flows_into_the_filename() {
    let name = render::suggested_filename("rapport", "projet.pdf", "chloe", generated_at(), "pdf");
    assert!(name.starts_with("rapport_projet_chloe_"));
}
