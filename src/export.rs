//! Report export: raw Markdown bytes and a paginated plain-text PDF.
//!
//! The PDF is deliberately simple: markdown emphasis and heading markers are
//! stripped, lines are hard-wrapped at a fixed character count, and pages
//! break on a fixed bottom margin. Layout is computed first as plain data
//! ([`layout_pages`]) and only then serialised with `lopdf`, so the exact
//! line placement can be tested without parsing PDF content streams.
//!
//! ```text
//! markdown ──▶ markdown_to_text ──▶ layout_pages ──▶ render (lopdf) ──▶ bytes
//! ```

use crate::error::RadNoteError;
use chrono::{DateTime, Local};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::debug;

/// A4 portrait, in points.
pub const PAGE_WIDTH: f64 = 595.275_590_551_181_2;
pub const PAGE_HEIGHT: f64 = 841.889_763_779_527_6;

/// One centimetre in points.
pub const CM: f64 = 72.0 / 2.54;

/// Characters per body line before a hard wrap.
pub const MAX_CHARS_PER_LINE: usize = 110;

const LEFT_MARGIN: f64 = 2.0 * CM;
const BOTTOM_MARGIN: f64 = 2.0 * CM;
const TITLE_Y: f64 = PAGE_HEIGHT - 2.0 * CM;
const FIRST_BODY_Y: f64 = PAGE_HEIGHT - 3.0 * CM;
const CONTINUATION_Y: f64 = PAGE_HEIGHT - 2.0 * CM;
const LINE_ADVANCE: f64 = 12.0;
const BLANK_ADVANCE: f64 = 10.0;

const TITLE_SIZE: f64 = 14.0;
const BODY_SIZE: f64 = 10.0;

/// Base-14 font used for a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfFont {
    Helvetica,
    HelveticaBold,
}

impl PdfFont {
    fn resource_name(&self) -> &'static str {
        match self {
            PdfFont::Helvetica => "F1",
            PdfFont::HelveticaBold => "F2",
        }
    }
}

/// A single line of text at an absolute position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub x: f64,
    pub y: f64,
    pub font: PdfFont,
    pub size: f64,
    pub text: String,
}

/// Lines drawn on one page, in drawing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

/// UTF-8 bytes of the report, untouched.
pub fn to_markdown_bytes(report: &str) -> Vec<u8> {
    report.as_bytes().to_vec()
}

/// Light markdown cleanup for the PDF body.
///
/// Removes `**` and `__`, then every `### `, `## ` and `# ` marker, line by
/// line, and trims the result.
pub fn markdown_to_text(md: &str) -> String {
    md.lines()
        .map(|line| {
            line.replace("**", "")
                .replace("__", "")
                .replace("### ", "")
                .replace("## ", "")
                .replace("# ", "")
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Split after `n` characters (not bytes).
fn split_at_char(s: &str, n: usize) -> (&str, &str) {
    match s.char_indices().nth(n) {
        Some((idx, _)) => s.split_at(idx),
        None => (s, ""),
    }
}

/// Place the title and every body line of `report` onto pages.
///
/// The final page is always emitted, so the result is never empty. A line
/// that moves the cursor past the bottom margin opens a new page even when
/// nothing follows it, so the last page may be blank.
pub fn layout_pages(title: &str, report: &str) -> Vec<PageLayout> {
    let text = markdown_to_text(report);
    let mut pages = Vec::new();
    let mut page = PageLayout::default();

    page.lines.push(PlacedLine {
        x: LEFT_MARGIN,
        y: TITLE_Y,
        font: PdfFont::HelveticaBold,
        size: TITLE_SIZE,
        text: title.to_string(),
    });

    let mut y = FIRST_BODY_Y;

    for raw_line in text.lines() {
        if raw_line.trim().is_empty() {
            y -= BLANK_ADVANCE;
            continue;
        }

        let mut line = raw_line;
        while line.chars().count() > MAX_CHARS_PER_LINE {
            let (chunk, rest) = split_at_char(line, MAX_CHARS_PER_LINE);
            draw_body_line(&mut page, &mut pages, &mut y, chunk);
            line = rest;
        }
        draw_body_line(&mut page, &mut pages, &mut y, line);
    }

    pages.push(page);
    pages
}

/// Draw one body line at `y`, advance, and break the page past the margin.
fn draw_body_line(page: &mut PageLayout, pages: &mut Vec<PageLayout>, y: &mut f64, text: &str) {
    page.lines.push(PlacedLine {
        x: LEFT_MARGIN,
        y: *y,
        font: PdfFont::Helvetica,
        size: BODY_SIZE,
        text: text.to_string(),
    });
    *y -= LINE_ADVANCE;
    if *y < BOTTOM_MARGIN {
        pages.push(std::mem::take(page));
        *y = CONTINUATION_Y;
    }
}

/// Render `report` as a paginated PDF with `title` on the first page.
pub fn to_pdf_bytes(title: &str, report: &str) -> Result<Vec<u8>, RadNoteError> {
    let pages = layout_pages(title, report);
    debug!("PDF layout: {} page(s)", pages.len());
    render_pdf(&pages)
}

fn render_pdf(pages: &[PageLayout]) -> Result<Vec<u8>, RadNoteError> {
    let pdf_err = |e: &dyn std::fmt::Display| RadNoteError::PdfExport(e.to_string());

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            PdfFont::Helvetica.resource_name() => regular_id,
            PdfFont::HelveticaBold.resource_name() => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = Content {
            operations: page_operations(page),
        };
        let encoded = content.encode().map_err(|e| pdf_err(&e))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
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
                Object::from(PAGE_WIDTH as f32),
                Object::from(PAGE_HEIGHT as f32),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buf = Vec::new();
    doc.save_to(&mut buf).map_err(|e| pdf_err(&e))?;
    Ok(buf)
}

fn page_operations(page: &PageLayout) -> Vec<Operation> {
    let mut ops = Vec::with_capacity(page.lines.len() * 5);
    for line in &page.lines {
        ops.push(Operation::new("BT", vec![]));
        ops.push(Operation::new(
            "Tf",
            vec![line.font.resource_name().into(), Object::from(line.size as f32)],
        ));
        ops.push(Operation::new(
            "Td",
            vec![Object::from(line.x as f32), Object::from(line.y as f32)],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::string_literal(to_win_ansi(&line.text))],
        ));
        ops.push(Operation::new("ET", vec![]));
    }
    ops
}

/// Encode text for the standard fonts' WinAnsi encoding.
///
/// Characters outside the code page become `?`; zero-width characters and
/// emoji variation selectors are dropped.
fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !matches!(c, '\u{200B}'..='\u{200D}' | '\u{FE00}'..='\u{FE0F}' | '\u{FEFF}'))
        .map(|c| match c {
            '\t' => b' ',
            c if (c as u32) < 0x20 => b' ',
            c if (c as u32) < 0x7F => c as u8,
            c if (0xA0..=0xFF).contains(&(c as u32)) => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}

/// `medical_report_YYYYMMDD_HHMMSS.<ext>`
pub fn report_file_name(now: &DateTime<Local>, ext: &str) -> String {
    format!("medical_report_{}.{}", now.format("%Y%m%d_%H%M%S"), ext)
}
