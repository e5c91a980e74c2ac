//! Minimal PDF 1.4 serialization for laid-out report documents.
//!
//! Only what the report needs is emitted: the two standard Helvetica faces
//! with WinAnsi encoding, one content stream of positioned text per page, and
//! a cross-reference table.

use std::fmt::Write as _;

use encoding_rs::WINDOWS_1252;
use itertools::Itertools;

use crate::report::{Document, FontFace, Page};

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const REGULAR_FONT_ID: usize = 3;
const BOLD_FONT_ID: usize = 4;
const FIRST_PAGE_ID: usize = 5;

struct PdfWriter {
    buffer: Vec<u8>,
    offsets: Vec<usize>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n");
        Self {
            buffer,
            offsets: Vec::new(),
        }
    }

    /// Objects must be written in id order starting at 1.
    fn object(&mut self, id: usize, body: &[u8]) {
        debug_assert_eq!(id, self.offsets.len() + 1);
        self.offsets.push(self.buffer.len());
        self.buffer
            .extend_from_slice(format!("{id} 0 obj\n").as_bytes());
        self.buffer.extend_from_slice(body);
        self.buffer.extend_from_slice(b"\nendobj\n");
    }

    fn stream(&mut self, id: usize, content: &[u8]) {
        let mut body = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(b"\nendstream");
        self.object(id, &body);
    }

    fn finish(mut self) -> Vec<u8> {
        let xref_offset = self.buffer.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = writeln!(xref, "{offset:010} 00000 n ");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.buffer.extend_from_slice(xref.as_bytes());
        self.buffer
    }
}

pub fn render_pdf(document: &Document) -> Vec<u8> {
    let mut writer = PdfWriter::new();
    let page_ids = (0..document.pages.len())
        .map(|idx| FIRST_PAGE_ID + idx * 2)
        .collect::<Vec<_>>();

    writer.object(
        CATALOG_ID,
        format!("<< /Type /Catalog /Pages {PAGES_ID} 0 R >>").as_bytes(),
    );
    let kids = page_ids.iter().map(|id| format!("{id} 0 R")).join(" ");
    writer.object(
        PAGES_ID,
        format!(
            "<< /Type /Pages /Kids [{kids}] /Count {} >>",
            page_ids.len()
        )
        .as_bytes(),
    );
    writer.object(REGULAR_FONT_ID, font_dict("Helvetica").as_bytes());
    writer.object(BOLD_FONT_ID, font_dict("Helvetica-Bold").as_bytes());

    for (page, page_id) in document.pages.iter().zip(&page_ids) {
        let content_id = page_id + 1;
        writer.object(
            *page_id,
            format!(
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 {REGULAR_FONT_ID} 0 R /F2 {BOLD_FONT_ID} 0 R >> >> \
                 /Contents {content_id} 0 R >>",
                format_number(document.page_width),
                format_number(document.page_height)
            )
            .as_bytes(),
        );
        writer.stream(content_id, &page_content(page));
    }

    writer.finish()
}

fn font_dict(base: &str) -> String {
    format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
}

fn page_content(page: &Page) -> Vec<u8> {
    let mut content = Vec::new();
    for run in &page.runs {
        let font = match run.face {
            FontFace::Regular => "F1",
            FontFace::Bold => "F2",
        };
        content.extend_from_slice(
            format!(
                "BT /{font} {} Tf {} {} Td (",
                format_number(run.size),
                format_number(run.x),
                format_number(run.y)
            )
            .as_bytes(),
        );
        content.extend_from_slice(&escape_text(&run.text));
        content.extend_from_slice(b") Tj ET\n");
    }
    content
}

/// Encodes text as a WinAnsi literal string body; bytes outside printable
/// ASCII are written as octal escapes.
fn escape_text(text: &str) -> Vec<u8> {
    let encoded = encode_win_ansi(text);
    let mut escaped = Vec::with_capacity(encoded.len());
    for &byte in &encoded {
        match byte {
            b'(' | b')' | b'\\' => {
                escaped.push(b'\\');
                escaped.push(byte);
            }
            0x20..=0x7e => escaped.push(byte),
            other => escaped.extend_from_slice(format!("\\{other:03o}").as_bytes()),
        }
    }
    escaped
}

/// Characters the standard fonts cannot show become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let (encoded, _, unmappable) = WINDOWS_1252.encode(text);
    if !unmappable {
        return encoded.into_owned();
    }
    let mut buffer = [0u8; 4];
    let mut bytes = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let (single, _, unmappable) = WINDOWS_1252.encode(ch.encode_utf8(&mut buffer));
        if unmappable {
            bytes.push(b'?');
        } else {
            bytes.extend_from_slice(&single);
        }
    }
    bytes
}

fn format_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        let formatted = format!("{value:.2}");
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}
