//! Paginated report layout for the most recent history records.
//!
//! Layout works in PDF points with the origin at the bottom-left corner, so
//! the vertical cursor decreases as content is written. A record block is
//! only started when the cursor still has the minimum headroom above the page
//! bottom; otherwise a new page is opened first, which keeps every block on a
//! single page.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use clap::ValueEnum;

use crate::record::AggregateRecord;

pub const REPORT_TITLE: &str = "Chemical Equipment Parameter Report";
pub const NO_DATA_LINE: &str = "No data available.";

/// Height of the A4 page every default measurement below was chosen for.
const REFERENCE_PAGE_HEIGHT: f32 = 841.89;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
}

impl PageSize {
    pub fn dimensions(self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::Letter => (612.0, 792.0),
        }
    }
}

/// Positions and spacing used by the layout, in points.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub title_y: f32,
    pub generated_y: f32,
    pub first_record_y: f32,
    pub top_margin: f32,
    pub min_headroom: f32,
    pub header_x: f32,
    pub detail_x: f32,
    pub header_step: f32,
    pub detail_step: f32,
    pub block_gap: f32,
}

impl Default for ReportGeometry {
    fn default() -> Self {
        Self::for_page(PageSize::default())
    }
}

impl ReportGeometry {
    /// Vertical measurements scale with page height; horizontal ones are kept.
    pub fn for_page(size: PageSize) -> Self {
        let (page_width, page_height) = size.dimensions();
        let scale = page_height / REFERENCE_PAGE_HEIGHT;
        Self {
            page_width,
            page_height,
            title_y: 800.0 * scale,
            generated_y: 780.0 * scale,
            first_record_y: 750.0 * scale,
            top_margin: 800.0 * scale,
            min_headroom: 200.0 * scale,
            header_x: 100.0,
            detail_x: 120.0,
            header_step: 20.0 * scale,
            detail_step: 15.0 * scale,
            block_gap: 40.0 * scale,
        }
    }

    /// Vertical space consumed by one record block, including the gap after it.
    pub fn block_height(&self) -> f32 {
        self.header_step + 5.0 * self.detail_step + self.block_gap
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub face: FontFace,
    pub size: f32,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub runs: Vec<TextRun>,
}

/// A finished document: every page has been closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub page_width: f32,
    pub page_height: f32,
    pub pages: Vec<Page>,
}

impl Document {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    #[cfg(test)]
    pub(crate) fn lines(&self) -> impl Iterator<Item = &str> + '_ {
        self.pages
            .iter()
            .flat_map(|page| page.runs.iter().map(|run| run.text.as_str()))
    }
}

/// Drawing surface that accumulates pages. Consuming it with [`finish`]
/// closes the page in progress, so no page can be left half-written.
///
/// [`finish`]: ReportCanvas::finish
struct ReportCanvas {
    width: f32,
    height: f32,
    pages: Vec<Page>,
    current: Page,
    face: FontFace,
    size: f32,
}

impl ReportCanvas {
    fn new(geometry: &ReportGeometry) -> Self {
        Self {
            width: geometry.page_width,
            height: geometry.page_height,
            pages: Vec::new(),
            current: Page::default(),
            face: FontFace::Regular,
            size: 10.0,
        }
    }

    fn set_font(&mut self, face: FontFace, size: f32) {
        self.face = face;
        self.size = size;
    }

    fn draw_string(&mut self, x: f32, y: f32, text: impl Into<String>) {
        self.current.runs.push(TextRun {
            x,
            y,
            face: self.face,
            size: self.size,
            text: text.into(),
        });
    }

    fn show_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
    }

    fn finish(mut self) -> Document {
        self.show_page();
        Document {
            page_width: self.width,
            page_height: self.height,
            pages: self.pages,
        }
    }
}

/// Lays out `records` in the order given. Upload dates are shown in the time
/// zone of `generated_at`.
pub fn layout_report<Tz>(
    records: &[AggregateRecord],
    generated_at: &DateTime<Tz>,
    geometry: &ReportGeometry,
) -> Document
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut canvas = ReportCanvas::new(geometry);
    let g = geometry;

    canvas.set_font(FontFace::Bold, 16.0);
    canvas.draw_string(g.header_x, g.title_y, REPORT_TITLE);
    canvas.set_font(FontFace::Regular, 10.0);
    canvas.draw_string(
        g.header_x,
        g.generated_y,
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")),
    );

    let mut y = g.first_record_y;
    if records.is_empty() {
        canvas.draw_string(g.header_x, y, NO_DATA_LINE);
    }

    for (idx, record) in records.iter().enumerate() {
        if y < g.min_headroom {
            canvas.show_page();
            y = g.top_margin;
        }

        canvas.set_font(FontFace::Bold, 12.0);
        canvas.draw_string(
            g.header_x,
            y,
            format!("Dataset {}: {}", idx + 1, record.summary.source_name),
        );
        y -= g.header_step;

        canvas.set_font(FontFace::Regular, 10.0);
        let uploaded = record.uploaded_at.with_timezone(&generated_at.timezone());
        let details = [
            format!("Upload Date: {}", uploaded.format("%Y-%m-%d %H:%M")),
            format!("Total Records: {}", record.summary.total_count),
            format!("Avg Flow Rate: {:.2}", record.summary.avg_flow),
            format!("Avg Pressure: {:.2}", record.summary.avg_pressure),
            format!("Avg Temperature: {:.2}", record.summary.avg_temperature),
        ];
        for line in details {
            canvas.draw_string(g.detail_x, y, line);
            y -= g.detail_step;
        }
        canvas.draw_string(
            g.detail_x,
            y,
            format!("Distribution: {}", record.summary.distribution),
        );
        y -= g.block_gap;
    }

    canvas.finish()
}
