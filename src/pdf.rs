// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

//! Flow layout of a `ReportDocument` onto letter pages.

use crate::report::{ReportDocument, Section, Table, TableStyle, TextStyle};
use crate::visualizations::ChartImage;
use anyhow::{anyhow, Context, Result};
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::path::PaintMode;
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Rect, Rgb,
};
use std::io::Cursor;

const PAGE_WIDTH: f32 = 215.9;
const PAGE_HEIGHT: f32 = 279.4;
const MARGIN_TOP: f32 = 0.5 * MM_PER_INCH;
const MARGIN_BOTTOM: f32 = 0.75 * MM_PER_INCH;
const MARGIN_SIDE: f32 = 0.75 * MM_PER_INCH;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN_SIDE;

const MM_PER_INCH: f32 = 25.4;
const MM_PER_PT: f32 = 0.3528;
const IMAGE_DPI: f32 = 300.0;

const BRAND_BLUE: u32 = 0x1f77b4;
const BRAND_ORANGE: u32 = 0xff7f0e;
const HEADING_BACKGROUND: u32 = 0xf0f8ff;
const KPI_BACKGROUND: u32 = 0xe6f2ff;
const LABEL_GREY: u32 = 0xe8e8e8;
const BAND_GREY: u32 = 0xf9f9f9;
const TEXT_GREY: u32 = 0x666666;
const GRID_GREY: u32 = 0x808080;
const WHITE: u32 = 0xffffff;
const BLACK: u32 = 0x000000;

fn color(hex: u32) -> Color {
    let channel = |shift: u32| ((hex >> shift) & 0xff) as f32 / 255.0;
    Color::Rgb(Rgb::new(channel(16), channel(8), channel(0), None))
}

fn inches(v: f32) -> f32 {
    v * MM_PER_INCH
}

/// Rough Helvetica advance width; builtin fonts carry no metrics.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em = if bold { 0.56 } else { 0.5 };
    text.chars().count() as f32 * size * em * MM_PER_PT
}

fn fit_to_width(text: &str, size: f32, bold: bool, width: f32) -> String {
    if text_width(text, size, bold) <= width {
        return text.to_string();
    }
    let per_char = text_width("x", size, bold);
    let keep = ((width / per_char) as usize).saturating_sub(3);
    format!("{}...", text.chars().take(keep).collect::<String>())
}

/// Greedy word wrap to the given width.
fn wrap(text: &str, size: f32, bold: bool, width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if text_width(&candidate, size, bold) > width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[derive(Clone, Copy, PartialEq)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy)]
struct Font {
    size: f32,
    bold: bool,
    color: u32,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// Cursor-based writer. `y` is the top of the free area, measured from the page bottom.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    fonts: Fonts,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
    fresh_page: bool,
    in_footer: bool,
}

impl<'a> PageWriter<'a> {
    fn new(doc: &'a PdfDocumentReference, layer: PdfLayerReference, fonts: Fonts) -> Self {
        Self {
            doc,
            fonts,
            layer,
            y: PAGE_HEIGHT - MARGIN_TOP,
            pages: 1,
            fresh_page: true,
            in_footer: false,
        }
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), format!("Page {}", self.pages));
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN_TOP;
        self.fresh_page = true;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.y - height < MARGIN_BOTTOM && !self.fresh_page {
            self.new_page();
        }
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
        self.fresh_page = false;
    }

    fn fill_rect(&self, x: f32, top: f32, width: f32, height: f32, fill: u32) {
        self.layer.set_fill_color(color(fill));
        self.layer
            .add_rect(Rect::new(Mm(x), Mm(top - height), Mm(x + width), Mm(top)).with_mode(PaintMode::Fill));
    }

    fn stroke_rect(&self, x: f32, top: f32, width: f32, height: f32, stroke: u32, thickness: f32) {
        self.layer.set_outline_color(color(stroke));
        self.layer.set_outline_thickness(thickness);
        self.layer
            .add_rect(Rect::new(Mm(x), Mm(top - height), Mm(x + width), Mm(top)).with_mode(PaintMode::Stroke));
    }

    /// Place one line with its baseline derived from `top`.
    fn text(&self, text: &str, font: &Font, x: f32, width: f32, top: f32, align: Align) {
        let advance = text_width(text, font.size, font.bold);
        let x = match align {
            Align::Left => x,
            Align::Center => x + (width - advance).max(0.0) / 2.0,
            Align::Right => x + (width - advance).max(0.0),
        };
        let baseline = top - font.size * 0.8 * MM_PER_PT;
        let face = if font.bold { &self.fonts.bold } else { &self.fonts.regular };
        self.layer.set_fill_color(color(font.color));
        self.layer.use_text(text, font.size, Mm(x), Mm(baseline), face);
    }

    fn line_height(size: f32) -> f32 {
        size * 1.25 * MM_PER_PT
    }

    fn write_lines(&mut self, text: &str, font: &Font, indent: f32, align: Align) {
        let width = CONTENT_WIDTH - indent;
        for line in wrap(text, font.size, font.bold, width) {
            let h = Self::line_height(font.size);
            self.ensure_space(h);
            self.text(&line, font, MARGIN_SIDE + indent, width, self.y, align);
            self.advance(h);
        }
    }

    fn heading(&mut self, text: &str, style: TextStyle) {
        match style {
            TextStyle::Banner => {
                let font = Font { size: 28.0, bold: true, color: WHITE };
                let height = 20.0;
                if self.fresh_page {
                    self.advance(inches(1.5));
                }
                self.ensure_space(height);
                self.fill_rect(MARGIN_SIDE, self.y, CONTENT_WIDTH, height, BRAND_BLUE);
                let text = fit_to_width(text, font.size, true, CONTENT_WIDTH);
                self.text(&text, &font, MARGIN_SIDE, CONTENT_WIDTH, self.y - 5.5, Align::Center);
                self.advance(height + inches(0.5));
            }
            TextStyle::SectionHeading => {
                let font = Font { size: 16.0, bold: true, color: BRAND_BLUE };
                let height = 12.0;
                if !self.fresh_page {
                    self.advance(6.0);
                }
                self.ensure_space(height + 10.0);
                self.fill_rect(MARGIN_SIDE, self.y, CONTENT_WIDTH, height, HEADING_BACKGROUND);
                self.stroke_rect(MARGIN_SIDE, self.y, CONTENT_WIDTH, height, BRAND_BLUE, 2.0);
                let text = fit_to_width(text, font.size, true, CONTENT_WIDTH - 6.0);
                self.text(&text, &font, MARGIN_SIDE + 3.0, CONTENT_WIDTH, self.y - 3.0, Align::Left);
                self.advance(height + 6.0);
            }
            TextStyle::Title => {
                let font = Font { size: 28.0, bold: true, color: BRAND_BLUE };
                self.write_lines(text, &font, 0.0, Align::Center);
                self.advance(2.0);
            }
            TextStyle::SubHeading => {
                self.advance(2.0);
                let font = Font { size: 10.5, bold: true, color: BLACK };
                self.ensure_space(Self::line_height(10.5) * 2.0);
                self.write_lines(text, &font, 0.0, Align::Left);
            }
            other => self.paragraph(text, other),
        }
    }

    fn paragraph(&mut self, text: &str, style: TextStyle) {
        match style {
            TextStyle::Subtitle => {
                let font = Font { size: 14.0, bold: false, color: TEXT_GREY };
                self.write_lines(text, &font, 0.0, Align::Center);
                self.advance(10.0 + inches(1.0));
            }
            TextStyle::Bullet => {
                let font = Font { size: 10.0, bold: false, color: BLACK };
                self.write_lines(&format!("- {}", text), &font, 4.0, Align::Left);
            }
            TextStyle::Footer => {
                if !self.in_footer {
                    self.in_footer = true;
                    self.ensure_space(inches(0.5) + 20.0);
                    self.advance(inches(0.5));
                    self.fill_rect(MARGIN_SIDE + 20.0, self.y, CONTENT_WIDTH - 40.0, 0.3, GRID_GREY);
                    self.advance(3.0);
                }
                let font = Font { size: 9.0, bold: false, color: GRID_GREY };
                self.write_lines(text, &font, 0.0, Align::Center);
            }
            other => self.heading(text, other),
        }
    }

    fn row_layout(style: TableStyle, row: usize, is_header: bool) -> (Font, f32, Option<u32>) {
        match style {
            TableStyle::Metadata => (Font { size: 11.0, bold: false, color: BLACK }, 10.0, None),
            TableStyle::KpiGrid if row % 2 == 0 => (Font { size: 11.0, bold: true, color: WHITE }, 12.0, Some(BRAND_BLUE)),
            TableStyle::KpiGrid => (Font { size: 18.0, bold: true, color: BRAND_BLUE }, 17.0, Some(KPI_BACKGROUND)),
            TableStyle::Ranking if is_header => (Font { size: 10.0, bold: true, color: WHITE }, 10.0, Some(BRAND_ORANGE)),
            TableStyle::Ranking => {
                let band = if row % 2 == 0 { WHITE } else { BAND_GREY };
                (Font { size: 9.0, bold: false, color: BLACK }, 7.5, Some(band))
            }
        }
    }

    fn cell_align(style: TableStyle, col: usize) -> Align {
        match (style, col) {
            (TableStyle::Metadata, 0) => Align::Right,
            (TableStyle::Metadata, _) => Align::Left,
            (TableStyle::KpiGrid, _) => Align::Center,
            (TableStyle::Ranking, 0) => Align::Center,
            (TableStyle::Ranking, 1) => Align::Left,
            (TableStyle::Ranking, _) => Align::Right,
        }
    }

    fn table_row(&mut self, table: &Table, cells: &[String], row: usize, is_header: bool, x0: f32, widths: &[f32]) {
        let (font, height, fill) = Self::row_layout(table.style, row, is_header);
        let grid = if table.style == TableStyle::KpiGrid { (BRAND_BLUE, 0.8) } else { (GRID_GREY, 0.3) };
        let mut x = x0;
        for (col, width) in widths.iter().enumerate() {
            if let Some(fill) = fill {
                self.fill_rect(x, self.y, *width, height, fill);
            } else if table.style == TableStyle::Metadata && col == 0 {
                self.fill_rect(x, self.y, *width, height, LABEL_GREY);
            }
            self.stroke_rect(x, self.y, *width, height, grid.0, grid.1);

            let cell_font = Font {
                bold: font.bold || (table.style == TableStyle::Metadata && col == 0),
                ..font
            };
            let text = cells.get(col).map(String::as_str).unwrap_or("");
            let text = fit_to_width(text, cell_font.size, cell_font.bold, width - 4.0);
            let top = self.y - (height - cell_font.size * MM_PER_PT) / 2.0;
            self.text(&text, &cell_font, x + 2.0, width - 4.0, top, Self::cell_align(table.style, col));
            x += width;
        }
        self.advance(height);
    }

    fn table(&mut self, table: &Table) {
        let widths: Vec<f32> = table.column_widths_in.iter().map(|w| inches(*w)).collect();
        let total: f32 = widths.iter().sum();
        let x0 = MARGIN_SIDE + (CONTENT_WIDTH - total).max(0.0) / 2.0;

        if let Some(header) = &table.header {
            let (_, h, _) = Self::row_layout(table.style, 0, true);
            self.ensure_space(h * 2.0);
            self.table_row(table, header, 0, true, x0, &widths);
        }
        for (i, cells) in table.rows.iter().enumerate() {
            let (_, h, _) = Self::row_layout(table.style, i, false);
            if self.y - h < MARGIN_BOTTOM {
                self.new_page();
                if let Some(header) = &table.header {
                    self.table_row(table, header, 0, true, x0, &widths);
                }
            }
            self.table_row(table, cells, i, false, x0, &widths);
        }
        self.advance(4.0);
    }

    fn image(&mut self, chart: &ChartImage, width_in: f32, height_in: f32) -> Result<()> {
        let (w, h) = (inches(width_in), inches(height_in));
        self.ensure_space(h);

        let decoder = PngDecoder::new(Cursor::new(chart.png.as_slice()))
            .with_context(|| format!("Failed to decode {} chart", chart.kind.file_stem()))?;
        let image = Image::try_from(decoder)?;
        let natural_w = chart.width as f32 / IMAGE_DPI * MM_PER_INCH;
        let natural_h = chart.height as f32 / IMAGE_DPI * MM_PER_INCH;

        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN_SIDE + (CONTENT_WIDTH - w).max(0.0) / 2.0)),
                translate_y: Some(Mm(self.y - h)),
                scale_x: Some(w / natural_w),
                scale_y: Some(h / natural_h),
                dpi: Some(IMAGE_DPI),
                ..Default::default()
            },
        );
        self.advance(h + 5.0);
        Ok(())
    }
}

/// Lay out the document and return the PDF bytes.
pub fn render_pdf(document: &ReportDocument) -> Result<Vec<u8>> {
    let (doc, page, layer) = PdfDocument::new(document.title.as_str(), Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Page 1");
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| anyhow!("Failed to embed Helvetica: {:?}", e))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| anyhow!("Failed to embed Helvetica-Bold: {:?}", e))?,
    };

    let pages = {
        let first_layer = doc.get_page(page).get_layer(layer);
        let mut writer = PageWriter::new(&doc, first_layer, fonts);
        for section in &document.sections {
            match section {
                Section::Heading { text, style } => writer.heading(text, *style),
                Section::Paragraph { text, style } => writer.paragraph(text, *style),
                Section::Table(table) => writer.table(table),
                Section::Image { chart, width_in, height_in } => match document.images.get(chart) {
                    Some(img) => writer.image(img, *width_in, *height_in)?,
                    None => tracing::warn!(chart = chart.file_stem(), "image missing from document, skipped"),
                },
                Section::PageBreak => writer.new_page(),
            }
        }
        writer.pages
    };

    let bytes = doc
        .save_to_bytes()
        .map_err(|e| anyhow!("Failed to serialise PDF: {:?}", e))?;
    tracing::info!(pages, bytes = bytes.len(), "pdf rendered");
    Ok(bytes)
}
