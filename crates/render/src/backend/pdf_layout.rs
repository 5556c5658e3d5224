//! In-process PDF layout with `printpdf`.
//!
//! Walks the [`DocumentSpec`] directly instead of going through HTML, so it
//! works without any external converter. Layout is deliberately simple:
//! built-in Helvetica, proportional column widths, wrapped cells and page
//! breaks that repeat the table header.

use std::io::BufWriter;

use async_trait::async_trait;
use billpack_core::domain::document::{Align, DocumentSpec, Section, Table};
use printpdf::{
    BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
};

use super::{wrap, OutputFormat, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::errors::BackendError;

const A4_SHORT: f32 = 210.0;
const A4_LONG: f32 = 297.0;
const MARGIN: f32 = 15.0;
const BODY_SIZE: f32 = 10.0;
const TABLE_SIZE: f32 = 8.0;
const CELL_PADDING: f32 = 1.5;
/// Tables wider than this switch the document to landscape.
const PORTRAIT_MAX_COLUMNS: usize = 8;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f32 = 0.52;

#[derive(Clone, Copy, Debug, Default)]
pub struct PrintPdfBackend;

#[async_trait]
impl RenderBackend for PrintPdfBackend {
    fn id(&self) -> &str {
        "printpdf"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    async fn render(
        &self,
        spec: &DocumentSpec,
        _env: &RenderEnvironment,
    ) -> Result<Vec<u8>, BackendError> {
        let spec = spec.clone();
        tokio::task::spawn_blocking(move || layout_document(&spec))
            .await
            .map_err(|error| BackendError::Failed(format!("layout task failed: {error}")))?
    }
}

pub fn layout_document(spec: &DocumentSpec) -> Result<Vec<u8>, BackendError> {
    let landscape = spec.tables().any(|table| table.columns.len() > PORTRAIT_MAX_COLUMNS);
    let (width, height) = if landscape { (A4_LONG, A4_SHORT) } else { (A4_SHORT, A4_LONG) };

    let (doc, page, layer) = PdfDocument::new(spec.title(), Mm(width), Mm(height), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
    let layer = doc.get_page(page).get_layer(layer);

    let mut cursor = Cursor { doc: &doc, layer, width, height, y: height - MARGIN, regular, bold };
    for section in &spec.sections {
        match section {
            Section::Heading { level, text } => cursor.heading(*level, text),
            Section::Paragraph { text } => cursor.paragraph(text),
            Section::Table(table) => cursor.table(table),
        }
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer).map_err(pdf_error)?;
    buffer
        .into_inner()
        .map_err(|error| BackendError::Failed(format!("pdf buffer: {error}")))
}

fn pdf_error(error: impl std::fmt::Display) -> BackendError {
    BackendError::Failed(format!("pdf layout: {error}"))
}

fn line_height(size: f32) -> f32 {
    size * PT_TO_MM * 1.35
}

fn chars_per_width(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * GLYPH_WIDTH * PT_TO_MM)).floor() as usize).max(1)
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * GLYPH_WIDTH * PT_TO_MM
}

/// Built-in PDF fonts only cover Latin-1; anything else becomes `?`.
fn latin1(text: &str) -> String {
    text.chars().map(|ch| if (ch as u32) < 0x100 { ch } else { '?' }).collect()
}

struct Cursor<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    width: f32,
    height: f32,
    y: f32,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

impl Cursor<'_> {
    fn content_width(&self) -> f32 {
        self.width - 2.0 * MARGIN
    }

    fn fits(&self, needed: f32) -> bool {
        self.y - needed >= MARGIN
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(self.width), Mm(self.height), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.height - MARGIN;
    }

    fn ensure(&mut self, needed: f32) {
        if !self.fits(needed) {
            self.new_page();
        }
    }

    fn put(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(latin1(text), size, Mm(x), Mm(self.y), font);
    }

    fn heading(&mut self, level: u8, text: &str) {
        let size = if level <= 1 { 14.0 } else { 11.0 };
        let step = line_height(size);
        self.ensure(step * 2.0);
        self.y -= step;
        let x = if level <= 1 {
            MARGIN + ((self.content_width() - text_width(text, size)) / 2.0).max(0.0)
        } else {
            MARGIN
        };
        self.put(text, size, x, true);
        self.y -= step * 0.5;
    }

    fn paragraph(&mut self, text: &str) {
        let step = line_height(BODY_SIZE);
        for line in wrap(text, chars_per_width(self.content_width(), BODY_SIZE)) {
            self.ensure(step);
            self.y -= step;
            self.put(&line, BODY_SIZE, MARGIN, false);
        }
        self.y -= step * 0.5;
    }

    fn table(&mut self, table: &Table) {
        if table.columns.is_empty() {
            return;
        }
        let widths = column_widths(table, self.content_width());
        let aligns: Vec<Align> = table.columns.iter().map(|column| column.align).collect();
        let header: Vec<String> = table.columns.iter().map(|column| column.header.clone()).collect();

        if let Some(caption) = &table.caption {
            self.heading(3, caption);
        }
        self.row(&header, &widths, &aligns, true, None);
        for cells in &table.rows {
            let cells: Vec<String> = cells.iter().map(|cell| cell.display()).collect();
            self.row(&cells, &widths, &aligns, false, Some(header.as_slice()));
        }
        if let Some(totals) = &table.totals {
            let cells: Vec<String> = totals.iter().map(|cell| cell.display()).collect();
            self.row(&cells, &widths, &aligns, true, Some(header.as_slice()));
        }
        self.y -= line_height(BODY_SIZE) * 0.5;
    }

    /// Draws one row. On a page break the header is repeated first.
    fn row(
        &mut self,
        cells: &[String],
        widths: &[f32],
        aligns: &[Align],
        bold: bool,
        header: Option<&[String]>,
    ) {
        let step = line_height(TABLE_SIZE);
        let wrapped: Vec<Vec<String>> = widths
            .iter()
            .enumerate()
            .map(|(index, width)| {
                let text = cells.get(index).map(String::as_str).unwrap_or("");
                wrap(text, chars_per_width(width - 2.0 * CELL_PADDING, TABLE_SIZE))
            })
            .collect();
        let lines = wrapped.iter().map(Vec::len).max().unwrap_or(1);
        let needed = step * lines as f32 + CELL_PADDING;

        if !self.fits(needed) {
            self.new_page();
            if let Some(header) = header {
                self.row(header, widths, aligns, true, None);
            }
        }

        for line in 0..lines {
            self.y -= step;
            let mut x = MARGIN;
            for ((column, width), align) in wrapped.iter().zip(widths).zip(aligns) {
                if let Some(text) = column.get(line).filter(|text| !text.is_empty()) {
                    let left = match align {
                        Align::Left => x + CELL_PADDING,
                        Align::Right => {
                            (x + width - CELL_PADDING - text_width(text, TABLE_SIZE)).max(x)
                        }
                    };
                    self.put(text, TABLE_SIZE, left, bold);
                }
                x += width;
            }
        }
        self.y -= CELL_PADDING;
    }
}

/// Splits the content width in proportion to each column's longest text,
/// bounded so no column starves or dominates.
fn column_widths(table: &Table, available: f32) -> Vec<f32> {
    let weights: Vec<f32> = (0..table.columns.len())
        .map(|index| {
            let header = table.columns[index].header.chars().count();
            let longest = table
                .rows
                .iter()
                .chain(table.totals.iter())
                .filter_map(|row| row.get(index))
                .map(|cell| cell.display().chars().count())
                .max()
                .unwrap_or(0);
            header.max(longest).clamp(4, 40) as f32
        })
        .collect();
    let total: f32 = weights.iter().sum();
    weights.iter().map(|weight| available * weight / total).collect()
}
