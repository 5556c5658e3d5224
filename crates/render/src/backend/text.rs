use async_trait::async_trait;
use billpack_core::domain::document::{Align, DocumentSpec, Section, Table};

use super::{wrap, OutputFormat, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::errors::BackendError;

const PAGE_WIDTH: usize = 100;
const MAX_COLUMN_WIDTH: usize = 40;

/// Plain-text rendition. Needs nothing but the document, so it is the
/// natural last resort in a backend chain.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlainTextBackend;

#[async_trait]
impl RenderBackend for PlainTextBackend {
    fn id(&self) -> &str {
        "text"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Text
    }

    async fn render(
        &self,
        spec: &DocumentSpec,
        _env: &RenderEnvironment,
    ) -> Result<Vec<u8>, BackendError> {
        Ok(render_text(spec).into_bytes())
    }
}

pub fn render_text(spec: &DocumentSpec) -> String {
    let mut out = String::new();
    for section in &spec.sections {
        match section {
            Section::Heading { level, text } => {
                let rule = if *level <= 1 { '=' } else { '-' };
                out.push_str(text);
                out.push('\n');
                out.extend(std::iter::repeat(rule).take(text.chars().count()));
                out.push_str("\n\n");
            }
            Section::Paragraph { text } => {
                for line in wrap(text, PAGE_WIDTH) {
                    out.push_str(&line);
                    out.push('\n');
                }
                out.push('\n');
            }
            Section::Table(table) => {
                write_table(&mut out, table);
                out.push('\n');
            }
        }
    }
    out
}

fn write_table(out: &mut String, table: &Table) {
    if let Some(caption) = &table.caption {
        out.push_str(caption);
        out.push('\n');
    }

    let header: Vec<String> = table.columns.iter().map(|column| column.header.clone()).collect();
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .chain(table.totals.iter())
        .map(|row| row.iter().map(|cell| cell.display()).collect())
        .collect();

    let widths: Vec<usize> = (0..table.columns.len())
        .map(|index| {
            std::iter::once(&header)
                .chain(body.iter())
                .filter_map(|row| row.get(index))
                .map(|text| text.chars().count())
                .max()
                .unwrap_or(0)
                .clamp(1, MAX_COLUMN_WIDTH)
        })
        .collect();
    let aligns: Vec<Align> = table.columns.iter().map(|column| column.align).collect();

    write_row(out, &header, &widths, &aligns);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    let totals_at = table.rows.len();
    for (index, row) in body.iter().enumerate() {
        if index == totals_at {
            out.push_str(&rule.join("-+-"));
            out.push('\n');
        }
        write_row(out, row, &widths, &aligns);
    }
}

/// Writes one logical row; cells wider than their column wrap onto
/// continuation lines.
fn write_row(out: &mut String, cells: &[String], widths: &[usize], aligns: &[Align]) {
    let wrapped: Vec<Vec<String>> = widths
        .iter()
        .enumerate()
        .map(|(index, width)| wrap(cells.get(index).map(String::as_str).unwrap_or(""), *width))
        .collect();
    let height = wrapped.iter().map(Vec::len).max().unwrap_or(1);

    for line in 0..height {
        let parts: Vec<String> = wrapped
            .iter()
            .zip(widths)
            .zip(aligns)
            .map(|((lines, width), align)| {
                let text = lines.get(line).map(String::as_str).unwrap_or("");
                match align {
                    Align::Left => format!("{text:<width$}"),
                    Align::Right => format!("{text:>width$}"),
                }
            })
            .collect();
        out.push_str(parts.join(" | ").trim_end());
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use billpack_core::domain::document::{Cell, Column, DocumentKind, DocumentSpec, Table};
    use rust_decimal::Decimal;

    use super::render_text;

    #[test]
    fn tables_align_numbers_right_and_separate_totals() {
        let mut spec = DocumentSpec::new(DocumentKind::FirstPageSummary);
        let mut table = Table::new(vec![Column::text("Item"), Column::numeric("Amount")]);
        table.push_row(vec![Cell::text("Excavation"), Cell::Amount(Decimal::new(100000, 2))]);
        table.push_row(vec![Cell::text("Fill"), Cell::Amount(Decimal::new(550, 2))]);
        table.close_with_totals("Total", &[1]);
        spec.table(table);

        let text = render_text(&spec);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "First Page Summary");
        assert_eq!(lines[1], "==================");
        assert_eq!(lines[3], "Item       |  Amount");
        assert_eq!(lines[5], "Excavation | 1000.00");
        assert_eq!(lines[6], "Fill       |    5.50");
        assert_eq!(lines[7], "-----------+--------");
        assert_eq!(lines[8], "Total      | 1005.50");
    }

    #[test]
    fn output_is_deterministic() {
        let mut spec = DocumentSpec::new(DocumentKind::CertificateII);
        spec.paragraph("Certified that the measurements were recorded.");
        assert_eq!(render_text(&spec), render_text(&spec));
    }
}
