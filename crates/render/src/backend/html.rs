use async_trait::async_trait;
use billpack_core::domain::document::{Align, Cell, DocumentSpec, Section, Table};
use serde::Serialize;
use tera::{Context, Tera};

use super::{OutputFormat, RenderBackend};
use crate::environment::RenderEnvironment;
use crate::errors::{BackendError, EnvironmentError};

const DOCUMENT_TEMPLATE: &str = "document.html.tera";

/// Renders a [`DocumentSpec`] to a standalone HTML page. Shared by the HTML
/// backend and the print-to-PDF backends.
#[derive(Debug)]
pub struct HtmlRenderer {
    tera: Tera,
}

impl HtmlRenderer {
    pub fn with_embedded_template() -> Result<Self, EnvironmentError> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html.tera"]);
        tera.add_raw_template(
            DOCUMENT_TEMPLATE,
            include_str!("../../templates/document.html.tera"),
        )
        .map_err(|error| EnvironmentError::Template(error.to_string()))?;
        Ok(Self { tera })
    }

    pub fn render(&self, spec: &DocumentSpec) -> Result<String, BackendError> {
        let context = Context::from_serialize(DocumentView::from_spec(spec))
            .map_err(|error| BackendError::Failed(format!("template context: {error}")))?;
        self.tera
            .render(DOCUMENT_TEMPLATE, &context)
            .map_err(|error| BackendError::Failed(format!("template render: {error}")))
    }
}

#[derive(Serialize)]
struct DocumentView {
    title: String,
    name: String,
    sections: Vec<SectionView>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SectionView {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Table(TableView),
}

#[derive(Serialize)]
struct TableView {
    caption: Option<String>,
    columns: Vec<CellView>,
    rows: Vec<Vec<CellView>>,
    totals: Option<Vec<CellView>>,
}

#[derive(Serialize)]
struct CellView {
    text: String,
    numeric: bool,
}

impl DocumentView {
    fn from_spec(spec: &DocumentSpec) -> Self {
        let sections = spec
            .sections
            .iter()
            .map(|section| match section {
                Section::Heading { level, text } => {
                    SectionView::Heading { level: (*level).clamp(1, 6), text: text.clone() }
                }
                Section::Paragraph { text } => SectionView::Paragraph { text: text.clone() },
                Section::Table(table) => SectionView::Table(TableView::from_table(table)),
            })
            .collect();
        Self { title: spec.title().to_string(), name: spec.name.clone(), sections }
    }
}

impl TableView {
    fn from_table(table: &Table) -> Self {
        let numeric: Vec<bool> =
            table.columns.iter().map(|column| column.align == Align::Right).collect();
        let row = |cells: &Vec<Cell>| -> Vec<CellView> {
            cells
                .iter()
                .enumerate()
                .map(|(index, cell)| CellView {
                    text: cell.display(),
                    numeric: cell.is_numeric() || numeric.get(index).copied().unwrap_or(false),
                })
                .collect()
        };
        Self {
            caption: table.caption.clone(),
            columns: table
                .columns
                .iter()
                .map(|column| CellView {
                    text: column.header.clone(),
                    numeric: column.align == Align::Right,
                })
                .collect(),
            rows: table.rows.iter().map(row).collect(),
            totals: table.totals.as_ref().map(row),
        }
    }
}

/// Delivers the HTML rendition itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlBackend;

#[async_trait]
impl RenderBackend for HtmlBackend {
    fn id(&self) -> &str {
        "html"
    }

    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    async fn render(
        &self,
        spec: &DocumentSpec,
        env: &RenderEnvironment,
    ) -> Result<Vec<u8>, BackendError> {
        env.html().render(spec).map(String::into_bytes)
    }
}
