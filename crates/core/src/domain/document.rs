use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::line_item::saturating_sum;

/// The fixed catalog of documents in a billing packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    FirstPageSummary,
    DeviationStatement,
    FinalBillScrutinySheet,
    ExtraItemsStatement,
    CertificateII,
    CertificateIII,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        DocumentKind::FirstPageSummary,
        DocumentKind::DeviationStatement,
        DocumentKind::FinalBillScrutinySheet,
        DocumentKind::ExtraItemsStatement,
        DocumentKind::CertificateII,
        DocumentKind::CertificateIII,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::FirstPageSummary => "first_page_summary",
            Self::DeviationStatement => "deviation_statement",
            Self::FinalBillScrutinySheet => "final_bill_scrutiny_sheet",
            Self::ExtraItemsStatement => "extra_items_statement",
            Self::CertificateII => "certificate_ii",
            Self::CertificateIII => "certificate_iii",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.slug() == slug)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::FirstPageSummary => "First Page Summary",
            Self::DeviationStatement => "Deviation Statement",
            Self::FinalBillScrutinySheet => "Final Bill Scrutiny Sheet",
            Self::ExtraItemsStatement => "Statement of Extra Items",
            Self::CertificateII => "Certificate II",
            Self::CertificateIII => "Certificate III",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub header: String,
    pub align: Align,
}

impl Column {
    pub fn text(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Left }
    }

    pub fn numeric(header: impl Into<String>) -> Self {
        Self { header: header.into(), align: Align::Right }
    }
}

/// A table cell. Numeric cells already carry their presentation rounding,
/// and amounts display at exactly their own scale.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Blank,
    Text(String),
    Quantity(Decimal),
    Amount(Decimal),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Blank
        } else {
            Self::Text(value)
        }
    }

    pub fn amount_value(&self) -> Option<Decimal> {
        match self {
            Self::Amount(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Quantity(_) | Self::Amount(_))
    }

    pub fn display(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Text(value) => value.clone(),
            Self::Quantity(value) => value.normalize().to_string(),
            Self::Amount(value) => value.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub caption: Option<String>,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    /// Summing row; every `Amount` cell equals the sum of the `Amount`
    /// cells above it in the same column.
    pub totals: Option<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { caption: None, columns, rows: Vec::new(), totals: None }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Appends a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Blank);
        self.rows.push(row);
    }

    /// Adds a totals row summing the given columns over the current rows.
    pub fn close_with_totals(&mut self, label: &str, amount_columns: &[usize]) {
        let mut totals = vec![Cell::Blank; self.columns.len()];
        if let Some(first) = totals.first_mut() {
            *first = Cell::text(label);
        }
        for &index in amount_columns {
            if index >= totals.len() {
                continue;
            }
            totals[index] = Cell::Amount(self.column_sum(index));
        }
        self.totals = Some(totals);
    }

    pub fn column_sum(&self, index: usize) -> Decimal {
        saturating_sum(
            self.rows.iter().filter_map(|row| row.get(index)).filter_map(Cell::amount_value),
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Section {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    Table(Table),
}

/// Markup-agnostic description of one document, consumed by renderers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSpec {
    pub kind: DocumentKind,
    pub name: String,
    pub sections: Vec<Section>,
}

impl DocumentSpec {
    pub fn new(kind: DocumentKind) -> Self {
        Self {
            kind,
            name: kind.slug().to_string(),
            sections: vec![Section::Heading { level: 1, text: kind.title().to_string() }],
        }
    }

    pub fn title(&self) -> &str {
        self.sections
            .iter()
            .find_map(|section| match section {
                Section::Heading { level: 1, text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or(self.name.as_str())
    }

    pub fn heading(&mut self, text: impl Into<String>) -> &mut Self {
        self.sections.push(Section::Heading { level: 2, text: text.into() });
        self
    }

    pub fn paragraph(&mut self, text: impl Into<String>) -> &mut Self {
        self.sections.push(Section::Paragraph { text: text.into() });
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.sections.push(Section::Table(table));
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.sections.iter().filter_map(|section| match section {
            Section::Table(table) => Some(table),
            _ => None,
        })
    }
}
