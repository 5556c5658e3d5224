use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::errors::IngestError;

pub const TITLE_SHEET: &str = "Title";
pub const WORK_ORDER_SHEET: &str = "Work Order";
pub const BILL_QUANTITY_SHEET: &str = "Bill Quantity";
pub const EXTRA_ITEMS_SHEET: &str = "Extra Items";

/// Sheets read from a workbook. Names are matched case-sensitively.
pub const CANONICAL_SHEETS: [&str; 4] =
    [TITLE_SHEET, WORK_ORDER_SHEET, BILL_QUANTITY_SHEET, EXTRA_ITEMS_SHEET];

#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl CellValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(value) => value.trim().is_empty(),
            Self::Number(_) | Self::Bool(_) => false,
        }
    }

    /// Cell rendered as trimmed text; whole numbers drop their fraction so
    /// an item number typed as `1` does not come back as `1.0`.
    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(value) => value.trim().to_string(),
            Self::Number(value) => {
                if value.fract() == 0.0 && value.abs() < 1e15 {
                    format!("{}", *value as i64)
                } else {
                    value.to_string()
                }
            }
            Self::Bool(value) => value.to_string(),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(value: &Data) -> Self {
        match value {
            Data::Int(number) => Self::Number(*number as f64),
            Data::Float(number) => Self::Number(*number),
            Data::String(text) => Self::Text(text.clone()),
            Data::Bool(flag) => Self::Bool(*flag),
            Data::DateTime(stamp) => match stamp.as_datetime() {
                Some(datetime) => Self::Text(datetime.format("%d-%m-%Y").to_string()),
                None => Self::Number(stamp.as_f64()),
            },
            Data::DateTimeIso(text) | Data::DurationIso(text) => Self::Text(text.clone()),
            _ => Self::Empty,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawSheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        Self { name: name.into(), rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|row| row.iter().all(CellValue::is_blank))
    }
}

/// The canonical sheets present in a workbook, detached from the file format.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawWorkbook {
    sheets: Vec<RawSheet>,
}

impl RawWorkbook {
    pub fn new(sheets: Vec<RawSheet>) -> Self {
        Self { sheets }
    }

    /// Opens xlsx/xlsm/xlsb/xls/ods bytes and reads the canonical sheets
    /// that exist. Other sheets are never touched.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IngestError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|error| IngestError::Workbook(error.to_string()))?;

        let available = workbook.sheet_names();
        let mut sheets = Vec::new();
        for name in CANONICAL_SHEETS {
            if !available.iter().any(|candidate| candidate == name) {
                continue;
            }
            let range = workbook
                .worksheet_range(name)
                .map_err(|error| IngestError::schema(name, error.to_string()))?;
            let rows = range.rows().map(|row| row.iter().map(CellValue::from).collect()).collect();
            sheets.push(RawSheet::new(name, rows));
        }

        Ok(Self { sheets })
    }

    pub fn sheet(&self, name: &str) -> Option<&RawSheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}
