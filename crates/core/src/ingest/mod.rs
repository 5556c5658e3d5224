//! Spreadsheet ingestion.
//!
//! Turns a bill-of-quantities workbook into a [`BillOfQuantities`]. Only two
//! things are fatal: a missing "Work Order" sheet and a sheet whose structure
//! cannot be read. Bad cell content is coerced to a default and counted in
//! the [`IngestReport`], never raised.

pub mod columns;
pub mod workbook;

use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::line_item::{BillOfQuantities, ItemCollection, LineItem};
use crate::domain::meta::ProjectMeta;
use crate::errors::IngestError;

use self::columns::{find_header, ColumnMap, Field};
use self::workbook::{
    CellValue, RawSheet, RawWorkbook, BILL_QUANTITY_SHEET, EXTRA_ITEMS_SHEET, TITLE_SHEET,
    WORK_ORDER_SHEET,
};

pub const DEFAULT_DESCRIPTION: &str = "(description not given)";
pub const DEFAULT_UNIT: &str = "Nos";
/// Largest quantity or rate magnitude accepted from a cell (10^12).
pub const MAX_CELL_MAGNITUDE: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetReport {
    pub sheet: String,
    pub header_row: Option<usize>,
    pub rows_read: usize,
    pub rows_retained: usize,
    /// Non-empty numeric cells that failed to parse and became 0.
    pub coerced_cells: usize,
    pub unresolved_fields: Vec<Field>,
}

/// Per-sheet account of what ingestion defaulted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub sheets: Vec<SheetReport>,
    pub missing_optional_sheets: Vec<String>,
}

impl IngestReport {
    pub fn coerced_cells(&self) -> usize {
        self.sheets.iter().map(|sheet| sheet.coerced_cells).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ingested {
    pub model: BillOfQuantities,
    pub report: IngestReport,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SheetIngestor;

impl SheetIngestor {
    pub fn ingest(&self, bytes: &[u8]) -> Result<BillOfQuantities, IngestError> {
        self.ingest_with_report(bytes).map(|ingested| ingested.model)
    }

    pub fn ingest_with_report(&self, bytes: &[u8]) -> Result<Ingested, IngestError> {
        let workbook = RawWorkbook::from_bytes(bytes)?;
        self.ingest_workbook(&workbook)
    }

    pub fn ingest_workbook(&self, workbook: &RawWorkbook) -> Result<Ingested, IngestError> {
        let work_order_sheet = workbook.sheet(WORK_ORDER_SHEET).ok_or_else(|| {
            IngestError::MissingRequiredSheet { sheet: WORK_ORDER_SHEET.to_string() }
        })?;

        let mut report = IngestReport::default();

        let meta = match workbook.sheet(TITLE_SHEET) {
            Some(sheet) => read_title(sheet),
            None => {
                report.missing_optional_sheets.push(TITLE_SHEET.to_string());
                ProjectMeta::default()
            }
        };

        let (work_order, sheet_report) = read_items(work_order_sheet, ItemCollection::WorkOrder)?;
        report.sheets.push(sheet_report);

        let mut optional = |name: &str, collection| -> Result<Vec<LineItem>, IngestError> {
            match workbook.sheet(name) {
                Some(sheet) => {
                    let (items, sheet_report) = read_items(sheet, collection)?;
                    report.sheets.push(sheet_report);
                    Ok(items)
                }
                None => {
                    report.missing_optional_sheets.push(name.to_string());
                    Ok(Vec::new())
                }
            }
        };
        let bill_quantity = optional(BILL_QUANTITY_SHEET, ItemCollection::BillQuantity)?;
        let extra_items = optional(EXTRA_ITEMS_SHEET, ItemCollection::ExtraItems)?;

        Ok(Ingested {
            model: BillOfQuantities { meta, work_order, bill_quantity, extra_items },
            report,
        })
    }
}

/// Reads label/value pairs: the first non-blank cell of a row is the label,
/// the next non-blank cell its value.
fn read_title(sheet: &RawSheet) -> ProjectMeta {
    let pairs = sheet.rows.iter().filter_map(|row| {
        let mut cells = row.iter().filter(|cell| !cell.is_blank());
        let label = cells.next()?.as_text();
        let value = cells.next().map(CellValue::as_text).unwrap_or_default();
        Some((label, value))
    });
    ProjectMeta::from_entries(pairs)
}

fn read_items(
    sheet: &RawSheet,
    collection: ItemCollection,
) -> Result<(Vec<LineItem>, SheetReport), IngestError> {
    let mut report = SheetReport { sheet: sheet.name.clone(), ..SheetReport::default() };

    if sheet.is_empty() {
        if collection == ItemCollection::WorkOrder {
            return Err(IngestError::schema(&sheet.name, "sheet is empty"));
        }
        report.unresolved_fields = Field::ALL.to_vec();
        return Ok((Vec::new(), report));
    }

    let (header_row, columns) = find_header(&sheet.rows).ok_or_else(|| {
        IngestError::schema(
            &sheet.name,
            format!(
                "no header row with an item, description, quantity or rate column in the first {} rows",
                columns::HEADER_SCAN_LIMIT
            ),
        )
    })?;
    report.header_row = Some(header_row);
    report.unresolved_fields = columns.unresolved();

    let mut items = Vec::new();
    for row in sheet.rows.iter().skip(header_row + 1) {
        report.rows_read += 1;
        let sequence = items.len() + 1;
        if let Some(item) = read_row(row, &columns, sequence, &mut report.coerced_cells) {
            items.push(item);
        }
    }
    report.rows_retained = items.len();

    Ok((items, report))
}

/// Converts one data row. The row is kept when it has a nonzero quantity,
/// a description or an item number, judged on the raw cells before any
/// defaults are applied.
fn read_row(
    row: &[CellValue],
    columns: &ColumnMap,
    sequence: usize,
    coerced: &mut usize,
) -> Option<LineItem> {
    let text = |field| columns.cell(row, field).map(CellValue::as_text).unwrap_or_default();

    let item_no = text(Field::ItemNo);
    let description = text(Field::Description);
    let quantity = coerce_decimal(columns.cell(row, Field::Quantity), coerced);

    if quantity.is_zero() && description.is_empty() && item_no.is_empty() {
        return None;
    }

    let rate = coerce_decimal(columns.cell(row, Field::Rate), coerced);
    let unit = text(Field::Unit);

    Some(LineItem {
        item_no: if item_no.is_empty() { sequence.to_string() } else { item_no },
        description: if description.is_empty() {
            DEFAULT_DESCRIPTION.to_string()
        } else {
            description
        },
        unit: if unit.is_empty() { DEFAULT_UNIT.to_string() } else { unit },
        quantity,
        rate,
        remark: text(Field::Remark),
    })
}

/// Numeric value of a cell; anything unreadable or larger in magnitude than
/// [`MAX_CELL_MAGNITUDE`] is 0. Only non-empty cells are counted as coerced.
pub fn coerce_decimal(cell: Option<&CellValue>, coerced: &mut usize) -> Decimal {
    let parsed = match cell {
        None | Some(CellValue::Empty) => return Decimal::ZERO,
        Some(CellValue::Number(value)) => Decimal::from_f64(*value),
        Some(CellValue::Text(raw)) => parse_decimal_text(raw),
        Some(CellValue::Bool(_)) => None,
    }
    .filter(|value| value.abs() <= MAX_CELL_MAGNITUDE);
    match parsed {
        Some(value) => value,
        None => {
            if cell.is_some_and(|value| !value.is_blank()) {
                *coerced += 1;
            }
            Decimal::ZERO
        }
    }
}

fn parse_decimal_text(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw.trim().chars().filter(|ch| *ch != ',' && !ch.is_whitespace()).collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).or_else(|_| Decimal::from_scientific(&cleaned)).ok()
}

/// Lower-case hex SHA-256 of the uploaded bytes, recorded with every run.
pub fn input_fingerprint(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::workbook::{CellValue, RawSheet, RawWorkbook};
    use super::{
        coerce_decimal, input_fingerprint, SheetIngestor, DEFAULT_DESCRIPTION, DEFAULT_UNIT,
        MAX_CELL_MAGNITUDE,
    };
    use crate::domain::meta::{CONTRACTOR, PROJECT_NAME};
    use crate::finance::{compute_summary, DeductionRates};
    use crate::ingest::columns::Field;

    fn t(value: &str) -> CellValue {
        CellValue::text(value)
    }

    fn n(value: f64) -> CellValue {
        CellValue::Number(value)
    }

    fn work_order(rows: Vec<Vec<CellValue>>) -> RawSheet {
        let mut all = vec![vec![t("Item No"), t("Description"), t("Unit"), t("Quantity"), t("Rate")]];
        all.extend(rows);
        RawSheet::new("Work Order", all)
    }

    #[test]
    fn missing_work_order_sheet_is_fatal() {
        let workbook = RawWorkbook::new(vec![RawSheet::new("Title", vec![])]);
        let error = SheetIngestor.ingest_workbook(&workbook).expect_err("must fail");
        assert_eq!(error.error_class(), "missing_required_sheet");
    }

    #[test]
    fn sheet_names_are_case_sensitive() {
        let workbook = RawWorkbook::new(vec![RawSheet::new(
            "work order",
            vec![vec![t("Item No"), t("Quantity")]],
        )]);
        assert!(SheetIngestor.ingest_workbook(&workbook).is_err());
    }

    #[test]
    fn work_order_without_header_is_schema_error() {
        let workbook = RawWorkbook::new(vec![RawSheet::new(
            "Work Order",
            vec![vec![t("foo"), t("bar")], vec![n(1.0), n(2.0)]],
        )]);
        let error = SheetIngestor.ingest_workbook(&workbook).expect_err("must fail");
        assert_eq!(error.error_class(), "schema_error");
    }

    #[test]
    fn empty_work_order_sheet_is_schema_error() {
        for rows in [vec![], vec![vec![CellValue::Empty, t("   ")], vec![]]] {
            let workbook = RawWorkbook::new(vec![RawSheet::new("Work Order", rows)]);
            let error = SheetIngestor.ingest_workbook(&workbook).expect_err("must fail");
            assert_eq!(error.error_class(), "schema_error");
        }
    }

    #[test]
    fn optional_sheet_with_content_but_no_header_is_schema_error() {
        let mut rows: Vec<Vec<CellValue>> =
            (0..10).map(|index| vec![t("note"), n(f64::from(index))]).collect();
        rows.push(vec![t("Item No"), t("Description"), t("Quantity"), t("Rate")]);
        let workbook = RawWorkbook::new(vec![
            work_order(vec![vec![t("1"), t("Earthwork"), t("Cum"), n(1.0), n(1.0)]]),
            RawSheet::new("Bill Quantity", rows),
        ]);

        let error = SheetIngestor.ingest_workbook(&workbook).expect_err("must fail");
        assert_eq!(error.error_class(), "schema_error");
        assert!(error.to_string().contains("Bill Quantity"));
    }

    #[test]
    fn optional_sheets_default_to_empty() {
        let workbook = RawWorkbook::new(vec![work_order(vec![vec![
            t("1"),
            t("Earthwork"),
            t("Cum"),
            n(10.0),
            n(100.0),
        ]])]);
        let ingested = SheetIngestor.ingest_workbook(&workbook).expect("ingest");

        assert_eq!(ingested.model.work_order.len(), 1);
        assert!(ingested.model.bill_quantity.is_empty());
        assert!(ingested.model.extra_items.is_empty());
        assert_eq!(ingested.model.meta.text(PROJECT_NAME), "");
        assert_eq!(ingested.report.missing_optional_sheets.len(), 3);
    }

    #[test]
    fn retention_keeps_header_rows_and_drops_empty_ones() {
        let workbook = RawWorkbook::new(vec![work_order(vec![
            vec![t(""), t("PART A: EARTHWORK"), t(""), t(""), t("")],
            vec![t("A.1"), t(""), t(""), n(0.0), n(55.0)],
            vec![t(""), t(""), t(""), n(4.0), n(25.0)],
            vec![t(""), t(""), t("Cum"), n(0.0), n(80.0)],
            vec![],
        ])]);
        let items = SheetIngestor.ingest_workbook(&workbook).expect("ingest").model.work_order;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].item_no, "1");
        assert_eq!(items[0].description, "PART A: EARTHWORK");
        assert_eq!(items[1].item_no, "A.1");
        assert_eq!(items[1].description, DEFAULT_DESCRIPTION);
        assert_eq!(items[2].item_no, "3");
        assert_eq!(items[2].unit, DEFAULT_UNIT);
        assert_eq!(items[2].amount(), Decimal::new(100, 0));
    }

    #[test]
    fn bad_numeric_cells_become_zero_and_are_counted() {
        let workbook = RawWorkbook::new(vec![work_order(vec![vec![
            t("7"),
            t("Plastering"),
            t("Sqm"),
            t("1,250.5"),
            t("N/A"),
        ]])]);
        let ingested = SheetIngestor.ingest_workbook(&workbook).expect("ingest");
        let item = &ingested.model.work_order[0];

        assert_eq!(item.quantity, Decimal::new(12505, 1));
        assert_eq!(item.rate, Decimal::ZERO);
        assert_eq!(item.amount(), Decimal::ZERO);
        assert_eq!(ingested.report.coerced_cells(), 1);
    }

    #[test]
    fn out_of_range_numbers_are_coerced_and_totals_stay_finite() {
        let workbook = RawWorkbook::new(vec![work_order(vec![
            vec![t("1"), t("Runaway row"), t("Cum"), n(1e15), n(1e15)],
            vec![t("2"), t("Earthwork"), t("Cum"), t("1000000000000"), n(2.0)],
        ])]);
        let ingested = SheetIngestor.ingest_workbook(&workbook).expect("ingest");
        let items = &ingested.model.work_order;

        assert_eq!(items[0].quantity, Decimal::ZERO);
        assert_eq!(items[0].rate, Decimal::ZERO);
        assert_eq!(items[1].quantity, MAX_CELL_MAGNITUDE);
        assert_eq!(ingested.report.coerced_cells(), 2);

        let summary = compute_summary(&ingested.model, &DeductionRates::default());
        assert_eq!(summary.subtotal, Decimal::from(2_000_000_000_000_i64));
    }

    #[test]
    fn unresolved_columns_receive_defaults() {
        let workbook = RawWorkbook::new(vec![RawSheet::new(
            "Work Order",
            vec![vec![t("Particulars"), t("Qty")], vec![t("Brick masonry"), n(3.0)]],
        )]);
        let ingested = SheetIngestor.ingest_workbook(&workbook).expect("ingest");
        let item = &ingested.model.work_order[0];

        assert_eq!(item.item_no, "1");
        assert_eq!(item.unit, "Nos");
        assert_eq!(item.rate, Decimal::ZERO);
        assert!(ingested.report.sheets[0].unresolved_fields.contains(&Field::Rate));
    }

    #[test]
    fn title_sheet_populates_metadata() {
        let workbook = RawWorkbook::new(vec![
            RawSheet::new(
                "Title",
                vec![
                    vec![t("Name of Work:"), t("Construction of culvert")],
                    vec![CellValue::Empty, t("Contractor"), t("M/s Rao & Sons")],
                    vec![t("Tender Premium"), n(4.5)],
                ],
            ),
            work_order(vec![vec![t("1"), t("Earthwork"), t("Cum"), n(1.0), n(1.0)]]),
        ]);
        let meta = SheetIngestor.ingest_workbook(&workbook).expect("ingest").model.meta;

        assert_eq!(meta.text(PROJECT_NAME), "Construction of culvert");
        assert_eq!(meta.text(CONTRACTOR), "M/s Rao & Sons");
        assert_eq!(meta.tender_premium_percent(), Decimal::new(45, 1));
    }

    #[test]
    fn empty_optional_sheet_yields_no_items() {
        let workbook = RawWorkbook::new(vec![
            work_order(vec![vec![t("1"), t("Earthwork"), t("Cum"), n(1.0), n(1.0)]]),
            RawSheet::new("Extra Items", vec![vec![CellValue::Empty]]),
        ]);
        let ingested = SheetIngestor.ingest_workbook(&workbook).expect("ingest");
        assert!(ingested.model.extra_items.is_empty());
    }

    #[test]
    fn coercion_counts_only_non_empty_failures() {
        let mut coerced = 0;
        assert_eq!(coerce_decimal(None, &mut coerced), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&CellValue::Empty), &mut coerced), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&t("  ")), &mut coerced), Decimal::ZERO);
        assert_eq!(coerce_decimal(Some(&t("1.5e2")), &mut coerced), Decimal::new(150, 0));
        assert_eq!(coerce_decimal(Some(&CellValue::Number(f64::NAN)), &mut coerced), Decimal::ZERO);
        assert_eq!(coerced, 1);
    }

    #[test]
    fn fingerprint_is_stable_hex_sha256() {
        assert_eq!(
            input_fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(input_fingerprint(b"abc"), input_fingerprint(b"abc"));
    }
}
