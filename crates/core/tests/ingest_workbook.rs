use billpack_core::domain::meta::{CONTRACTOR, CONTRACT_NO, PROJECT_NAME};
use billpack_core::finance::{compute_summary, deviation::compute_deviation, DeductionRates};
use billpack_core::{IngestError, SheetIngestor};
use rust_decimal::Decimal;

const WORKBOOK: &[u8] = include_bytes!("fixtures/mdr12.xlsx");
const NO_WORK_ORDER: &[u8] = include_bytes!("fixtures/no_work_order.xlsx");

fn dec(value: &str) -> Decimal {
    value.parse().expect("decimal literal")
}

#[test]
fn reads_every_canonical_sheet_from_a_real_workbook() {
    let ingested = SheetIngestor.ingest_with_report(WORKBOOK).expect("workbook ingests");
    let model = &ingested.model;

    assert_eq!(model.meta.text(PROJECT_NAME), "Resurfacing of MDR-12 road");
    assert_eq!(model.meta.text(CONTRACT_NO), "EE/PWD/42/2025-26");
    assert_eq!(model.meta.text(CONTRACTOR), "M/s Acme Builders");
    assert_eq!(model.meta.tender_premium_percent(), Decimal::from(5));

    let numbers: Vec<&str> = model.work_order.iter().map(|item| item.item_no.as_str()).collect();
    assert_eq!(numbers, ["1", "2", "3", "4"]);
    assert_eq!(model.work_order[1].quantity, dec("12.5"));
    assert_eq!(model.work_order[1].rate, dec("4500.5"));
    assert_eq!(model.work_order[2].amount(), Decimal::ZERO);

    assert_eq!(model.bill_quantity.len(), 3);
    assert_eq!(model.bill_quantity[2].quantity, Decimal::from(260));
    assert_eq!(model.extra_items.len(), 2);
    assert_eq!(model.extra_items[0].remark, "approved");
    assert_eq!(model.extra_items[1].quantity, Decimal::ZERO);
}

#[test]
fn report_records_header_rows_and_coerced_cells() {
    let ingested = SheetIngestor.ingest_with_report(WORKBOOK).expect("workbook ingests");
    let report = &ingested.report;

    assert!(report.missing_optional_sheets.is_empty());
    let work_order = report.sheets.iter().find(|sheet| sheet.sheet == "Work Order").expect("sheet");
    assert_eq!(work_order.header_row, Some(1));
    assert_eq!(work_order.rows_retained, 4);
    assert_eq!(report.coerced_cells(), 1);
}

#[test]
fn financial_results_match_hand_computation() {
    let model = SheetIngestor.ingest(WORKBOOK).expect("workbook ingests");
    let summary = compute_summary(&model, &DeductionRates::default());

    assert_eq!(summary.subtotal, dec("143266.25"));
    assert_eq!(summary.gross_total, dec("150429.5625"));
    assert_eq!(summary.deductions.sd, dec("15042.95625"));
    assert_eq!(summary.net_payable, dec("127865.128125"));

    let deviation = compute_deviation(&model);
    assert_eq!(deviation.totals.work_order_amt, dec("137256.25"));
    assert_eq!(deviation.totals.excess_amt, dec("3700"));
    assert_eq!(deviation.totals.saving_amt, dec("11251.25"));
    assert!(!deviation.record("3").expect("item 3").matched);
}

#[test]
fn workbook_without_work_order_is_rejected() {
    let error = SheetIngestor.ingest(NO_WORK_ORDER).expect_err("must fail");
    assert_eq!(error, IngestError::MissingRequiredSheet { sheet: "Work Order".to_string() });
}

#[test]
fn non_spreadsheet_bytes_are_a_schema_error() {
    let error = SheetIngestor.ingest(b"not a workbook").expect_err("must fail");
    assert_eq!(error.error_class(), "schema_error");
}
