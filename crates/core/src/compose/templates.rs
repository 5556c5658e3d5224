use rust_decimal::Decimal;

use super::words::amount_in_words;
use super::{ComposeInput, Presenter};
use crate::domain::document::{Cell, Column, DocumentKind, DocumentSpec, Table};
use crate::domain::line_item::{total_amount, LineItem};
use crate::domain::meta::{
    ProjectMeta, BILL_NO, COMMENCEMENT_DATE, COMPLETION_DATE, CONTRACTOR, CONTRACT_NO,
    MEASUREMENT_BOOK, PROJECT_NAME,
};
use crate::domain::summary::FinancialSummary;

const FILL_IN: &str = "______________";

const PARTICULARS: &[(&str, &str)] = &[
    ("Name of work", PROJECT_NAME),
    ("Name of contractor", CONTRACTOR),
    ("Agreement no.", CONTRACT_NO),
    ("Bill no.", BILL_NO),
    ("Measurement book no.", MEASUREMENT_BOOK),
    ("Date of commencement", COMMENCEMENT_DATE),
    ("Date of completion", COMPLETION_DATE),
];

pub(super) fn first_page_summary(p: &Presenter, input: &ComposeInput<'_>) -> DocumentSpec {
    let model = input.model;
    let mut spec = DocumentSpec::new(DocumentKind::FirstPageSummary);
    spec.table(particulars(&model.meta, &PARTICULARS[..4]));

    spec.heading("Work Order Items");
    spec.table(items_table(p, &model.work_order));

    if model.has_extra_items() {
        spec.heading("Extra Items");
        spec.table(items_table(p, &model.extra_items));
    }

    spec.heading("Abstract of Cost");
    let mut abstract_rows = vec![
        ("Value of work order items".to_string(), total_amount(&model.work_order)),
        ("Value of extra items".to_string(), total_amount(&model.extra_items)),
    ];
    abstract_rows.extend(summary_rows(p, input.summary));
    spec.table(amount_table(p, abstract_rows));
    spec
}

pub(super) fn deviation_statement(p: &Presenter, input: &ComposeInput<'_>) -> DocumentSpec {
    let report = input.deviation;
    let mut spec = DocumentSpec::new(DocumentKind::DeviationStatement);
    spec.table(particulars(&input.model.meta, &PARTICULARS[..3]));

    let mut table = Table::new(vec![
        Column::text("Item No"),
        Column::text("Description"),
        Column::text("Unit"),
        Column::numeric("Rate"),
        Column::numeric("Work Order Qty"),
        Column::numeric("Work Order Amount"),
        Column::numeric("Executed Qty"),
        Column::numeric("Executed Amount"),
        Column::numeric("Excess Qty"),
        Column::numeric("Excess Amount"),
        Column::numeric("Saving Qty"),
        Column::numeric("Saving Amount"),
        Column::text("Remarks"),
    ]);
    for record in &report.records {
        let remark = if record.matched || !record.remark.trim().is_empty() {
            record.remark.clone()
        } else {
            "No bill quantity entry".to_string()
        };
        table.push_row(vec![
            Cell::text(&record.item_no),
            Cell::text(&record.description),
            Cell::text(&record.unit),
            Cell::Amount(p.money(record.rate)),
            Cell::Quantity(record.work_order_qty),
            Cell::Amount(p.money(record.work_order_amt())),
            Cell::Quantity(record.bill_qty),
            Cell::Amount(p.money(record.bill_amt())),
            Cell::Quantity(record.excess_qty),
            Cell::Amount(p.money(record.excess_amt)),
            Cell::Quantity(record.saving_qty),
            Cell::Amount(p.money(record.saving_amt)),
            Cell::text(remark),
        ]);
    }
    table.close_with_totals("Total", &[5, 7, 9, 11]);
    spec.table(table);

    let totals = &report.totals;
    spec.paragraph(format!(
        "Total excess Rs. {:.2}, total saving Rs. {:.2}, net deviation Rs. {:.2} ({} of the work order value).",
        p.money(totals.excess_amt),
        p.money(totals.saving_amt),
        p.money(totals.net_deviation),
        p.percent_label(totals.net_deviation_percent.round_dp(2)),
    ));
    let unmatched = report.records.iter().filter(|record| !record.matched).count();
    if unmatched > 0 {
        spec.paragraph(format!(
            "{unmatched} work order item(s) have no Bill Quantity entry and are shown as fully saved."
        ));
    }
    spec
}

pub(super) fn final_bill_scrutiny_sheet(p: &Presenter, input: &ComposeInput<'_>) -> DocumentSpec {
    let model = input.model;
    let report = input.deviation;
    let mut spec = DocumentSpec::new(DocumentKind::FinalBillScrutinySheet);
    spec.table(particulars(&model.meta, PARTICULARS));

    spec.heading("Financial Scrutiny");
    let mut rows = vec![
        ("Value as per work order".to_string(), report.totals.work_order_amt),
        ("Value of work executed".to_string(), report.totals.bill_amt),
        ("Value of extra items".to_string(), total_amount(&model.extra_items)),
    ];
    rows.extend(summary_rows(p, input.summary));
    spec.table(amount_table(p, rows));

    spec.heading("Deviation Check");
    spec.paragraph(format!(
        "{} item(s) exceed the work order quantity by Rs. {:.2}; {} item(s) fall short by Rs. {:.2}.",
        report.excess_count(),
        p.money(report.totals.excess_amt),
        report.saving_count(),
        p.money(report.totals.saving_amt),
    ));
    spec.paragraph(format!(
        "Net deviation is {} of the work order value.",
        p.percent_label(report.totals.net_deviation_percent.round_dp(2))
    ));
    spec
}

pub(super) fn extra_items_statement(p: &Presenter, input: &ComposeInput<'_>) -> DocumentSpec {
    let model = input.model;
    let mut spec = DocumentSpec::new(DocumentKind::ExtraItemsStatement);
    spec.table(particulars(&model.meta, &PARTICULARS[..3]));
    spec.table(items_table(p, &model.extra_items));
    spec.paragraph(format!(
        "Extra items are included in the bill subtotal and carry the tender premium of {}.",
        p.percent_label(input.summary.premium_percent)
    ));
    spec
}

pub(super) fn certificate_ii(p: &Presenter, input: &ComposeInput<'_>) -> DocumentSpec {
    let meta = &input.model.meta;
    let mut spec = DocumentSpec::new(DocumentKind::CertificateII);
    spec.paragraph(format!(
        "Certified that the measurements on which this bill is based were taken and recorded in Measurement Book No. {} and that the work \"{}\" has been executed by {} in accordance with agreement no. {}.",
        fill_in(meta.text(MEASUREMENT_BOOK)),
        fill_in(meta.text(PROJECT_NAME)),
        fill_in(meta.text(CONTRACTOR)),
        fill_in(meta.text(CONTRACT_NO)),
    ));
    spec.paragraph(format!(
        "Certified that the value of work done, including tender premium, is Rs. {:.2}.",
        p.money(input.summary.gross_total)
    ));
    spec.paragraph("Certified that the quantities billed do not exceed those actually executed and that no item has been paid for previously.");
    spec.table(signatures());
    spec
}

pub(super) fn certificate_iii(p: &Presenter, input: &ComposeInput<'_>) -> DocumentSpec {
    let meta = &input.model.meta;
    let summary = input.summary;
    let mut spec = DocumentSpec::new(DocumentKind::CertificateIII);
    spec.table(particulars(meta, &PARTICULARS[..4]));

    let rates = p.rates();
    let rows = vec![
        ("Gross value of work done".to_string(), summary.gross_total),
        (format!("Security deposit @ {}", p.percent_label(rates.sd_percent)), summary.deductions.sd),
        (format!("Income tax @ {}", p.percent_label(rates.it_percent)), summary.deductions.it),
        (format!("GST @ {}", p.percent_label(rates.gst_percent)), summary.deductions.gst),
        (format!("Labour cess @ {}", p.percent_label(rates.lc_percent)), summary.deductions.lc),
        ("Total deductions".to_string(), summary.deductions.total()),
        ("Net amount payable".to_string(), summary.net_payable),
    ];
    spec.table(amount_table(p, rows));

    let net = p.money(summary.net_payable);
    spec.paragraph(format!(
        "Certified that a sum of Rs. {net:.2} ({}) is payable to {} against bill no. {}.",
        amount_in_words(net),
        fill_in(meta.text(CONTRACTOR)),
        fill_in(meta.text(BILL_NO)),
    ));
    spec.table(signatures());
    spec
}

fn fill_in(value: &str) -> &str {
    if value.trim().is_empty() {
        FILL_IN
    } else {
        value
    }
}

fn particulars(meta: &ProjectMeta, keys: &[(&str, &str)]) -> Table {
    let mut table = Table::new(vec![Column::text("Particulars"), Column::text("Details")]);
    for (label, key) in keys {
        table.push_row(vec![Cell::text(*label), Cell::text(meta.text(key))]);
    }
    table
}

fn items_table(p: &Presenter, items: &[LineItem]) -> Table {
    let mut table = Table::new(vec![
        Column::text("Item No"),
        Column::text("Description"),
        Column::text("Unit"),
        Column::numeric("Quantity"),
        Column::numeric("Rate"),
        Column::numeric("Amount"),
        Column::text("Remarks"),
    ]);
    for item in items {
        table.push_row(vec![
            Cell::text(&item.item_no),
            Cell::text(&item.description),
            Cell::text(&item.unit),
            Cell::Quantity(item.quantity),
            Cell::Amount(p.money(item.rate)),
            Cell::Amount(p.money(item.amount())),
            Cell::text(&item.remark),
        ]);
    }
    table.close_with_totals("Total", &[5]);
    table
}

/// Two-column money table without a summing row; its rows are a
/// derivation, not addends.
fn amount_table(p: &Presenter, rows: Vec<(String, Decimal)>) -> Table {
    let mut table = Table::new(vec![Column::text("Particulars"), Column::numeric("Amount (Rs.)")]);
    for (label, value) in rows {
        table.push_row(vec![Cell::text(label), Cell::Amount(p.money(value))]);
    }
    table
}

fn summary_rows(p: &Presenter, summary: &FinancialSummary) -> Vec<(String, Decimal)> {
    let rates = p.rates();
    vec![
        ("Subtotal".to_string(), summary.subtotal),
        (format!("Tender premium @ {}", p.percent_label(summary.premium_percent)), summary.premium_amount),
        ("Gross total".to_string(), summary.gross_total),
        (format!("Less security deposit @ {}", p.percent_label(rates.sd_percent)), summary.deductions.sd),
        (format!("Less income tax @ {}", p.percent_label(rates.it_percent)), summary.deductions.it),
        (format!("Less GST @ {}", p.percent_label(rates.gst_percent)), summary.deductions.gst),
        (format!("Less labour cess @ {}", p.percent_label(rates.lc_percent)), summary.deductions.lc),
        ("Total deductions".to_string(), summary.deductions.total()),
        ("Net payable".to_string(), summary.net_payable),
    ]
}

fn signatures() -> Table {
    let mut table = Table::new(vec![
        Column::text("Prepared by"),
        Column::text("Checked by"),
        Column::text("Approved by"),
    ]);
    table.push_row(vec![Cell::Blank, Cell::Blank, Cell::Blank]);
    table.push_row(vec![
        Cell::text("Junior Engineer"),
        Cell::text("Assistant Engineer"),
        Cell::text("Executive Engineer"),
    ]);
    table
}
