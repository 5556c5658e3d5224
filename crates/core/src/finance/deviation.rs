use std::collections::HashMap;

use rust_decimal::Decimal;

use crate::domain::deviation::{priced, DeviationRecord, DeviationReport, DeviationTotals};
use crate::domain::line_item::{saturating_sum, BillOfQuantities, LineItem};

/// Pairs every work-order item with the first Bill Quantity row sharing its
/// trimmed item number and prices the difference at the work-order rate.
///
/// Duplicate item numbers in the Bill Quantity sheet are not reconciled:
/// the first row in sheet order is used and later ones are ignored. An
/// unmatched work-order item is treated as not executed.
pub fn compute_deviation(model: &BillOfQuantities) -> DeviationReport {
    let mut executed: HashMap<&str, &LineItem> = HashMap::new();
    for item in &model.bill_quantity {
        executed.entry(item.match_key()).or_insert(item);
    }

    let records: Vec<DeviationRecord> = model
        .work_order
        .iter()
        .map(|ordered| {
            let matched = executed.get(ordered.match_key()).copied();
            deviation_record(ordered, matched)
        })
        .collect();

    let totals = totals(&records);
    DeviationReport { records, totals }
}

fn deviation_record(ordered: &LineItem, executed: Option<&LineItem>) -> DeviationRecord {
    let work_order_qty = ordered.quantity;
    let bill_qty = executed.map(|item| item.quantity).unwrap_or(Decimal::ZERO);
    let rate = ordered.rate;

    let excess_qty = bill_qty.saturating_sub(work_order_qty).max(Decimal::ZERO);
    let saving_qty = work_order_qty.saturating_sub(bill_qty).max(Decimal::ZERO);

    DeviationRecord {
        item_no: ordered.item_no.clone(),
        description: ordered.description.clone(),
        unit: ordered.unit.clone(),
        work_order_qty,
        bill_qty,
        rate,
        excess_qty,
        excess_amt: priced(excess_qty, rate),
        saving_qty,
        saving_amt: priced(saving_qty, rate),
        matched: executed.is_some(),
        remark: ordered.remark.clone(),
    }
}

fn totals(records: &[DeviationRecord]) -> DeviationTotals {
    let work_order_amt = saturating_sum(records.iter().map(DeviationRecord::work_order_amt));
    let bill_amt = saturating_sum(records.iter().map(DeviationRecord::bill_amt));
    let excess_amt = saturating_sum(records.iter().map(|record| record.excess_amt));
    let saving_amt = saturating_sum(records.iter().map(|record| record.saving_amt));
    let net_deviation = excess_amt.saturating_sub(saving_amt);
    let net_deviation_percent = percent_of_total(net_deviation, work_order_amt);

    DeviationTotals {
        work_order_amt,
        bill_amt,
        excess_amt,
        saving_amt,
        net_deviation,
        net_deviation_percent,
    }
}

/// `part / whole * 100`; 0 when `whole` is zero, clamped when the quotient
/// leaves the `Decimal` range.
fn percent_of_total(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    let ratio = part.checked_div(whole).unwrap_or(
        if part.is_sign_negative() == whole.is_sign_negative() { Decimal::MAX } else { Decimal::MIN },
    );
    ratio.saturating_mul(Decimal::ONE_HUNDRED)
}
