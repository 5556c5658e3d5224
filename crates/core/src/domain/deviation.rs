use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ordered-versus-executed comparison for one work-order item. Both sides
/// are priced at the work-order rate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviationRecord {
    pub item_no: String,
    pub description: String,
    pub unit: String,
    pub work_order_qty: Decimal,
    pub bill_qty: Decimal,
    pub rate: Decimal,
    pub excess_qty: Decimal,
    pub excess_amt: Decimal,
    pub saving_qty: Decimal,
    pub saving_amt: Decimal,
    /// False when no Bill Quantity row shares the item number.
    pub matched: bool,
    pub remark: String,
}

impl DeviationRecord {
    pub fn work_order_amt(&self) -> Decimal {
        priced(self.work_order_qty, self.rate)
    }

    pub fn bill_amt(&self) -> Decimal {
        priced(self.bill_qty, self.rate)
    }
}

pub(crate) fn priced(quantity: Decimal, rate: Decimal) -> Decimal {
    if rate.is_zero() {
        Decimal::ZERO
    } else {
        quantity.saturating_mul(rate)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviationTotals {
    pub work_order_amt: Decimal,
    pub bill_amt: Decimal,
    pub excess_amt: Decimal,
    pub saving_amt: Decimal,
    /// `excess_amt - saving_amt`.
    pub net_deviation: Decimal,
    /// Net deviation as a percentage of the work-order amount; 0 for an
    /// empty work order.
    pub net_deviation_percent: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviationReport {
    pub records: Vec<DeviationRecord>,
    pub totals: DeviationTotals,
}

impl DeviationReport {
    pub fn record(&self, item_no: &str) -> Option<&DeviationRecord> {
        self.records.iter().find(|record| record.item_no.trim() == item_no.trim())
    }

    pub fn excess_count(&self) -> usize {
        self.records.iter().filter(|record| record.excess_qty > Decimal::ZERO).count()
    }

    pub fn saving_count(&self) -> usize {
        self.records.iter().filter(|record| record.saving_qty > Decimal::ZERO).count()
    }
}
