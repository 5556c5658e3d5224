use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::line_item::saturating_sum;

/// Statutory recoveries, each a fixed percentage of the gross total.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deductions {
    /// Security deposit.
    pub sd: Decimal,
    /// Income tax.
    pub it: Decimal,
    pub gst: Decimal,
    /// Labour cess.
    pub lc: Decimal,
}

impl Deductions {
    pub fn total(&self) -> Decimal {
        saturating_sum([self.sd, self.it, self.gst, self.lc])
    }
}

/// Money totals for one run. Values are unrounded; rounding happens only
/// when a document is composed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub subtotal: Decimal,
    pub premium_percent: Decimal,
    pub premium_amount: Decimal,
    pub gross_total: Decimal,
    pub deductions: Deductions,
    pub net_payable: Decimal,
}
