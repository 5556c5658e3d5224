//! Totals, premium, statutory deductions and the deviation report.
//!
//! Everything here is a pure function of the ingested model. Arithmetic is
//! exact decimal and stays unrounded; documents round when they present a
//! value.

pub mod deviation;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::deviation::DeviationReport;
use crate::domain::line_item::{total_amount, BillOfQuantities};
use crate::domain::summary::{Deductions, FinancialSummary};

/// Deduction percentages applied to the gross total.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRates {
    pub sd_percent: Decimal,
    pub it_percent: Decimal,
    pub gst_percent: Decimal,
    pub lc_percent: Decimal,
}

impl Default for DeductionRates {
    fn default() -> Self {
        Self {
            sd_percent: Decimal::new(10, 0),
            it_percent: Decimal::new(2, 0),
            gst_percent: Decimal::new(2, 0),
            lc_percent: Decimal::new(1, 0),
        }
    }
}

impl DeductionRates {
    pub fn apply(&self, gross_total: Decimal) -> Deductions {
        Deductions {
            sd: percent_of(gross_total, self.sd_percent),
            it: percent_of(gross_total, self.it_percent),
            gst: percent_of(gross_total, self.gst_percent),
            lc: percent_of(gross_total, self.lc_percent),
        }
    }
}

fn percent_of(base: Decimal, percent: Decimal) -> Decimal {
    base.saturating_mul(percent / Decimal::ONE_HUNDRED)
}

pub trait FinancialEngine: Send + Sync {
    fn summarize(&self, model: &BillOfQuantities) -> FinancialSummary;
    fn deviation(&self, model: &BillOfQuantities) -> DeviationReport;
}

#[derive(Clone, Debug, Default)]
pub struct StandardFinancialEngine {
    rates: DeductionRates,
}

impl StandardFinancialEngine {
    pub fn new(rates: DeductionRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &DeductionRates {
        &self.rates
    }
}

impl FinancialEngine for StandardFinancialEngine {
    fn summarize(&self, model: &BillOfQuantities) -> FinancialSummary {
        compute_summary(model, &self.rates)
    }

    fn deviation(&self, model: &BillOfQuantities) -> DeviationReport {
        deviation::compute_deviation(model)
    }
}

/// Subtotal over work-order and extra items, premium from the project
/// metadata, then deductions on the gross total. Every stage saturates at
/// the `Decimal` range rather than panicking.
pub fn compute_summary(model: &BillOfQuantities, rates: &DeductionRates) -> FinancialSummary {
    let subtotal = total_amount(&model.work_order).saturating_add(total_amount(&model.extra_items));
    let premium_percent = model.meta.tender_premium_percent();
    let gross_total = subtotal.saturating_mul(Decimal::ONE + premium_percent / Decimal::ONE_HUNDRED);
    let premium_amount = gross_total.saturating_sub(subtotal);
    let deductions = rates.apply(gross_total);
    let net_payable = gross_total.saturating_sub(deductions.total());

    FinancialSummary {
        subtotal,
        premium_percent,
        premium_amount,
        gross_total,
        deductions,
        net_payable,
    }
}

/// Per-stage breakdown of a summary for audit output.
pub fn summary_trace(summary: &FinancialSummary, rates: &DeductionRates) -> Vec<(String, Decimal)> {
    vec![
        ("subtotal = sum(quantity * rate)".to_string(), summary.subtotal),
        (format!("premium @ {}%", summary.premium_percent.normalize()), summary.premium_amount),
        ("gross_total".to_string(), summary.gross_total),
        (format!("sd @ {}%", rates.sd_percent.normalize()), summary.deductions.sd),
        (format!("it @ {}%", rates.it_percent.normalize()), summary.deductions.it),
        (format!("gst @ {}%", rates.gst_percent.normalize()), summary.deductions.gst),
        (format!("lc @ {}%", rates.lc_percent.normalize()), summary.deductions.lc),
        ("net_payable".to_string(), summary.net_payable),
    ]
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{compute_summary, DeductionRates, FinancialEngine, StandardFinancialEngine};
    use crate::domain::line_item::{BillOfQuantities, LineItem};
    use crate::domain::meta::ProjectMeta;

    fn item(no: &str, quantity: i64, rate: i64) -> LineItem {
        LineItem {
            item_no: no.to_string(),
            description: format!("item {no}"),
            unit: "Nos".to_string(),
            quantity: Decimal::from(quantity),
            rate: Decimal::from(rate),
            remark: String::new(),
        }
    }

    fn model(premium: &str, work_order: Vec<LineItem>, extra: Vec<LineItem>) -> BillOfQuantities {
        BillOfQuantities {
            meta: ProjectMeta::from_entries([("Tender Premium", premium)]),
            work_order,
            bill_quantity: Vec::new(),
            extra_items: extra,
        }
    }

    #[test]
    fn single_item_without_premium_matches_reference_figures() {
        let summary = StandardFinancialEngine::default()
            .summarize(&model("0", vec![item("1", 10, 100)], Vec::new()));

        assert_eq!(summary.subtotal, Decimal::from(1000));
        assert_eq!(summary.premium_amount, Decimal::ZERO);
        assert_eq!(summary.gross_total, Decimal::from(1000));
        assert_eq!(summary.deductions.sd, Decimal::from(100));
        assert_eq!(summary.deductions.it, Decimal::from(20));
        assert_eq!(summary.deductions.gst, Decimal::from(20));
        assert_eq!(summary.deductions.lc, Decimal::from(10));
        assert_eq!(summary.net_payable, Decimal::from(850));
    }

    #[test]
    fn extra_items_count_towards_subtotal_and_zero_rates_do_not() {
        let summary = compute_summary(
            &model("0", vec![item("1", 10, 100), item("2", 500, 0)], vec![item("E1", 2, 50)]),
            &DeductionRates::default(),
        );
        assert_eq!(summary.subtotal, Decimal::from(1100));
    }

    #[test]
    fn premium_and_deduction_identities_hold_across_inputs() {
        let rates = DeductionRates::default();
        let premiums = ["0", "4.75", "12.5 % above", "7.25% below", "-0.01"];
        let quantities = [(3, 7), (125, 4499), (1, 1), (999, 12), (0, 10)];

        for premium in premiums {
            for (quantity, rate) in quantities {
                let summary = compute_summary(
                    &model(premium, vec![item("1", quantity, rate), item("2", 7, 33)], Vec::new()),
                    &rates,
                );
                let factor = Decimal::ONE + summary.premium_percent / Decimal::ONE_HUNDRED;
                assert_eq!(summary.gross_total, summary.subtotal * factor);
                assert_eq!(
                    summary.deductions.sd,
                    summary.gross_total * (rates.sd_percent / Decimal::ONE_HUNDRED)
                );
                assert_eq!(
                    summary.deductions.lc,
                    summary.gross_total * (rates.lc_percent / Decimal::ONE_HUNDRED)
                );
                assert_eq!(
                    summary.net_payable,
                    summary.gross_total - summary.deductions.total()
                );
            }
        }
    }

    #[test]
    fn below_premium_reduces_gross_total() {
        let summary =
            compute_summary(&model("10% below", vec![item("1", 10, 100)], Vec::new()), &DeductionRates::default());
        assert_eq!(summary.premium_percent, Decimal::from(-10));
        assert_eq!(summary.gross_total, Decimal::from(900));
        assert_eq!(summary.premium_amount, Decimal::from(-100));
    }

    #[test]
    fn oversized_rows_saturate_instead_of_panicking() {
        let huge = 1_000_000_000_000_000;
        let summary = compute_summary(
            &model("5", vec![item("1", huge, huge), item("2", huge, huge)], vec![item("E1", huge, huge)]),
            &DeductionRates::default(),
        );

        assert_eq!(summary.subtotal, Decimal::MAX);
        assert_eq!(summary.gross_total, Decimal::MAX);
        assert!(summary.deductions.total() > Decimal::ZERO);
        assert!(summary.net_payable < summary.gross_total);
        assert!(summary.net_payable > Decimal::ZERO);
    }

    #[test]
    fn empty_model_yields_zero_summary() {
        let summary = compute_summary(&BillOfQuantities::default(), &DeductionRates::default());
        assert_eq!(summary.net_payable, Decimal::ZERO);
        assert_eq!(summary.deductions.total(), Decimal::ZERO);
    }
}
