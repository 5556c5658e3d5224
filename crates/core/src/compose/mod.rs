//! Document composition.
//!
//! Maps the ingested model and the financial results onto one
//! [`DocumentSpec`] per catalog entry. Each kind has a plain template
//! function; nothing here knows about HTML or PDF.

mod templates;
pub mod words;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::deviation::DeviationReport;
use crate::domain::document::{DocumentKind, DocumentSpec};
use crate::domain::line_item::BillOfQuantities;
use crate::domain::summary::FinancialSummary;
use crate::finance::DeductionRates;

pub const DEFAULT_DISPLAY_PRECISION: u32 = 2;

/// Everything a template may read. Borrowed, never mutated.
#[derive(Clone, Copy, Debug)]
pub struct ComposeInput<'a> {
    pub model: &'a BillOfQuantities,
    pub summary: &'a FinancialSummary,
    pub deviation: &'a DeviationReport,
}

pub(crate) type TemplateFn = fn(&Presenter, &ComposeInput<'_>) -> DocumentSpec;

/// Rounding and labelling rules shared by the templates.
#[derive(Clone, Debug)]
pub struct Presenter {
    precision: u32,
    rates: DeductionRates,
}

impl Presenter {
    pub fn new(precision: u32, rates: DeductionRates) -> Self {
        Self { precision, rates }
    }

    /// Rounds half away from zero and fixes the scale, so `100` presents as
    /// `100.00` at precision 2.
    pub fn money(&self, value: Decimal) -> Decimal {
        let mut rounded =
            value.round_dp_with_strategy(self.precision, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(self.precision);
        rounded
    }

    pub fn rates(&self) -> &DeductionRates {
        &self.rates
    }

    pub fn percent_label(&self, value: Decimal) -> String {
        format!("{}%", value.normalize())
    }
}

#[derive(Clone, Debug)]
pub struct DocumentComposer {
    presenter: Presenter,
}

impl Default for DocumentComposer {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_PRECISION, DeductionRates::default())
    }
}

impl DocumentComposer {
    pub fn new(precision: u32, rates: DeductionRates) -> Self {
        Self { presenter: Presenter::new(precision, rates) }
    }

    /// Documents to produce for this model, in packet order. The extra
    /// items statement is only included when there are extra items.
    pub fn catalog(&self, model: &BillOfQuantities) -> Vec<DocumentKind> {
        DocumentKind::ALL
            .into_iter()
            .filter(|kind| *kind != DocumentKind::ExtraItemsStatement || model.has_extra_items())
            .collect()
    }

    pub fn compose(&self, kind: DocumentKind, input: &ComposeInput<'_>) -> DocumentSpec {
        template_for(kind)(&self.presenter, input)
    }

    pub fn compose_all(&self, input: &ComposeInput<'_>) -> Vec<DocumentSpec> {
        self.catalog(input.model).into_iter().map(|kind| self.compose(kind, input)).collect()
    }
}

fn template_for(kind: DocumentKind) -> TemplateFn {
    match kind {
        DocumentKind::FirstPageSummary => templates::first_page_summary,
        DocumentKind::DeviationStatement => templates::deviation_statement,
        DocumentKind::FinalBillScrutinySheet => templates::final_bill_scrutiny_sheet,
        DocumentKind::ExtraItemsStatement => templates::extra_items_statement,
        DocumentKind::CertificateII => templates::certificate_ii,
        DocumentKind::CertificateIII => templates::certificate_iii,
    }
}
