use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::meta::ProjectMeta;

/// One row of a bill-of-quantities sheet.
///
/// The amount is never stored: it is derived from quantity and rate every
/// time it is read, so a sheet's own "Amount" column can never disagree
/// with what gets billed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub item_no: String,
    pub description: String,
    pub unit: String,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub remark: String,
}

impl LineItem {
    /// `quantity * rate`, clamped to the representable range.
    pub fn amount(&self) -> Decimal {
        if self.rate.is_zero() {
            return Decimal::ZERO;
        }
        self.quantity.saturating_mul(self.rate)
    }

    /// Item number used for cross-sheet matching.
    pub fn match_key(&self) -> &str {
        self.item_no.trim()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCollection {
    WorkOrder,
    BillQuantity,
    ExtraItems,
}

/// Canonical in-memory model produced by ingestion.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillOfQuantities {
    pub meta: ProjectMeta,
    pub work_order: Vec<LineItem>,
    pub bill_quantity: Vec<LineItem>,
    pub extra_items: Vec<LineItem>,
}

impl BillOfQuantities {
    pub fn items(&self, collection: ItemCollection) -> &[LineItem] {
        match collection {
            ItemCollection::WorkOrder => &self.work_order,
            ItemCollection::BillQuantity => &self.bill_quantity,
            ItemCollection::ExtraItems => &self.extra_items,
        }
    }

    pub fn has_extra_items(&self) -> bool {
        !self.extra_items.is_empty()
    }
}

pub fn total_amount(items: &[LineItem]) -> Decimal {
    saturating_sum(items.iter().map(LineItem::amount))
}

/// Sum that clamps at `Decimal::MAX`/`Decimal::MIN` instead of panicking.
pub fn saturating_sum(values: impl IntoIterator<Item = Decimal>) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}
