use std::fmt;

use serde::{Deserialize, Serialize};

use super::workbook::CellValue;

/// Bumped whenever [`COLUMN_ALIASES`] changes.
pub const ALIAS_TABLE_VERSION: u32 = 1;

/// Rows scanned from the top of a sheet when looking for the header.
pub const HEADER_SCAN_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ItemNo,
    Description,
    Unit,
    Quantity,
    Rate,
    Remark,
}

impl Field {
    pub const ALL: [Field; 6] =
        [Field::ItemNo, Field::Description, Field::Unit, Field::Quantity, Field::Rate, Field::Remark];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ItemNo => "item_no",
            Self::Description => "description",
            Self::Unit => "unit",
            Self::Quantity => "quantity",
            Self::Rate => "rate",
            Self::Remark => "remark",
        };
        f.write_str(name)
    }
}

/// Header spellings per canonical field, in priority order. The first alias
/// present in the header row wins. A sheet's own amount column is never
/// read.
pub const COLUMN_ALIASES: &[(Field, &[&str])] = &[
    (
        Field::ItemNo,
        &["Item No", "Item No.", "Item", "S. No.", "S.No.", "S No", "Sl. No.", "Sl No", "Sr. No."],
    ),
    (
        Field::Description,
        &["Description", "Description of Item", "Item Description", "Particulars", "Name of Item"],
    ),
    (Field::Unit, &["Unit", "Units", "UOM"]),
    (
        Field::Quantity,
        &[
            "Quantity",
            "Qty",
            "Qty.",
            "Bill Quantity",
            "Bill Qty",
            "Executed Qty",
            "Quantity Executed",
            "Qty Executed",
        ],
    ),
    (Field::Rate, &["Rate", "Unit Rate", "Rate (Rs.)", "Rate in Rs.", "Rate Rs."]),
    (Field::Remark, &["Remark", "Remarks", "Note", "Notes"]),
];

fn normalize(header: &str) -> String {
    header.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase()
}

/// Column index per canonical field for one sheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: Vec<(Field, usize)>,
}

impl ColumnMap {
    pub fn resolve(header: &[CellValue]) -> Self {
        let normalized: Vec<String> =
            header.iter().map(|cell| normalize(&cell.as_text())).collect();

        let indices = COLUMN_ALIASES
            .iter()
            .filter_map(|(field, aliases)| {
                aliases.iter().find_map(|alias| {
                    let alias = normalize(alias);
                    normalized.iter().position(|candidate| *candidate == alias)
                })
                .map(|index| (*field, index))
            })
            .collect();

        Self { indices }
    }

    pub fn index(&self, field: Field) -> Option<usize> {
        self.indices.iter().find(|(candidate, _)| *candidate == field).map(|(_, index)| *index)
    }

    pub fn cell<'a>(&self, row: &'a [CellValue], field: Field) -> Option<&'a CellValue> {
        self.index(field).and_then(|index| row.get(index))
    }

    pub fn unresolved(&self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|field| self.index(*field).is_none()).collect()
    }

    /// Whether the row looks like a line-item header at all.
    pub fn is_header(&self) -> bool {
        [Field::ItemNo, Field::Description, Field::Quantity, Field::Rate]
            .into_iter()
            .any(|field| self.index(field).is_some())
    }
}

/// Finds the header row among the first [`HEADER_SCAN_LIMIT`] rows.
pub fn find_header(rows: &[Vec<CellValue>]) -> Option<(usize, ColumnMap)> {
    rows.iter().take(HEADER_SCAN_LIMIT).enumerate().find_map(|(index, row)| {
        let map = ColumnMap::resolve(row);
        map.is_header().then_some((index, map))
    })
}
