use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const PROJECT_NAME: &str = "project_name";
pub const CONTRACT_NO: &str = "contract_no";
pub const CONTRACTOR: &str = "contractor";
pub const TENDER_PREMIUM: &str = "tender_premium";
pub const COMMENCEMENT_DATE: &str = "commencement_date";
pub const COMPLETION_DATE: &str = "completion_date";
pub const BILL_NO: &str = "bill_no";
pub const MEASUREMENT_BOOK: &str = "measurement_book";

/// Well-known keys and the value used when the Title sheet omits them.
pub const DEFAULT_ENTRIES: &[(&str, &str)] = &[
    (PROJECT_NAME, ""),
    (CONTRACT_NO, ""),
    (CONTRACTOR, ""),
    (TENDER_PREMIUM, "0"),
    (COMMENCEMENT_DATE, ""),
    (COMPLETION_DATE, ""),
    (BILL_NO, ""),
    (MEASUREMENT_BOOK, ""),
];

/// Title-sheet labels recognised for each well-known key, compared
/// case-insensitively after trimming.
pub const KEY_ALIASES: &[(&str, &[&str])] = &[
    (PROJECT_NAME, &["name of work", "project name", "project", "name of project", "work"]),
    (CONTRACT_NO, &["agreement no", "agreement no.", "contract no", "contract no.", "contract number"]),
    (CONTRACTOR, &["name of contractor", "contractor", "contractor name", "agency"]),
    (TENDER_PREMIUM, &["tender premium", "tender premium %", "premium", "premium %"]),
    (COMMENCEMENT_DATE, &["date of commencement", "commencement date", "start date"]),
    (COMPLETION_DATE, &["date of completion", "completion date", "actual date of completion"]),
    (BILL_NO, &["bill no", "bill no.", "bill number", "running bill no"]),
    (MEASUREMENT_BOOK, &["measurement book no", "measurement book", "mb no", "mb no."]),
];

/// Project metadata from the Title sheet. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectMeta {
    entries: BTreeMap<String, String>,
}

impl Default for ProjectMeta {
    fn default() -> Self {
        Self::from_entries(std::iter::empty::<(String, String)>())
    }
}

impl ProjectMeta {
    /// Builds metadata from raw label/value pairs. Labels matching a known
    /// alias are stored under the canonical key; the first occurrence of a
    /// key wins. Missing well-known keys receive their defaults.
    pub fn from_entries<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = BTreeMap::new();
        for (label, value) in pairs {
            let key = canonical_key(label.as_ref());
            if key.is_empty() {
                continue;
            }
            entries.entry(key).or_insert_with(|| value.into().trim().to_string());
        }
        for (key, default) in DEFAULT_ENTRIES {
            entries.entry((*key).to_string()).or_insert_with(|| (*default).to_string());
        }
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Value for `key`, or an empty string so templates render a blank cell.
    pub fn text(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Signed tender premium percentage, 0 when absent or unreadable.
    pub fn tender_premium_percent(&self) -> Decimal {
        self.get(TENDER_PREMIUM).and_then(parse_premium).unwrap_or(Decimal::ZERO)
    }
}

/// Maps a Title-sheet label to its canonical key, or to the trimmed label
/// itself when it is not a known alias.
pub fn canonical_key(label: &str) -> String {
    let trimmed = label.trim().trim_end_matches(':').trim();
    let normalized = trimmed.to_ascii_lowercase();
    KEY_ALIASES
        .iter()
        .find(|(_, aliases)| aliases.iter().any(|alias| *alias == normalized))
        .map(|(key, _)| (*key).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Parses values such as `5`, `-3.5`, `4.25 %`, `5% above` or `2.5% below`.
/// "below" marks a markdown and flips the sign.
pub fn parse_premium(raw: &str) -> Option<Decimal> {
    let lowered = raw.trim().to_ascii_lowercase();
    let below = lowered.contains("below");
    let numeric: String = lowered
        .replace("above", "")
        .replace("below", "")
        .replace('%', "")
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .collect();
    let value = Decimal::from_str(&numeric).ok()?;
    Some(if below { -value.abs() } else { value })
}
