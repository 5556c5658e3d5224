use thiserror::Error;

/// Fatal ingestion failures. Anything else found in a workbook (bad cells,
/// missing optional sheets, unknown columns) is defaulted, not raised.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("required sheet `{sheet}` was not found in the workbook")]
    MissingRequiredSheet { sheet: String },
    #[error("sheet `{sheet}` has an unusable structure: {reason}")]
    SchemaError { sheet: String, reason: String },
    #[error("workbook could not be opened: {0}")]
    Workbook(String),
}

impl IngestError {
    pub fn schema(sheet: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaError { sheet: sheet.into(), reason: reason.into() }
    }

    /// Stable identifier for structured output.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::MissingRequiredSheet { .. } => "missing_required_sheet",
            Self::SchemaError { .. } | Self::Workbook(_) => "schema_error",
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MissingRequiredSheet { .. } => {
                "The workbook has no \"Work Order\" sheet. Rename the sheet holding the contracted items and try again."
            }
            Self::SchemaError { .. } => {
                "A sheet could not be read. Check that it has a header row with item, description, quantity and rate columns."
            }
            Self::Workbook(_) => "The file is not a readable spreadsheet workbook.",
        }
    }
}
