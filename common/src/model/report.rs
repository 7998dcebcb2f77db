use serde::{Deserialize, Serialize};

/// Resolved value of one category for one product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultValue {
    /// A matching document was (or was not) found.
    Bool(bool),
    /// Validity date read from the selected document, if any.
    OptionalDate(Option<String>),
}

impl ResultValue {
    /// Renders the value as a report cell.
    ///
    /// Booleans are spelled `True`/`False`; absent dates are empty cells.
    pub fn to_cell(&self) -> String {
        match self {
            ResultValue::Bool(true) => "True".to_string(),
            ResultValue::Bool(false) => "False".to_string(),
            ResultValue::OptionalDate(Some(date)) => date.clone(),
            ResultValue::OptionalDate(None) => String::new(),
        }
    }
}

/// Outcome of a finished scan, returned to callers next to the CSV report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Root directory that was scanned.
    pub directory_path: String,
    /// Number of product rows in the report.
    pub total_products: usize,
    /// Extractions that fell back to an empty value.
    pub extraction_failures: usize,
    /// True when the run was cancelled before every extraction was issued.
    pub cancelled: bool,
    /// Where the CSV report was written, when it was persisted.
    pub output_csv: Option<String>,
}
