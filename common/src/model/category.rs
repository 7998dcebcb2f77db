use serde::{Deserialize, Serialize};

/// How a category's column is filled in a product row.
///
/// A `Presence` column only records whether a matching document exists. An
/// `ExtractedDate` column holds the validity date read from the most recent
/// matching document by the document-understanding service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Presence,
    ExtractedDate,
}

/// Declarative form of one catalog entry, as written in a catalog file.
///
/// The backend compiles `pattern` into a case-insensitive regex when the
/// catalog is built; this struct only carries the raw text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDef {
    /// Column name in the report. Unique within a catalog.
    pub id: String,
    /// Regex searched anywhere in the file name.
    pub pattern: String,
    pub kind: ValueKind,
}

impl CategoryDef {
    pub fn new(id: &str, pattern: &str, kind: ValueKind) -> Self {
        Self {
            id: id.to_string(),
            pattern: pattern.to_string(),
            kind,
        }
    }
}
