//! # Category Catalog
//!
//! The fixed, ordered set of document categories a product folder is
//! inventoried against. Each category pairs a column id with a file-name
//! pattern and a [`ValueKind`] telling the dispatcher whether the column is a
//! presence flag or a date read by the extraction service.
//!
//! A catalog is compiled once at start-up, either from the built-in
//! definitions or from a TOML file, and shared read-only by every scan. Its
//! order is the column order of the report.

use common::model::category::{CategoryDef, ValueKind};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog has no categories")]
    Empty,

    #[error("category id must not be empty")]
    EmptyId,

    #[error("duplicate category id: {0}")]
    DuplicateId(String),

    #[error("invalid pattern for category '{id}': {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("cannot read catalog file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse catalog file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Categories of the historical certificate inventory, in report order.
pub fn default_definitions() -> Vec<CategoryDef> {
    use ValueKind::{ExtractedDate, Presence};
    vec![
        CategoryDef::new("ISO", "ISO", ExtractedDate),
        CategoryDef::new("GMP", "GMP", ExtractedDate),
        CategoryDef::new("GDP", "GDP", ExtractedDate),
        CategoryDef::new("Control Drug", "(Control Drug|CD)", ExtractedDate),
        CategoryDef::new("API", "API", ExtractedDate),
        CategoryDef::new("WC", "WC", ExtractedDate),
        CategoryDef::new("TSE", "TSE", ExtractedDate),
        CategoryDef::new("MSDS", "MSDS", Presence),
        CategoryDef::new("CEP", "CEP", Presence),
        CategoryDef::new("Ele", "Ele", Presence),
        CategoryDef::new("RS", "RS", Presence),
        CategoryDef::new("Genotoxic", "Genotoxic", Presence),
        CategoryDef::new("Nitrosamine", "Nitrosamine", Presence),
    ]
}

/// A compiled catalog entry.
#[derive(Debug, Clone)]
pub struct Category {
    id: String,
    pattern: Regex,
    kind: ValueKind,
}

impl Category {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Case-insensitive search of the pattern anywhere in `file_name`.
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }
}

/// On-disk shape of a catalog file: a list of `[[category]]` tables.
#[derive(Deserialize)]
struct CatalogFile {
    category: Vec<CategoryDef>,
}

#[derive(Debug, Clone)]
pub struct CategoryCatalog {
    categories: Vec<Category>,
}

impl CategoryCatalog {
    /// Compiles and validates a list of definitions, keeping their order.
    pub fn from_defs(defs: &[CategoryDef]) -> Result<Self, CatalogError> {
        if defs.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        let mut categories = Vec::with_capacity(defs.len());
        for def in defs {
            if def.id.trim().is_empty() {
                return Err(CatalogError::EmptyId);
            }
            if !seen.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateId(def.id.clone()));
            }
            let pattern = RegexBuilder::new(&def.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|source| CatalogError::InvalidPattern {
                    id: def.id.clone(),
                    source,
                })?;
            categories.push(Category {
                id: def.id.clone(),
                pattern,
                kind: def.kind,
            });
        }

        Ok(Self { categories })
    }

    /// The built-in certificate catalog.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_defs(&default_definitions())
    }

    /// Loads a catalog from a TOML file of `[[category]]` tables.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let display = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: display.clone(),
            source,
        })?;
        Self::parse(&text).map_err(|err| match err {
            CatalogError::Parse { source, .. } => CatalogError::Parse {
                path: display,
                source,
            },
            other => other,
        })
    }

    fn parse(text: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(text).map_err(|source| CatalogError::Parse {
            path: String::new(),
            source,
        })?;
        Self::from_defs(&file.category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Category> {
        self.categories.get(index)
    }

    /// Catalog position of the category with this id.
    #[cfg(test)]
    pub fn position(&self, id: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}
