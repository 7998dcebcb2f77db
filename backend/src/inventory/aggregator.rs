//! # Report Aggregator
//!
//! Builds the immutable per-product row. Whatever subset of categories was
//! resolved, the row always carries every catalog category in catalog order:
//! missing presence columns default to `false`, missing date columns to an
//! empty date. This keeps the report schema identical across products.

use super::catalog::CategoryCatalog;
use super::tree::ProductDir;
use chrono::{DateTime, Local};
use common::model::category::ValueKind;
use common::model::report::ResultValue;
use log::debug;
use std::collections::HashMap;

const CREATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq)]
pub struct ProductRow {
    product: String,
    created_at: DateTime<Local>,
    values: Vec<(String, ResultValue)>,
}

impl ProductRow {
    pub fn product(&self) -> &str {
        &self.product
    }

    /// `Created_At` column text, local time.
    pub fn created_at_label(&self) -> String {
        self.created_at.format(CREATED_AT_FORMAT).to_string()
    }

    /// Category values in catalog order.
    #[cfg(test)]
    pub fn values(&self) -> &[(String, ResultValue)] {
        &self.values
    }

    pub fn value(&self, category_id: &str) -> Option<&ResultValue> {
        self.values
            .iter()
            .find(|(id, _)| id == category_id)
            .map(|(_, value)| value)
    }
}

fn default_value(kind: ValueKind) -> ResultValue {
    match kind {
        ValueKind::Presence => ResultValue::Bool(false),
        ValueKind::ExtractedDate => ResultValue::OptionalDate(None),
    }
}

pub fn aggregate(
    catalog: &CategoryCatalog,
    product: &ProductDir,
    mut resolved: HashMap<String, ResultValue>,
) -> ProductRow {
    let values = catalog
        .iter()
        .map(|category| {
            let value = resolved
                .remove(category.id())
                .unwrap_or_else(|| default_value(category.kind()));
            (category.id().to_string(), value)
        })
        .collect();

    for id in resolved.keys() {
        debug!("Ignoring value for unknown category '{}' in {}", id, product.name);
    }

    ProductRow {
        product: product.name.clone(),
        created_at: DateTime::<Local>::from(product.created_at),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn product(name: &str) -> ProductDir {
        ProductDir {
            name: name.to_string(),
            path: PathBuf::from("/inventory").join(name),
            created_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    #[test]
    fn empty_input_yields_full_default_row() {
        let catalog = CategoryCatalog::standard().unwrap();
        let row = aggregate(&catalog, &product("Paracetamol"), HashMap::new());

        assert_eq!(row.product(), "Paracetamol");
        assert_eq!(row.values().len(), catalog.len());
        for (category, (id, value)) in catalog.iter().zip(row.values()) {
            assert_eq!(category.id(), id);
            match category.kind() {
                ValueKind::Presence => assert_eq!(value, &ResultValue::Bool(false)),
                ValueKind::ExtractedDate => assert_eq!(value, &ResultValue::OptionalDate(None)),
            }
        }
    }

    #[test]
    fn resolved_values_land_in_catalog_order() {
        let catalog = CategoryCatalog::standard().unwrap();
        let mut resolved = HashMap::new();
        resolved.insert("MSDS".to_string(), ResultValue::Bool(true));
        resolved.insert(
            "ISO".to_string(),
            ResultValue::OptionalDate(Some("2026-05-01".to_string())),
        );
        resolved.insert("Unknown".to_string(), ResultValue::Bool(true));

        let row = aggregate(&catalog, &product("Ibuprofen"), resolved);
        assert_eq!(row.values().len(), catalog.len());
        assert_eq!(row.values()[0].0, "ISO");
        assert_eq!(
            row.value("ISO"),
            Some(&ResultValue::OptionalDate(Some("2026-05-01".to_string())))
        );
        assert_eq!(row.value("MSDS"), Some(&ResultValue::Bool(true)));
        assert_eq!(row.value("CEP"), Some(&ResultValue::Bool(false)));
        assert_eq!(row.value("Unknown"), None);
    }

    #[test]
    fn created_at_uses_report_format() {
        let catalog = CategoryCatalog::standard().unwrap();
        let row = aggregate(&catalog, &product("Aspirin"), HashMap::new());
        let expected = DateTime::<Local>::from(product("Aspirin").created_at)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        assert_eq!(row.created_at_label(), expected);
        assert_eq!(row.created_at_label().len(), 19);
    }
}
