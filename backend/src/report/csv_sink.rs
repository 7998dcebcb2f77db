//! # CSV Report Sink
//!
//! Persists product rows as the inventory table: `Product`, `Created_At`,
//! then one column per catalog category in catalog order.

use crate::inventory::aggregator::ProductRow;
use crate::inventory::catalog::CategoryCatalog;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

pub const PRODUCT_COLUMN: &str = "Product";
pub const CREATED_AT_COLUMN: &str = "Created_At";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cannot write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot encode report: {0}")]
    Csv(#[from] csv::Error),
}

/// Destination for a finished table.
pub trait ReportSink {
    fn write_report(
        &mut self,
        catalog: &CategoryCatalog,
        rows: &[ProductRow],
    ) -> Result<(), ReportError>;
}

pub struct CsvReportSink<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvReportSink<File> {
    /// Creates (or truncates) the report file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, ReportError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::from_writer(File::create(path)?))
    }
}

impl<W: Write> CsvReportSink<W> {
    pub fn from_writer(writer: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(writer),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> Result<W, ReportError> {
        self.writer
            .into_inner()
            .map_err(|e| ReportError::Io(e.into_error()))
    }
}

impl<W: Write> ReportSink for CsvReportSink<W> {
    fn write_report(
        &mut self,
        catalog: &CategoryCatalog,
        rows: &[ProductRow],
    ) -> Result<(), ReportError> {
        let mut header = vec![PRODUCT_COLUMN.to_string(), CREATED_AT_COLUMN.to_string()];
        header.extend(catalog.iter().map(|c| c.id().to_string()));
        self.writer.write_record(&header)?;

        for row in rows {
            let mut record = vec![row.product().to_string(), row.created_at_label()];
            record.extend(catalog.iter().map(|category| {
                row.value(category.id())
                    .map(|value| value.to_cell())
                    .unwrap_or_default()
            }));
            self.writer.write_record(&record)?;
        }

        self.writer.flush()?;
        Ok(())
    }
}
