//! # Certificate Inventory
//!
//! Scans a root directory of product folders and produces one report row per
//! product describing which certificate categories are on file and, for the
//! dated categories, the validity date of the newest document.
//!
//! ## Workflow
//!
//! 1.  **Enumeration**: the [`tree::DirectoryTree`] lists the products (fatal
//!     if the root cannot be read) and each product's PDF files.
//!
//! 2.  **Classification and selection**: one rayon task per product matches
//!     file names against the [`catalog::CategoryCatalog`] and keeps the
//!     newest candidate per category. A product's selections are complete
//!     before any of its extraction calls is issued.
//!
//! 3.  **Dispatch**: presence categories resolve immediately. Each dated
//!     selection becomes an extraction task; tasks from all products run on a
//!     dedicated pool whose size bounds concurrent calls to the service.
//!     Failures become empty values plus a [`Diagnostic`].
//!
//! 4.  **Aggregation**: rows are assembled with the full catalog schema and
//!     sorted by product name, independent of completion order.
//!
//! Progress and cancellation flow through [`control::RunControl`].

pub mod aggregator;
pub mod catalog;
pub mod classifier;
pub mod control;
pub mod dispatcher;
pub mod error;
pub mod selector;
pub mod tree;

use crate::extraction::{ExtractionError, ExtractionService};
use aggregator::ProductRow;
use catalog::CategoryCatalog;
use classifier::Candidate;
use common::model::report::{ResultValue, ScanSummary};
use control::{RunControl, ScanProgress};
use dispatcher::Dispatch;
use error::ScanError;
use log::{info, warn};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tree::{DirectoryTree, FileEntry, ProductDir};

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Upper bound on extraction calls in flight at once.
    pub max_concurrent_extractions: usize,
    /// MIME type sent with every document.
    pub mime_type: String,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_concurrent_extractions: 4,
            mime_type: "application/pdf".to_string(),
        }
    }
}

/// A non-fatal extraction failure, kept next to the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub product: String,
    pub category: String,
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub root: PathBuf,
    pub rows: Vec<ProductRow>,
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
}

impl ScanReport {
    pub fn summary(&self, output_csv: Option<&Path>) -> ScanSummary {
        ScanSummary {
            directory_path: self.root.display().to_string(),
            total_products: self.rows.len(),
            extraction_failures: self.diagnostics.len(),
            cancelled: self.cancelled,
            output_csv: output_csv.map(|p| p.display().to_string()),
        }
    }
}

/// Per-product state between selection and aggregation.
struct ProductPlan {
    product: ProductDir,
    resolved: HashMap<String, ResultValue>,
    pending: Vec<(usize, Candidate)>,
}

struct ExtractionTask {
    product: usize,
    category: usize,
    candidate: Candidate,
}

type Outcome = Result<Option<String>, ExtractionError>;

/// The scan pipeline with its collaborators.
///
/// Holds only read-only state, so one instance serves concurrent runs.
pub struct Inventory {
    catalog: Arc<CategoryCatalog>,
    tree: Arc<dyn DirectoryTree>,
    extractor: Arc<dyn ExtractionService>,
    options: ScanOptions,
}

impl Inventory {
    pub fn new(
        catalog: Arc<CategoryCatalog>,
        tree: Arc<dyn DirectoryTree>,
        extractor: Arc<dyn ExtractionService>,
        options: ScanOptions,
    ) -> Self {
        Self {
            catalog,
            tree,
            extractor,
            options,
        }
    }

    pub fn catalog(&self) -> &CategoryCatalog {
        &self.catalog
    }

    pub fn run(&self, root: &Path, control: &RunControl) -> Result<ScanReport, ScanError> {
        let start = Instant::now();
        info!("Scanning {}", root.display());

        let products = self.tree.products(root)?;
        let listings: Vec<(ProductDir, Vec<FileEntry>)> = products
            .into_par_iter()
            .map(|product| {
                let files = self.tree.files(&product);
                (product, files)
            })
            .collect();

        let total_files: usize = listings.iter().map(|(_, files)| files.len()).sum();
        control.report(ScanProgress::Classifying {
            done: 0,
            total: total_files,
        });

        let processed = AtomicUsize::new(0);
        let mut plans: Vec<ProductPlan> = listings
            .into_par_iter()
            .map(|(product, files)| {
                let selections = selector::select(classifier::classify(&self.catalog, &files));
                let done = processed.fetch_add(files.len(), Ordering::SeqCst) + files.len();
                control.report(ScanProgress::Classifying {
                    done,
                    total: total_files,
                });
                self.plan_product(product, selections)
            })
            .collect();

        let tasks: Vec<ExtractionTask> = plans
            .iter()
            .enumerate()
            .flat_map(|(product, plan)| {
                plan.pending.iter().map(move |(category, candidate)| ExtractionTask {
                    product,
                    category: *category,
                    candidate: candidate.clone(),
                })
            })
            .collect();
        let outcomes = self.run_extractions(&tasks, control)?;

        let mut diagnostics = Vec::new();
        for (task, outcome) in tasks.iter().zip(outcomes) {
            let resolution = dispatcher::resolve(outcome);
            let plan = &mut plans[task.product];
            let category_id = self
                .catalog
                .get(task.category)
                .map(|c| c.id().to_string())
                .unwrap_or_default();
            if let Some(failure) = resolution.failure {
                let diagnostic = Diagnostic {
                    product: plan.product.name.clone(),
                    category: category_id.clone(),
                    path: task.candidate.path.clone(),
                    reason: failure.to_string(),
                };
                warn!(
                    "No {} date for {} ({}): {}",
                    diagnostic.category,
                    diagnostic.product,
                    diagnostic.path.display(),
                    diagnostic.reason
                );
                diagnostics.push(diagnostic);
            }
            plan.resolved.insert(category_id, resolution.value);
        }

        let mut rows: Vec<ProductRow> = plans
            .into_iter()
            .map(|plan| aggregator::aggregate(&self.catalog, &plan.product, plan.resolved))
            .collect();
        rows.sort_by(|a, b| a.product().cmp(b.product()));

        let cancelled = control.cancellation().is_cancelled();
        info!(
            "Scanned {} products ({} PDFs, {} extractions, {} failed) in {:.2?}{}",
            rows.len(),
            total_files,
            tasks.len(),
            diagnostics.len(),
            start.elapsed(),
            if cancelled { ", cancelled" } else { "" }
        );

        Ok(ScanReport {
            root: root.to_path_buf(),
            rows,
            diagnostics,
            cancelled,
        })
    }

    fn plan_product(&self, product: ProductDir, selections: Vec<Option<Candidate>>) -> ProductPlan {
        let mut resolved = HashMap::new();
        let mut pending = Vec::new();
        for (index, (category, selection)) in self.catalog.iter().zip(selections).enumerate() {
            match dispatcher::plan(category.kind(), selection) {
                Dispatch::Resolved(value) => {
                    resolved.insert(category.id().to_string(), value);
                }
                Dispatch::Extract(candidate) => pending.push((index, candidate)),
            }
        }
        ProductPlan {
            product,
            resolved,
            pending,
        }
    }

    /// Runs every task on a pool of `max_concurrent_extractions` threads.
    /// Outcomes come back in task order.
    fn run_extractions(
        &self,
        tasks: &[ExtractionTask],
        control: &RunControl,
    ) -> Result<Vec<Outcome>, ScanError> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let total = tasks.len();
        control.report(ScanProgress::Extracting { done: 0, total });

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.max_concurrent_extractions.max(1))
            .thread_name(|i| format!("extract-{}", i))
            .build()?;

        let done = AtomicUsize::new(0);
        let outcomes: Vec<Outcome> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let outcome = dispatcher::extract(
                        self.extractor.as_ref(),
                        &task.candidate,
                        &self.options.mime_type,
                        control.cancellation(),
                    );
                    let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                    control.report(ScanProgress::Extracting {
                        done: finished,
                        total,
                    });
                    outcome
                })
                .collect()
        });
        Ok(outcomes)
    }
}
