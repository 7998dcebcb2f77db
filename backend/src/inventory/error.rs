//! Errors that abort a whole scan.
//!
//! Per-document extraction failures are not here: they are recovered into
//! empty values and reported as diagnostics (see `extraction::ExtractionError`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("root directory not found: {0}")]
    RootNotFound(String),

    #[error("root path is not a directory: {0}")]
    RootNotDirectory(String),

    #[error("cannot read root directory {path}: {source}")]
    RootUnreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot start extraction workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}
