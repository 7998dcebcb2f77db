//! # Scan Service Module
//!
//! HTTP API for running certificate inventories as background jobs. A scan
//! can take minutes when many documents go through the extraction service,
//! so starting one only registers a job; clients poll its status and fetch
//! the CSV once it has finished.
//!
//! ## Registered Routes
//!
//! *   **`POST /start`**: body `{"directory": "..."}`. Schedules a scan of that
//!     root and returns `{"job_id": "..."}`.
//! *   **`GET /status/{job_id}`**: current `JobStatus` of the job.
//! *   **`GET /report/{job_id}`**: the CSV report of a finished job.
//! *   **`POST /cancel/{job_id}`**: stops issuing extraction calls for the job.
//!     Rows are still produced; skipped dates are left empty.

mod cancel;
mod get_status;
mod report;
mod start;

use crate::inventory::Inventory;
use actix_web::web::{get, post, scope};
use actix_web::Scope;
use std::path::PathBuf;
use std::sync::Arc;

/// The base path for all scan endpoints.
const API_PATH: &str = "/api/scan";

/// What scan jobs need besides the job registry.
#[derive(Clone)]
pub struct ScanContext {
    pub inventory: Arc<Inventory>,
    /// Reports are written here as `{job_id}.csv`.
    pub output_dir: PathBuf,
}

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/start", post().to(start::process))
        .route("/status/{job_id}", get().to(get_status::process))
        .route("/report/{job_id}", get().to(report::process))
        .route("/cancel/{job_id}", post().to(cancel::process))
}
