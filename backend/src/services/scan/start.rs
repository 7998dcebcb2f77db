//! # Scan Job Start Service
//!
//! Provides `POST /api/scan/start`, which runs a certificate inventory of a
//! root directory as a background job.
//!
//! ## Workflow:
//!
//! 1.  **HTTP Request**: `process` receives a `StartScanRequest` naming the root.
//!
//! 2.  **Job Scheduling**: `schedule_scan_job` registers the job as `Pending`
//!     together with its cancellation token, returns the `job_id` at once and
//!     spawns a Tokio task that owns the job's lifecycle.
//!
//! 3.  **Background Processing**: the pipeline runs inside `spawn_blocking`;
//!     it classifies on the rayon pool and calls the extraction service from
//!     its own bounded pool.
//!
//! 4.  **Progress Reporting**: the pipeline's progress callback sends
//!     `ScanProgress` values through a per-job channel; a listener task
//!     converts them to `JobStatus::InProgress(percent)` for the job updater.
//!
//! 5.  **Completion**: the report is written to `{output_dir}/{job_id}.csv`
//!     and the job ends `Completed` or `Cancelled` with its `ScanSummary`, or
//!     `Failed` when the root could not be scanned.

use super::ScanContext;
use crate::inventory::control::{CancellationToken, RunControl, ScanProgress};
use crate::job_controller::state::{JobUpdate, JobsState};
use crate::report::csv_sink::{CsvReportSink, ReportSink};
use actix_web::{web, HttpResponse, Responder};
use common::jobs::JobStatus;
use common::model::report::ScanSummary;
use common::requests::StartScanRequest;
use log::{error, info};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use uuid::Uuid;

pub(crate) async fn process(
    state: web::Data<JobsState>,
    ctx: web::Data<ScanContext>,
    payload: web::Json<StartScanRequest>,
) -> impl Responder {
    match schedule_scan_job(state, ctx, payload.into_inner()).await {
        Ok(job_id) => HttpResponse::Ok().json(serde_json::json!({ "job_id": job_id })),
        Err(err) => HttpResponse::BadRequest().body(err),
    }
}

async fn schedule_scan_job(
    state: web::Data<JobsState>,
    ctx: web::Data<ScanContext>,
    req: StartScanRequest,
) -> Result<String, String> {
    if req.directory.trim().is_empty() {
        return Err("Directory path must not be empty".to_string());
    }

    let job_id = Uuid::new_v4().to_string();
    let cancel = CancellationToken::new();
    state
        .jobs
        .write()
        .await
        .insert(job_id.clone(), JobStatus::Pending);
    state
        .cancels
        .write()
        .await
        .insert(job_id.clone(), cancel.clone());

    let tx = state.tx.clone();
    let reports = state.reports.clone();
    let job_id_clone = job_id.clone();
    let root = PathBuf::from(req.directory);
    let ctx = ctx.into_inner();
    info!("Scan job {} started for {}", job_id, root.display());

    tokio::spawn(async move {
        let (progress_tx, mut progress_rx) = mpsc::channel::<ScanProgress>(100);

        // Listener: translate pipeline progress into job updates.
        let job_updater_tx = tx.clone();
        let job_id_for_updater = job_id_clone.clone();
        tokio::spawn(async move {
            let mut gate = ProgressGate::default();
            while let Some(progress) = progress_rx.recv().await {
                let Some(percent) = gate.advance(progress.percent()) else {
                    continue;
                };
                let _ = job_updater_tx
                    .send(JobUpdate {
                        job_id: job_id_for_updater.clone(),
                        status: JobStatus::InProgress(percent),
                    })
                    .await;
            }
        });

        let output = ctx.output_dir.join(format!("{}.csv", job_id_clone));
        let output_for_blocking = output.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let control = RunControl::new()
                .with_cancellation(cancel)
                .with_progress(move |progress| {
                    let _ = progress_tx.blocking_send(progress);
                });
            scan_blocking(&ctx, &root, &output_for_blocking, &control)
        });

        let status = match handle.await {
            Ok(Ok(summary)) => {
                reports.write().await.insert(job_id_clone.clone(), output);
                if summary.cancelled {
                    JobStatus::Cancelled(summary)
                } else {
                    JobStatus::Completed(summary)
                }
            }
            Ok(Err(e)) => {
                error!("Scan job {} failed: {}", job_id_clone, e);
                JobStatus::Failed(e)
            }
            Err(e) => JobStatus::Failed(format!("Task join error: {}", e)),
        };
        let _ = tx
            .send(JobUpdate {
                job_id: job_id_clone,
                status,
            })
            .await;
    });

    Ok(job_id)
}

/// Drops progress values that do not move the job forward.
///
/// Parallel workers report in completion order, so a smaller count can
/// arrive after a larger one.
#[derive(Default)]
struct ProgressGate {
    last: Option<u32>,
}

impl ProgressGate {
    fn advance(&mut self, percent: u32) -> Option<u32> {
        if self.last.is_some_and(|last| percent <= last) {
            return None;
        }
        self.last = Some(percent);
        Some(percent)
    }
}

/// Runs the pipeline and persists its table; meant for `spawn_blocking`.
fn scan_blocking(
    ctx: &ScanContext,
    root: &Path,
    output: &Path,
    control: &RunControl,
) -> Result<ScanSummary, String> {
    let report = ctx
        .inventory
        .run(root, control)
        .map_err(|e| e.to_string())?;
    let mut sink = CsvReportSink::create(output).map_err(|e| e.to_string())?;
    sink.write_report(ctx.inventory.catalog(), &report.rows)
        .map_err(|e| e.to_string())?;
    Ok(report.summary(Some(output)))
}
